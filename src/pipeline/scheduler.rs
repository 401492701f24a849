//! Consensus scheduler
//!
//! Ticks on a fixed interval, snapshots every domain's published signature,
//! runs the resonance engine on that snapshot and hands the report to the
//! sink. Stops once every domain task has exited (after one final tick) or
//! when the task is dropped.

use super::engine::{ResonanceEngine, TickReport};
use super::ingestion::SignatureBoard;
use crate::output::PredictionSink;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Consensus scheduler task
///
/// Arguments:
/// - `engine`: owned resonance engine (single consumer, no lock needed)
/// - `board`: published signatures of every spawned domain
/// - `sink`: optional destination for tick reports
/// - `tick_interval_ms`: tick interval in milliseconds
///
/// Returns the engine and the final report once all domain tasks are gone.
pub async fn consensus_scheduler_task(
    mut engine: ResonanceEngine,
    board: SignatureBoard,
    mut sink: Option<Box<dyn PredictionSink>>,
    tick_interval_ms: u64,
) -> (ResonanceEngine, TickReport) {
    log::info!(
        "⏰ Starting consensus scheduler (interval: {}ms, domains: {})",
        tick_interval_ms,
        board.len()
    );
    if let Some(sink) = &sink {
        log::info!("   └─ Sink: {}", sink.backend_type());
    }

    let mut timer = interval(Duration::from_millis(tick_interval_ms.max(1)));
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let last_report = loop {
        timer.tick().await;

        // Read before the snapshot so the final tick sees every final publish
        let finished = !board.is_empty() && board.all_closed();

        let tick_start = std::time::Instant::now();
        let snapshot = board.snapshot();
        let report = engine.tick(&snapshot);

        if let Some(sink) = sink.as_mut() {
            if let Err(e) = sink.write_report(&report).await {
                log::error!("❌ Failed to write tick {}: {}", report.tick, e);
            }
        }

        log::debug!(
            "📊 Tick {} complete: {} domains, {} ready pairs | {}µs",
            report.tick,
            snapshot.len(),
            report.correlations.len(),
            tick_start.elapsed().as_micros()
        );

        if finished {
            log::info!("🔄 All domain tasks stopped, scheduler exiting");
            break report;
        }
    };

    if let Some(sink) = sink.as_mut() {
        if let Err(e) = sink.flush().await {
            log::error!("❌ Failed final sink flush: {}", e);
        }
    }

    log::info!("✅ Consensus scheduler stopped after {} ticks", engine.tick_count());
    (engine, last_report)
}
