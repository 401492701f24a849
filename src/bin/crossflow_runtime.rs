//! Crossflow Runtime
//!
//! This binary wires the bundled domains into a running pipeline:
//! - Spawns one ingestion task per domain (seismic, epidemic, market, sentiment)
//! - Tails `<CROSSFLOW_FEED_DIR>/<domain>.jsonl` into each domain's channel
//! - Runs the consensus scheduler and appends tick reports to a JSONL file
//!
//! Usage:
//!   cargo run --release --bin crossflow_runtime
//!
//! Environment variables: see `EngineConfig::from_env`.

use crossflow::domains::{
    epidemic, market, seismic, sentiment, EpidemicModel, MarketModel, SeismicModel,
    SentimentModel,
};
use crossflow::feed::{FeedReader, StartPosition};
use crossflow::output::{PredictionJsonlWriter, PredictionSink};
use crossflow::pipeline::{
    consensus_scheduler_task, spawn_domain, Adapter, DomainHandle, EngineConfig, PipelineError,
    ResonanceEngine, SignatureBoard,
};
use dotenv::dotenv;
use log::{error, info, warn};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Retry delay while a feed file does not exist yet
const FEED_RETRY: Duration = Duration::from_secs(5);

/// Forward every decodable line of `path` into `handle` until the domain task stops.
fn spawn_feed<E>(path: String, start: StartPosition, handle: DomainHandle<E>) -> JoinHandle<()>
where
    E: DeserializeOwned + Send + 'static,
{
    tokio::spawn(async move {
        let domain = handle.domain().clone();

        let mut reader = loop {
            let mut reader = FeedReader::new(&path, start);
            match reader.start().await {
                Ok(()) => break reader,
                Err(e) => {
                    warn!("⚠️  {} feed not available ({}), retrying in {:?}", domain, e, FEED_RETRY);
                    tokio::time::sleep(FEED_RETRY).await;
                }
            }
        };

        loop {
            match reader.next_event::<E>().await {
                Ok(event) => {
                    if let Err(e) = handle.send(event).await {
                        warn!("⚠️  {}", e);
                        break;
                    }
                }
                Err(PipelineError::Serialization(e)) => {
                    warn!("⚠️  Skipping malformed {} line: {}", domain, e);
                }
                Err(e) => {
                    error!("❌ {} feed failed: {}", domain, e);
                    tokio::time::sleep(FEED_RETRY).await;
                }
            }
        }
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize environment and logging
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("🚀 Crossflow Runtime");
    info!("   └─ Version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = EngineConfig::from_env();
    config.validate()?;

    info!("✅ Configuration loaded");
    info!("   ├─ Tick interval: {}ms", config.tick_interval_ms);
    info!("   ├─ Signature refresh: {}ms", config.signature_refresh_ms);
    info!("   ├─ Channel buffer: {} events", config.channel_buffer);
    info!(
        "   ├─ Correlation: min {} samples, window {}, max lag {}, metric {}",
        config.correlation.min_samples,
        config.correlation.window,
        config.correlation.max_lag,
        config.correlation.metric.as_str()
    );
    info!("   ├─ Feeds: {} (replay: {})", config.feed_dir, config.feed_replay);
    info!("   └─ Output: {}", config.predictions_output_path);

    let start = if config.feed_replay {
        StartPosition::Beginning
    } else {
        StartPosition::End
    };
    let task_config = config.domain_task_config();
    let mut board = SignatureBoard::new();
    let mut feeds = Vec::new();
    let mut domain_tasks = Vec::new();

    info!("🚀 Spawning domains...");

    let (handle, task) = spawn_domain(
        Adapter::new(SeismicModel::default(), seismic::adapter_config())?,
        &mut board,
        task_config,
    );
    feeds.push(spawn_feed(config.feed_path(seismic::DOMAIN), start, handle));
    domain_tasks.push(task);

    let (handle, task) = spawn_domain(
        Adapter::new(EpidemicModel::default(), epidemic::adapter_config())?,
        &mut board,
        task_config,
    );
    feeds.push(spawn_feed(config.feed_path(epidemic::DOMAIN), start, handle));
    domain_tasks.push(task);

    let (handle, task) = spawn_domain(
        Adapter::new(MarketModel::default(), market::adapter_config())?,
        &mut board,
        task_config,
    );
    feeds.push(spawn_feed(config.feed_path(market::DOMAIN), start, handle));
    domain_tasks.push(task);

    let (handle, task) = spawn_domain(
        Adapter::new(SentimentModel::default(), sentiment::adapter_config())?,
        &mut board,
        task_config,
    );
    feeds.push(spawn_feed(config.feed_path(sentiment::DOMAIN), start, handle));
    domain_tasks.push(task);

    info!("✅ {} domains running", board.len());

    // Consensus scheduler
    let sink: Box<dyn PredictionSink> =
        Box::new(PredictionJsonlWriter::new(&config.predictions_output_path)?);
    let engine = ResonanceEngine::from_config(&config)?;
    let scheduler = tokio::spawn(consensus_scheduler_task(
        engine,
        board,
        Some(sink),
        config.tick_interval_ms,
    ));

    info!("🔄 Press CTRL+C to shutdown gracefully");

    // Wait for CTRL+C
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("");
            info!("⚠️  Received CTRL+C, shutting down...");
        }
        Err(err) => {
            error!("❌ Failed to listen for CTRL+C: {}", err);
        }
    }

    // Stopping the feeds drops every domain handle, which closes the channels
    for feed in feeds {
        feed.abort();
    }
    for task in domain_tasks {
        match task.await {
            Ok(status) => info!(
                "   ├─ {}: {} accepted, {} rejected, {} clamped",
                status.domain, status.accepted, status.rejected, status.clamped
            ),
            Err(e) => error!("❌ Domain task failed: {}", e),
        }
    }

    let shutdown_grace = Duration::from_millis(config.tick_interval_ms.saturating_mul(2).max(2_000));
    match tokio::time::timeout(shutdown_grace, scheduler).await {
        Ok(Ok((engine, last))) => {
            info!("   └─ Scheduler: {} ticks", engine.tick_count());
            info!(
                "📊 Final consensus: {} (confidence {:.2})",
                last.prediction.direction.as_str(),
                last.prediction.confidence
            );
        }
        Ok(Err(e)) => error!("❌ Scheduler task failed: {}", e),
        Err(_) => warn!("⚠️  Scheduler did not stop within {:?}", shutdown_grace),
    }

    info!("✅ Crossflow runtime stopped");
    Ok(())
}
