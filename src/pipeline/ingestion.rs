//! Per-domain ingestion tasks
//!
//! Each domain adapter is moved into its own task and fed through a bounded
//! mpsc channel, so no buffer is ever behind a lock. The task republishes the
//! adapter's signature on a `watch` channel whenever new events arrived since
//! the last refresh, and once more when the event channel closes. A domain
//! that goes quiet for longer than `stale_after_ms` publishes its default
//! signature instead, so it stops carrying confidence it no longer has. The
//! scheduler only ever reads those published values.

use super::adapter::{Adapter, AdapterStatus, DomainAdapter, DomainModel};
use super::error::{PipelineError, PipelineResult};
use super::types::{DomainId, Signature};
use std::collections::BTreeMap;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};

/// Per-domain task settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainTaskConfig {
    pub channel_buffer: usize,
    /// Signature republish cadence
    pub refresh_ms: u64,
    /// Quiet period after which the default signature is published
    pub stale_after_ms: Option<u64>,
}

impl Default for DomainTaskConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 10_000,
            refresh_ms: 250,
            stale_after_ms: Some(60_000),
        }
    }
}

/// Sending side of one domain's event channel
pub struct DomainHandle<E> {
    domain: DomainId,
    tx: mpsc::Sender<E>,
}

impl<E> Clone for DomainHandle<E> {
    fn clone(&self) -> Self {
        Self {
            domain: self.domain.clone(),
            tx: self.tx.clone(),
        }
    }
}

impl<E: Send + 'static> DomainHandle<E> {
    pub fn domain(&self) -> &DomainId {
        &self.domain
    }

    /// Queue one event, waiting for channel capacity.
    pub async fn send(&self, event: E) -> PipelineResult<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| PipelineError::ChannelClosed(self.domain.clone()))
    }

    /// Queue one event without waiting; `Ok(false)` when the channel is full.
    pub fn try_send(&self, event: E) -> PipelineResult<bool> {
        match self.tx.try_send(event) {
            Ok(()) => Ok(true),
            Err(mpsc::error::TrySendError::Full(_)) => Ok(false),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(PipelineError::ChannelClosed(self.domain.clone()))
            }
        }
    }

    /// Events waiting in the channel
    pub fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

struct BoardEntry {
    signature: watch::Receiver<Signature>,
    status: watch::Receiver<AdapterStatus>,
}

/// Latest published signature of every registered domain
#[derive(Default)]
pub struct SignatureBoard {
    entries: BTreeMap<DomainId, BoardEntry>,
}

impl SignatureBoard {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(
        &mut self,
        domain: DomainId,
        signature: watch::Receiver<Signature>,
        status: watch::Receiver<AdapterStatus>,
    ) {
        if self.entries.contains_key(&domain) {
            log::warn!("⚠️  Domain {} registered twice, replacing previous task", domain);
        }
        self.entries.insert(domain, BoardEntry { signature, status });
    }

    /// Point-in-time copy of every domain's current signature.
    ///
    /// A domain whose task has stopped keeps contributing its last value.
    pub fn snapshot(&self) -> Vec<Signature> {
        self.entries
            .values()
            .map(|entry| entry.signature.borrow().clone())
            .collect()
    }

    pub fn statuses(&self) -> Vec<AdapterStatus> {
        self.entries
            .values()
            .map(|entry| entry.status.borrow().clone())
            .collect()
    }

    pub fn domains(&self) -> Vec<DomainId> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stop tracking a domain; its last signature is no longer reported.
    pub fn remove(&mut self, domain: &DomainId) -> bool {
        self.entries.remove(domain).is_some()
    }

    /// True once every registered domain task has exited.
    pub fn all_closed(&self) -> bool {
        self.entries
            .values()
            .all(|entry| entry.signature.has_changed().is_err())
    }
}

/// Move `adapter` into its own task and register it on `board`.
///
/// Returns the handle feed connectors send events through and the task's
/// join handle, which yields the final adapter status once every handle has
/// been dropped.
pub fn spawn_domain<M: DomainModel>(
    mut adapter: Adapter<M>,
    board: &mut SignatureBoard,
    config: DomainTaskConfig,
) -> (DomainHandle<M::Event>, JoinHandle<AdapterStatus>) {
    adapter.initialize();
    let domain = adapter.domain().clone();

    let (tx, rx) = mpsc::channel(config.channel_buffer.max(1));
    let (signature_tx, signature_rx) = watch::channel(adapter.extract_signature(None));
    let (status_tx, status_rx) = watch::channel(adapter.status());
    board.register(domain.clone(), signature_rx, status_rx);

    let handle = tokio::spawn(run_domain(adapter, rx, signature_tx, status_tx, config));

    (DomainHandle { domain, tx }, handle)
}

async fn run_domain<M: DomainModel>(
    mut adapter: Adapter<M>,
    mut rx: mpsc::Receiver<M::Event>,
    signature_tx: watch::Sender<Signature>,
    status_tx: watch::Sender<AdapterStatus>,
    config: DomainTaskConfig,
) -> AdapterStatus {
    let domain = adapter.domain().clone();
    let refresh_ms = config.refresh_ms.max(1);
    let stale_after = config.stale_after_ms.filter(|ms| *ms > 0).map(Duration::from_millis);

    log::info!("🚀 Starting {} ingestion", domain);
    log::info!("   ├─ Signature refresh: {}ms", refresh_ms);
    match stale_after {
        Some(limit) => log::info!("   ├─ Stale after: {}ms", limit.as_millis()),
        None => log::info!("   ├─ Stale detection: disabled"),
    }
    log::info!("   └─ Waiting for events...");

    let mut refresh_timer = interval(Duration::from_millis(refresh_ms));
    refresh_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut dirty = false;
    let mut stale = false;
    let mut last_event_at = Instant::now();
    let mut event_count = 0u64;
    let mut last_log_time = std::time::Instant::now();

    loop {
        tokio::select! {
            maybe_event = rx.recv() => {
                let Some(event) = maybe_event else {
                    // Channel closed (every handle dropped)
                    log::info!("🔄 {} event channel closed, publishing final signature", domain);
                    if !stale {
                        publish(&adapter, &signature_tx, &status_tx);
                    }
                    break;
                };

                match adapter.process(event) {
                    Ok(_) => {
                        if stale {
                            log::info!("✅ {} resumed after going stale", domain);
                            stale = false;
                        }
                        dirty = true;
                        event_count += 1;
                        last_event_at = Instant::now();
                    }
                    Err(e) => log::warn!("⚠️  Dropped event: {}", e),
                }

                // Log throughput every 10 seconds
                if last_log_time.elapsed().as_secs() >= 10 {
                    let per_sec = event_count as f64 / last_log_time.elapsed().as_secs_f64();
                    log::info!(
                        "📊 {} ingestion rate: {:.1} events/sec (buffered: {})",
                        domain,
                        per_sec,
                        adapter.status().buffered
                    );
                    last_log_time = std::time::Instant::now();
                    event_count = 0;
                }
            }

            _ = refresh_timer.tick() => {
                if dirty {
                    publish(&adapter, &signature_tx, &status_tx);
                    dirty = false;
                } else if !stale && stale_after.is_some_and(|limit| last_event_at.elapsed() >= limit) {
                    log::warn!(
                        "⚠️  {} stalled (no events for {}ms), publishing default signature",
                        domain,
                        last_event_at.elapsed().as_millis()
                    );
                    signature_tx.send_replace(adapter.extract_signature(Some(0)));
                    status_tx.send_replace(adapter.status());
                    stale = true;
                }
            }
        }
    }

    let status = adapter.status();
    log::info!(
        "✅ {} ingestion stopped ({} accepted, {} rejected)",
        domain,
        status.accepted,
        status.rejected
    );
    status
}

fn publish<M: DomainModel>(
    adapter: &Adapter<M>,
    signature_tx: &watch::Sender<Signature>,
    status_tx: &watch::Sender<AdapterStatus>,
) {
    // send_replace never fails, even with no receivers left
    signature_tx.send_replace(adapter.extract_signature(None));
    status_tx.send_replace(adapter.status());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::adapter::tests::GaugeModel;
    use crate::pipeline::adapter::AdapterConfig;

    fn task_config() -> DomainTaskConfig {
        DomainTaskConfig {
            channel_buffer: 16,
            refresh_ms: 10,
            stale_after_ms: None,
        }
    }

    fn make_adapter() -> Adapter<GaugeModel> {
        Adapter::new_with_timestamp_fn(GaugeModel, AdapterConfig::new(8, 8, 2), Box::new(|| 5_000))
            .unwrap()
    }

    #[tokio::test]
    async fn test_initial_publish_is_default_signature() {
        let mut board = SignatureBoard::new();
        let (_handle, _task) = spawn_domain(make_adapter(), &mut board, task_config());

        let snapshot = board.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot[0].is_default);
        assert_eq!(snapshot[0].domain, DomainId::new("gauge"));

        let statuses = board.statuses();
        assert!(statuses[0].active);
        assert_eq!(statuses[0].buffered, 0);
    }

    #[tokio::test]
    async fn test_events_flow_into_published_signature() {
        let mut board = SignatureBoard::new();
        let (handle, task) = spawn_domain(make_adapter(), &mut board, task_config());

        for i in 0..5 {
            handle.send((i, 0.1 * (i + 1) as f64, 1.0)).await.unwrap();
        }
        // Invalid event is dropped by the task, not by the sender
        handle.send((5, 0.5, f64::NAN)).await.unwrap();
        drop(handle);

        let status = task.await.unwrap();
        assert_eq!(status.accepted, 5);
        assert_eq!(status.rejected, 1);

        // Final publish happened before the task exited
        let snapshot = board.snapshot();
        assert!(!snapshot[0].is_default);
        assert_eq!(snapshot[0].sample_count, 5);
        assert!((snapshot[0].intensity - 0.3).abs() < 1e-9);
        assert!(board.all_closed());
    }

    #[tokio::test]
    async fn test_send_after_task_stops() {
        let mut board = SignatureBoard::new();
        let (handle, task) = spawn_domain(make_adapter(), &mut board, task_config());

        task.abort();
        let _ = task.await;

        let err = handle.send((0, 0.5, 0.0)).await.unwrap_err();
        assert!(matches!(err, PipelineError::ChannelClosed(ref d) if d.as_str() == "gauge"));
        assert!(matches!(
            handle.try_send((0, 0.5, 0.0)),
            Err(PipelineError::ChannelClosed(_))
        ));
    }

    #[tokio::test]
    async fn test_board_remove() {
        let mut board = SignatureBoard::new();
        let (_handle, _task) = spawn_domain(make_adapter(), &mut board, task_config());
        assert_eq!(board.domains(), vec![DomainId::new("gauge")]);
        assert!(!board.all_closed());

        assert!(board.remove(&DomainId::new("gauge")));
        assert!(board.is_empty());
        assert!(board.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_domain_falls_back_to_default() {
        let mut board = SignatureBoard::new();
        let config = DomainTaskConfig {
            stale_after_ms: Some(1_000),
            ..task_config()
        };
        let (handle, task) = spawn_domain(make_adapter(), &mut board, config);

        handle.send((0, 0.6, 1.0)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!board.snapshot()[0].is_default);

        // Quiet past the stale limit
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        let snapshot = board.snapshot();
        assert!(snapshot[0].is_default);
        assert_eq!(snapshot[0].sample_count, 0);

        // A new event brings the real signature back
        handle.send((1, 0.4, 1.0)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let snapshot = board.snapshot();
        assert!(!snapshot[0].is_default);
        assert_eq!(snapshot[0].sample_count, 2);

        drop(handle);
        task.await.unwrap();
    }
}
