//! Resonance Engine - per-tick orchestration above all adapters
//!
//! ```text
//! Vec<Signature> (point-in-time snapshot of every domain)
//!     ↓
//! CorrelationEngine::observe()
//!     ↓
//! Ready correlations
//!     ↓
//! ConsensusAggregator::aggregate()
//!     ↓
//! TickReport { prediction, correlations }
//! ```
//!
//! The engine never sees a live buffer. It works only on the signatures it is
//! handed, so a domain updating mid-tick simply contributes its pre-tick value.

use super::config::EngineConfig;
use super::consensus::{ConsensusAggregator, ConsensusConfig};
use super::correlation::{CorrelationConfig, CorrelationEngine, PairPhase};
use super::error::PipelineResult;
use super::types::{CrossDomainCorrelation, Direction, DomainId, Signature, UnifiedPrediction};
use serde::{Deserialize, Serialize};

/// Everything one scheduler tick produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: u64,
    pub prediction: UnifiedPrediction,
    pub correlations: Vec<CrossDomainCorrelation>,
    /// Pairs that reached Ready during this tick
    pub newly_ready: usize,
}

pub struct ResonanceEngine {
    correlations: CorrelationEngine,
    aggregator: ConsensusAggregator,
    tick_count: u64,
    last_direction: Option<Direction>,

    /// Timestamp function (for testing with mock time)
    now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
}

impl ResonanceEngine {
    pub fn new(correlation: CorrelationConfig, consensus: ConsensusConfig) -> PipelineResult<Self> {
        Self::new_with_timestamp_fn(
            correlation,
            consensus,
            Box::new(|| chrono::Utc::now().timestamp_millis()),
        )
    }

    pub fn from_config(config: &EngineConfig) -> PipelineResult<Self> {
        Self::new(config.correlation, config.consensus)
    }

    /// Create an engine with a custom timestamp function (milliseconds).
    pub fn new_with_timestamp_fn(
        correlation: CorrelationConfig,
        consensus: ConsensusConfig,
        now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
    ) -> PipelineResult<Self> {
        Ok(Self {
            correlations: CorrelationEngine::new(correlation)?,
            aggregator: ConsensusAggregator::new(consensus)?,
            tick_count: 0,
            last_direction: None,
            now_fn,
        })
    }

    /// Run one tick over a consistent snapshot of domain signatures.
    pub fn tick(&mut self, snapshots: &[Signature]) -> TickReport {
        let now = (self.now_fn)();
        self.tick_count += 1;

        let newly_ready = self.correlations.observe(snapshots, now);
        let correlations = self.correlations.ready_correlations();
        let prediction = self.aggregator.aggregate(snapshots, &correlations, now);

        if self.last_direction != Some(prediction.direction) {
            log::info!(
                "🧭 Consensus {} (confidence {:.2}, strength {:.2}, {} domains, {} ready pairs)",
                prediction.direction.as_str(),
                prediction.confidence,
                prediction.consensus_strength,
                prediction.contributions.len(),
                correlations.len()
            );
            self.last_direction = Some(prediction.direction);
        }

        log::debug!(
            "Tick {}: {} signatures, {} ready pairs, direction {}",
            self.tick_count,
            snapshots.len(),
            correlations.len(),
            prediction.direction.as_str()
        );

        TickReport {
            tick: self.tick_count,
            prediction,
            correlations,
            newly_ready,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn correlation(&self, a: &DomainId, b: &DomainId) -> Option<CrossDomainCorrelation> {
        self.correlations.get(a, b)
    }

    pub fn pair_phase(&self, a: &DomainId, b: &DomainId) -> PairPhase {
        self.correlations.phase(a, b)
    }

    /// Forget a domain that will not report again.
    pub fn retire_domain(&mut self, domain: &DomainId) {
        self.correlations.forget(domain);
        log::info!("🗑️  Retired domain {}", domain);
    }
}
