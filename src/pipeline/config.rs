//! Runtime configuration from environment variables

use super::consensus::ConsensusConfig;
use super::correlation::{CorrelationConfig, SignatureMetric};
use super::error::{PipelineError, PipelineResult};
use super::ingestion::DomainTaskConfig;
use std::env;
use std::str::FromStr;

/// Configuration for the crossflow runtime
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Consensus scheduler tick interval in milliseconds
    pub tick_interval_ms: u64,

    /// How often each domain task republishes its signature
    pub signature_refresh_ms: u64,

    /// Per-domain event channel buffer size
    pub channel_buffer: usize,

    /// Quiet period before a domain falls back to its default signature (0 disables)
    pub stale_after_ms: u64,

    pub correlation: CorrelationConfig,
    pub consensus: ConsensusConfig,

    /// JSONL file receiving one tick report per line
    pub predictions_output_path: String,

    /// Directory holding `<domain>.jsonl` event feeds
    pub feed_dir: String,

    /// Replay existing feed lines on startup instead of tailing from the end
    pub feed_replay: bool,
}

fn parse_or<T: FromStr>(lookup: &dyn Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl EngineConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `CROSSFLOW_TICK_INTERVAL_MS` (default: 1000)
    /// - `CROSSFLOW_SIGNATURE_REFRESH_MS` (default: 250)
    /// - `CROSSFLOW_CHANNEL_BUFFER` (default: 10000)
    /// - `CROSSFLOW_STALE_AFTER_MS` (default: 60000, 0 disables)
    /// - `CORRELATION_MIN_SAMPLES` (default: 30)
    /// - `CORRELATION_WINDOW` (default: 100)
    /// - `CORRELATION_MAX_LAG` (default: 5)
    /// - `CORRELATION_METRIC` (default: momentum)
    /// - `CONSENSUS_ISOLATED_WEIGHT` (default: 0.05)
    /// - `CONSENSUS_VOTE_DEADBAND` (default: 0.0)
    /// - `PREDICTIONS_OUTPUT_PATH` (default: streams/predictions.jsonl)
    /// - `CROSSFLOW_FEED_DIR` (default: streams/feeds)
    /// - `CROSSFLOW_FEED_REPLAY` (default: false)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary key source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup: &dyn Fn(&str) -> Option<String> = &lookup;
        let correlation_defaults = CorrelationConfig::default();
        let consensus_defaults = ConsensusConfig::default();

        let metric = lookup("CORRELATION_METRIC")
            .and_then(|s| SignatureMetric::parse(s.trim()))
            .unwrap_or(correlation_defaults.metric);

        Self {
            tick_interval_ms: parse_or(lookup, "CROSSFLOW_TICK_INTERVAL_MS", 1_000),
            signature_refresh_ms: parse_or(lookup, "CROSSFLOW_SIGNATURE_REFRESH_MS", 250),
            channel_buffer: parse_or(lookup, "CROSSFLOW_CHANNEL_BUFFER", 10_000),
            stale_after_ms: parse_or(lookup, "CROSSFLOW_STALE_AFTER_MS", 60_000),

            correlation: CorrelationConfig {
                min_samples: parse_or(
                    lookup,
                    "CORRELATION_MIN_SAMPLES",
                    correlation_defaults.min_samples,
                ),
                window: parse_or(lookup, "CORRELATION_WINDOW", correlation_defaults.window),
                max_lag: parse_or(lookup, "CORRELATION_MAX_LAG", correlation_defaults.max_lag),
                metric,
                variance_penalty: correlation_defaults.variance_penalty,
            },

            consensus: ConsensusConfig {
                isolated_weight: parse_or(
                    lookup,
                    "CONSENSUS_ISOLATED_WEIGHT",
                    consensus_defaults.isolated_weight,
                ),
                vote_deadband: parse_or(
                    lookup,
                    "CONSENSUS_VOTE_DEADBAND",
                    consensus_defaults.vote_deadband,
                ),
                momentum_scale: consensus_defaults.momentum_scale,
            },

            predictions_output_path: lookup("PREDICTIONS_OUTPUT_PATH")
                .unwrap_or_else(|| "streams/predictions.jsonl".to_string()),
            feed_dir: lookup("CROSSFLOW_FEED_DIR").unwrap_or_else(|| "streams/feeds".to_string()),
            feed_replay: parse_or(lookup, "CROSSFLOW_FEED_REPLAY", false),
        }
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.tick_interval_ms == 0 {
            return Err(PipelineError::InvalidConfig(
                "CROSSFLOW_TICK_INTERVAL_MS must be > 0".to_string(),
            ));
        }
        if self.signature_refresh_ms == 0 {
            return Err(PipelineError::InvalidConfig(
                "CROSSFLOW_SIGNATURE_REFRESH_MS must be > 0".to_string(),
            ));
        }
        if self.channel_buffer == 0 {
            return Err(PipelineError::InvalidConfig(
                "CROSSFLOW_CHANNEL_BUFFER must be > 0".to_string(),
            ));
        }
        self.correlation.validate()?;
        self.consensus.validate()?;
        Ok(())
    }

    pub fn domain_task_config(&self) -> DomainTaskConfig {
        DomainTaskConfig {
            channel_buffer: self.channel_buffer,
            refresh_ms: self.signature_refresh_ms,
            stale_after_ms: (self.stale_after_ms > 0).then_some(self.stale_after_ms),
        }
    }

    pub fn feed_path(&self, domain: &str) -> String {
        format!("{}/{}.jsonl", self.feed_dir.trim_end_matches('/'), domain)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
