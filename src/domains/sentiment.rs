//! Sentiment domain: aggregated text polarity per interval
//!
//! Valid ranges: `polarity` in [-1, 1], `subjectivity` in [0, 1],
//! `mention_count` any non-negative count. Intensity is |polarity| weighted
//! by how much chatter backs it up.
//!
//! Harmonics (3): polarity, subjectivity, mention weight.

use super::tables::{classify, SENTIMENT_POLARITY_BANDS};
use crate::pipeline::adapter::{AdapterConfig, DomainModel, Normalized};
use crate::pipeline::error::{require_range, PipelineResult};
use crate::pipeline::types::{DomainId, QuadrantProfile, Signal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

pub const DOMAIN: &str = "sentiment";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentEvent {
    pub timestamp_ms: i64,
    pub polarity: f64,
    pub subjectivity: f64,
    pub mention_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentTuning {
    /// Mentions per interval at which the mention weight reaches 1
    pub mention_saturation: f64,
    /// |polarity| below this reads as no opinion
    pub neutral_band: f64,
}

impl Default for SentimentTuning {
    fn default() -> Self {
        Self {
            mention_saturation: 1_000.0,
            neutral_band: 0.05,
        }
    }
}

#[derive(Default)]
pub struct SentimentModel {
    tuning: SentimentTuning,
}

impl SentimentModel {
    pub fn new(tuning: SentimentTuning) -> Self {
        Self { tuning }
    }

    /// Log-scaled mention weight in [0, 1]
    fn mention_weight(&self, mentions: f64) -> f64 {
        (mentions.max(0.0).ln_1p() / self.tuning.mention_saturation.ln_1p()).min(1.0)
    }
}

pub fn adapter_config() -> AdapterConfig {
    AdapterConfig::new(5_000, 200, 50)
}

impl DomainModel for SentimentModel {
    type Event = SentimentEvent;

    fn domain(&self) -> DomainId {
        DomainId::new(DOMAIN)
    }

    fn harmonics_len(&self) -> usize {
        3
    }

    fn feature_names(&self) -> &'static [&'static str] {
        &["polarity", "subjectivity", "mention_count"]
    }

    fn normalize(&self, event: &SentimentEvent) -> PipelineResult<Normalized> {
        let domain = self.domain();
        let polarity = require_range(&domain, "polarity", event.polarity, -1.0, 1.0)?;
        let subjectivity = require_range(&domain, "subjectivity", event.subjectivity, 0.0, 1.0)?;
        let mentions = event.mention_count as f64;
        let weight = self.mention_weight(mentions);
        let label = classify(SENTIMENT_POLARITY_BANDS, polarity);

        Ok(Normalized {
            timestamp_ms: event.timestamp_ms,
            intensity: polarity.abs() * (0.5 + 0.5 * weight) * (0.5 + 0.5 * label.weight),
            frequency: 1.0 + mentions / self.tuning.mention_saturation,
            phase: (polarity + 1.0) * PI / 2.0,
            harmonics: vec![polarity, subjectivity, weight],
            raw_features: vec![polarity, subjectivity, mentions],
            clamped: false,
        })
    }

    fn quadrant(&self, means: &[f64]) -> QuadrantProfile {
        let polarity = means.first().copied().unwrap_or(0.0);
        let subjectivity = means.get(1).copied().unwrap_or(0.0).clamp(0.0, 1.0);
        let mentions = means.get(2).copied().unwrap_or(0.0);
        let conviction = (polarity.abs() - self.tuning.neutral_band).max(0.0);

        QuadrantProfile {
            aggressive: conviction * subjectivity,
            defensive: (self.tuning.neutral_band - polarity.abs()).max(0.0) / self.tuning.neutral_band,
            tactical: self.mention_weight(mentions),
            strategic: conviction * (1.0 - subjectivity),
        }
    }

    fn directional_proxy(&self, signal: &Signal) -> f64 {
        signal.raw_features.first().copied().unwrap_or(0.0)
    }
}
