//! Epidemic domain: periodic case-count reports
//!
//! Valid ranges:
//! - `population`: > 0
//! - `new_cases`: [0, population]
//! - `reproduction_estimate`: [0, 20]
//!
//! Intensity is weekly incidence per 100k relative to `saturation_incidence`;
//! a surge beyond it is clamped to 1.
//!
//! Harmonics (2): intensity, reproduction-regime weight.

use super::tables::{classify, EPIDEMIC_REPRODUCTION_BANDS};
use crate::pipeline::adapter::{AdapterConfig, DomainModel, Normalized};
use crate::pipeline::error::{require_range, PipelineError, PipelineResult};
use crate::pipeline::types::{DomainId, QuadrantProfile, Signal};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

pub const DOMAIN: &str = "epidemic";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpidemicEvent {
    pub timestamp_ms: i64,
    pub new_cases: u64,
    pub population: u64,
    pub reproduction_estimate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpidemicTuning {
    /// Incidence per 100k mapped to intensity 1.0
    pub saturation_incidence: f64,
    /// Reproduction number separating growth from decline
    pub growth_threshold: f64,
    /// Days covered by one report
    pub reporting_period_days: f64,
}

impl Default for EpidemicTuning {
    fn default() -> Self {
        Self {
            saturation_incidence: 500.0,
            growth_threshold: 1.0,
            reporting_period_days: 7.0,
        }
    }
}

#[derive(Default)]
pub struct EpidemicModel {
    tuning: EpidemicTuning,
}

impl EpidemicModel {
    pub fn new(tuning: EpidemicTuning) -> Self {
        Self { tuning }
    }
}

/// Weekly reports: two years of history, a quarter for the signature.
pub fn adapter_config() -> AdapterConfig {
    AdapterConfig::new(104, 13, 4)
}

impl DomainModel for EpidemicModel {
    type Event = EpidemicEvent;

    fn domain(&self) -> DomainId {
        DomainId::new(DOMAIN)
    }

    fn harmonics_len(&self) -> usize {
        2
    }

    fn feature_names(&self) -> &'static [&'static str] {
        &["new_cases", "population", "reproduction_estimate", "incidence_per_100k"]
    }

    fn normalize(&self, event: &EpidemicEvent) -> PipelineResult<Normalized> {
        let domain = self.domain();
        if event.population == 0 {
            return Err(PipelineError::invalid_event(&domain, "population", "must be > 0"));
        }
        if event.new_cases > event.population {
            return Err(PipelineError::invalid_event(
                &domain,
                "new_cases",
                format!("{} exceeds population {}", event.new_cases, event.population),
            ));
        }
        let reproduction = require_range(
            &domain,
            "reproduction_estimate",
            event.reproduction_estimate,
            0.0,
            20.0,
        )?;

        let incidence = event.new_cases as f64 / event.population as f64 * 100_000.0;
        let intensity = incidence / self.tuning.saturation_incidence;
        let regime = classify(EPIDEMIC_REPRODUCTION_BANDS, reproduction);

        Ok(Normalized {
            timestamp_ms: event.timestamp_ms,
            intensity,
            frequency: 1.0 / self.tuning.reporting_period_days,
            // R in [0, inf) folded onto [0, 2π)
            phase: TAU * reproduction / (reproduction + 1.0),
            harmonics: vec![intensity.clamp(0.0, 1.0), regime.weight],
            raw_features: vec![
                event.new_cases as f64,
                event.population as f64,
                reproduction,
                incidence,
            ],
            clamped: false,
        })
    }

    fn quadrant(&self, means: &[f64]) -> QuadrantProfile {
        let reproduction = means.get(2).copied().unwrap_or(0.0);
        let incidence = means.get(3).copied().unwrap_or(0.0);
        let load = (incidence / self.tuning.saturation_incidence).max(0.0);

        QuadrantProfile {
            aggressive: (reproduction - self.tuning.growth_threshold).max(0.0),
            defensive: (self.tuning.growth_threshold - reproduction).max(0.0),
            tactical: load,
            strategic: 1.0 / (1.0 + load),
        }
    }

    fn directional_proxy(&self, signal: &Signal) -> f64 {
        signal.raw_features.get(2).copied().unwrap_or(0.0) - self.tuning.growth_threshold
    }
}
