//! Seismic domain: earthquake catalog events
//!
//! Valid ranges:
//! - `magnitude`: [-2, 10]; intensity is magnitude / `max_magnitude`, so
//!   negative microquakes are clamped to zero intensity
//! - `depth_km`: [0, 800]
//! - `latitude`: [-90, 90], `longitude`: [-180, 180]
//!
//! Harmonics (3): intensity, depth shallowness, magnitude-class weight.
//! Default signature: neutral with a fully defensive quadrant.

use super::tables::{classify, SEISMIC_DEPTH_BANDS, SEISMIC_MAGNITUDE_BANDS};
use crate::pipeline::adapter::{AdapterConfig, DomainModel, Normalized};
use crate::pipeline::error::{require_range, PipelineResult};
use crate::pipeline::types::{DomainId, QuadrantProfile, Signal, Signature};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

pub const DOMAIN: &str = "seismic";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeismicEvent {
    pub timestamp_ms: i64,
    pub magnitude: f64,
    pub depth_km: f64,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeismicTuning {
    /// Magnitude mapped to intensity 1.0
    pub max_magnitude: f64,
    /// Depth at which shallowness reaches zero
    pub max_depth_km: f64,
    /// Mean magnitude above which the window reads as aggressive
    pub aggressive_magnitude: f64,
    /// Background magnitude; momentum measures escalation above it
    pub baseline_magnitude: f64,
    /// Corner frequency of a magnitude 3 event, in Hz
    pub reference_corner_hz: f64,
}

impl Default for SeismicTuning {
    fn default() -> Self {
        Self {
            max_magnitude: 10.0,
            max_depth_km: 700.0,
            aggressive_magnitude: 5.0,
            baseline_magnitude: 2.5,
            reference_corner_hz: 10.0,
        }
    }
}

pub struct SeismicModel {
    tuning: SeismicTuning,
}

impl SeismicModel {
    pub fn new(tuning: SeismicTuning) -> Self {
        Self { tuning }
    }

    fn shallowness(&self, depth_km: f64) -> f64 {
        (1.0 - depth_km / self.tuning.max_depth_km).clamp(0.0, 1.0)
    }
}

impl Default for SeismicModel {
    fn default() -> Self {
        Self::new(SeismicTuning::default())
    }
}

/// Catalog feeds are sparse; 100 events is several days of regional activity.
pub fn adapter_config() -> AdapterConfig {
    AdapterConfig::new(1_000, 100, 20)
}

impl DomainModel for SeismicModel {
    type Event = SeismicEvent;

    fn domain(&self) -> DomainId {
        DomainId::new(DOMAIN)
    }

    fn harmonics_len(&self) -> usize {
        3
    }

    fn feature_names(&self) -> &'static [&'static str] {
        &["magnitude", "depth_km", "latitude", "longitude"]
    }

    fn normalize(&self, event: &SeismicEvent) -> PipelineResult<Normalized> {
        let domain = self.domain();
        let magnitude = require_range(&domain, "magnitude", event.magnitude, -2.0, 10.0)?;
        let depth_km = require_range(&domain, "depth_km", event.depth_km, 0.0, 800.0)?;
        let latitude = require_range(&domain, "latitude", event.latitude, -90.0, 90.0)?;
        let longitude = require_range(&domain, "longitude", event.longitude, -180.0, 180.0)?;

        let intensity = magnitude / self.tuning.max_magnitude;
        // Larger ruptures radiate lower frequencies
        let frequency = self.tuning.reference_corner_hz * 10f64.powf(-0.5 * (magnitude - 3.0));
        let phase = (longitude + 180.0) / 360.0 * TAU;

        let magnitude_class = classify(SEISMIC_MAGNITUDE_BANDS, magnitude);
        let depth_class = classify(SEISMIC_DEPTH_BANDS, depth_km);

        Ok(Normalized {
            timestamp_ms: event.timestamp_ms,
            intensity,
            frequency,
            phase,
            harmonics: vec![
                intensity.clamp(0.0, 1.0),
                self.shallowness(depth_km) * depth_class.weight,
                magnitude_class.weight,
            ],
            raw_features: vec![magnitude, depth_km, latitude, longitude],
            clamped: false,
        })
    }

    fn quadrant(&self, means: &[f64]) -> QuadrantProfile {
        let magnitude = means.first().copied().unwrap_or(0.0);
        let depth_km = means.get(1).copied().unwrap_or(0.0);
        let latitude = means.get(2).copied().unwrap_or(0.0);

        let shallowness = self.shallowness(depth_km);
        let scaled = (magnitude / self.tuning.max_magnitude).clamp(0.0, 1.0);

        QuadrantProfile {
            aggressive: (magnitude - self.tuning.aggressive_magnitude).max(0.0) * shallowness,
            defensive: 1.0 - shallowness,
            tactical: scaled * shallowness,
            strategic: (latitude.abs() / 90.0).clamp(0.0, 1.0) * (1.0 - scaled),
        }
    }

    fn directional_proxy(&self, signal: &Signal) -> f64 {
        signal.raw_features.first().copied().unwrap_or(0.0) - self.tuning.baseline_magnitude
    }

    fn default_signature(&self, at_ms: i64) -> Signature {
        let mut signature = Signature::neutral(self.domain(), at_ms);
        signature.quadrant = QuadrantProfile {
            aggressive: 0.0,
            defensive: 1.0,
            tactical: 0.0,
            strategic: 0.0,
        };
        signature
    }
}
