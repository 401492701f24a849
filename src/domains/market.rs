//! Market domain: price ticks or bars
//!
//! Valid ranges: `price` and `previous_close` in (0, 1e12], `volume` in
//! [0, 1e15]. Intensity is |return| / `saturation_return`, clamped to 1 on
//! shock moves. The signature window defaults to 252 signals, roughly one
//! trading year of daily bars.
//!
//! Harmonics (3): intensity, volume participation, move-regime weight.

use super::tables::{classify, MARKET_MOVE_BANDS};
use crate::pipeline::adapter::{AdapterConfig, DomainModel, Normalized};
use crate::pipeline::error::{require_range, PipelineResult};
use crate::pipeline::types::{DomainId, QuadrantProfile, Signal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

pub const DOMAIN: &str = "market";

pub const TRADING_YEAR: usize = 252;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketEvent {
    pub timestamp_ms: i64,
    pub price: f64,
    pub previous_close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketTuning {
    /// Absolute return mapped to intensity 1.0
    pub saturation_return: f64,
    /// Volume considered typical participation
    pub reference_volume: f64,
}

impl Default for MarketTuning {
    fn default() -> Self {
        Self {
            saturation_return: 0.1,
            reference_volume: 1_000_000.0,
        }
    }
}

#[derive(Default)]
pub struct MarketModel {
    tuning: MarketTuning,
}

impl MarketModel {
    pub fn new(tuning: MarketTuning) -> Self {
        Self { tuning }
    }

    fn participation(&self, volume: f64) -> f64 {
        volume.max(0.0) / self.tuning.reference_volume
    }
}

pub fn adapter_config() -> AdapterConfig {
    AdapterConfig::new(2_000, TRADING_YEAR, 21)
}

impl DomainModel for MarketModel {
    type Event = MarketEvent;

    fn domain(&self) -> DomainId {
        DomainId::new(DOMAIN)
    }

    fn harmonics_len(&self) -> usize {
        3
    }

    fn feature_names(&self) -> &'static [&'static str] {
        &["price", "previous_close", "volume", "return"]
    }

    fn normalize(&self, event: &MarketEvent) -> PipelineResult<Normalized> {
        let domain = self.domain();
        let price = require_range(&domain, "price", event.price, f64::MIN_POSITIVE, 1e12)?;
        let previous_close = require_range(
            &domain,
            "previous_close",
            event.previous_close,
            f64::MIN_POSITIVE,
            1e12,
        )?;
        let volume = require_range(&domain, "volume", event.volume, 0.0, 1e15)?;

        let ret = price / previous_close - 1.0;
        let participation = self.participation(volume);
        let regime = classify(MARKET_MOVE_BANDS, ret.abs());

        Ok(Normalized {
            timestamp_ms: event.timestamp_ms,
            intensity: ret.abs() / self.tuning.saturation_return,
            frequency: 1.0 + participation.ln_1p(),
            // Down moves below π/2, up moves above
            phase: (ret / self.tuning.saturation_return).atan() + PI / 2.0,
            harmonics: vec![
                (ret.abs() / self.tuning.saturation_return).min(1.0),
                participation / (1.0 + participation),
                regime.weight,
            ],
            raw_features: vec![price, previous_close, volume, ret],
            clamped: false,
        })
    }

    fn quadrant(&self, means: &[f64]) -> QuadrantProfile {
        let volume = means.get(2).copied().unwrap_or(0.0);
        let ret = means.get(3).copied().unwrap_or(0.0);
        let participation = self.participation(volume);
        let drift = ret / self.tuning.saturation_return;

        QuadrantProfile {
            aggressive: drift.max(0.0),
            defensive: (-drift).max(0.0),
            tactical: participation,
            strategic: 1.0 / (1.0 + participation),
        }
    }

    fn directional_proxy(&self, signal: &Signal) -> f64 {
        signal.raw_features.get(3).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::adapter::{Adapter, DomainAdapter};

    fn make_event(timestamp_ms: i64, price: f64, previous_close: f64) -> MarketEvent {
        MarketEvent {
            timestamp_ms,
            price,
            previous_close,
            volume: 1_000_000.0,
        }
    }

    #[test]
    fn test_return_and_phase() {
        let model = MarketModel::default();

        let up = model.normalize(&make_event(0, 102.0, 100.0)).unwrap();
        assert!((up.raw_features[3] - 0.02).abs() < 1e-12);
        assert!((up.intensity - 0.2).abs() < 1e-9);
        assert!(up.phase > PI / 2.0);
        assert_eq!(up.harmonics[2], 0.65);

        let down = model.normalize(&make_event(0, 98.0, 100.0)).unwrap();
        assert!(down.phase < PI / 2.0);
        assert!((down.intensity - up.intensity).abs() < 1e-9);

        // ln(1 + 1) for typical participation
        assert!((up.frequency - (1.0 + 2f64.ln())).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_prices_rejected() {
        let model = MarketModel::default();
        assert!(model.normalize(&make_event(0, 0.0, 100.0)).is_err());
        assert!(model.normalize(&make_event(0, 100.0, -1.0)).is_err());
        assert!(model.normalize(&make_event(0, f64::NAN, 100.0)).is_err());

        let mut event = make_event(0, 100.0, 100.0);
        event.volume = -5.0;
        let err = model.normalize(&event).unwrap_err();
        assert!(err.to_string().contains("volume"));
    }

    #[test]
    fn test_shock_move_clamped() {
        let mut adapter = Adapter::new(MarketModel::default(), adapter_config()).unwrap();
        let signal = adapter.process(make_event(0, 80.0, 100.0)).unwrap();
        assert_eq!(signal.intensity, 1.0);
        assert!(signal.clamped);
    }

    #[test]
    fn test_default_window_is_one_trading_year() {
        let mut adapter = Adapter::new(MarketModel::default(), adapter_config()).unwrap();
        let mut close = 100.0;
        for day in 0..300 {
            let price = close * if day % 2 == 0 { 1.01 } else { 0.995 };
            adapter.process(make_event(day, price, close)).unwrap();
            close = price;
        }

        assert_eq!(adapter.extract_signature(None).sample_count, TRADING_YEAR);
        assert_eq!(adapter.extract_signature(Some(100)).sample_count, 100);
        assert_eq!(adapter.extract_signature(Some(10_000)).sample_count, 300);
    }

    #[test]
    fn test_rally_votes_up() {
        let mut adapter = Adapter::new(MarketModel::default(), AdapterConfig::new(100, 40, 10)).unwrap();
        let mut close = 100.0;
        for day in 0..40 {
            // Returns accelerate over the window
            let price = close * (1.0 + day as f64 * 0.001);
            adapter.process(make_event(day, price, close)).unwrap();
            close = price;
        }
        let signature = adapter.extract_signature(None);
        assert!(signature.momentum > 0.0);
        assert!(signature.quadrant.aggressive > signature.quadrant.defensive);
    }
}
