//! Core value types shared by adapters, the correlation engine and the aggregator
//!
//! Everything here is a plain value: cloned across task boundaries, serialized
//! to JSONL by the output layer, never mutated after construction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one independent subject area (e.g. "seismic", "market")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainId(String);

impl DomainId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DomainId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// One normalized observation from one domain at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub domain: DomainId,
    /// Unix timestamp in milliseconds
    pub timestamp_ms: i64,
    /// Always within [0, 1]
    pub intensity: f64,
    /// How fast the domain's state is changing (positive)
    pub frequency: f64,
    /// Radians in [0, 2π)
    pub phase: f64,
    /// Fixed length per domain
    pub harmonics: Vec<f64>,
    /// Unconverted input fields in the order the domain model declares
    pub raw_features: Vec<f64>,
    /// True when at least one field was clamped during normalization
    pub clamped: bool,
}

/// Four-way categorical weighting of a signature's character
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuadrantProfile {
    pub aggressive: f64,
    pub defensive: f64,
    pub tactical: f64,
    pub strategic: f64,
}

impl QuadrantProfile {
    pub fn uniform() -> Self {
        Self {
            aggressive: 0.25,
            defensive: 0.25,
            tactical: 0.25,
            strategic: 0.25,
        }
    }

    pub fn total(&self) -> f64 {
        self.aggressive + self.defensive + self.tactical + self.strategic
    }

    /// Clamp negatives to zero and scale so the weights sum to 1.
    ///
    /// A profile with no positive mass collapses to [`QuadrantProfile::uniform`].
    pub fn normalized(self) -> Self {
        let clean = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
        let raw = Self {
            aggressive: clean(self.aggressive),
            defensive: clean(self.defensive),
            tactical: clean(self.tactical),
            strategic: clean(self.strategic),
        };
        let total = raw.total();
        if total <= 0.0 {
            return Self::uniform();
        }
        Self {
            aggressive: raw.aggressive / total,
            defensive: raw.defensive / total,
            tactical: raw.tactical / total,
            strategic: raw.strategic / total,
        }
    }
}

/// Share of window energy held by the early, mid and late thirds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemporalFlow {
    pub early: f64,
    pub mid: f64,
    pub late: f64,
}

impl TemporalFlow {
    /// All mass in the middle partition (windows shorter than three signals)
    pub fn centered() -> Self {
        Self {
            early: 0.0,
            mid: 1.0,
            late: 0.0,
        }
    }

    pub fn even() -> Self {
        Self {
            early: 1.0 / 3.0,
            mid: 1.0 / 3.0,
            late: 1.0 / 3.0,
        }
    }

    pub fn total(&self) -> f64 {
        self.early + self.mid + self.late
    }
}

/// Point-in-time statistical summary of a domain's recent signal window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub domain: DomainId,
    pub quadrant: QuadrantProfile,
    pub temporal_flow: TemporalFlow,
    /// Mean of recent intensities
    pub intensity: f64,
    /// Signed rate of change of the domain's directional proxy
    pub momentum: f64,
    /// Dispersion of recent intensities
    pub volatility: f64,
    pub dominant_frequency: f64,
    /// Similarity of consecutive harmonic vectors, in [0, 1]
    pub harmonic_resonance: f64,
    /// Consistency of consecutive phases, in [0, 1]
    pub phase_alignment: f64,
    /// Number of signals the signature was computed over
    pub sample_count: usize,
    /// True when produced from an empty buffer
    pub is_default: bool,
    /// Unix timestamp in milliseconds
    pub extracted_at_ms: i64,
}

impl Signature {
    /// Neutral signature used when a domain has no history yet.
    ///
    /// Domain models start from this and override the fields their
    /// documented default differs on.
    pub fn neutral(domain: DomainId, extracted_at_ms: i64) -> Self {
        Self {
            domain,
            quadrant: QuadrantProfile::uniform(),
            temporal_flow: TemporalFlow::centered(),
            intensity: 0.0,
            momentum: 0.0,
            volatility: 0.0,
            dominant_frequency: 0.0,
            harmonic_resonance: 0.5,
            phase_alignment: 0.5,
            sample_count: 0,
            is_default: true,
            extracted_at_ms,
        }
    }
}

/// Relationship between two domains' signature time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossDomainCorrelation {
    pub first: DomainId,
    pub second: DomainId,
    /// Zero-lag Pearson coefficient
    pub coefficient: f64,
    /// Coefficient at `lead_lag`
    pub peak_coefficient: f64,
    /// Positive when `first` leads `second` by that many ticks
    pub lead_lag: i32,
    pub confidence: f64,
    pub sample_size: usize,
    pub updated_at_ms: i64,
}

impl CrossDomainCorrelation {
    /// The same relationship seen from the other side.
    pub fn flipped(&self) -> Self {
        Self {
            first: self.second.clone(),
            second: self.first.clone(),
            lead_lag: -self.lead_lag,
            ..self.clone()
        }
    }

    pub fn involves(&self, domain: &DomainId) -> bool {
        &self.first == domain || &self.second == domain
    }

    pub fn other(&self, domain: &DomainId) -> Option<&DomainId> {
        if &self.first == domain {
            Some(&self.second)
        } else if &self.second == domain {
            Some(&self.first)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "UP")]
    Up,
    #[serde(rename = "DOWN")]
    Down,
    #[serde(rename = "NEUTRAL")]
    Neutral,
}

impl Direction {
    pub fn from_sign(value: f64, deadband: f64) -> Self {
        if value > deadband {
            Direction::Up
        } else if value < -deadband {
            Direction::Down
        } else {
            Direction::Neutral
        }
    }

    pub fn as_vote(&self) -> f64 {
        match self {
            Direction::Up => 1.0,
            Direction::Down => -1.0,
            Direction::Neutral => 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Neutral => "NEUTRAL",
        }
    }
}

/// One domain's share of a unified prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainContribution {
    pub domain: DomainId,
    pub weight: f64,
    pub vote: Direction,
    pub confidence: f64,
    /// Mean |coefficient| with the other Ready-correlated domains
    pub resonance: f64,
    pub default_signature: bool,
}

/// Output of the consensus aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedPrediction {
    pub direction: Direction,
    pub confidence: f64,
    pub magnitude: f64,
    /// Expected lead time in scheduler ticks
    pub horizon_ticks: u32,
    pub contributions: Vec<DomainContribution>,
    pub consensus_strength: f64,
    pub harmonic_alignment: f64,
    pub insufficient_correlation: bool,
    pub timestamp_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadrant_normalization() {
        let profile = QuadrantProfile {
            aggressive: 2.0,
            defensive: 1.0,
            tactical: 1.0,
            strategic: -3.0,
        }
        .normalized();

        assert!((profile.total() - 1.0).abs() < 1e-12);
        assert_eq!(profile.strategic, 0.0);
        assert!((profile.aggressive - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_quadrant_without_mass_is_uniform() {
        let profile = QuadrantProfile {
            aggressive: 0.0,
            defensive: f64::NAN,
            tactical: -1.0,
            strategic: 0.0,
        }
        .normalized();

        assert_eq!(profile, QuadrantProfile::uniform());
    }

    #[test]
    fn test_correlation_flip() {
        let corr = CrossDomainCorrelation {
            first: "market".into(),
            second: "sentiment".into(),
            coefficient: 0.8,
            peak_coefficient: 0.9,
            lead_lag: 3,
            confidence: 0.5,
            sample_size: 40,
            updated_at_ms: 1000,
        };

        let flipped = corr.flipped();
        assert_eq!(flipped.first.as_str(), "sentiment");
        assert_eq!(flipped.lead_lag, -3);
        assert_eq!(flipped.coefficient, 0.8);
        assert_eq!(flipped.flipped(), corr);
    }

    #[test]
    fn test_direction_from_sign() {
        assert_eq!(Direction::from_sign(0.3, 0.0), Direction::Up);
        assert_eq!(Direction::from_sign(-0.3, 0.0), Direction::Down);
        assert_eq!(Direction::from_sign(0.0, 0.0), Direction::Neutral);
        assert_eq!(Direction::from_sign(0.05, 0.1), Direction::Neutral);
    }

    #[test]
    fn test_prediction_serde_roundtrip() {
        let prediction = UnifiedPrediction {
            direction: Direction::Down,
            confidence: 0.42,
            magnitude: 0.17,
            horizon_ticks: 2,
            contributions: vec![DomainContribution {
                domain: "seismic".into(),
                weight: 0.3,
                vote: Direction::Down,
                confidence: 0.7,
                resonance: 0.43,
                default_signature: false,
            }],
            consensus_strength: 0.9,
            harmonic_alignment: 0.61,
            insufficient_correlation: false,
            timestamp_ms: 1_700_000_000_000,
        };

        let json = serde_json::to_string(&prediction).unwrap();
        assert!(json.contains(r#""direction":"DOWN""#));
        assert!(json.contains(r#""domain":"seismic""#));

        let parsed: UnifiedPrediction = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, prediction);
    }
}
