//! Static reference tables consulted by the domain models
//!
//! Pure constant data: each table is a list of ascending bands with a label,
//! a short description for presentation, and a weight the model folds into
//! its harmonics.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    /// Inclusive lower bound; the band runs up to the next band's bound
    pub lower: f64,
    pub label: &'static str,
    pub description: &'static str,
    /// Relative significance in [0, 1]
    pub weight: f64,
}

/// Band containing `value`.
///
/// Values below the first bound fall into the first band. `bands` must be
/// non-empty and sorted by `lower`.
pub fn classify(bands: &'static [Band], value: f64) -> &'static Band {
    bands
        .iter()
        .rev()
        .find(|band| value >= band.lower)
        .unwrap_or(&bands[0])
}

/// Richter-style magnitude classes
pub const SEISMIC_MAGNITUDE_BANDS: &[Band] = &[
    Band { lower: f64::NEG_INFINITY, label: "micro", description: "Not felt, recorded by instruments only", weight: 0.05 },
    Band { lower: 3.0, label: "minor", description: "Felt by some, rarely causes damage", weight: 0.15 },
    Band { lower: 4.0, label: "light", description: "Noticeable shaking, little damage", weight: 0.3 },
    Band { lower: 5.0, label: "moderate", description: "Damage to poorly built structures", weight: 0.5 },
    Band { lower: 6.0, label: "strong", description: "Destructive in populated areas", weight: 0.7 },
    Band { lower: 7.0, label: "major", description: "Serious damage over large areas", weight: 0.85 },
    Band { lower: 8.0, label: "great", description: "Severe destruction near the epicenter", weight: 1.0 },
];

/// Hypocenter depth classes in kilometres
pub const SEISMIC_DEPTH_BANDS: &[Band] = &[
    Band { lower: 0.0, label: "shallow", description: "Crustal, strongest surface shaking", weight: 1.0 },
    Band { lower: 70.0, label: "intermediate", description: "Upper mantle, attenuated shaking", weight: 0.5 },
    Band { lower: 300.0, label: "deep", description: "Subducting slab, widely felt but weak", weight: 0.2 },
];

/// Effective reproduction number regimes
pub const EPIDEMIC_REPRODUCTION_BANDS: &[Band] = &[
    Band { lower: 0.0, label: "declining", description: "Each case infects fewer than one other", weight: 0.1 },
    Band { lower: 1.0, label: "stable", description: "Roughly constant transmission", weight: 0.35 },
    Band { lower: 1.2, label: "growing", description: "Sustained growth in cases", weight: 0.7 },
    Band { lower: 2.0, label: "explosive", description: "Rapid exponential spread", weight: 1.0 },
];

/// Absolute one-period return regimes
pub const MARKET_MOVE_BANDS: &[Band] = &[
    Band { lower: 0.0, label: "quiet", description: "Move within normal noise", weight: 0.1 },
    Band { lower: 0.005, label: "normal", description: "Ordinary session move", weight: 0.3 },
    Band { lower: 0.02, label: "volatile", description: "Large move relative to typical range", weight: 0.65 },
    Band { lower: 0.05, label: "extreme", description: "Gap or shock move", weight: 1.0 },
];

/// Polarity labels for aggregated text sentiment
pub const SENTIMENT_POLARITY_BANDS: &[Band] = &[
    Band { lower: -1.0, label: "very_negative", description: "Strongly negative tone", weight: 1.0 },
    Band { lower: -0.6, label: "negative", description: "Mostly negative tone", weight: 0.6 },
    Band { lower: -0.2, label: "neutral", description: "Mixed or factual tone", weight: 0.1 },
    Band { lower: 0.2, label: "positive", description: "Mostly positive tone", weight: 0.6 },
    Band { lower: 0.6, label: "very_positive", description: "Strongly positive tone", weight: 1.0 },
];

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_sorted(bands: &[Band]) {
        assert!(!bands.is_empty());
        for pair in bands.windows(2) {
            assert!(pair[0].lower < pair[1].lower, "{} >= {}", pair[0].label, pair[1].label);
        }
        for band in bands {
            assert!((0.0..=1.0).contains(&band.weight), "{}", band.label);
        }
    }

    #[test]
    fn test_tables_are_well_formed() {
        assert_sorted(SEISMIC_MAGNITUDE_BANDS);
        assert_sorted(SEISMIC_DEPTH_BANDS);
        assert_sorted(EPIDEMIC_REPRODUCTION_BANDS);
        assert_sorted(MARKET_MOVE_BANDS);
        assert_sorted(SENTIMENT_POLARITY_BANDS);
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(SEISMIC_MAGNITUDE_BANDS, -1.0).label, "micro");
        assert_eq!(classify(SEISMIC_MAGNITUDE_BANDS, 5.0).label, "moderate");
        assert_eq!(classify(SEISMIC_MAGNITUDE_BANDS, 9.5).label, "great");
        assert_eq!(classify(SEISMIC_DEPTH_BANDS, 69.9).label, "shallow");
        assert_eq!(classify(EPIDEMIC_REPRODUCTION_BANDS, 1.1).label, "stable");
        assert_eq!(classify(SENTIMENT_POLARITY_BANDS, 0.0).label, "neutral");
        // Below the first bound
        assert_eq!(classify(MARKET_MOVE_BANDS, -0.1).label, "quiet");
    }
}
