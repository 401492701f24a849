//! Cross-domain correlation engine
//!
//! Tracks every unordered domain pair through
//! `Uninitialized → Accumulating → Ready`. Each scheduler tick contributes one
//! paired sample per pair of domains present in the snapshot. Once a pair has
//! `min_samples` paired samples it is Ready for good, and every further sample
//! recomputes the rolling coefficient and the lead/lag estimate.

use super::error::{PipelineError, PipelineResult};
use super::types::{CrossDomainCorrelation, DomainId, Signature};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Tie tolerance when comparing cross-correlation magnitudes across shifts
const LAG_TIE_EPSILON: f64 = 1e-9;

/// Minimum overlapping samples for a shifted cross-correlation to count
const MIN_LAG_OVERLAP: usize = 3;

/// Which scalar of each signature is correlated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureMetric {
    Momentum,
    Intensity,
    Volatility,
    HarmonicResonance,
}

impl SignatureMetric {
    pub fn value(&self, signature: &Signature) -> f64 {
        match self {
            SignatureMetric::Momentum => signature.momentum,
            SignatureMetric::Intensity => signature.intensity,
            SignatureMetric::Volatility => signature.volatility,
            SignatureMetric::HarmonicResonance => signature.harmonic_resonance,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "momentum" => Some(SignatureMetric::Momentum),
            "intensity" => Some(SignatureMetric::Intensity),
            "volatility" => Some(SignatureMetric::Volatility),
            "harmonic_resonance" => Some(SignatureMetric::HarmonicResonance),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureMetric::Momentum => "momentum",
            SignatureMetric::Intensity => "intensity",
            SignatureMetric::Volatility => "volatility",
            SignatureMetric::HarmonicResonance => "harmonic_resonance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationConfig {
    /// Paired samples required before a pair is Ready
    pub min_samples: usize,
    /// Rolling window of paired samples used for the coefficient
    pub window: usize,
    /// Largest shift (in ticks) tried for lead/lag
    pub max_lag: usize,
    pub metric: SignatureMetric,
    /// How strongly coefficient spread across shifts lowers confidence
    pub variance_penalty: f64,
}

impl CorrelationConfig {
    pub fn validate(&self) -> PipelineResult<()> {
        if self.min_samples < 2 {
            return Err(PipelineError::InvalidConfig(
                "correlation min_samples must be >= 2".to_string(),
            ));
        }
        if self.window < self.min_samples {
            return Err(PipelineError::InvalidConfig(format!(
                "correlation window ({}) must be >= min_samples ({})",
                self.window, self.min_samples
            )));
        }
        if self.max_lag + MIN_LAG_OVERLAP > self.min_samples {
            return Err(PipelineError::InvalidConfig(format!(
                "correlation max_lag ({}) leaves fewer than {} overlapping samples",
                self.max_lag, MIN_LAG_OVERLAP
            )));
        }
        if !self.variance_penalty.is_finite() || self.variance_penalty < 0.0 {
            return Err(PipelineError::InvalidConfig(
                "variance_penalty must be a non-negative finite value".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            min_samples: 30,
            window: 100,
            max_lag: 5,
            metric: SignatureMetric::Momentum,
            variance_penalty: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairPhase {
    Uninitialized,
    Accumulating,
    Ready,
}

#[derive(Debug, Clone)]
struct PairState {
    samples: VecDeque<(f64, f64)>,
    total_samples: usize,
    phase: PairPhase,
    latest: Option<CrossDomainCorrelation>,
}

impl PairState {
    fn new(window: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(window),
            total_samples: 0,
            phase: PairPhase::Uninitialized,
            latest: None,
        }
    }
}

/// Population variance; zero for fewer than two values
fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

/// A constant series, compared exactly: the mean of a repeated value that
/// f64 cannot represent leaves rounding noise in the variance.
fn is_constant(values: &[f64]) -> bool {
    match values.first() {
        Some(first) => values.iter().all(|v| v == first),
        None => true,
    }
}

/// Pearson coefficient, or `None` when either side has zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    if is_constant(xs) || is_constant(ys) {
        return None;
    }
    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys.iter()) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    let r = cov / (var_x.sqrt() * var_y.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Correlation of `xs[t]` with `ys[t + shift]` over the overlapping range
fn shifted_pearson(xs: &[f64], ys: &[f64], shift: i64) -> Option<f64> {
    let n = xs.len().min(ys.len());
    let s = shift.unsigned_abs() as usize;
    if s >= n || n - s < MIN_LAG_OVERLAP {
        return None;
    }
    if shift >= 0 {
        pearson(&xs[..n - s], &ys[s..n])
    } else {
        pearson(&xs[s..n], &ys[..n - s])
    }
}

/// Shifts ordered by magnitude: 0, 1, -1, 2, -2, ...
fn shift_candidates(max_lag: usize) -> impl Iterator<Item = i64> {
    std::iter::once(0).chain((1..=max_lag as i64).flat_map(|s| [s, -s]))
}

/// Recompute a Ready pair's correlation over its rolling window.
fn compute_correlation(
    first: &DomainId,
    second: &DomainId,
    state: &PairState,
    config: &CorrelationConfig,
    at_ms: i64,
) -> CrossDomainCorrelation {
    let (xs, ys): (Vec<f64>, Vec<f64>) = state.samples.iter().copied().unzip();
    let mut result = CrossDomainCorrelation {
        first: first.clone(),
        second: second.clone(),
        coefficient: 0.0,
        peak_coefficient: 0.0,
        lead_lag: 0,
        confidence: 0.0,
        sample_size: state.total_samples,
        updated_at_ms: at_ms,
    };

    // Degenerate series: reported as zero with zero confidence
    let coefficient = match pearson(&xs, &ys) {
        Some(r) => r,
        None => return result,
    };

    let mut candidates = Vec::with_capacity(config.max_lag * 2 + 1);
    let mut best_shift = 0i64;
    let mut best_r = coefficient;
    for shift in shift_candidates(config.max_lag) {
        let r = shifted_pearson(&xs, &ys, shift).unwrap_or(0.0);
        candidates.push(r);
        if r.abs() > best_r.abs() + LAG_TIE_EPSILON {
            best_r = r;
            best_shift = shift;
        }
    }

    let n = state.total_samples as f64;
    let sample_factor = n / (n + config.min_samples as f64);
    let spread = variance(&candidates);

    result.coefficient = coefficient;
    result.peak_coefficient = best_r;
    result.lead_lag = best_shift as i32;
    result.confidence = (sample_factor / (1.0 + config.variance_penalty * spread)).clamp(0.0, 1.0);
    result
}

pub struct CorrelationEngine {
    config: CorrelationConfig,
    /// Keyed by (smaller, larger) domain id
    pairs: BTreeMap<(DomainId, DomainId), PairState>,
}

impl CorrelationEngine {
    pub fn new(config: CorrelationConfig) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            pairs: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &CorrelationConfig {
        &self.config
    }

    fn key(a: &DomainId, b: &DomainId) -> (DomainId, DomainId) {
        if a <= b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        }
    }

    /// Record one paired sample for every pair of domains in `snapshots`.
    ///
    /// Default signatures carry no history and are skipped. When a domain
    /// appears more than once, its first signature is used. Returns the
    /// number of pairs that became Ready during this call.
    pub fn observe(&mut self, snapshots: &[Signature], at_ms: i64) -> usize {
        let mut values: BTreeMap<&DomainId, f64> = BTreeMap::new();
        for signature in snapshots.iter().filter(|s| !s.is_default) {
            let value = self.config.metric.value(signature);
            if value.is_finite() {
                values.entry(&signature.domain).or_insert(value);
            }
        }

        let entries: Vec<(&DomainId, f64)> = values.into_iter().collect();
        let mut became_ready = 0;

        for (i, (first, x)) in entries.iter().enumerate() {
            for (second, y) in entries.iter().skip(i + 1) {
                let state = self
                    .pairs
                    .entry(((*first).clone(), (*second).clone()))
                    .or_insert_with(|| PairState::new(self.config.window));

                state.samples.push_back((*x, *y));
                while state.samples.len() > self.config.window {
                    state.samples.pop_front();
                }
                state.total_samples += 1;

                if state.phase != PairPhase::Ready {
                    if state.total_samples >= self.config.min_samples {
                        state.phase = PairPhase::Ready;
                        became_ready += 1;
                        log::info!(
                            "🔗 Correlation ready: {} ↔ {} ({} samples)",
                            first,
                            second,
                            state.total_samples
                        );
                    } else {
                        state.phase = PairPhase::Accumulating;
                    }
                }

                if state.phase == PairPhase::Ready {
                    let correlation =
                        compute_correlation(first, second, state, &self.config, at_ms);
                    state.latest = Some(correlation);
                }
            }
        }

        became_ready
    }

    pub fn phase(&self, a: &DomainId, b: &DomainId) -> PairPhase {
        self.pairs
            .get(&Self::key(a, b))
            .map(|state| state.phase)
            .unwrap_or(PairPhase::Uninitialized)
    }

    pub fn is_ready(&self, a: &DomainId, b: &DomainId) -> bool {
        self.phase(a, b) == PairPhase::Ready
    }

    pub fn paired_samples(&self, a: &DomainId, b: &DomainId) -> usize {
        self.pairs
            .get(&Self::key(a, b))
            .map(|state| state.total_samples)
            .unwrap_or(0)
    }

    /// Correlation of `a` with `b`, oriented so positive lead/lag means `a` leads.
    ///
    /// `None` until the pair is Ready.
    pub fn get(&self, a: &DomainId, b: &DomainId) -> Option<CrossDomainCorrelation> {
        let latest = self.pairs.get(&Self::key(a, b))?.latest.as_ref()?;
        if &latest.first == a {
            Some(latest.clone())
        } else {
            Some(latest.flipped())
        }
    }

    pub fn ready_correlations(&self) -> Vec<CrossDomainCorrelation> {
        self.pairs
            .values()
            .filter_map(|state| state.latest.clone())
            .collect()
    }

    /// Drop every pair involving a retired domain.
    pub fn forget(&mut self, domain: &DomainId) {
        let before = self.pairs.len();
        self.pairs.retain(|(a, b), _| a != domain && b != domain);
        log::debug!(
            "Forgot {} correlation pairs for {}",
            before - self.pairs.len(),
            domain
        );
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_signature(domain: &str, momentum: f64) -> Signature {
        let mut signature = Signature::neutral(DomainId::new(domain), 0);
        signature.is_default = false;
        signature.sample_count = 10;
        signature.momentum = momentum;
        signature
    }

    fn engine(min_samples: usize, window: usize, max_lag: usize) -> CorrelationEngine {
        CorrelationEngine::new(CorrelationConfig {
            min_samples,
            window,
            max_lag,
            ..CorrelationConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_config_validation() {
        assert!(CorrelationEngine::new(CorrelationConfig::default()).is_ok());

        let bad_window = CorrelationConfig {
            min_samples: 30,
            window: 10,
            ..CorrelationConfig::default()
        };
        assert!(CorrelationEngine::new(bad_window).is_err());

        let bad_lag = CorrelationConfig {
            min_samples: 5,
            window: 10,
            max_lag: 5,
            ..CorrelationConfig::default()
        };
        assert!(CorrelationEngine::new(bad_lag).is_err());
    }

    #[test]
    fn test_pearson_basics() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert!((pearson(&xs, &[2.0, 4.0, 6.0, 8.0]).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&xs, &[8.0, 6.0, 4.0, 2.0]).unwrap() + 1.0).abs() < 1e-12);
        assert!(pearson(&xs, &[5.0, 5.0, 5.0, 5.0]).is_none());
        assert!(pearson(&[1.0], &[1.0]).is_none());
    }

    #[test]
    fn test_increasing_momentum_scenario() {
        // Scenario: two strictly increasing series for 40 ticks, min sample size 30
        let mut engine = engine(30, 100, 5);
        let a = DomainId::new("market");
        let b = DomainId::new("sentiment");

        for tick in 1..=40 {
            let snapshots = vec![
                make_signature("market", tick as f64 * 0.01),
                make_signature("sentiment", 0.5 + tick as f64 * 0.03),
            ];
            engine.observe(&snapshots, tick);

            if tick < 30 {
                assert_eq!(engine.phase(&a, &b), PairPhase::Accumulating, "tick {}", tick);
                assert!(engine.get(&a, &b).is_none());
            } else {
                assert!(engine.is_ready(&a, &b), "tick {}", tick);
            }
        }

        let corr = engine.get(&a, &b).unwrap();
        assert!((corr.coefficient - 1.0).abs() < 1e-9);
        assert_eq!(corr.lead_lag, 0);
        assert_eq!(corr.sample_size, 40);
        assert!(corr.confidence > 0.0 && corr.confidence <= 1.0);
    }

    #[test]
    fn test_uninitialized_until_observed() {
        let engine = engine(5, 10, 1);
        let a = DomainId::new("a");
        let b = DomainId::new("b");
        assert_eq!(engine.phase(&a, &b), PairPhase::Uninitialized);
        assert_eq!(engine.paired_samples(&a, &b), 0);
    }

    #[test]
    fn test_readiness_is_monotonic() {
        let mut engine = engine(5, 10, 1);
        let a = DomainId::new("a");
        let b = DomainId::new("b");

        for tick in 0..5 {
            engine.observe(
                &[make_signature("a", tick as f64), make_signature("b", (tick * tick) as f64)],
                tick,
            );
        }
        assert!(engine.is_ready(&a, &b));

        // Ticks where only one side reports do not touch the pair
        for tick in 5..20 {
            engine.observe(&[make_signature("a", tick as f64)], tick);
            assert!(engine.is_ready(&a, &b));
        }

        // Constant input afterwards degrades the value, not the phase
        for tick in 20..40 {
            engine.observe(&[make_signature("a", 1.0), make_signature("b", 1.0)], tick);
            assert!(engine.is_ready(&a, &b));
        }
        let corr = engine.get(&a, &b).unwrap();
        assert_eq!(corr.coefficient, 0.0);
        assert_eq!(corr.confidence, 0.0);
    }

    #[test]
    fn test_degenerate_series_never_nan() {
        let mut engine = engine(5, 10, 1);
        for tick in 0..10 {
            engine.observe(
                &[make_signature("flat", 0.25), make_signature("moving", tick as f64)],
                tick,
            );
        }

        let corr = engine
            .get(&DomainId::new("flat"), &DomainId::new("moving"))
            .unwrap();
        assert_eq!(corr.coefficient, 0.0);
        assert_eq!(corr.peak_coefficient, 0.0);
        assert_eq!(corr.confidence, 0.0);
        assert!(!corr.coefficient.is_nan());
    }

    #[test]
    fn test_flat_series_of_inexact_values_is_degenerate() {
        // Scenario: a stalled domain republishes a momentum f64 cannot represent exactly
        for flat in [0.1, 0.3, 0.7, 0.0123, 1.0 / 3.0] {
            let mut engine = engine(10, 40, 3);
            for tick in 0..40 {
                engine.observe(
                    &[
                        make_signature("flat", flat),
                        make_signature("moving", (tick as f64 * 0.37).sin()),
                    ],
                    tick,
                );
            }

            let corr = engine
                .get(&DomainId::new("flat"), &DomainId::new("moving"))
                .unwrap();
            assert_eq!(corr.coefficient, 0.0, "flat = {}", flat);
            assert_eq!(corr.peak_coefficient, 0.0, "flat = {}", flat);
            assert_eq!(corr.confidence, 0.0, "flat = {}", flat);
        }

        let xs = [0.1; 12];
        let ys: Vec<f64> = (0..12).map(|i| i as f64).collect();
        assert!(pearson(&xs, &ys).is_none());
        assert!(pearson(&ys, &xs).is_none());
    }

    #[test]
    fn test_lead_lag_detection_and_symmetry() {
        // "leader" moves first; "follower" repeats it two ticks later
        let series: Vec<f64> = (0..80).map(|i| ((i * 7919) % 97) as f64 / 97.0).collect();
        let mut engine = engine(30, 60, 4);

        for tick in 2..80 {
            engine.observe(
                &[
                    make_signature("leader", series[tick]),
                    make_signature("follower", series[tick - 2]),
                ],
                tick as i64,
            );
        }

        let leader = DomainId::new("leader");
        let follower = DomainId::new("follower");

        let forward = engine.get(&leader, &follower).unwrap();
        assert_eq!(forward.lead_lag, 2);
        assert!((forward.peak_coefficient - 1.0).abs() < 1e-9);
        assert_eq!(forward.first, leader);

        let backward = engine.get(&follower, &leader).unwrap();
        assert_eq!(backward.lead_lag, -2);
        assert_eq!(backward.coefficient, forward.coefficient);
    }

    #[test]
    fn test_confidence_monotone_in_sample_size() {
        let mut engine = engine(10, 200, 2);
        let a = DomainId::new("a");
        let b = DomainId::new("b");

        let mut previous = 0.0;
        for tick in 0..60 {
            let x = tick as f64;
            engine.observe(&[make_signature("a", x), make_signature("b", 2.0 * x + 1.0)], tick);
            if let Some(corr) = engine.get(&a, &b) {
                assert!(corr.confidence + 1e-12 >= previous, "tick {}", tick);
                previous = corr.confidence;
            }
        }
        assert!(previous > 0.8);
    }

    #[test]
    fn test_default_signatures_skipped() {
        let mut engine = engine(5, 10, 1);
        let mut silent = make_signature("silent", 0.0);
        silent.is_default = true;

        engine.observe(&[make_signature("a", 1.0), silent], 0);
        assert_eq!(engine.pair_count(), 0);
    }

    #[test]
    fn test_forget_domain() {
        let mut engine = engine(5, 10, 1);
        engine.observe(
            &[make_signature("a", 1.0), make_signature("b", 2.0), make_signature("c", 3.0)],
            0,
        );
        assert_eq!(engine.pair_count(), 3);

        engine.forget(&DomainId::new("b"));
        assert_eq!(engine.pair_count(), 1);
        assert_eq!(
            engine.phase(&DomainId::new("a"), &DomainId::new("c")),
            PairPhase::Accumulating
        );
    }
}
