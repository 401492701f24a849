//! Windowed signature extraction
//!
//! Every function here is a pure function of the window it is given. The
//! only non-deterministic input to a [`Signature`] is the extraction
//! timestamp, which the caller supplies.

use super::adapter::DomainModel;
use super::types::{Signal, Signature, TemporalFlow};
use std::f64::consts::{PI, TAU};

/// Per-index means of the raw feature vectors across the window.
///
/// Signals with shorter feature vectors only contribute to the indices they
/// carry.
pub fn feature_means(window: &[&Signal]) -> Vec<f64> {
    let width = window.iter().map(|s| s.raw_features.len()).max().unwrap_or(0);
    let mut sums = vec![0.0; width];
    let mut counts = vec![0usize; width];

    for signal in window {
        for (i, value) in signal.raw_features.iter().enumerate() {
            sums[i] += value;
            counts[i] += 1;
        }
    }

    sums.iter()
        .zip(counts.iter())
        .map(|(sum, &count)| if count > 0 { sum / count as f64 } else { 0.0 })
        .collect()
}

pub fn mean_intensity(window: &[&Signal]) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    window.iter().map(|s| s.intensity).sum::<f64>() / window.len() as f64
}

/// Population standard deviation of intensities
pub fn intensity_volatility(window: &[&Signal]) -> f64 {
    if window.len() < 2 {
        return 0.0;
    }
    let mean = mean_intensity(window);
    let variance = window
        .iter()
        .map(|s| (s.intensity - mean).powi(2))
        .sum::<f64>()
        / window.len() as f64;
    variance.sqrt()
}

/// Intensity-weighted mean frequency; plain mean when the window carries no intensity.
pub fn dominant_frequency(window: &[&Signal]) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    let total_intensity: f64 = window.iter().map(|s| s.intensity).sum();
    if total_intensity > 0.0 {
        window.iter().map(|s| s.frequency * s.intensity).sum::<f64>() / total_intensity
    } else {
        window.iter().map(|s| s.frequency).sum::<f64>() / window.len() as f64
    }
}

/// Sizes of the early/mid/late partitions; they differ by at most one.
///
/// Remainders go to mid first, then late.
fn partition_sizes(n: usize) -> [usize; 3] {
    let base = n / 3;
    match n % 3 {
        0 => [base, base, base],
        1 => [base, base + 1, base],
        _ => [base, base + 1, base + 1],
    }
}

/// Share of the window's energy held by each positional third.
pub fn temporal_flow(energies: &[f64]) -> TemporalFlow {
    if energies.len() < 3 {
        return TemporalFlow::centered();
    }

    let [early_len, mid_len, _] = partition_sizes(energies.len());
    let clean = |e: &f64| if e.is_finite() && *e > 0.0 { *e } else { 0.0 };

    let early: f64 = energies[..early_len].iter().map(clean).sum();
    let mid: f64 = energies[early_len..early_len + mid_len].iter().map(clean).sum();
    let late: f64 = energies[early_len + mid_len..].iter().map(clean).sum();
    let total = early + mid + late;

    if total <= 0.0 {
        return TemporalFlow::even();
    }

    TemporalFlow {
        early: early / total,
        mid: mid / total,
        late: late / total,
    }
}

/// Mean of the last `span` proxies minus the mean of the `span` before them.
///
/// Zero when the window cannot hold both sub-windows.
pub fn momentum(proxies: &[f64], span: usize) -> f64 {
    if span == 0 || proxies.len() < span * 2 {
        return 0.0;
    }
    let n = proxies.len();
    let recent = &proxies[n - span..];
    let previous = &proxies[n - 2 * span..n - span];

    let mean = |values: &[f64]| values.iter().sum::<f64>() / values.len() as f64;
    mean(recent) - mean(previous)
}

fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Mean cosine similarity of consecutive harmonic vectors, rescaled to [0, 1].
pub fn harmonic_resonance(window: &[&Signal]) -> f64 {
    if window.len() < 2 {
        return 0.5;
    }
    let total: f64 = window
        .windows(2)
        .map(|pair| (cosine_similarity(&pair[0].harmonics, &pair[1].harmonics) + 1.0) / 2.0)
        .sum();
    (total / (window.len() - 1) as f64).clamp(0.0, 1.0)
}

/// Shortest angular distance between two phases, in [0, π]
fn phase_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(TAU);
    d.min(TAU - d)
}

/// Mean of `1 - |Δphase| / π` over consecutive pairs.
pub fn phase_alignment(window: &[&Signal]) -> f64 {
    if window.len() < 2 {
        return 0.5;
    }
    let total: f64 = window
        .windows(2)
        .map(|pair| (1.0 - phase_distance(pair[0].phase, pair[1].phase) / PI).clamp(0.0, 1.0))
        .sum();
    (total / (window.len() - 1) as f64).clamp(0.0, 1.0)
}

/// Compute the full signature of `window` using the domain's projections.
///
/// An empty window yields the model's documented default signature.
pub fn extract<M: DomainModel + ?Sized>(
    model: &M,
    window: &[&Signal],
    momentum_span: usize,
    extracted_at_ms: i64,
) -> Signature {
    if window.is_empty() {
        let mut default = model.default_signature(extracted_at_ms);
        default.is_default = true;
        default.sample_count = 0;
        return default;
    }

    let means = feature_means(window);
    let energies: Vec<f64> = window.iter().map(|s| model.energy_proxy(s)).collect();
    let proxies: Vec<f64> = window.iter().map(|s| model.directional_proxy(s)).collect();

    Signature {
        domain: model.domain(),
        quadrant: model.quadrant(&means).normalized(),
        temporal_flow: temporal_flow(&energies),
        intensity: mean_intensity(window),
        momentum: momentum(&proxies, momentum_span),
        volatility: intensity_volatility(window),
        dominant_frequency: dominant_frequency(window),
        harmonic_resonance: harmonic_resonance(window),
        phase_alignment: phase_alignment(window),
        sample_count: window.len(),
        is_default: false,
        extracted_at_ms,
    }
}
