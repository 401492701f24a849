//! Consensus aggregation across domains
//!
//! Turns the current signature of every active domain plus the current set of
//! Ready correlations into one [`UnifiedPrediction`]. The result is a pure
//! function of those inputs and the aggregator's configuration.

use super::error::{PipelineError, PipelineResult};
use super::types::{
    CrossDomainCorrelation, Direction, DomainContribution, DomainId, Signature,
    UnifiedPrediction,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Weighted sums at or below this magnitude resolve to `Neutral`
const NEUTRAL_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Weight given to domains with no Ready correlation
    pub isolated_weight: f64,
    /// |momentum| at or below this votes neutral
    pub vote_deadband: f64,
    /// Momentum scale for vote strength: strength = tanh(|momentum| / scale)
    pub momentum_scale: f64,
}

impl ConsensusConfig {
    pub fn validate(&self) -> PipelineResult<()> {
        if !self.isolated_weight.is_finite() || self.isolated_weight < 0.0 {
            return Err(PipelineError::InvalidConfig(
                "isolated_weight must be a non-negative finite value".to_string(),
            ));
        }
        if !self.vote_deadband.is_finite() || self.vote_deadband < 0.0 {
            return Err(PipelineError::InvalidConfig(
                "vote_deadband must be a non-negative finite value".to_string(),
            ));
        }
        if !self.momentum_scale.is_finite() || self.momentum_scale <= 0.0 {
            return Err(PipelineError::InvalidConfig(
                "momentum_scale must be a positive finite value".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            isolated_weight: 0.05,
            vote_deadband: 0.0,
            momentum_scale: 0.1,
        }
    }
}

pub struct ConsensusAggregator {
    config: ConsensusConfig,
}

impl ConsensusAggregator {
    pub fn new(config: ConsensusConfig) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn with_defaults() -> Self {
        Self {
            config: ConsensusConfig::default(),
        }
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    /// Domain confidence: 1 - volatility, clamped; zero for default signatures
    fn domain_confidence(signature: &Signature) -> f64 {
        if signature.is_default {
            return 0.0;
        }
        let confidence = 1.0 - signature.volatility;
        if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    fn vote_strength(&self, signature: &Signature) -> f64 {
        (signature.momentum.abs() / self.config.momentum_scale).tanh()
    }

    /// Combine signatures and correlations into one prediction.
    ///
    /// Only correlations between two domains present in `signatures` with
    /// non-zero confidence are considered; a degenerate pair carries none. With none, the prediction is neutral with zero confidence
    /// and `insufficient_correlation` set; contributions are still listed.
    pub fn aggregate(
        &self,
        signatures: &[Signature],
        correlations: &[CrossDomainCorrelation],
        timestamp_ms: i64,
    ) -> UnifiedPrediction {
        // One signature per domain, deterministic order
        let mut by_domain: BTreeMap<&DomainId, &Signature> = BTreeMap::new();
        for signature in signatures {
            by_domain.entry(&signature.domain).or_insert(signature);
        }

        let relevant: Vec<&CrossDomainCorrelation> = correlations
            .iter()
            .filter(|c| {
                c.first != c.second
                    && c.confidence > 0.0
                    && by_domain.contains_key(&c.first)
                    && by_domain.contains_key(&c.second)
            })
            .collect();

        let mut resonance_sums: BTreeMap<&DomainId, (f64, usize)> = BTreeMap::new();
        for corr in &relevant {
            let magnitude = if corr.coefficient.is_finite() {
                corr.coefficient.abs().min(1.0)
            } else {
                0.0
            };
            for domain in [&corr.first, &corr.second] {
                let entry = resonance_sums.entry(domain).or_insert((0.0, 0));
                entry.0 += magnitude;
                entry.1 += 1;
            }
        }

        let mut contributions = Vec::with_capacity(by_domain.len());
        let mut total_weight = 0.0;
        let mut weighted_vote = 0.0;
        let mut weighted_strength = 0.0;
        let mut weighted_confidence = 0.0;

        for (domain, signature) in &by_domain {
            let confidence = Self::domain_confidence(signature);
            let vote = Direction::from_sign(signature.momentum, self.config.vote_deadband);

            let (weight, resonance) = match resonance_sums.get(domain) {
                Some(&(sum, count)) if count > 0 => {
                    let resonance = sum / count as f64;
                    (confidence * resonance, resonance)
                }
                _ => (self.config.isolated_weight, 0.0),
            };

            total_weight += weight;
            weighted_vote += weight * vote.as_vote();
            weighted_strength += weight * vote.as_vote() * self.vote_strength(signature);
            weighted_confidence += weight * confidence;

            contributions.push(DomainContribution {
                domain: (*domain).clone(),
                weight,
                vote,
                confidence,
                resonance,
                default_signature: signature.is_default,
            });
        }

        // Default signatures carry no harmonics of their own
        let resonances: Vec<f64> = by_domain
            .values()
            .filter(|s| !s.is_default)
            .map(|s| s.harmonic_resonance.clamp(0.0, 1.0))
            .collect();
        let harmonic_alignment = if resonances.is_empty() {
            0.5
        } else {
            resonances.iter().sum::<f64>() / resonances.len() as f64
        };

        if relevant.is_empty() {
            log::debug!(
                "Insufficient correlation data across {} domains, returning neutral",
                by_domain.len()
            );
            return UnifiedPrediction {
                direction: Direction::Neutral,
                confidence: 0.0,
                magnitude: 0.0,
                horizon_ticks: 1,
                contributions,
                consensus_strength: 0.0,
                harmonic_alignment,
                insufficient_correlation: true,
                timestamp_ms,
            };
        }

        let direction = Direction::from_sign(weighted_vote, NEUTRAL_EPSILON);

        let (magnitude, consensus_strength, confidence) = if total_weight > 0.0 {
            let agreeing: f64 = contributions
                .iter()
                .filter(|c| c.vote == direction)
                .map(|c| c.weight)
                .sum();
            let strength = agreeing / total_weight;
            (
                (weighted_strength.abs() / total_weight).clamp(0.0, 1.0),
                strength,
                (strength * weighted_confidence / total_weight).clamp(0.0, 1.0),
            )
        } else {
            (0.0, 0.0, 0.0)
        };

        let horizon_ticks = relevant
            .iter()
            .map(|c| c.lead_lag.unsigned_abs())
            .max()
            .unwrap_or(0)
            .max(1);

        UnifiedPrediction {
            direction,
            confidence,
            magnitude,
            horizon_ticks,
            contributions,
            consensus_strength,
            harmonic_alignment,
            insufficient_correlation: false,
            timestamp_ms,
        }
    }
}
