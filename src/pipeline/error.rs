//! Error taxonomy for the pipeline
//!
//! Only conditions the caller must react to are errors. "Not enough data
//! yet" is never an error: it is carried as default signatures, not-ready
//! correlations and the `insufficient_correlation` flag.

use super::types::DomainId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed or out-of-range input to `process`; the event is dropped and
    /// the adapter state is left untouched.
    #[error("invalid {domain} event: field `{field}` {reason}")]
    InvalidEvent {
        domain: DomainId,
        field: &'static str,
        reason: String,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("domain channel closed: {0}")]
    ChannelClosed(DomainId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn invalid_event(
        domain: &DomainId,
        field: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        PipelineError::InvalidEvent {
            domain: domain.clone(),
            field,
            reason: reason.into(),
        }
    }

    pub fn is_invalid_event(&self) -> bool {
        matches!(self, PipelineError::InvalidEvent { .. })
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Reject non-finite values and values outside `[min, max]`.
pub fn require_range(
    domain: &DomainId,
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> PipelineResult<f64> {
    if !value.is_finite() {
        return Err(PipelineError::invalid_event(domain, field, "is not finite"));
    }
    if value < min || value > max {
        return Err(PipelineError::invalid_event(
            domain,
            field,
            format!("{} outside [{}, {}]", value, min, max),
        ));
    }
    Ok(value)
}
