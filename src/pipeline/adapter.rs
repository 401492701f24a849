//! Domain adapter contract and the generic adapter implementation
//!
//! A domain plugs into the pipeline by implementing [`DomainModel`]: how one
//! typed event becomes normalized fields, and how a window of signals is
//! projected onto the quadrant profile. [`Adapter`] wraps a model with the
//! parts every domain shares: the bounded buffer, lifecycle timestamps,
//! counters and signature extraction.

use super::buffer::SignalBuffer;
use super::error::{PipelineError, PipelineResult};
use super::signature;
use super::types::{DomainId, QuadrantProfile, Signal, Signature};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Fields a domain model produces from one raw event
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub timestamp_ms: i64,
    pub intensity: f64,
    pub frequency: f64,
    pub phase: f64,
    pub harmonics: Vec<f64>,
    pub raw_features: Vec<f64>,
    /// Set by the model when it clamped any input on the way in
    pub clamped: bool,
}

/// Domain-specific content plugged into the generic adapter
pub trait DomainModel: Send + Sync + 'static {
    /// Typed event delivered by this domain's feed connector
    type Event: Send + 'static;

    fn domain(&self) -> DomainId;

    /// Length of every harmonics vector this model emits
    fn harmonics_len(&self) -> usize;

    /// Names of the raw features, in the order they are stored on a signal
    fn feature_names(&self) -> &'static [&'static str];

    /// Convert one event; reject non-finite or out-of-range fields with
    /// [`PipelineError::InvalidEvent`].
    fn normalize(&self, event: &Self::Event) -> PipelineResult<Normalized>;

    /// Project per-feature window means onto the four quadrants.
    ///
    /// Must be non-negative, deterministic and continuous in `means`.
    fn quadrant(&self, means: &[f64]) -> QuadrantProfile;

    /// Signed per-signal quantity whose trend drives momentum
    fn directional_proxy(&self, signal: &Signal) -> f64;

    /// Per-signal energy used for the temporal flow split
    fn energy_proxy(&self, signal: &Signal) -> f64 {
        signal.intensity * self.directional_proxy(signal).abs()
    }

    /// Signature reported while the buffer is empty
    fn default_signature(&self, at_ms: i64) -> Signature {
        Signature::neutral(self.domain(), at_ms)
    }
}

/// Per-domain sizing, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Maximum signals retained
    pub capacity: usize,
    /// Default trailing window for signature extraction
    pub signature_window: usize,
    /// Sub-window size compared for momentum
    pub momentum_window: usize,
}

impl AdapterConfig {
    pub fn new(capacity: usize, signature_window: usize, momentum_window: usize) -> Self {
        Self {
            capacity,
            signature_window,
            momentum_window,
        }
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.capacity == 0 {
            return Err(PipelineError::InvalidConfig("capacity must be > 0".to_string()));
        }
        if self.signature_window == 0 {
            return Err(PipelineError::InvalidConfig(
                "signature_window must be > 0".to_string(),
            ));
        }
        if self.momentum_window == 0 {
            return Err(PipelineError::InvalidConfig(
                "momentum_window must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self::new(1_000, 100, 20)
    }
}

/// Read-only lifecycle snapshot for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterStatus {
    pub domain: DomainId,
    pub active: bool,
    pub initialized_at_ms: Option<i64>,
    pub last_update_ms: Option<i64>,
    pub buffered: usize,
    pub capacity: usize,
    pub accepted: u64,
    pub rejected: u64,
    pub clamped: u64,
}

/// Engine-facing contract every domain adapter fulfils
pub trait DomainAdapter {
    type Event;

    fn domain(&self) -> &DomainId;

    /// Idempotent; marks the adapter active.
    fn initialize(&mut self);

    /// Normalize one event and append it to the buffer.
    fn process(&mut self, event: Self::Event) -> PipelineResult<Signal>;

    /// Signature over the configured window, or the trailing `window_override` signals.
    fn extract_signature(&self, window_override: Option<usize>) -> Signature;

    fn status(&self) -> AdapterStatus;
}

/// Generic adapter owning one domain's buffer
pub struct Adapter<M: DomainModel> {
    model: M,
    domain: DomainId,
    config: AdapterConfig,
    buffer: SignalBuffer,
    active: bool,
    initialized_at_ms: Option<i64>,
    last_update_ms: Option<i64>,
    accepted: u64,
    rejected: u64,
    clamped: u64,

    /// Timestamp function (for testing with mock time)
    now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
}

impl<M: DomainModel> Adapter<M> {
    /// Create an adapter that stamps lifecycle events with wall-clock time.
    pub fn new(model: M, config: AdapterConfig) -> PipelineResult<Self> {
        Self::new_with_timestamp_fn(
            model,
            config,
            Box::new(|| chrono::Utc::now().timestamp_millis()),
        )
    }

    /// Create an adapter with a custom timestamp function (milliseconds).
    pub fn new_with_timestamp_fn(
        model: M,
        config: AdapterConfig,
        now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
    ) -> PipelineResult<Self> {
        config.validate()?;
        let buffer = SignalBuffer::new(config.capacity)?;
        let domain = model.domain();
        Ok(Self {
            model,
            domain,
            config,
            buffer,
            active: false,
            initialized_at_ms: None,
            last_update_ms: None,
            accepted: 0,
            rejected: 0,
            clamped: 0,
            now_fn,
        })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn buffer(&self) -> &SignalBuffer {
        &self.buffer
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Validate the model's output and assemble the signal.
    fn build_signal(&self, normalized: Normalized) -> PipelineResult<Signal> {
        let Normalized {
            timestamp_ms,
            intensity,
            frequency,
            phase,
            harmonics,
            raw_features,
            mut clamped,
        } = normalized;

        if !intensity.is_finite() {
            return Err(PipelineError::invalid_event(&self.domain, "intensity", "is not finite"));
        }
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(PipelineError::invalid_event(
                &self.domain,
                "frequency",
                format!("{} is not a positive finite value", frequency),
            ));
        }
        if !phase.is_finite() {
            return Err(PipelineError::invalid_event(&self.domain, "phase", "is not finite"));
        }
        if harmonics.len() != self.model.harmonics_len() {
            return Err(PipelineError::invalid_event(
                &self.domain,
                "harmonics",
                format!(
                    "length {} does not match domain length {}",
                    harmonics.len(),
                    self.model.harmonics_len()
                ),
            ));
        }
        if harmonics.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::invalid_event(
                &self.domain,
                "harmonics",
                "contains a non-finite component",
            ));
        }
        if raw_features.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::invalid_event(
                &self.domain,
                "raw_features",
                "contains a non-finite component",
            ));
        }

        let bounded = intensity.clamp(0.0, 1.0);
        if bounded != intensity {
            log::debug!(
                "{} intensity {} clamped to {}",
                self.domain,
                intensity,
                bounded
            );
            clamped = true;
        }

        Ok(Signal {
            domain: self.domain.clone(),
            timestamp_ms,
            intensity: bounded,
            frequency,
            phase: phase.rem_euclid(TAU),
            harmonics,
            raw_features,
            clamped,
        })
    }
}

impl<M: DomainModel> DomainAdapter for Adapter<M> {
    type Event = M::Event;

    fn domain(&self) -> &DomainId {
        &self.domain
    }

    fn initialize(&mut self) {
        if self.active {
            return;
        }
        let now = (self.now_fn)();
        self.active = true;
        self.initialized_at_ms = Some(now);
        log::info!(
            "✅ {} adapter initialized (capacity: {}, window: {})",
            self.domain,
            self.config.capacity,
            self.config.signature_window
        );
    }

    fn process(&mut self, event: M::Event) -> PipelineResult<Signal> {
        let signal = match self.model.normalize(&event).and_then(|n| self.build_signal(n)) {
            Ok(signal) => signal,
            Err(e) => {
                self.rejected += 1;
                return Err(e);
            }
        };

        if !self.active {
            log::debug!("{} received an event before initialize()", self.domain);
            self.initialize();
        }

        if signal.clamped {
            self.clamped += 1;
        }
        self.buffer.append(signal.clone());
        self.accepted += 1;
        self.last_update_ms = Some((self.now_fn)());

        Ok(signal)
    }

    fn extract_signature(&self, window_override: Option<usize>) -> Signature {
        let k = window_override.unwrap_or(self.config.signature_window);
        let window: Vec<&Signal> = self.buffer.last_n(k).collect();
        signature::extract(
            &self.model,
            &window,
            self.config.momentum_window,
            (self.now_fn)(),
        )
    }

    fn status(&self) -> AdapterStatus {
        AdapterStatus {
            domain: self.domain.clone(),
            active: self.active,
            initialized_at_ms: self.initialized_at_ms,
            last_update_ms: self.last_update_ms,
            buffered: self.buffer.len(),
            capacity: self.buffer.capacity(),
            accepted: self.accepted,
            rejected: self.rejected,
            clamped: self.clamped,
        }
    }
}
