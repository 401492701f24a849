//! # Cross-Domain Resonance Pipeline
//!
//! Turns heterogeneous per-domain event streams into one directional
//! prediction per scheduler tick.
//!
//! ## Data flow
//!
//! ```text
//! raw event ─→ Adapter::process ─→ Signal ─→ SignalBuffer (bounded, per domain)
//!                                                 │
//!                        Adapter::extract_signature (trailing window)
//!                                                 ↓
//!                                             Signature ──(watch)──→ SignatureBoard
//!                                                                         │
//!                                   scheduler tick: point-in-time snapshot
//!                                                                         ↓
//!                          CorrelationEngine::observe ─→ ConsensusAggregator::aggregate
//!                                                                         ↓
//!                                                              UnifiedPrediction
//! ```
//!
//! ## Key principles
//!
//! - Each buffer is owned by exactly one adapter, and each adapter by one task.
//! - Missing data is never an error: empty buffers yield default signatures,
//!   young pairs are not Ready, and a prediction without Ready pairs is
//!   neutral with `insufficient_correlation` set.
//! - Everything the scheduler computes is a pure function of the snapshot
//!   it took, so identical snapshots produce identical predictions.
//!
//! ## Module Organization
//!
//! - `types` - Signal, Signature, correlations, predictions
//! - `error` - `PipelineError`
//! - `buffer` - bounded per-domain signal buffer
//! - `adapter` - `DomainModel` contract and the generic `Adapter`
//! - `signature` - windowed feature extraction
//! - `correlation` - pairwise rolling correlation with lead/lag
//! - `consensus` - weighted directional vote
//! - `engine` - one tick: correlation then consensus
//! - `config` - environment configuration
//! - `ingestion` - per-domain tasks and the signature board
//! - `scheduler` - fixed-interval tick loop

pub mod adapter;
pub mod buffer;
pub mod config;
pub mod consensus;
pub mod correlation;
pub mod engine;
pub mod error;
pub mod ingestion;
pub mod scheduler;
pub mod signature;
pub mod types;

// Re-export commonly used types
pub use adapter::{Adapter, AdapterConfig, AdapterStatus, DomainAdapter, DomainModel, Normalized};
pub use buffer::SignalBuffer;
pub use config::EngineConfig;
pub use consensus::{ConsensusAggregator, ConsensusConfig};
pub use correlation::{CorrelationConfig, CorrelationEngine, PairPhase, SignatureMetric};
pub use engine::{ResonanceEngine, TickReport};
pub use error::{PipelineError, PipelineResult};
pub use ingestion::{spawn_domain, DomainHandle, DomainTaskConfig, SignatureBoard};
pub use scheduler::consensus_scheduler_task;
pub use types::{
    CrossDomainCorrelation, Direction, DomainContribution, DomainId, QuadrantProfile, Signal,
    Signature, TemporalFlow, UnifiedPrediction,
};
