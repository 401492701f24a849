//! crossflow: cross-domain signal normalization, correlation and consensus
//!
//! - [`pipeline`]: the engine (adapters, buffers, signatures, correlation,
//!   consensus, tasks and scheduler)
//! - [`domains`]: bundled reference domain models
//! - [`feed`]: JSONL feed reader used by the runtime binary
//! - [`output`]: prediction sinks

pub mod domains;
pub mod feed;
pub mod output;
pub mod pipeline;
