//! Prediction sinks
//!
//! The scheduler hands every tick report to a [`PredictionSink`]. Two
//! backends ship with the crate: append-only JSONL files and an in-process
//! channel for embedding the engine in a larger service.

pub mod jsonl_writer;
pub mod sink;

pub use jsonl_writer::PredictionJsonlWriter;
pub use sink::{ChannelSink, PredictionSink};
