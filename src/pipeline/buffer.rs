//! Bounded per-domain signal buffer
//!
//! Append-only FIFO with a fixed capacity. Once full, every append evicts the
//! oldest signal, so a domain runs in constant memory no matter how fast its
//! feed is.

use super::error::{PipelineError, PipelineResult};
use super::types::Signal;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct SignalBuffer {
    signals: VecDeque<Signal>,
    capacity: usize,
    /// Total signals evicted since construction
    evicted: u64,
}

impl SignalBuffer {
    pub fn new(capacity: usize) -> PipelineResult<Self> {
        if capacity == 0 {
            return Err(PipelineError::InvalidConfig(
                "signal buffer capacity must be > 0".to_string(),
            ));
        }
        Ok(Self {
            signals: VecDeque::with_capacity(capacity),
            capacity,
            evicted: 0,
        })
    }

    /// Append a signal, evicting the oldest one when at capacity.
    ///
    /// Returns the evicted signal, if any.
    pub(crate) fn append(&mut self, signal: Signal) -> Option<Signal> {
        let evicted = if self.signals.len() == self.capacity {
            self.evicted += 1;
            self.signals.pop_front()
        } else {
            None
        };
        self.signals.push_back(signal);
        evicted
    }

    /// Trailing view of the last `k` signals, oldest first.
    pub fn last_n(&self, k: usize) -> impl DoubleEndedIterator<Item = &Signal> + ExactSizeIterator + Clone {
        let start = self.signals.len().saturating_sub(k);
        self.signals.range(start..)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Signal> + ExactSizeIterator + Clone {
        self.signals.iter()
    }

    pub fn latest(&self) -> Option<&Signal> {
        self.signals.back()
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}
