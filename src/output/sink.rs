//! Sink trait for tick reports

use crate::pipeline::engine::TickReport;
use crate::pipeline::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Backend trait for writing tick reports
#[async_trait]
pub trait PredictionSink: Send {
    /// Write a single tick report
    async fn write_report(&mut self, report: &TickReport) -> PipelineResult<()>;

    /// Flush pending writes to storage
    async fn flush(&mut self) -> PipelineResult<()>;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}

/// Forwards every report to an mpsc receiver
pub struct ChannelSink {
    tx: mpsc::Sender<TickReport>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<TickReport>) -> Self {
        Self { tx }
    }

    /// Sink plus the receiving end, with room for `buffer` reports.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<TickReport>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl PredictionSink for ChannelSink {
    async fn write_report(&mut self, report: &TickReport) -> PipelineResult<()> {
        self.tx.send(report.clone()).await.map_err(|_| {
            PipelineError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "prediction receiver dropped",
            ))
        })
    }

    async fn flush(&mut self) -> PipelineResult<()> {
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "channel"
    }
}
