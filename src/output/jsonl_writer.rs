//! JSONL writer for tick reports - one prediction per line, append-only

use super::sink::PredictionSink;
use crate::pipeline::engine::TickReport;
use crate::pipeline::error::PipelineResult;
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const FLUSH_INTERVAL: Duration = Duration::from_secs(5);

pub struct PredictionJsonlWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    last_flush: Instant,
    written: u64,
}

impl PredictionJsonlWriter {
    /// Open (or create) `path` for appending; parent directories are created.
    pub fn new(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        log::info!("📝 Writing predictions to: {}", path.display());

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            last_flush: Instant::now(),
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn write_line(&mut self, report: &TickReport) -> PipelineResult<()> {
        let json = serde_json::to_string(report)?;
        writeln!(self.writer, "{}", json)?;
        self.written += 1;

        // Flush every 5 seconds
        if self.last_flush.elapsed() > FLUSH_INTERVAL {
            self.flush_now()?;
        }
        Ok(())
    }

    pub fn flush_now(&mut self) -> PipelineResult<()> {
        self.writer.flush()?;
        self.last_flush = Instant::now();
        Ok(())
    }
}

impl Drop for PredictionJsonlWriter {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

#[async_trait]
impl PredictionSink for PredictionJsonlWriter {
    async fn write_report(&mut self, report: &TickReport) -> PipelineResult<()> {
        self.write_line(report)
    }

    async fn flush(&mut self) -> PipelineResult<()> {
        self.flush_now()
    }

    fn backend_type(&self) -> &'static str {
        "JSONL"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{Direction, UnifiedPrediction};
    use tempfile::TempDir;

    fn make_report(tick: u64) -> TickReport {
        TickReport {
            tick,
            prediction: UnifiedPrediction {
                direction: Direction::Up,
                confidence: 0.4,
                magnitude: 0.7,
                horizon_ticks: 2,
                contributions: Vec::new(),
                consensus_strength: 0.9,
                harmonic_alignment: 0.6,
                insufficient_correlation: false,
                timestamp_ms: 1_700_000_000_000 + tick as i64,
            },
            correlations: Vec::new(),
            newly_ready: 0,
        }
    }

    #[tokio::test]
    async fn test_writes_one_report_per_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("predictions.jsonl");

        let mut writer = PredictionJsonlWriter::new(&path).unwrap();
        for tick in 1..=3 {
            writer.write_report(&make_report(tick)).await.unwrap();
        }
        writer.flush().await.unwrap();
        assert_eq!(writer.written(), 3);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);

        let parsed: TickReport = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(parsed, make_report(3));
        assert!(lines[0].contains("\"direction\":\"UP\""));
    }

    #[tokio::test]
    async fn test_appends_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("predictions.jsonl");

        {
            let mut writer = PredictionJsonlWriter::new(&path).unwrap();
            writer.write_report(&make_report(1)).await.unwrap();
            // Dropped without explicit flush
        }
        {
            let mut writer = PredictionJsonlWriter::new(&path).unwrap();
            writer.write_report(&make_report(2)).await.unwrap();
            writer.flush().await.unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
