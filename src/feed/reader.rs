//! Asynchronous JSONL feed reader with file rotation detection
//!
//! Each line of a feed file is one raw domain event. The reader either
//! replays the file from the beginning or tails it from the end, and follows
//! the path across rotations (inode change, or truncation on non-Unix).

use crate::pipeline::error::PipelineResult;
use serde::de::DeserializeOwned;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::time::sleep;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPosition {
    /// Replay every existing line, then follow
    Beginning,
    /// Only lines appended after `start`
    End,
}

pub struct FeedReader {
    path: PathBuf,
    file: Option<BufReader<File>>,
    inode: Option<u64>,
    start: StartPosition,
    poll_interval: Duration,
    /// Bytes of a line whose newline has not been written yet
    partial: Vec<u8>,
    lines_read: u64,
}

impl FeedReader {
    pub fn new(path: impl Into<PathBuf>, start: StartPosition) -> Self {
        Self {
            path: path.into(),
            file: None,
            inode: None,
            start,
            poll_interval: Duration::from_millis(100),
            partial: Vec::new(),
            lines_read: 0,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// Open the file at the configured start position.
    pub async fn start(&mut self) -> PipelineResult<()> {
        self.open(self.start).await?;
        log::info!(
            "📖 Started reading feed: {} (from {:?})",
            self.path.display(),
            self.start
        );
        Ok(())
    }

    async fn open(&mut self, position: StartPosition) -> PipelineResult<()> {
        let file = File::open(&self.path).await?;
        let metadata = file.metadata().await?;

        #[cfg(unix)]
        {
            self.inode = Some(metadata.ino());
        }
        #[cfg(not(unix))]
        {
            let _ = metadata;
        }

        let mut reader = BufReader::new(file);
        if position == StartPosition::End {
            reader.seek(SeekFrom::End(0)).await?;
        }
        self.file = Some(reader);
        self.partial.clear();
        Ok(())
    }

    /// Read the next non-empty line, waiting if necessary.
    ///
    /// A line that is not valid UTF-8 is consumed and returned as an
    /// `InvalidData` I/O error.
    pub async fn read_line(&mut self) -> PipelineResult<String> {
        let bytes = self.next_line_bytes().await?;
        let line = String::from_utf8(bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(line.trim().to_string())
    }

    /// Raw bytes of the next complete, non-blank line
    async fn next_line_bytes(&mut self) -> PipelineResult<Vec<u8>> {
        if self.file.is_none() {
            self.start().await?;
        }

        loop {
            if self.detect_rotation().await? {
                log::info!("🔄 Feed rotation detected, reopening: {}", self.path.display());
                // A rotated file is new content: read it from the top
                self.open(StartPosition::Beginning).await?;
            }

            let reader = self.file.as_mut().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "Feed not opened")
            })?;

            if reader.read_until(b'\n', &mut self.partial).await? == 0 {
                // No new data, sleep and retry
                sleep(self.poll_interval).await;
                continue;
            }

            if self.partial.last() != Some(&b'\n') {
                // Writer is mid-line
                continue;
            }

            let line = std::mem::take(&mut self.partial);
            if !line.iter().all(u8::is_ascii_whitespace) {
                self.lines_read += 1;
                return Ok(line);
            }
        }
    }

    /// Read and decode the next line as one event.
    ///
    /// A line that fails to decode, invalid UTF-8 included, is consumed and
    /// returned as a `Serialization` error so the caller can skip it.
    pub async fn next_event<E: DeserializeOwned>(&mut self) -> PipelineResult<E> {
        let line = self.next_line_bytes().await?;
        Ok(serde_json::from_slice(&line)?)
    }

    /// Detect if the file has been rotated (inode changed)
    async fn detect_rotation(&mut self) -> PipelineResult<bool> {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            // Mid-rotation: the old file is gone and the new one not yet created
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        #[cfg(unix)]
        {
            Ok(self.inode.map_or(false, |old| old != metadata.ino()))
        }

        #[cfg(not(unix))]
        {
            // On non-Unix systems, check file size decrease as heuristic
            if let Some(reader) = self.file.as_mut() {
                let current_pos = reader.get_mut().stream_position().await?;
                Ok(metadata.len() < current_pos)
            } else {
                Ok(false)
            }
        }
    }
}
