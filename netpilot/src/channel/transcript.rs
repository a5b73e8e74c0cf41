//! Verbose session transcript for postmortem debugging.

use std::path::{Path, PathBuf};

use log::warn;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::error::{ChannelError, Result};

/// Placeholder written instead of secrets sent over the channel.
pub const MASK: &str = "********";

/// Append-only log of everything sent to and received from a device.
///
/// Write failures are logged and otherwise ignored after the file has been
/// opened; a full disk must not break a configuration push.
#[derive(Debug)]
pub struct SessionTranscript {
    path: PathBuf,
    file: File,
}

impl SessionTranscript {
    /// Open (or create) the transcript file in append mode.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(ChannelError::Transcript)?;
        Ok(Self { path, file })
    }

    /// Path of the transcript file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record bytes received from the device, verbatim.
    pub async fn received(&mut self, data: &[u8]) {
        self.write(data).await;
    }

    /// Record a line sent to the device.
    pub async fn sent(&mut self, line: &str, hidden: bool) {
        let text = if hidden { MASK } else { line };
        self.write(text.as_bytes()).await;
        self.write(b"\n").await;
    }

    /// Record a marker line (connection opened/closed).
    pub async fn note(&mut self, message: &str) {
        self.write(format!("\n*** {} ***\n", message).as_bytes())
            .await;
    }

    async fn write(&mut self, data: &[u8]) {
        if let Err(e) = self.file.write_all(data).await {
            warn!("transcript {}: write failed: {}", self.path.display(), e);
        }
    }

    /// Flush buffered data to disk.
    pub async fn flush(&mut self) {
        if let Err(e) = self.file.flush().await {
            warn!("transcript {}: flush failed: {}", self.path.display(), e);
        }
    }
}
