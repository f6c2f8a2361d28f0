//! Optional raw per-run archives.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use pulse_core::{RawMention, Source};

use crate::error::ArchiveError;

/// Writes each successful collection run to its own JSON file.
#[derive(Debug, Clone)]
pub struct RunArchive {
    dir: PathBuf,
    io_timeout: Duration,
}

impl RunArchive {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, io_timeout: Duration) -> Self {
        Self {
            dir: dir.into(),
            io_timeout,
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<source>_run<NNNNNN>_<YYYYmmdd_HHMMSS>.json`
    #[must_use]
    pub fn file_name(source: Source, run: u64, at: DateTime<Utc>) -> String {
        format!("{source}_run{run:06}_{}.json", at.format("%Y%m%d_%H%M%S"))
    }

    /// Write `mentions` for one run, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if the directory or file cannot be written,
    /// or if the write does not finish within the I/O timeout.
    pub async fn write(
        &self,
        source: Source,
        run: u64,
        at: DateTime<Utc>,
        mentions: &[RawMention],
    ) -> Result<PathBuf, ArchiveError> {
        let path = self.dir.join(Self::file_name(source, run, at));
        let body = serde_json::to_vec_pretty(mentions)?;
        tokio::time::timeout(self.io_timeout, self.write_file(&path, body))
            .await
            .map_err(|_| ArchiveError::Timeout {
                path: path.display().to_string(),
                after: self.io_timeout,
            })??;
        Ok(path)
    }

    async fn write_file(&self, path: &Path, body: Vec<u8>) -> Result<(), ArchiveError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ArchiveError::Io {
                path: self.dir.display().to_string(),
                source: e,
            })?;
        tokio::fs::write(path, body)
            .await
            .map_err(|e| ArchiveError::Io {
                path: path.display().to_string(),
                source: e,
            })
    }
}
