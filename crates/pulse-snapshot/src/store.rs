//! Atomic snapshot file storage.
//!
//! A write goes to `.<name>.staging` in the target's directory, is flushed
//! with `sync_all`, and is then renamed over the target. Readers of the
//! target path see either the previous file or the new one, never a mix.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pulse_core::Snapshot;
use tokio::io::AsyncWriteExt;

use crate::error::{ParseError, WriteError};

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    staging: PathBuf,
    io_timeout: Duration,
}

impl SnapshotStore {
    /// # Errors
    ///
    /// Returns [`WriteError::InvalidPath`] if `path` has no file name.
    pub fn new(path: impl Into<PathBuf>, io_timeout: Duration) -> Result<Self, WriteError> {
        let path = path.into();
        let staging = staging_path(&path)?;
        Ok(Self {
            path,
            staging,
            io_timeout,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn staging_path(&self) -> &Path {
        &self.staging
    }

    /// Remove a staging file left behind by a process killed mid-write.
    /// Returns `true` if one was removed.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError`] if the file exists but cannot be removed.
    pub async fn cleanup_staging(&self) -> Result<bool, WriteError> {
        match tokio::fs::remove_file(&self.staging).await {
            Ok(()) => {
                tracing::warn!(path = %self.staging.display(), "removed stale snapshot staging file");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(WriteError::Io {
                path: self.staging.display().to_string(),
                source: e,
            }),
        }
    }

    /// Serialize and atomically replace the snapshot file.
    ///
    /// A timed-out rename can still complete on the blocking pool. After a
    /// timeout the target is read back, and if it already holds the new body
    /// the write counts as a success.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError`] on serialization, I/O, or timeout. The previous
    /// file is left untouched in every failure case.
    pub async fn write(&self, snapshot: &Snapshot) -> Result<(), WriteError> {
        let body = serde_json::to_vec_pretty(snapshot)?;
        match tokio::time::timeout(self.io_timeout, self.write_atomic(&body)).await {
            Ok(result) => result,
            Err(_) => {
                // The staging file may be half-written.
                let _ = tokio::fs::remove_file(&self.staging).await;
                if self.holds(&body).await {
                    tracing::warn!(
                        path = %self.path.display(),
                        "snapshot write timed out after the rename landed"
                    );
                    return Ok(());
                }
                Err(WriteError::Timeout {
                    path: self.path.display().to_string(),
                    after: self.io_timeout,
                })
            }
        }
    }

    /// Whether the target file currently contains exactly `body`.
    async fn holds(&self, body: &[u8]) -> bool {
        matches!(
            tokio::time::timeout(self.io_timeout, tokio::fs::read(&self.path)).await,
            Ok(Ok(current)) if current == body
        )
    }

    async fn write_atomic(&self, body: &[u8]) -> Result<(), WriteError> {
        let io_err = |path: &Path| {
            let path = path.display().to_string();
            move |source| WriteError::Io { path, source }
        };

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await.map_err(io_err(dir))?;
        }

        let mut file = tokio::fs::File::create(&self.staging)
            .await
            .map_err(io_err(&self.staging))?;
        file.write_all(body).await.map_err(io_err(&self.staging))?;
        file.sync_all().await.map_err(io_err(&self.staging))?;
        drop(file);

        tokio::fs::rename(&self.staging, &self.path)
            .await
            .map_err(io_err(&self.path))
    }

    /// Read, parse, and validate the current snapshot file.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the file is missing, unreadable, malformed,
    /// or violates a snapshot invariant.
    pub async fn read(&self) -> Result<Snapshot, ParseError> {
        let bytes = read_bytes(&self.path, self.io_timeout).await?;
        parse_snapshot(&bytes)
    }
}

/// Parse bytes into a snapshot and check its invariants.
///
/// # Errors
///
/// Returns [`ParseError::Json`] or [`ParseError::Invariant`].
pub fn parse_snapshot(bytes: &[u8]) -> Result<Snapshot, ParseError> {
    let snapshot: Snapshot = serde_json::from_slice(bytes)?;
    snapshot.validate()?;
    Ok(snapshot)
}

pub(crate) async fn read_bytes(path: &Path, io_timeout: Duration) -> Result<Vec<u8>, ParseError> {
    match tokio::time::timeout(io_timeout, tokio::fs::read(path)).await {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(e)) if e.kind() == ErrorKind::NotFound => Err(ParseError::Missing {
            path: path.display().to_string(),
        }),
        Ok(Err(e)) => Err(ParseError::Read {
            path: path.display().to_string(),
            source: e,
        }),
        Err(_) => Err(ParseError::Timeout {
            path: path.display().to_string(),
            after: io_timeout,
        }),
    }
}

fn staging_path(path: &Path) -> Result<PathBuf, WriteError> {
    let name = path
        .file_name()
        .ok_or_else(|| WriteError::InvalidPath(path.display().to_string()))?;
    let mut staging_name = std::ffi::OsString::from(".");
    staging_name.push(name);
    staging_name.push(".staging");
    Ok(path.with_file_name(staging_name))
}
