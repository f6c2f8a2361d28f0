//! Read-only view of every source task's state, for the health endpoint.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use pulse_core::{Cursor, Source};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceHealth {
    /// No cycle has finished yet.
    Pending,
    Healthy,
    BackingOff,
    /// Stopped after an auth failure; needs new credentials and a restart.
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceStatus {
    pub source: Source,
    pub health: SourceHealth,
    pub consecutive_failures: u32,
    pub cursor: Option<Cursor>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub retry_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub runs: u64,
    pub window_len: usize,
}

impl SourceStatus {
    #[must_use]
    pub fn pending(source: Source) -> Self {
        Self {
            source,
            health: SourceHealth::Pending,
            consecutive_failures: 0,
            cursor: None,
            last_success_at: None,
            retry_at: None,
            last_error: None,
            runs: 0,
            window_len: 0,
        }
    }
}

/// Shared board each source task publishes its status copy to.
#[derive(Debug, Clone, Default)]
pub struct SourceStatusBoard {
    inner: Arc<RwLock<BTreeMap<Source, SourceStatus>>>,
}

impl SourceStatusBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, status: SourceStatus) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(status.source, status);
    }

    #[must_use]
    pub fn get(&self, source: Source) -> Option<SourceStatus> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&source)
            .cloned()
    }

    /// Every known status, ordered by source.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SourceStatus> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}
