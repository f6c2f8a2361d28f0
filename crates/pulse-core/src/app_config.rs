use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Process-level settings, read once from the environment at startup.
///
/// Durations are stored as whole seconds (or milliseconds for the backoff
/// base) the same way they are supplied; use the accessor methods to get
/// [`Duration`] values.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub tracking_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub archive_dir: Option<PathBuf>,
    pub collect_interval_secs: u64,
    pub publish_interval_secs: u64,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub collect_budget_secs: u64,
    pub io_timeout_secs: u64,
    pub retry_backoff_base_ms: u64,
    pub retry_max_delay_secs: u64,
    pub window_max_mentions: usize,
}

impl AppConfig {
    #[must_use]
    pub fn collect_interval(&self) -> Duration {
        Duration::from_secs(self.collect_interval_secs)
    }

    #[must_use]
    pub fn publish_interval(&self) -> Duration {
        Duration::from_secs(self.publish_interval_secs)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn collect_budget(&self) -> Duration {
        Duration::from_secs(self.collect_budget_secs)
    }

    #[must_use]
    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }

    #[must_use]
    pub fn retry_backoff_base(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_base_ms)
    }

    #[must_use]
    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_secs(self.retry_max_delay_secs)
    }
}
