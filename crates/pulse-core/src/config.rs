use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is missing or invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is missing or invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can use a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    // Every numeric knob in this config is a duration or a limit, and zero
    // would either spin a loop or disable the pipeline.
    let parse_positive_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let value = or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be greater than zero".to_string()));
        }
        Ok(value)
    };

    let parse_positive_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be greater than zero".to_string()));
        }
        Ok(value)
    };

    let env = parse_environment(&or_default("PULSE_ENV", "development"))?;

    let bind_addr = parse_addr("PULSE_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("PULSE_LOG_LEVEL", "info");
    let tracking_path = PathBuf::from(or_default("PULSE_TRACKING_PATH", "./config/tracking.yaml"));
    let snapshot_path = PathBuf::from(or_default("PULSE_SNAPSHOT_PATH", "./data/snapshot.json"));
    let archive_dir = lookup("PULSE_ARCHIVE_DIR")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from);

    if snapshot_path.file_name().is_none() {
        return Err(invalid(
            "PULSE_SNAPSHOT_PATH",
            "must name a file, not a directory".to_string(),
        ));
    }

    let collect_interval_secs = parse_positive_u64("PULSE_COLLECT_INTERVAL_SECS", "60")?;
    let publish_interval_secs = parse_positive_u64("PULSE_PUBLISH_INTERVAL_SECS", "60")?;
    let poll_interval_secs = parse_positive_u64("PULSE_POLL_INTERVAL_SECS", "10")?;
    let request_timeout_secs = parse_positive_u64("PULSE_REQUEST_TIMEOUT_SECS", "30")?;
    let collect_budget_secs = parse_positive_u64("PULSE_COLLECT_BUDGET_SECS", "45")?;
    let io_timeout_secs = parse_positive_u64("PULSE_IO_TIMEOUT_SECS", "10")?;
    let retry_backoff_base_ms = parse_positive_u64("PULSE_RETRY_BACKOFF_BASE_MS", "1000")?;
    let retry_max_delay_secs = parse_positive_u64("PULSE_RETRY_MAX_DELAY_SECS", "300")?;
    let window_max_mentions = parse_positive_usize("PULSE_WINDOW_MAX_MENTIONS", "500")?;

    if retry_max_delay_secs.saturating_mul(1_000) < retry_backoff_base_ms {
        return Err(invalid(
            "PULSE_RETRY_MAX_DELAY_SECS",
            format!(
                "max delay ({retry_max_delay_secs}s) is shorter than the backoff base ({retry_backoff_base_ms}ms)"
            ),
        ));
    }

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        tracking_path,
        snapshot_path,
        archive_dir,
        collect_interval_secs,
        publish_interval_secs,
        poll_interval_secs,
        request_timeout_secs,
        collect_budget_secs,
        io_timeout_secs,
        retry_backoff_base_ms,
        retry_max_delay_secs,
        window_max_mentions,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PULSE_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
