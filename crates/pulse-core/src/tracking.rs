use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::mention::{RatingScale, Source};
use crate::ConfigError;

/// One configured collection endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEndpoint {
    pub source: Source,
    pub endpoint: String,
    /// Name of the env var holding the bearer token, if the feed needs one.
    pub token_env: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// What to track and where to collect it from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    pub brand: String,
    pub brand_identifiers: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    pub min_mentions: usize,
    #[serde(default)]
    pub source_priority: Vec<Source>,
    #[serde(default)]
    pub rating_scale: RatingScale,
    pub sources: Vec<SourceEndpoint>,
}

impl TrackingConfig {
    /// All tracked terms: identifiers, then keywords, then hashtags (with `#`).
    #[must_use]
    pub fn terms(&self) -> Vec<String> {
        self.brand_identifiers
            .iter()
            .chain(&self.keywords)
            .cloned()
            .chain(self.hashtags.iter().map(|tag| {
                if tag.starts_with('#') {
                    tag.clone()
                } else {
                    format!("#{tag}")
                }
            }))
            .collect()
    }

    /// Enabled endpoints, in file order.
    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceEndpoint> {
        self.sources.iter().filter(|s| s.enabled)
    }

    /// Full source ordering used when laying out snapshot mentions.
    ///
    /// Sources missing from `source_priority` follow in [`Source::ALL`] order.
    #[must_use]
    pub fn priority(&self) -> Vec<Source> {
        let mut order = self.source_priority.clone();
        for source in Source::ALL {
            if !order.contains(&source) {
                order.push(source);
            }
        }
        order
    }

    /// Per-source share of the minimum-mentions target, rounded up.
    #[must_use]
    pub fn per_source_target(&self) -> usize {
        let enabled = self.enabled_sources().count().max(1);
        self.min_mentions.div_ceil(enabled)
    }
}

/// Load and validate the tracking configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_tracking(path: &Path) -> Result<TrackingConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::TrackingFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_tracking(&content)
}

/// Parse and validate tracking YAML.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_tracking(content: &str) -> Result<TrackingConfig, ConfigError> {
    let tracking: TrackingConfig = serde_yaml::from_str(content)?;
    validate_tracking(&tracking)?;
    Ok(tracking)
}

fn validate_tracking(tracking: &TrackingConfig) -> Result<(), ConfigError> {
    if tracking.brand.trim().is_empty() {
        return Err(ConfigError::Validation(
            "brand must be non-empty".to_string(),
        ));
    }

    if tracking.brand_identifiers.iter().all(|t| t.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "brand '{}' needs at least one non-empty brand identifier",
            tracking.brand
        )));
    }

    if tracking.min_mentions == 0 {
        return Err(ConfigError::Validation(
            "min_mentions must be greater than zero".to_string(),
        ));
    }

    let scale = tracking.rating_scale;
    if !(scale.min.is_finite() && scale.max.is_finite() && scale.min < scale.max) {
        return Err(ConfigError::Validation(format!(
            "rating_scale min ({}) must be below max ({})",
            scale.min, scale.max
        )));
    }

    let mut seen_priority = HashSet::new();
    for source in &tracking.source_priority {
        if !seen_priority.insert(*source) {
            return Err(ConfigError::Validation(format!(
                "duplicate source in source_priority: '{source}'"
            )));
        }
    }

    let mut seen_sources = HashSet::new();
    for endpoint in &tracking.sources {
        if !seen_sources.insert(endpoint.source) {
            return Err(ConfigError::Validation(format!(
                "duplicate source entry: '{}'",
                endpoint.source
            )));
        }

        let url = endpoint.endpoint.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "source '{}' has invalid endpoint '{}'; must be http(s)",
                endpoint.source, endpoint.endpoint
            )));
        }

        if endpoint
            .token_env
            .as_deref()
            .is_some_and(|var| var.trim().is_empty())
        {
            return Err(ConfigError::Validation(format!(
                "source '{}' has an empty token_env",
                endpoint.source
            )));
        }
    }

    if tracking.enabled_sources().next().is_none() {
        return Err(ConfigError::Validation(
            "at least one source must be enabled".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[path = "tracking_test.rs"]
mod tests;
