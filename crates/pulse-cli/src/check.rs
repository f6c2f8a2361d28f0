//! `check-config`: validate configuration without starting anything.

use std::fmt::Write as _;
use std::path::Path;

use pulse_core::{AppConfig, TrackingConfig};

/// Load and validate the tracking file, then confirm every enabled source's
/// token variable resolves.
///
/// # Errors
///
/// Returns an error if the tracking file is invalid or any token is missing.
pub(crate) fn run_check_config(
    config: &AppConfig,
    tracking_override: Option<&Path>,
) -> anyhow::Result<()> {
    let path = tracking_override.unwrap_or(&config.tracking_path);
    let tracking = pulse_core::load_tracking(path)?;

    let (report, missing) = render_tracking(&tracking, |var| std::env::var(var));
    println!("tracking file {}", path.display());
    print!("{report}");
    println!(
        "snapshot {} (publish every {}s, poll every {}s)",
        config.snapshot_path.display(),
        config.publish_interval_secs,
        config.poll_interval_secs
    );

    if !missing.is_empty() {
        anyhow::bail!("unresolved source tokens: {}", missing.join(", "));
    }
    println!("configuration ok");
    Ok(())
}

/// Human-readable summary plus the names of token variables `lookup` could
/// not resolve.
pub(crate) fn render_tracking<F>(tracking: &TrackingConfig, lookup: F) -> (String, Vec<String>)
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let mut out = String::new();
    let mut missing = Vec::new();

    let _ = writeln!(out, "brand {} ({} terms)", tracking.brand, tracking.terms().len());
    let _ = writeln!(
        out,
        "min_mentions {} ({} per source)",
        tracking.min_mentions,
        tracking.per_source_target()
    );
    let _ = writeln!(out, "{:<16}{:<10}{:<12}ENDPOINT", "SOURCE", "ENABLED", "TOKEN");
    for endpoint in &tracking.sources {
        let token = match endpoint.token_env.as_deref() {
            None => "none",
            Some(var) if lookup(var).is_ok() => "set",
            Some(var) => {
                if endpoint.enabled {
                    missing.push(var.to_owned());
                }
                "missing"
            }
        };
        let _ = writeln!(
            out,
            "{:<16}{:<10}{:<12}{}",
            endpoint.source.as_str(),
            if endpoint.enabled { "yes" } else { "no" },
            token,
            endpoint.endpoint
        );
    }

    (out, missing)
}
