//! `show`: print the snapshot a consumer would currently load.

use std::fmt::Write as _;
use std::path::Path;

use pulse_core::{AppConfig, Snapshot};
use pulse_snapshot::SnapshotStore;

/// # Errors
///
/// Returns an error if the file is missing, malformed, or fails validation.
pub(crate) async fn run_show(
    config: &AppConfig,
    path_override: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let path = path_override.unwrap_or(&config.snapshot_path);
    let snapshot = SnapshotStore::new(path, config.io_timeout())?.read().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print!("{}", render_summary(&snapshot));
    }
    Ok(())
}

pub(crate) fn render_summary(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let generated = snapshot.generated_at.format("%Y-%m-%d %H:%M:%S UTC");

    if snapshot.no_data {
        let _ = writeln!(out, "generated {generated}: no data");
        return out;
    }

    let d = snapshot.distribution;
    let _ = writeln!(
        out,
        "generated {generated}: {} mentions, {}% positive / {}% negative / {}% neutral",
        snapshot.mentions.len(),
        d.positive,
        d.negative,
        d.neutral
    );
    let _ = writeln!(
        out,
        "{:<16}{:<8}{:<6}{:<6}NEU",
        "SOURCE", "COUNT", "POS", "NEG"
    );
    for (source, breakdown) in &snapshot.by_platform {
        let _ = writeln!(
            out,
            "{:<16}{:<8}{:<6}{:<6}{}",
            source.as_str(),
            breakdown.count,
            breakdown.positive,
            breakdown.negative,
            breakdown.neutral
        );
    }

    if !snapshot.metrics.by_term.is_empty() {
        let _ = writeln!(
            out,
            "{:<24}{:<10}{:<6}{:<6}{:<6}AVG",
            "TERM", "MENTIONS", "POS", "NEG", "NEU"
        );
        for (term, m) in &snapshot.metrics.by_term {
            let _ = writeln!(
                out,
                "{:<24}{:<10}{:<6}{:<6}{:<6}{:.2}",
                term, m.mentions, m.positive, m.negative, m.neutral, m.average_score
            );
        }
    }
    out
}
