use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use pulse_core::{RawMention, Source};
use pulse_sentiment::{aggregate, AggregateOptions, SourceBatch};

use super::*;

const TRACKING: &str = r"
brand: tesla
brand_identifiers: [Tesla, Model 3]
hashtags: [tesla]
min_mentions: 30
sources:
  - source: twitter
    endpoint: https://feeds.example.com/twitter
    token_env: PULSE_TWITTER_TOKEN
  - source: news
    endpoint: https://feeds.example.com/news
  - source: reddit
    endpoint: https://feeds.example.com/reddit
    token_env: PULSE_REDDIT_TOKEN
    enabled: false
";

#[test]
fn parses_check_config_command() {
    let cli = Cli::try_parse_from(["pulse-cli", "check-config"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::CheckConfig { tracking: None }
    ));
}

#[test]
fn parses_check_config_with_tracking_override() {
    let cli = Cli::try_parse_from(["pulse-cli", "check-config", "--tracking", "t.yaml"])
        .expect("expected valid cli args");
    match cli.command {
        Commands::CheckConfig { tracking } => {
            assert_eq!(tracking, Some(PathBuf::from("t.yaml")));
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn parses_publish_once_dry_run() {
    let cli = Cli::try_parse_from(["pulse-cli", "publish-once", "--dry-run"])
        .expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::PublishOnce { dry_run: true }));
}

#[test]
fn parses_show_json() {
    let cli = Cli::try_parse_from(["pulse-cli", "show", "--json"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::Show {
            path: None,
            json: true
        }
    ));
}

#[test]
fn command_is_required() {
    assert!(Cli::try_parse_from(["pulse-cli"]).is_err());
}

#[test]
fn render_tracking_reports_missing_tokens_for_enabled_sources_only() {
    let tracking = pulse_core::parse_tracking(TRACKING).expect("valid tracking");

    let (report, missing) = check::render_tracking(&tracking, |_| Err(std::env::VarError::NotPresent));

    assert_eq!(missing, vec!["PULSE_TWITTER_TOKEN".to_owned()]);
    assert!(report.contains("brand tesla (3 terms)"));
    assert!(report.contains("min_mentions 30 (15 per source)"));
    assert!(report.lines().any(|l| l.starts_with("reddit") && l.contains("missing")));
}

#[test]
fn render_tracking_accepts_resolved_tokens() {
    let tracking = pulse_core::parse_tracking(TRACKING).expect("valid tracking");

    let (report, missing) = check::render_tracking(&tracking, |_| Ok("secret".to_owned()));

    assert!(missing.is_empty());
    assert!(report.lines().any(|l| l.starts_with("twitter") && l.contains("set")));
    assert!(report.lines().any(|l| l.starts_with("news") && l.contains("none")));
}

fn rated(id: &str, rating: f32) -> RawMention {
    RawMention {
        id: id.to_owned(),
        text: String::new(),
        timestamp: Utc::now(),
        engagement: BTreeMap::new(),
        matched_terms: BTreeSet::new(),
        rating: Some(rating),
    }
}

#[test]
fn render_summary_lists_each_source() {
    let batches = vec![SourceBatch {
        source: Source::AmazonReview,
        mentions: vec![rated("a", 5.0), rated("b", 1.0), rated("c", 3.0)],
    }];
    let snapshot = aggregate(&batches, &AggregateOptions::default(), Utc::now()).unwrap();

    let summary = show::render_summary(&snapshot);

    assert!(summary.contains("3 mentions, 33% positive / 33% negative / 34% neutral"));
    assert!(summary
        .lines()
        .any(|l| l.split_whitespace().collect::<Vec<_>>() == ["amazon_review", "3", "33", "33", "34"]));
}

#[test]
fn render_summary_lists_term_metrics() {
    let batches = vec![SourceBatch {
        source: Source::AmazonReview,
        mentions: vec![rated("a", 5.0), rated("b", 1.0)],
    }];
    let options = AggregateOptions {
        terms: vec!["Cybertruck".to_owned()],
        ..AggregateOptions::default()
    };
    let snapshot = aggregate(&batches, &options, Utc::now()).unwrap();

    let summary = show::render_summary(&snapshot);

    assert!(summary
        .lines()
        .any(|l| l.split_whitespace().collect::<Vec<_>>() == ["Cybertruck", "0", "0", "0", "0", "0.00"]));
}

#[test]
fn render_summary_marks_empty_snapshot() {
    let snapshot = aggregate(&[], &AggregateOptions::default(), Utc::now()).unwrap();
    assert!(show::render_summary(&snapshot).ends_with("no data\n"));
}
