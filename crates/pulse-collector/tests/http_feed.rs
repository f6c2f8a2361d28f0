//! Integration tests for `HttpFeedCollector`.
//!
//! Uses `wiremock` to stand up a local feed server per test; no real network
//! traffic is made.

use std::time::Duration;

use pulse_collector::{CollectionError, Collector, ErrorKind, HttpFeedCollector};
use pulse_core::{Cursor, Source};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn collector(server: &MockServer, token: Option<&str>) -> HttpFeedCollector {
    let client = HttpFeedCollector::build_client(Duration::from_secs(5), "pulse-test/0.1")
        .expect("failed to build test client");
    HttpFeedCollector::new(
        client,
        Source::Twitter,
        format!("{}/feed", server.uri()),
        &["Tesla".to_owned(), "#ev".to_owned()],
        25,
        token.map(str::to_owned),
    )
}

#[tokio::test]
async fn parses_page_and_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .and(query_param("q", "Tesla,#ev"))
        .and(query_param("limit", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "mentions": [{
                "id": "t-1",
                "text": "Loving my Tesla",
                "timestamp": "2025-03-01T12:00:00Z",
                "engagement": {"likes": 12, "retweets": 3}
            }],
            "next_cursor": "abc"
        })))
        .mount(&server)
        .await;

    let batch = collector(&server, None).collect(None).await.unwrap();
    assert_eq!(batch.mentions.len(), 1);
    assert_eq!(batch.mentions[0].id, "t-1");
    assert_eq!(batch.mentions[0].engagement["likes"], 12);
    assert!(batch.mentions[0].matched_terms.is_empty());
    assert_eq!(batch.next_cursor, Some(Cursor("abc".to_owned())));
}

#[tokio::test]
async fn sends_cursor_and_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .and(query_param("since", "abc"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"mentions": [], "next_cursor": null})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let batch = collector(&server, Some("s3cret"))
        .collect(Some(&Cursor("abc".to_owned())))
        .await
        .unwrap();
    assert!(batch.mentions.is_empty());
    assert!(batch.next_cursor.is_none());
}

#[tokio::test]
async fn unauthorized_and_forbidden_map_to_auth() {
    for status in [401, 403] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        let err = collector(&server, None).collect(None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth, "status {status}: {err}");
    }
}

#[tokio::test]
async fn too_many_requests_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
        .mount(&server)
        .await;

    let err = collector(&server, None).collect(None).await.unwrap_err();
    assert!(matches!(
        err,
        CollectionError::RateLimited {
            retry_after_secs: Some(30)
        }
    ));
    assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
}

#[tokio::test]
async fn server_error_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = collector(&server, None).collect(None).await.unwrap_err();
    assert!(matches!(
        err,
        CollectionError::UnexpectedStatus { status: 503, .. }
    ));
    assert_eq!(err.kind(), ErrorKind::Transient);
}

#[tokio::test]
async fn malformed_body_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"mentions\": [tru"))
        .mount(&server)
        .await;

    let err = collector(&server, None).collect(None).await.unwrap_err();
    assert!(matches!(err, CollectionError::MalformedResponse { .. }));
    assert_eq!(err.kind(), ErrorKind::Transient);
}

#[tokio::test]
async fn connection_failure_is_transient() {
    let server = MockServer::start().await;
    let c = collector(&server, None);
    drop(server);

    let err = c.collect(None).await.unwrap_err();
    assert!(matches!(err, CollectionError::Http(_)));
    assert_eq!(err.kind(), ErrorKind::Transient);
}

const TRACKING: &str = r"
brand: tesla
brand_identifiers: [Tesla]
min_mentions: 40
sources:
  - source: twitter
    endpoint: https://feeds.example.com/twitter
    token_env: PULSE_TWITTER_TOKEN
  - source: news
    endpoint: https://feeds.example.com/news
  - source: reddit
    endpoint: https://feeds.example.com/reddit
    enabled: false
";

#[test]
fn from_tracking_builds_one_collector_per_enabled_source() {
    let tracking = pulse_core::parse_tracking(TRACKING).unwrap();
    let client = HttpFeedCollector::build_client(Duration::from_secs(5), "pulse-test/0.1").unwrap();

    let collectors = HttpFeedCollector::from_tracking(&tracking, &client, 20, |var| {
        assert_eq!(var, "PULSE_TWITTER_TOKEN");
        Ok("secret".to_owned())
    })
    .unwrap();

    let sources: Vec<_> = collectors.iter().map(|c| c.source()).collect();
    assert_eq!(sources, vec![Source::Twitter, Source::News]);
}

#[test]
fn from_tracking_rejects_unresolved_token() {
    let tracking = pulse_core::parse_tracking(TRACKING).unwrap();
    let client = HttpFeedCollector::build_client(Duration::from_secs(5), "pulse-test/0.1").unwrap();

    let result = HttpFeedCollector::from_tracking(&tracking, &client, 20, |_| {
        Err(std::env::VarError::NotPresent)
    });

    assert!(matches!(
        result,
        Err(pulse_core::ConfigError::MissingEnvVar(var)) if var == "PULSE_TWITTER_TOKEN"
    ));
}
