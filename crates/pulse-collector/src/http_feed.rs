//! Generic HTTP mention-feed collector.
//!
//! Wire protocol:
//!
//! ```text
//! GET <endpoint>?q=<terms>&limit=<n>[&since=<cursor>]
//! Authorization: Bearer <token>        (optional)
//!
//! 200 {"mentions": [RawMention, ...], "next_cursor": "..." | null}
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pulse_core::{ConfigError, Cursor, RawMention, Source, TrackingConfig};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::collector::{CollectBatch, Collector};
use crate::error::CollectionError;

#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    mentions: Vec<RawMention>,
    #[serde(default)]
    next_cursor: Option<String>,
}

/// Polls one mention feed endpoint for a single source.
#[derive(Debug, Clone)]
pub struct HttpFeedCollector {
    client: Client,
    source: Source,
    endpoint: String,
    query: String,
    page_size: u32,
    token: Option<String>,
}

impl HttpFeedCollector {
    /// Build the shared HTTP client used by every feed collector.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn build_client(timeout: Duration, user_agent: &str) -> Result<Client, CollectionError> {
        Ok(Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?)
    }

    /// `terms` are sent comma-joined as the `q` parameter.
    #[must_use]
    pub fn new(
        client: Client,
        source: Source,
        endpoint: impl Into<String>,
        terms: &[String],
        page_size: u32,
        token: Option<String>,
    ) -> Self {
        Self {
            client,
            source,
            endpoint: endpoint.into(),
            query: terms.join(","),
            page_size: page_size.max(1),
            token,
        }
    }

    /// One collector per enabled source in `tracking`, sharing `client`.
    ///
    /// Bearer tokens are resolved through `lookup` so tests need not touch
    /// the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] if a source names a `token_env`
    /// that `lookup` cannot resolve.
    pub fn from_tracking<F>(
        tracking: &TrackingConfig,
        client: &Client,
        page_size: u32,
        lookup: F,
    ) -> Result<Vec<Arc<dyn Collector>>, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let terms = tracking.terms();
        tracking
            .enabled_sources()
            .map(|endpoint| -> Result<Arc<dyn Collector>, ConfigError> {
                let token = endpoint
                    .token_env
                    .as_deref()
                    .map(|var| lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_owned())))
                    .transpose()?;
                Ok(Arc::new(Self::new(
                    client.clone(),
                    endpoint.source,
                    endpoint.endpoint.clone(),
                    &terms,
                    page_size,
                    token,
                )))
            })
            .collect()
    }
}

#[async_trait]
impl Collector for HttpFeedCollector {
    fn source(&self) -> Source {
        self.source
    }

    async fn collect(&self, since: Option<&Cursor>) -> Result<CollectBatch, CollectionError> {
        let mut params = vec![
            ("q", self.query.clone()),
            ("limit", self.page_size.to_string()),
        ];
        if let Some(cursor) = since {
            params.push(("since", cursor.0.clone()));
        }

        let mut request = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(CollectionError::Auth(format!(
                "{} returned {status}",
                self.endpoint
            )));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok());
            return Err(CollectionError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            return Err(CollectionError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.endpoint.clone(),
            });
        }

        let body = response.text().await?;
        let parsed = serde_json::from_str::<FeedResponse>(&body).map_err(|e| {
            CollectionError::MalformedResponse {
                url: self.endpoint.clone(),
                reason: e.to_string(),
            }
        })?;

        tracing::debug!(
            source = %self.source,
            mentions = parsed.mentions.len(),
            has_next = parsed.next_cursor.is_some(),
            "feed page received"
        );

        Ok(CollectBatch {
            mentions: parsed.mentions,
            next_cursor: parsed.next_cursor.map(Cursor),
        })
    }
}
