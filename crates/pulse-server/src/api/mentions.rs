use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use pulse_core::{Mention, SentimentCategory, Source};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

const TEXT_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Deserialize)]
pub(super) struct LatestMentionsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, PartialEq)]
pub(super) struct LatestMentionItem {
    pub id: String,
    pub source: Source,
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub sentiment: SentimentCategory,
    pub score: f32,
}

impl From<&Mention> for LatestMentionItem {
    fn from(mention: &Mention) -> Self {
        Self {
            id: mention.id.clone(),
            source: mention.source,
            timestamp: mention.timestamp,
            text: preview(&mention.text),
            sentiment: mention.sentiment.category,
            score: mention.sentiment.score,
        }
    }
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(TEXT_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_owned(),
    }
}

/// Newest mentions first across all sources.
pub(super) async fn list_latest_mentions(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<LatestMentionsQuery>,
) -> Result<Json<ApiResponse<Vec<LatestMentionItem>>>, ApiError> {
    let snapshot = state
        .cache
        .load()
        .ok_or_else(|| ApiError::no_data(req_id.0.clone()))?;

    let limit = usize::try_from(normalize_limit(query.limit)).unwrap_or(1);
    let mut mentions: Vec<&Mention> = snapshot.mentions.iter().collect();
    mentions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let data = mentions
        .into_iter()
        .take(limit)
        .map(LatestMentionItem::from)
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_keeps_short_text() {
        assert_eq!(preview("Tesla rocks"), "Tesla rocks");
        assert_eq!(preview(&"a".repeat(100)), "a".repeat(100));
    }

    #[test]
    fn preview_cuts_on_char_boundary() {
        let text = "é".repeat(150);
        let cut = preview(&text);
        assert_eq!(cut.chars().count(), 103);
        assert!(cut.ends_with("..."));
    }
}
