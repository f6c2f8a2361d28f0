mod mentions;
mod sentiment;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use pulse_collector::{SourceStatus, SourceStatusBoard};
use pulse_snapshot::{PublisherHealth, PublisherHealthView, SnapshotCache, WatcherState, WatcherStatus};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{request_id, RequestId, REQUEST_ID_HEADER};

/// Handles the query API reads from. Nothing here blocks on the pipeline.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<SnapshotCache>,
    pub watcher: Arc<WatcherStatus>,
    pub publisher: Arc<PublisherHealth>,
    pub sources: SourceStatusBoard,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct HealthData {
    status: &'static str,
    watcher: WatcherState,
    has_loaded: bool,
    seconds_since_last_success: Option<i64>,
    last_error: Option<String>,
    generated_at: Option<DateTime<Utc>>,
    publisher: PublisherHealthView,
    sources: Vec<SourceStatus>,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    pub(super) fn no_data(request_id: impl Into<String>) -> Self {
        Self::new(request_id, "no_data", "no snapshot has been loaded yet")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "no_data" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(REQUEST_ID_HEADER)])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/sentiment", get(sentiment::get_sentiment))
        .route(
            "/api/v1/mentions/latest",
            get(mentions::list_latest_mentions),
        )
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let watcher = state.watcher.health();
    let generated_at = state.cache.load().map(|snapshot| snapshot.generated_at);

    let (status_code, status) = match (watcher.has_loaded, watcher.state) {
        (false, _) => (StatusCode::SERVICE_UNAVAILABLE, "no_data"),
        (true, WatcherState::Watching) => (StatusCode::OK, "ok"),
        (true, _) => (StatusCode::OK, "degraded"),
    };

    (
        status_code,
        Json(ApiResponse {
            data: HealthData {
                status,
                watcher: watcher.state,
                has_loaded: watcher.has_loaded,
                seconds_since_last_success: watcher.seconds_since_last_success(Utc::now()),
                last_error: watcher.last_error,
                generated_at,
                publisher: state.publisher.view(),
                sources: state.sources.snapshot(),
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    )
}
