use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Extension, Json,
};

use crate::middleware::RequestId;

use super::{ApiError, AppState};

/// The cached snapshot exactly as published, or `503 no_data` before the
/// first successful load.
pub(super) async fn get_sentiment(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Response {
    match state.cache.load() {
        Some(snapshot) => Json(snapshot.as_ref()).into_response(),
        None => ApiError::no_data(req_id.0).into_response(),
    }
}
