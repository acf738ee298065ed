use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::Serialize;

use super::require_learner;
use crate::response::{success, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_summary).delete(reset_progress))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetResponse {
    removed: u64,
}

async fn get_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let learner_id = require_learner(&headers)?;
    let summary = state.scheduler().summary(learner_id).await?;
    Ok(success(summary))
}

async fn reset_progress(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let learner_id = require_learner(&headers)?;
    let removed = state.scheduler().reset(learner_id).await?;
    Ok(success(ResetResponse { removed }))
}
