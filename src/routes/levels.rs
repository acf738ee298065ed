use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use serde::Serialize;

use super::require_learner;
use crate::response::{success, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/:level/words", post(enroll_level))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LevelEnrollResponse {
    level: String,
    added: u64,
}

async fn enroll_level(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(level): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let learner_id = require_learner(&headers)?;
    let added = state.scheduler().enroll_level(learner_id, &level).await?;
    Ok(success(LevelEnrollResponse { level, added }))
}
