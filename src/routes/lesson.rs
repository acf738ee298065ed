use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use super::require_learner;
use crate::response::{success, AppError};
use crate::scheduler::Answer;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_lesson))
        .route("/answers", post(submit_answer))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnswerRequest {
    word_id: String,
    is_correct: bool,
    #[serde(default = "default_first_try")]
    is_first_try: bool,
}

fn default_first_try() -> bool {
    true
}

async fn get_lesson(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let learner_id = require_learner(&headers)?;
    let batch = state.scheduler().compose(learner_id).await?;
    Ok(success(batch))
}

async fn submit_answer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let learner_id = require_learner(&headers)?;
    let answer = Answer {
        is_correct: payload.is_correct,
        is_first_try: payload.is_first_try,
    };
    let updated = state
        .scheduler()
        .score(learner_id, &payload.word_id, answer)
        .await?;
    Ok(success(updated))
}
