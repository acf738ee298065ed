use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::require_learner;
use crate::response::{success, AppError};
use crate::scheduler::{DetailOverrides, ItemId, WordListQuery, WordOrder};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_words).post(enroll_word))
        .route("/:word", delete(remove_word))
        .route("/:word/mastered", post(mark_mastered))
        .route("/:word/details", put(update_details))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnrollRequest {
    word: String,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    q: Option<String>,
    page: Option<u64>,
    limit: Option<u64>,
    order: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailsRequest {
    translation: Option<String>,
    transcription: Option<String>,
    synonyms: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnrollResponse {
    created: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RemoveResponse {
    removed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetailsResponse {
    word_id: ItemId,
}

async fn list_words(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let learner_id = require_learner(&headers)?;
    let query = WordListQuery {
        filter: query.q,
        order: query.order.as_deref().map(WordOrder::parse).unwrap_or_default(),
        page: query.page.unwrap_or(1),
        limit: query.limit.unwrap_or(0),
    };
    let page = state.scheduler().list_words(learner_id, query).await?;
    Ok(success(page))
}

async fn enroll_word(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<EnrollRequest>,
) -> Result<impl IntoResponse, AppError> {
    let learner_id = require_learner(&headers)?;
    let created = state.scheduler().enroll(learner_id, &payload.word).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, success(EnrollResponse { created })))
}

async fn remove_word(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(word): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let learner_id = require_learner(&headers)?;
    state.scheduler().remove(learner_id, &word).await?;
    Ok(success(RemoveResponse { removed: true }))
}

async fn mark_mastered(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(word): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let learner_id = require_learner(&headers)?;
    let updated = state.scheduler().mark_as_mastered(learner_id, &word).await?;
    Ok(success(updated))
}

async fn update_details(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(word): Path<String>,
    Json(payload): Json<DetailsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let learner_id = require_learner(&headers)?;
    let overrides = DetailOverrides {
        translation: payload.translation,
        transcription: payload.transcription,
        synonyms: payload.synonyms,
    };
    let word_id = state
        .scheduler()
        .edit_details(learner_id, &word, overrides)
        .await?;
    Ok(success(DetailsResponse { word_id }))
}
