use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::response::{success, AppError};
use crate::state::AppState;

/// Catalog lookups; no learner identity needed.
pub fn router() -> Router<AppState> {
    Router::new().route("/search", get(search_words))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

async fn search_words(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, AppError> {
    let items = state.scheduler().search(&query.q).await?;
    Ok(success(items))
}
