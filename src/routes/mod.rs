mod dictionary;
mod health;
mod lesson;
mod levels;
mod progress;
mod words;

use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Router;
use uuid::Uuid;

use crate::response::AppError;
use crate::scheduler::LearnerId;
use crate::state::AppState;

/// Set by the authenticating gateway in front of this service.
pub const LEARNER_HEADER: &str = "x-learner-id";

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest("/api/lesson", lesson::router())
        .nest("/api/words", words::router())
        .nest("/api/levels", levels::router())
        .nest("/api/dictionary", dictionary::router())
        .nest("/api/progress", progress::router())
        .fallback(fallback_handler)
        .with_state(state)
}

pub(crate) fn require_learner(headers: &HeaderMap) -> Result<LearnerId, AppError> {
    let raw = headers
        .get(LEARNER_HEADER)
        .ok_or_else(|| AppError::unauthorized("missing learner identity"))?;

    raw.to_str()
        .ok()
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or_else(|| AppError::bad_request("learner id must be a UUID"))
}

async fn fallback_handler() -> Response {
    AppError::not_found("route not found").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};

    #[test]
    fn test_require_learner() {
        let mut headers = HeaderMap::new();
        let err = require_learner(&headers).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        headers.insert(LEARNER_HEADER, HeaderValue::from_static("not-a-uuid"));
        let err = require_learner(&headers).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let id = Uuid::new_v4();
        headers.insert(
            LEARNER_HEADER,
            HeaderValue::from_str(&id.to_string()).unwrap(),
        );
        assert_eq!(require_learner(&headers).unwrap(), id);
    }
}
