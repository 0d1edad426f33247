use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use trailnav_core::NavError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("request deadline exceeded: {0}")]
    DeadlineExceeded(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorPayload<'a>,
}

#[derive(Serialize)]
struct ErrorPayload<'a> {
    code: &'a str,
    message: String,
}

impl From<NavError> for AppError {
    fn from(e: NavError) -> Self {
        match e {
            NavError::InvalidInput(msg) => AppError::BadRequest(msg),
            NavError::NotFound(_) | NavError::NoPath { .. } => AppError::NotFound(e.to_string()),
            NavError::GraphUnavailable => AppError::Unavailable(e.to_string()),
            NavError::Cancelled => AppError::DeadlineExceeded(e.to_string()),
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "graph_unavailable"),
            AppError::DeadlineExceeded(_) => (StatusCode::GATEWAY_TIMEOUT, "deadline_exceeded"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Internal(e) => {
                error!(error = %e, "internal error");
                e.to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorBody { error: ErrorPayload { code, message } })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nav_errors_map_to_statuses() {
        let cases = [
            (NavError::invalid("lat"), StatusCode::BAD_REQUEST),
            (NavError::not_found("feature 3"), StatusCode::NOT_FOUND),
            (NavError::NoPath { from: 1, to: 2 }, StatusCode::NOT_FOUND),
            (NavError::GraphUnavailable, StatusCode::SERVICE_UNAVAILABLE),
            (NavError::Cancelled, StatusCode::GATEWAY_TIMEOUT),
            (NavError::integrity("edge 4"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn deadline_is_504() {
        let res = AppError::DeadlineExceeded("routing took longer than 5000 ms".into()).into_response();
        assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
