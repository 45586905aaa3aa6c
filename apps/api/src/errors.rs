use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::diary::DiaryError;
use crate::store::StoreError;
use crate::weather::WeatherError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Weather provider unreachable: {0}")]
    WeatherUnavailable(String),

    #[error("Weather payload unreadable: {0}")]
    WeatherParse(String),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<DiaryError> for AppError {
    fn from(err: DiaryError) -> Self {
        match err {
            err if err.is_conflict() => AppError::Conflict(
                "A concurrent write touched the same date; retry the request".to_string(),
            ),
            DiaryError::NotFound(date) => AppError::NotFound(format!("No diary entry for {date}")),
            DiaryError::Weather(WeatherError::Transport(e)) => {
                AppError::WeatherUnavailable(e.to_string())
            }
            DiaryError::Weather(WeatherError::Parse(msg)) => AppError::WeatherParse(msg),
            DiaryError::Store(e) => AppError::Store(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::WeatherUnavailable(msg) => {
                tracing::warn!("Weather provider unreachable: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "WEATHER_UNAVAILABLE",
                    "The weather provider could not be reached".to_string(),
                )
            }
            AppError::WeatherParse(msg) => {
                tracing::warn!("Weather payload unreadable: {msg}");
                (StatusCode::BAD_GATEWAY, "WEATHER_PARSE_ERROR", msg.clone())
            }
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
