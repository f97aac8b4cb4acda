//! API route modules and the shared error bridge.

pub mod calendars;
pub mod config;
pub mod events;
pub mod images;
pub mod news;
pub mod schedule;
pub mod transport;
pub mod waste;
pub mod weather;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::state::AppState;

/// Assemble the full API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(events::router())
        .merge(calendars::router())
        .merge(config::router())
        .merge(weather::router())
        .merge(transport::router())
        .merge(waste::router())
        .merge(schedule::router())
        .merge(news::router())
        .merge(images::router())
        .with_state(state)
}

/// Standard API error response body.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error bridge for handlers: any anyhow-compatible error becomes a JSON
/// error response, 500 unless a handler picked a status explicitly.
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError {
            status: StatusCode::BAD_REQUEST,
            error: anyhow::anyhow!(message.into()),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError {
            status: StatusCode::NOT_FOUND,
            error: anyhow::anyhow!(message.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.error.to_string(),
        });
        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: err.into(),
        }
    }
}
