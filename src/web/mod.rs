//! HTTP surface of the entity store.
//!
//! `routes.rs` mounts the generic entity endpoints (list, create, fetch,
//! patch) plus the bulk assignment endpoints; this module maps errors to
//! responses.

mod routes;

pub use routes::{AppState, HealthResponse, build_router, serve};

use crate::core::DeskError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{Level, event};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug)]
pub enum WebError {
    Desk(DeskError),
    Input(String),
    UnsupportedMediaType(String),
}

impl From<DeskError> for WebError {
    fn from(err: DeskError) -> Self {
        WebError::Desk(err)
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            WebError::Desk(err) => {
                let (status, code) = match &err {
                    DeskError::Validation(_) | DeskError::TypeMismatch(_) => {
                        (StatusCode::BAD_REQUEST, "validation_error")
                    }
                    DeskError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                    DeskError::CollectionExists(_) => (StatusCode::CONFLICT, "conflict"),
                    DeskError::UnsupportedMediaType(_) => {
                        (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_media_type")
                    }
                    DeskError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
                    DeskError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
                    _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
                };
                (status, err.user_message(), code)
            }
            WebError::Input(msg) => (StatusCode::BAD_REQUEST, msg, "input_error"),
            WebError::UnsupportedMediaType(msg) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                msg,
                "unsupported_media_type",
            ),
        };

        if status.is_server_error() {
            event!(Level::ERROR, status = status.as_u16(), error = %message, "request failed");
        }

        let body = Json(ErrorResponse {
            error: message,
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, WebError>;
