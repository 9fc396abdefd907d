//! # API Errors
//!
//! Maps library errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::{Error, ImportError};

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub error: String,
    pub message: String,
}

/// Error response body carrying several validation messages
#[derive(Debug, Serialize)]
pub struct ErrorArrayResponse {
    pub status: u16,
    pub error: String,
    pub message: Vec<String>,
}

/// Wrapper that turns a library [`Error`] into a response
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError(Error::InvalidArgument(message.into()))
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,

            Error::InvalidArgument(_)
            | Error::Validation(_)
            | Error::NotEnoughQuantity { .. } => StatusCode::BAD_REQUEST,

            Error::Import(ImportError::TimedOut { .. }) => StatusCode::REQUEST_TIMEOUT,
            Error::Import(ImportError::Storage { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Import(_) => StatusCode::BAD_REQUEST,

            Error::Storage(_) | Error::Io(_) | Error::Migration(_) | Error::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

fn reason(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("Unknown").to_string()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        } else {
            tracing::debug!("Request rejected ({}): {}", status.as_u16(), self.0);
        }

        match self.0 {
            Error::Validation(messages) => {
                let mut unique: Vec<String> = Vec::with_capacity(messages.len());
                for message in messages {
                    if !unique.contains(&message) {
                        unique.push(message);
                    }
                }
                let body = ErrorArrayResponse {
                    status: status.as_u16(),
                    error: reason(status),
                    message: unique,
                };
                (status, Json(body)).into_response()
            }
            other => {
                let message = if status.is_server_error() {
                    format!("Unexpected error: {}", other)
                } else {
                    other.to_string()
                };
                let body = ErrorResponse {
                    status: status.as_u16(),
                    error: reason(status),
                    message,
                };
                (status, Json(body)).into_response()
            }
        }
    }
}
