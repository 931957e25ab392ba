// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP mapping for engine errors.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use confide_core::ConfideError;
use serde::Serialize;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A [`ConfideError`] returned from a handler.
#[derive(Debug)]
pub struct ApiError(pub ConfideError);

impl From<ConfideError> for ApiError {
    fn from(err: ConfideError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            ConfideError::Validation(_) => StatusCode::BAD_REQUEST,
            ConfideError::Unauthorized => StatusCode::UNAUTHORIZED,
            ConfideError::Forbidden(_) => StatusCode::FORBIDDEN,
            ConfideError::NotFound { .. } => StatusCode::NOT_FOUND,
            ConfideError::Provider { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        // Internal details stay in the log.
        let error = match self.0 {
            ConfideError::Storage { .. } | ConfideError::Internal(_) => {
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}
