// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the confide chat engine.

use thiserror::Error;

/// The primary error type used across every confide crate.
///
/// Pre-stream failures (`Validation`, `NotFound`, `Forbidden`, `Unauthorized`)
/// are returned to the caller before any side effect. Once a response is
/// streaming, only `Provider` errors ever reach the caller; `Storage` and
/// `Compaction` failures on the completion path are logged and swallowed.
#[derive(Debug, Error)]
pub enum ConfideError {
    /// Caller input rejected (blank message, malformed request).
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced record does not exist.
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// The caller is not the owner of the referenced record.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The caller's credential could not be resolved to an owner.
    #[error("unauthorized")]
    Unauthorized,

    /// Completion provider failure (connect error, mid-stream failure).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Storage backend errors (connection, query failure, row mapping).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// History compaction failed; the stored summary is unchanged.
    #[error("compaction error: {message}")]
    Compaction {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors (invalid TOML, failed validation).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ConfideError {
    /// Shorthand for a missing conversation.
    pub fn conversation_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: "conversation".to_string(),
            id: id.into(),
        }
    }

    /// Shorthand for a provider error without an underlying source.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true for errors that must be rejected before streaming starts.
    pub fn is_pre_stream(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::NotFound { .. } | Self::Forbidden(_) | Self::Unauthorized
        )
    }
}
