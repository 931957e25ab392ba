// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::ConfideConfig;

/// Smallest window that can hold one user turn and one reply.
pub const MIN_WINDOW_SIZE: usize = 2;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure rather than stopping at the first.
pub fn validate_config(config: &ConfideConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.context.window_size < MIN_WINDOW_SIZE {
        fail(format!(
            "context.window_size must be at least {MIN_WINDOW_SIZE}, got {}",
            config.context.window_size
        ));
    }

    for (key, value) in [
        ("model.chat_model", &config.model.chat_model),
        ("model.summary_model", &config.model.summary_model),
        ("model.title_model", &config.model.title_model),
    ] {
        if value.trim().is_empty() {
            fail(format!("{key} must not be empty"));
        }
    }

    if config.model.max_tokens == 0 {
        fail("model.max_tokens must be greater than 0".to_string());
    }

    if config.engine.task_queue_capacity == 0 {
        fail("engine.task_queue_capacity must be at least 1".to_string());
    }

    if config.engine.task_workers == 0 {
        fail("engine.task_workers must be at least 1".to_string());
    }

    if config.gateway.host.trim().is_empty() {
        fail("gateway.host must not be empty".to_string());
    }

    let mut seen_tokens = HashSet::new();
    for (i, entry) in config.gateway.tokens.iter().enumerate() {
        if entry.token.trim().is_empty() {
            fail(format!("gateway.tokens[{i}].token must not be empty"));
        }
        if entry.owner.trim().is_empty() {
            fail(format!("gateway.tokens[{i}].owner must not be empty"));
        }
        if !seen_tokens.insert(entry.token.as_str()) {
            fail(format!("duplicate token in gateway.tokens[{i}]"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
