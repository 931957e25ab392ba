// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the confide chat engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level confide configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfideConfig {
    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Model selection for chat, summaries, and titles.
    #[serde(default)]
    pub model: ModelConfig,

    /// Context window and system policy settings.
    #[serde(default)]
    pub context: ContextConfig,

    /// Turn orchestration and background task settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL journal mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("confide").join("confide.db"))
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "confide.db".to_string())
}

fn default_true() -> bool {
    true
}

/// Model selection and generation limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Model used for the live chat stream.
    #[serde(default = "default_model")]
    pub chat_model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Model used by the history compactor.
    #[serde(default = "default_model")]
    pub summary_model: String,

    #[serde(default = "default_summary_max_tokens")]
    pub summary_max_tokens: u32,

    /// Model used for first-turn title generation.
    #[serde(default = "default_model")]
    pub title_model: String,

    #[serde(default = "default_title_max_tokens")]
    pub title_max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            chat_model: default_model(),
            max_tokens: default_max_tokens(),
            summary_model: default_model(),
            summary_max_tokens: default_summary_max_tokens(),
            title_model: default_model(),
            title_max_tokens: default_title_max_tokens(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_summary_max_tokens() -> u32 {
    1024
}

fn default_title_max_tokens() -> u32 {
    32
}

/// Context window and prompt policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContextConfig {
    /// Maximum turns held in a conversation's short-term window.
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Inline system policy. Overridden by `system_prompt_file` if both set.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Path to a file containing the system policy.
    /// Takes precedence over `system_prompt` if both are set.
    #[serde(default)]
    pub system_prompt_file: Option<String>,

    /// Title shown in listings until a generated title is stored.
    #[serde(default = "default_placeholder_title")]
    pub placeholder_title: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            system_prompt: None,
            system_prompt_file: None,
            placeholder_title: default_placeholder_title(),
        }
    }
}

fn default_window_size() -> usize {
    10
}

fn default_placeholder_title() -> String {
    "New conversation".to_string()
}

/// What happens to the upstream generation when every live reader has gone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectPolicy {
    /// Keep consuming the upstream so the full reply is persisted.
    #[default]
    RunToCompletion,
    /// Stop consuming and persist whatever arrived, flagged partial.
    CancelUpstream,
}

impl std::fmt::Display for DisconnectPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisconnectPolicy::RunToCompletion => write!(f, "run_to_completion"),
            DisconnectPolicy::CancelUpstream => write!(f, "cancel_upstream"),
        }
    }
}

/// Turn orchestration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub on_disconnect: DisconnectPolicy,

    /// Pending background jobs (compaction, titles) before submitters wait.
    #[serde(default = "default_task_queue_capacity")]
    pub task_queue_capacity: usize,

    /// Background workers. Jobs for one conversation always share a worker.
    #[serde(default = "default_task_workers")]
    pub task_workers: usize,

    /// Seconds to wait for background jobs to drain on shutdown.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            on_disconnect: DisconnectPolicy::default(),
            task_queue_capacity: default_task_queue_capacity(),
            task_workers: default_task_workers(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

fn default_task_queue_capacity() -> usize {
    256
}

fn default_task_workers() -> usize {
    4
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Bearer tokens accepted by the gateway and the owner each maps to.
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            tokens: Vec::new(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

/// One `[[gateway.tokens]]` entry.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TokenConfig {
    pub token: String,
    pub owner: String,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("token", &"[redacted]")
            .field("owner", &self.owner)
            .finish()
    }
}
