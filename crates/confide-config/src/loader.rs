// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./confide.toml` > `~/.config/confide/confide.toml` > `/etc/confide/confide.toml`
//! with environment variable overrides via `CONFIDE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ConfideConfig;

/// System-wide config file location.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/confide/confide.toml";

/// Local config file name, resolved against the working directory.
pub const LOCAL_CONFIG_FILE: &str = "confide.toml";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/confide/confide.toml` (system-wide)
/// 3. `~/.config/confide/confide.toml` (user XDG config)
/// 4. `./confide.toml` (local directory)
/// 5. `CONFIDE_*` environment variables
pub fn load_config() -> Result<ConfideConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string over the compiled defaults.
///
/// No files and no environment are consulted.
pub fn load_config_from_str(toml_content: &str) -> Result<ConfideConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ConfideConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ConfideConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ConfideConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ConfideConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// `~/.config/confide/confide.toml`, when a config dir exists.
pub fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("confide").join("confide.toml"))
}

/// Environment provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `CONFIDE_CONTEXT_WINDOW_SIZE` must map to
/// `context.window_size`, not `context.window.size`.
fn env_provider() -> Env {
    Env::prefixed("CONFIDE_").map(|key| {
        let key_str = key.as_str();
        let mapped = ["storage", "model", "context", "engine", "gateway"]
            .iter()
            .find_map(|section| {
                key_str
                    .strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or_else(|| key_str.to_string());
        mapped.into()
    })
}
