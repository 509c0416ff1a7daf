// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./relaypost.toml` > `~/.config/relaypost/relaypost.toml`
//! > `/etc/relaypost/relaypost.toml` with environment variable overrides via
//! the `RELAYPOST_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::RelaypostConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/relaypost/relaypost.toml` (system-wide)
/// 3. `~/.config/relaypost/relaypost.toml` (user XDG config)
/// 4. `./relaypost.toml` (local directory)
/// 5. `RELAYPOST_*` environment variables
pub fn load_config() -> Result<RelaypostConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RelaypostConfig::default()))
        .merge(Toml::file("/etc/relaypost/relaypost.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("relaypost/relaypost.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("relaypost.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<RelaypostConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RelaypostConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RelaypostConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RelaypostConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `RELAYPOST_BOT_OWNER_ID` must map to
/// `bot.owner_id`, not `bot.owner.id`.
fn env_provider() -> Env {
    Env::prefixed("RELAYPOST_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("bot_", "bot.", 1)
            .replacen("channels_", "channels.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("health_", "health.", 1)
            .replacen("scheduler_", "scheduler.", 1);
        mapped.into()
    })
}
