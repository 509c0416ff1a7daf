// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Relaypost.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Relaypost configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values; `bot.token` and `bot.owner_id` are required to actually serve.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelaypostConfig {
    /// Bot identity settings.
    #[serde(default)]
    pub bot: BotConfig,

    /// Source and admin channel wiring.
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Liveness endpoint settings.
    #[serde(default)]
    pub health: HealthConfig,

    /// Timer periods for the background jobs.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Bot identity configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Telegram Bot API token. `None` prevents serving.
    #[serde(default)]
    pub token: Option<String>,

    /// The owner's user id. Implicitly holds every capability.
    #[serde(default)]
    pub owner_id: i64,
}

/// Channel wiring configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelsConfig {
    /// Channel where approval requests are logged.
    #[serde(default)]
    pub admin_channel_id: i64,

    /// Channel the bot indexes media from.
    #[serde(default)]
    pub source_channel_id: i64,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "relaypost.db".to_string()
}

/// Liveness endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HealthConfig {
    /// Bind address for the liveness endpoint.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port for the liveness endpoint.
    #[serde(default = "default_health_port")]
    pub port: u16,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_health_port(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_health_port() -> u16 {
    8000
}

/// Background job timer configuration.
///
/// The poll period only bounds reaction latency; the distribution interval
/// itself lives in stored settings and gates each poll.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Seconds between distribution engine polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Seconds between expiry sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Courtesy delay between consecutive dispatches to one destination.
    #[serde(default = "default_dispatch_delay_secs")]
    pub dispatch_delay_secs: u64,

    /// Days an approved subscription stays active.
    #[serde(default = "default_plan_duration_days")]
    pub plan_duration_days: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            dispatch_delay_secs: default_dispatch_delay_secs(),
            plan_duration_days: default_plan_duration_days(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    300
}

fn default_sweep_interval_secs() -> u64 {
    3_600
}

fn default_dispatch_delay_secs() -> u64 {
    2
}

fn default_plan_duration_days() -> i64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = RelaypostConfig::default();
        assert!(config.bot.token.is_none());
        assert_eq!(config.storage.database_path, "relaypost.db");
        assert_eq!(config.health.port, 8000);
        assert_eq!(config.scheduler.poll_interval_secs, 300);
        assert_eq!(config.scheduler.plan_duration_days, 30);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let toml_str = r#"
[bot]
token = "123:abc"
unknown_key = true
"#;
        assert!(toml::from_str::<RelaypostConfig>(toml_str).is_err());
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let toml_str = r#"
[bot]
token = "123:abc"
owner_id = 42

[channels]
source_channel_id = -1001234
"#;
        let config: RelaypostConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.bot.owner_id, 42);
        assert_eq!(config.channels.source_channel_id, -1001234);
        assert_eq!(config.channels.admin_channel_id, 0);
        assert_eq!(config.scheduler.sweep_interval_secs, 3_600);
    }
}
