// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes. Collects all errors instead of failing fast.

use thiserror::Error;

use crate::model::RelaypostConfig;

/// A configuration error surfaced at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML parsing or merging failed.
    #[error("config parse error: {0}")]
    Parse(String),

    /// A semantic constraint was violated.
    #[error("config validation error: {message}")]
    Validation { message: String },
}

/// Render collected configuration errors to stderr.
pub fn render_errors(errors: &[ConfigError]) {
    for error in errors {
        eprintln!("relaypost: {error}");
    }
}

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &RelaypostConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.health.bind_address.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "health.bind_address must not be empty".to_string(),
        });
    } else {
        let addr = config.health.bind_address.trim();
        let is_valid_ip = addr.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = addr
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!(
                    "health.bind_address `{addr}` is not a valid IP address or hostname"
                ),
            });
        }
    }

    if config.scheduler.poll_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "scheduler.poll_interval_secs must be greater than 0".to_string(),
        });
    }

    if config.scheduler.sweep_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "scheduler.sweep_interval_secs must be greater than 0".to_string(),
        });
    }

    if config.scheduler.plan_duration_days <= 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "scheduler.plan_duration_days must be positive, got {}",
                config.scheduler.plan_duration_days
            ),
        });
    }

    if let Some(token) = &config.bot.token
        && token.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "bot.token must not be empty when set".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
