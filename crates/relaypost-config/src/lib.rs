// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for Relaypost.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, and environment
//! variable overrides.

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::RelaypostConfig;
pub use validation::{render_errors, ConfigError};

/// Load configuration from the XDG hierarchy and validate it.
pub fn load_and_validate() -> Result<RelaypostConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(vec![ConfigError::Parse(err.to_string())]),
    }
}

/// Load configuration from a TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<RelaypostConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(vec![ConfigError::Parse(err.to_string())]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_toml_loads_and_validates() {
        let config = load_and_validate_str(
            r#"
[bot]
token = "123456:ABC-DEF"
owner_id = 42

[channels]
admin_channel_id = -1009999
source_channel_id = -1008888

[storage]
database_path = "/var/lib/relaypost/relaypost.db"
"#,
        )
        .unwrap();
        assert_eq!(config.bot.owner_id, 42);
        assert_eq!(config.channels.admin_channel_id, -1009999);
    }

    #[test]
    fn unknown_section_is_a_parse_error() {
        let result = load_and_validate_str("[nonsense]\nkey = 1\n");
        assert!(matches!(
            result.unwrap_err().as_slice(),
            [ConfigError::Parse(_), ..]
        ));
    }

    #[test]
    fn invalid_values_are_validation_errors() {
        let result = load_and_validate_str(
            r#"
[scheduler]
poll_interval_secs = 0
"#,
        );
        assert!(matches!(
            result.unwrap_err().as_slice(),
            [ConfigError::Validation { .. }, ..]
        ));
    }
}
