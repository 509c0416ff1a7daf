// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relaypost - subscription-driven content distribution bot.
//!
//! This is the binary entry point for the Relaypost service.

use clap::{Parser, Subcommand};

mod handlers;
mod health;
mod serve;
mod shutdown;
mod state;

/// Relaypost - subscription-driven content distribution bot.
#[derive(Parser, Debug)]
#[command(name = "relaypost", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Relaypost service.
    Serve,
    /// Print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match relaypost_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            relaypost_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("relaypost: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => {
            let mut sanitized = config;
            if sanitized.bot.token.is_some() {
                sanitized.bot.token = Some("<redacted>".to_string());
            }
            match toml::to_string_pretty(&sanitized) {
                Ok(rendered) => print!("{rendered}"),
                Err(e) => {
                    eprintln!("relaypost: failed to render config: {e}");
                    std::process::exit(1);
                }
            }
        }
        None => {
            println!("relaypost: use --help for available commands");
        }
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn binary_loads_config_defaults() {
        // Defaults must be valid without any config file present.
        let config = relaypost_config::load_and_validate()
            .expect("default config should be valid");
        assert_eq!(config.scheduler.poll_interval_secs, 300);
    }
}
