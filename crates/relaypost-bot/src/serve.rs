// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `relaypost serve` command implementation.
//!
//! Opens the database, builds the Telegram transport and the distribution
//! engine, spawns the periodic poll and sweep timers plus the liveness
//! endpoint, and runs the teloxide dispatcher until shutdown.

use std::sync::Arc;
use std::time::Duration;

use relaypost_config::RelaypostConfig;
use relaypost_core::{RelaypostError, SessionRegistry};
use relaypost_scheduler::Engine;
use relaypost_storage::Database;
use relaypost_telegram::TelegramTransport;
use teloxide::dptree;
use teloxide::prelude::*;
use tracing::{error, info, warn};

use crate::handlers::commands::Command;
use crate::handlers::{callbacks, commands, messages};
use crate::state::{unix_now, AppState};
use crate::{health, shutdown};

/// Runs the `relaypost serve` command.
pub async fn run_serve(config: RelaypostConfig) -> Result<(), RelaypostError> {
    init_tracing();
    info!("starting relaypost serve");

    let token = config
        .bot
        .token
        .clone()
        .ok_or_else(|| RelaypostError::Config("bot.token is required to serve".into()))?;

    let db = Arc::new(Database::open(&config.storage.database_path).await?);
    let transport = Arc::new(TelegramTransport::from_token(
        &token,
        config.channels.source_channel_id,
    )?);
    let bot = transport.bot().clone();

    let engine = Arc::new(Engine::with_dispatch_delay(
        db.clone(),
        transport.clone(),
        Duration::from_secs(config.scheduler.dispatch_delay_secs),
    ));

    let state = Arc::new(AppState {
        db,
        config: config.clone(),
        sessions: SessionRegistry::new(),
        transport,
    });

    let cancel = shutdown::install_signal_handler();

    // Distribution poll timer. The poll period only bounds reaction
    // latency; the stored interval gates each tick.
    {
        let engine = engine.clone();
        let cancel = cancel.clone();
        let period = Duration::from_secs(config.scheduler.poll_interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // Skip the first immediate tick.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = engine.tick(unix_now()).await {
                            warn!(error = %e, "distribution poll failed");
                        }
                    }
                    _ = cancel.cancelled() => {
                        info!("distribution poll task shutting down");
                        break;
                    }
                }
            }
        });
        info!(
            poll_interval_secs = config.scheduler.poll_interval_secs,
            "distribution poll timer started"
        );
    }

    // Subscription expiry sweep timer.
    {
        let engine = engine.clone();
        let cancel = cancel.clone();
        let period = Duration::from_secs(config.scheduler.sweep_interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = engine.sweep_expired(unix_now()).await {
                            warn!(error = %e, "expiry sweep failed");
                        }
                    }
                    _ = cancel.cancelled() => {
                        info!("expiry sweep task shutting down");
                        break;
                    }
                }
            }
        });
        info!(
            sweep_interval_secs = config.scheduler.sweep_interval_secs,
            "expiry sweep timer started"
        );
    }

    // Liveness endpoint.
    {
        let health_config = config.health.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = health::serve(&health_config, cancel).await {
                error!(error = %e, "liveness endpoint failed");
            }
        });
    }

    info!("starting Telegram long polling");
    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(commands::handle_command),
        )
        .branch(Update::filter_message().endpoint(messages::handle_message))
        .branch(Update::filter_callback_query().endpoint(callbacks::handle_callback));

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|_| async {}) // Silently ignore other update kinds.
        .build();

    // Bridge the signal token into the dispatcher's own shutdown.
    let shutdown_token = dispatcher.shutdown_token();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            cancel.cancelled().await;
            if let Ok(wait) = shutdown_token.shutdown() {
                wait.await;
            }
        });
    }

    dispatcher.dispatch().await;

    info!("relaypost serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("relaypost=info,warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
