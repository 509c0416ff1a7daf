// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared state injected into every dispatcher handler.

use std::sync::Arc;

use relaypost_config::RelaypostConfig;
use relaypost_core::{SessionRegistry, Transport, UserId};
use relaypost_storage::Database;

use crate::handlers::flows::FlowState;

/// Everything the command, callback, and message handlers need.
pub struct AppState {
    pub db: Arc<Database>,
    pub config: RelaypostConfig,
    pub sessions: SessionRegistry<FlowState>,
    pub transport: Arc<dyn Transport>,
}

impl AppState {
    /// The configured owner, implicitly holding every capability.
    pub fn owner(&self) -> UserId {
        UserId(self.config.bot.owner_id)
    }
}

/// Current unix timestamp in seconds.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
