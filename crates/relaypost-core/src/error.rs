// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Relaypost distribution bot.

use thiserror::Error;

/// The primary error type used across Relaypost crates.
#[derive(Debug, Error)]
pub enum RelaypostError {
    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Transport errors outside the dispatch path (notifications, deletes).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Failure classification for a single media dispatch.
///
/// The distribution engine treats the two variants differently: an
/// authorization denial notifies the subscription owner, any other failure
/// is only logged. Both abort the remaining attempts for that destination
/// and never propagate out of the run.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The transport refused to post in the destination (bot lacks rights).
    #[error("posting rights denied in destination")]
    AuthorizationDenied,

    /// Any other dispatch failure (network, rate limit, malformed media).
    #[error("dispatch failed: {message}")]
    Failed {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}
