// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Liveness endpoint.
//!
//! A minimal axum server answering `GET /` with `"OK"` so external
//! supervisors can probe the process.

use axum::routing::get;
use axum::Router;
use relaypost_config::model::HealthConfig;
use relaypost_core::RelaypostError;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// The liveness router.
pub fn router() -> Router {
    Router::new().route("/", get(|| async { "OK" }))
}

/// Binds the liveness endpoint and serves until cancellation.
pub async fn serve(config: &HealthConfig, cancel: CancellationToken) -> Result<(), RelaypostError> {
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RelaypostError::Internal(format!("failed to bind {addr}: {e}")))?;

    info!(%addr, "liveness endpoint listening");

    axum::serve(listener, router())
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| RelaypostError::Internal(format!("liveness endpoint failed: {e}")))
}
