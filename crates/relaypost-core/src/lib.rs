// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Relaypost distribution bot.
//!
//! Provides the error types, domain model, transport boundary trait, and
//! the in-memory conversation session registry used throughout the
//! workspace.

pub mod error;
pub mod session;
pub mod transport;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{DispatchError, RelaypostError};
pub use session::SessionRegistry;
pub use transport::Transport;
pub use types::{
    AdminAccount, Capability, CapabilitySet, ContentItem, DeliveryRecord, DestinationId,
    IndexCandidate, MediaKind, MediaRef, PlanKind, Settings, SettingsPatch, Subscription,
    SubscriptionStatus, UserId,
};
