// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `relaypost-core::types` for use across
//! crate boundaries. This module re-exports them for convenience within the
//! storage crate.

pub use relaypost_core::types::{
    AdminAccount, Capability, CapabilitySet, ContentItem, DeliveryRecord, DestinationId,
    IndexCandidate, MediaKind, PlanKind, Settings, SettingsPatch, Subscription,
    SubscriptionStatus, UserId,
};
