// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Relaypost workspace.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Telegram user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A destination feed (channel) that receives distributed content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DestinationId(pub i64);

impl std::fmt::Display for DestinationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Media classification of a content item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
pub enum MediaKind {
    Video,
    Photo,
}

/// Subscription plan.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
pub enum PlanKind {
    Monthly,
}

/// Subscription lifecycle state.
///
/// Rejection is destructive (the record is deleted), so no `rejected` state
/// is ever stored. The only forward transitions are pending -> active and
/// active -> expired.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Expired,
}

/// An indexed content item in the distribution pool.
///
/// Immutable after insert; removed only by bulk clear. `natural_key` is the
/// transport file reference and deduplicates re-indexing; `sequence_marker`
/// is the source message id and orders delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: i64,
    pub natural_key: String,
    pub display_name: String,
    pub media_kind: MediaKind,
    pub sequence_marker: i64,
}

impl ContentItem {
    /// The transport-facing handle for dispatching this item.
    pub fn media_ref(&self) -> MediaRef {
        MediaRef {
            kind: self.media_kind,
            file_ref: self.natural_key.clone(),
            source_message_id: self.sequence_marker,
        }
    }
}

/// A candidate for indexing, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexCandidate {
    pub natural_key: String,
    pub display_name: String,
    pub media_kind: MediaKind,
    pub sequence_marker: i64,
}

/// Opaque media handle passed to the transport for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub file_ref: String,
    pub source_message_id: i64,
}

/// A destination feed subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub owner_user_id: UserId,
    pub destination_id: DestinationId,
    pub plan_kind: PlanKind,
    /// Payment method label as chosen during onboarding.
    pub payment_method: Option<String>,
    /// Opaque payment proof handed to a human approver. Never validated.
    pub payment_details: Option<String>,
    pub status: SubscriptionStatus,
    /// Unix seconds. Reset on activation.
    pub created_at: i64,
    /// Unix seconds. Non-null iff status is active or expired.
    pub expires_at: Option<i64>,
}

/// A record that an item was delivered to a destination.
///
/// Append-only; the (destination, item) pair is unique and enforces the
/// no-repeat invariant at query time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub destination_id: DestinationId,
    pub item_id: i64,
    pub delivered_at: i64,
}

/// Singleton run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Hours between distribution runs. Must be > 0.
    pub interval_hours: f64,
    /// Items dispatched per destination per run. Must be > 0.
    pub items_per_run: u32,
    /// Delete the source-channel message after a successful delivery.
    pub delete_after_deliver: bool,
    /// Index new source-channel media automatically.
    pub auto_index: bool,
    /// Unix seconds of the last completed run. Written only by the engine.
    pub last_run_at: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interval_hours: 24.0,
            items_per_run: 1,
            delete_after_deliver: false,
            auto_index: true,
            last_run_at: 0,
        }
    }
}

/// A partial settings update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    pub interval_hours: Option<f64>,
    pub items_per_run: Option<u32>,
    pub delete_after_deliver: Option<bool>,
    pub auto_index: Option<bool>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.interval_hours.is_none()
            && self.items_per_run.is_none()
            && self.delete_after_deliver.is_none()
            && self.auto_index.is_none()
    }
}

/// A named admin capability.
///
/// The set is closed; capability names that fail to parse are denied.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    ChangeInterval,
    ChangePosts,
    AddAdmin,
    ManagePayments,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::ChangeInterval,
        Capability::ChangePosts,
        Capability::AddAdmin,
        Capability::ManagePayments,
    ];
}

/// Boolean capability grants for one admin account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub change_interval: bool,
    pub change_posts: bool,
    pub add_admin: bool,
    pub manage_payments: bool,
}

impl Default for CapabilitySet {
    /// New admins can manage payments but nothing else until toggled.
    fn default() -> Self {
        Self {
            change_interval: false,
            change_posts: false,
            add_admin: false,
            manage_payments: true,
        }
    }
}

impl CapabilitySet {
    pub fn get(&self, cap: Capability) -> bool {
        match cap {
            Capability::ChangeInterval => self.change_interval,
            Capability::ChangePosts => self.change_posts,
            Capability::AddAdmin => self.add_admin,
            Capability::ManagePayments => self.manage_payments,
        }
    }

    pub fn set(&mut self, cap: Capability, value: bool) {
        match cap {
            Capability::ChangeInterval => self.change_interval = value,
            Capability::ChangePosts => self.change_posts = value,
            Capability::AddAdmin => self.add_admin = value,
            Capability::ManagePayments => self.manage_payments = value,
        }
    }
}

/// A stored admin account. The owner is configuration, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminAccount {
    pub user_id: UserId,
    pub added_at: i64,
    pub added_by: Option<UserId>,
    pub capabilities: CapabilitySet,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn capability_names_round_trip() {
        for cap in Capability::ALL {
            let name = cap.to_string();
            assert_eq!(Capability::from_str(&name).unwrap(), cap);
        }
        assert_eq!(Capability::ManagePayments.to_string(), "manage_payments");
    }

    #[test]
    fn unknown_capability_fails_to_parse() {
        assert!(Capability::from_str("launch_rockets").is_err());
    }

    #[test]
    fn default_capability_set_grants_payments_only() {
        let caps = CapabilitySet::default();
        assert!(caps.get(Capability::ManagePayments));
        assert!(!caps.get(Capability::ChangeInterval));
        assert!(!caps.get(Capability::ChangePosts));
        assert!(!caps.get(Capability::AddAdmin));
    }

    #[test]
    fn capability_set_toggles() {
        let mut caps = CapabilitySet::default();
        caps.set(Capability::ChangeInterval, true);
        assert!(caps.get(Capability::ChangeInterval));
        caps.set(Capability::ManagePayments, false);
        assert!(!caps.get(Capability::ManagePayments));
    }

    #[test]
    fn media_ref_carries_natural_key_and_marker() {
        let item = ContentItem {
            id: 7,
            natural_key: "BAACAgU123".into(),
            display_name: "episode-01.mp4".into(),
            media_kind: MediaKind::Video,
            sequence_marker: 42,
        };
        let media = item.media_ref();
        assert_eq!(media.file_ref, "BAACAgU123");
        assert_eq!(media.source_message_id, 42);
        assert_eq!(media.kind, MediaKind::Video);
    }

    #[test]
    fn settings_defaults_match_initial_install() {
        let settings = Settings::default();
        assert_eq!(settings.interval_hours, 24.0);
        assert_eq!(settings.items_per_run, 1);
        assert!(!settings.delete_after_deliver);
        assert!(settings.auto_index);
        assert_eq!(settings.last_run_at, 0);
    }

    #[test]
    fn empty_patch_detected() {
        assert!(SettingsPatch::default().is_empty());
        let patch = SettingsPatch {
            items_per_run: Some(3),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
