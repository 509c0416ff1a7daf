// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversational flow states and input validation.
//!
//! Each user holds at most one [`FlowState`] in the session registry;
//! `/cancel` drops it unconditionally and starting a new flow displaces
//! the old one. Input that fails validation keeps the session open and
//! re-prompts.

use relaypost_core::{DestinationId, PlanKind};

/// The single-slot per-user conversation state.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowState {
    /// Payment onboarding: waiting for the destination feed id.
    AwaitDestination { plan: PlanKind },
    /// Payment onboarding: waiting for a payment-method button press.
    AwaitPaymentMethod {
        plan: PlanKind,
        destination: DestinationId,
    },
    /// Payment onboarding: waiting for the gift card code.
    AwaitCode {
        plan: PlanKind,
        destination: DestinationId,
        method: String,
    },
    /// Payment onboarding: waiting for the gift card PIN (terminal step).
    AwaitPin {
        plan: PlanKind,
        destination: DestinationId,
        method: String,
        code: String,
    },
    /// An approver pressed Reject and owes a reason (text or photo).
    AwaitRejectReason { subscription_id: i64 },
    /// Admin settings edit: waiting for a numeric value.
    AwaitSettingValue { field: SettingField },
}

/// Which settings field a settings-edit session is collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingField {
    IntervalHours,
    ItemsPerRun,
}

/// Parse a destination feed id in the `-100...` channel id format.
///
/// Format-only validation; whether the bot can actually post there
/// surfaces later through the engine's authorization-denied path.
pub fn parse_destination(input: &str) -> Option<DestinationId> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix("-100")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse::<i64>().ok().map(DestinationId)
}

/// Parse a distribution interval in hours. Must be a finite number > 0.
pub fn parse_interval_hours(input: &str) -> Option<f64> {
    let value = input.trim().parse::<f64>().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Parse an items-per-run count. Must be an integer > 0.
pub fn parse_items_per_run(input: &str) -> Option<u32> {
    let value = input.trim().parse::<u32>().ok()?;
    (value > 0).then_some(value)
}
