// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interval-gated content distribution for Relaypost.
//!
//! The [`Engine`] is driven by an external periodic timer and decides on
//! each poll, from stored state alone, whether a distribution pass is due.
//! It also owns the subscription expiry sweep.

pub mod engine;
pub mod gate;

pub use engine::{Engine, RunReport, TickOutcome};
