// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per entity.

pub mod admins;
pub mod content;
pub mod deliveries;
pub mod settings;
pub mod subscriptions;
