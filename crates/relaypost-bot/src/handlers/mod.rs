// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram update handlers: commands, callback buttons, free-form
//! messages driving the conversational flows, and media indexing.

pub mod callbacks;
pub mod commands;
pub mod flows;
pub mod indexing;
pub mod messages;

use teloxide::types::{ChatKind, Message};

/// Whether the message arrived in a private (DM) chat.
pub(crate) fn is_dm(msg: &Message) -> bool {
    matches!(msg.chat.kind, ChatKind::Private(_))
}
