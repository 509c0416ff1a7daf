// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport boundary trait for the chat platform.

use async_trait::async_trait;

use crate::error::{DispatchError, RelaypostError};
use crate::types::{DestinationId, MediaRef, UserId};

/// The outbound side of the chat transport.
///
/// The distribution engine and the conversational flows talk to the platform
/// exclusively through this trait, which keeps the core testable with a mock
/// and isolates the teloxide surface in one crate.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Posts a media item with a caption into a destination feed.
    ///
    /// `AuthorizationDenied` means the bot lacks posting rights in the
    /// destination; any other failure is reported as `Failed`.
    async fn dispatch_media(
        &self,
        destination: DestinationId,
        media: &MediaRef,
        caption: &str,
    ) -> Result<(), DispatchError>;

    /// Sends a direct text message to a user.
    async fn notify_user(&self, user: UserId, text: &str) -> Result<(), RelaypostError>;

    /// Sends a text message into a destination feed (activation notices).
    async fn notify_destination(
        &self,
        destination: DestinationId,
        text: &str,
    ) -> Result<(), RelaypostError>;

    /// Deletes a message from the source channel after delivery.
    async fn delete_source_message(&self, source_message_id: i64)
        -> Result<(), RelaypostError>;
}
