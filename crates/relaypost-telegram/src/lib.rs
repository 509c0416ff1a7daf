// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram transport adapter for Relaypost.
//!
//! Implements the core [`Transport`] trait via teloxide, translating
//! dispatch failures into the engine's authorization/transient split.

use async_trait::async_trait;
use relaypost_core::error::{DispatchError, RelaypostError};
use relaypost_core::transport::Transport;
use relaypost_core::types::{DestinationId, MediaKind, MediaRef, UserId};
use teloxide::prelude::*;
use teloxide::types::{ChatId, FileId, InputFile, MessageId, Recipient};
use teloxide::{ApiError, RequestError};
use tracing::debug;

/// Telegram implementation of the outbound [`Transport`].
///
/// Holds a cloned `Bot` handle (teloxide bots are cheaply cloneable) and
/// the id of the source channel that indexed media originates from, which
/// is the only chat it ever deletes messages in.
pub struct TelegramTransport {
    bot: Bot,
    source_channel_id: i64,
}

impl TelegramTransport {
    /// Creates a transport over an existing bot handle.
    pub fn new(bot: Bot, source_channel_id: i64) -> Self {
        Self {
            bot,
            source_channel_id,
        }
    }

    /// Creates a transport from a raw bot token.
    ///
    /// Requires a non-empty token.
    pub fn from_token(token: &str, source_channel_id: i64) -> Result<Self, RelaypostError> {
        if token.trim().is_empty() {
            return Err(RelaypostError::Config(
                "bot.token cannot be empty".into(),
            ));
        }
        Ok(Self::new(Bot::new(token), source_channel_id))
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn dispatch_media(
        &self,
        destination: DestinationId,
        media: &MediaRef,
        caption: &str,
    ) -> Result<(), DispatchError> {
        let recipient = Recipient::Id(ChatId(destination.0));
        let input = InputFile::file_id(FileId(media.file_ref.clone()));

        let result = match media.kind {
            MediaKind::Video => self
                .bot
                .send_video(recipient, input)
                .caption(caption.to_string())
                .await
                .map(|_| ()),
            MediaKind::Photo => self
                .bot
                .send_photo(recipient, input)
                .caption(caption.to_string())
                .await
                .map(|_| ()),
        };

        result.map_err(|e| {
            if is_authorization_denied(&e) {
                debug!(destination = destination.0, error = %e, "posting rights denied");
                DispatchError::AuthorizationDenied
            } else {
                DispatchError::Failed {
                    message: format!("failed to dispatch media to {destination}: {e}"),
                    source: Some(Box::new(e)),
                }
            }
        })
    }

    async fn notify_user(&self, user: UserId, text: &str) -> Result<(), RelaypostError> {
        self.bot
            .send_message(Recipient::Id(ChatId(user.0)), text)
            .await
            .map_err(|e| RelaypostError::Transport {
                message: format!("failed to notify user {user}: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(())
    }

    async fn notify_destination(
        &self,
        destination: DestinationId,
        text: &str,
    ) -> Result<(), RelaypostError> {
        self.bot
            .send_message(Recipient::Id(ChatId(destination.0)), text)
            .await
            .map_err(|e| RelaypostError::Transport {
                message: format!("failed to notify destination {destination}: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(())
    }

    async fn delete_source_message(
        &self,
        source_message_id: i64,
    ) -> Result<(), RelaypostError> {
        let message_id = to_message_id(source_message_id)?;
        self.bot
            .delete_message(ChatId(self.source_channel_id), message_id)
            .await
            .map_err(|e| RelaypostError::Transport {
                message: format!("failed to delete source message {source_message_id}: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(())
    }
}

/// Whether a Bot API error means the bot cannot post in the chat at all,
/// as opposed to a transient delivery failure.
fn is_authorization_denied(error: &RequestError) -> bool {
    matches!(
        error,
        RequestError::Api(
            ApiError::NotEnoughRightsToPostMessages
                | ApiError::BotKicked
                | ApiError::BotKickedFromSupergroup
                | ApiError::ChatNotFound
        )
    )
}

fn to_message_id(raw: i64) -> Result<MessageId, RelaypostError> {
    i32::try_from(raw).map(MessageId).map_err(|_| {
        RelaypostError::Internal(format!("message id {raw} out of range"))
    })
}
