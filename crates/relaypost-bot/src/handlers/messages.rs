// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Free-form message handler.
//!
//! Routes source-channel media into auto indexing, drives whichever
//! conversational flow the sender has open, and indexes admin DM media.
//! A DM from a user with no open session and no indexable media falls
//! through silently.

use std::sync::Arc;

use relaypost_core::{DestinationId, PlanKind, SettingsPatch, UserId};
use relaypost_storage::queries::{admins, settings, subscriptions};
use teloxide::prelude::*;
use teloxide::types::{
    ChatId, FileId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, MessageOrigin,
};
use tracing::warn;

use crate::handlers::callbacks::payment_method_markup;
use crate::handlers::flows::{self, FlowState, SettingField};
use crate::handlers::indexing;
use crate::state::{unix_now, AppState};

const INTERNAL_ERROR: &str = "Something went wrong on our side. Please try again later.";

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    // Source-channel media feeds the auto indexer.
    if msg.chat.id.0 == state.config.channels.source_channel_id {
        if let Some(candidate) = indexing::candidate_from_message(&msg) {
            let auto_index = match settings::get_settings(&state.db).await {
                Ok(current) => current.auto_index,
                Err(e) => {
                    warn!(error = %e, "settings lookup failed, skipping indexing");
                    return Ok(());
                }
            };
            if let Err(e) = indexing::index_media(&state.db, auto_index, false, &candidate).await {
                warn!(error = %e, "source-channel indexing failed");
            }
        }
        return Ok(());
    }

    if !super::is_dm(&msg) {
        return Ok(());
    }
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let user_id = UserId(user.id.0 as i64);

    match state.sessions.get(user_id) {
        Some(flow) => drive_flow(&bot, &msg, &state, user_id, flow).await,
        None => index_admin_media(&bot, &msg, &state, user_id).await,
    }
}

/// Advance the sender's open conversational flow with this message.
async fn drive_flow(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    user_id: UserId,
    flow: FlowState,
) -> ResponseResult<()> {
    match flow {
        FlowState::AwaitDestination { plan } => {
            // A post forwarded out of the channel carries its id directly;
            // otherwise the id is expected as text.
            let parsed = match forwarded_channel(msg) {
                Some(destination) => Some(destination),
                None => match msg.text() {
                    Some(text) => flows::parse_destination(text),
                    None => {
                        bot.send_message(
                            msg.chat.id,
                            "Please send the channel id as text, or forward a post \
                             from the channel.",
                        )
                        .await?;
                        return Ok(());
                    }
                },
            };
            match parsed {
                Some(destination) => {
                    state
                        .sessions
                        .advance(user_id, FlowState::AwaitPaymentMethod { plan, destination });
                    bot.send_message(
                        msg.chat.id,
                        format!("✅ Channel saved: {destination}\n\nNow choose your payment method:"),
                    )
                    .reply_markup(payment_method_markup())
                    .await?;
                }
                None => {
                    // Validation failure keeps the session open.
                    bot.send_message(
                        msg.chat.id,
                        "❌ Invalid channel id format. It should look like -1001234567890. \
                         Please try again.",
                    )
                    .await?;
                }
            }
        }

        FlowState::AwaitPaymentMethod { .. } => {
            bot.send_message(
                msg.chat.id,
                "Please choose a payment method using the buttons above.",
            )
            .await?;
        }

        FlowState::AwaitCode {
            plan,
            destination,
            method,
        } => {
            let Some(text) = msg.text() else {
                bot.send_message(msg.chat.id, "Please send the gift card code as text.")
                    .await?;
                return Ok(());
            };
            state.sessions.advance(user_id, FlowState::AwaitPin {
                plan,
                destination,
                method,
                code: text.trim().to_string(),
            });
            bot.send_message(msg.chat.id, "🔢 Enter the gift card PIN:")
                .await?;
        }

        FlowState::AwaitPin {
            plan,
            destination,
            method,
            code,
        } => {
            let Some(text) = msg.text() else {
                bot.send_message(msg.chat.id, "Please send the PIN as text.")
                    .await?;
                return Ok(());
            };
            let pin = text.trim().to_string();
            // Removing the session is the claim; when two in-flight messages
            // raced to this step, only the winner submits.
            if state.sessions.take(user_id).is_none() {
                return Ok(());
            }

            let details = format!("code: {code}, pin: {pin}");
            let sub_id = match subscriptions::create_pending(
                &state.db,
                user_id,
                destination,
                plan,
                Some(method.clone()),
                Some(details),
                unix_now(),
            )
            .await
            {
                Ok(id) => id,
                Err(e) => {
                    warn!(error = %e, "creating pending subscription failed");
                    bot.send_message(msg.chat.id, INTERNAL_ERROR).await?;
                    return Ok(());
                }
            };

            bot.send_message(
                msg.chat.id,
                "✅ Payment details submitted!\n\n\
                 Your subscription is pending verification. \
                 You will be notified once approved.",
            )
            .await?;

            fan_out_approval_request(
                bot, state, sub_id, user_id, destination, plan, &method, &code, &pin,
            )
            .await;
        }

        FlowState::AwaitRejectReason { subscription_id } => {
            let reason = msg.text().or(msg.caption()).map(str::to_string);
            let photo = msg.photo().and_then(|sizes| sizes.last());
            if reason.is_none() && photo.is_none() {
                bot.send_message(
                    msg.chat.id,
                    "Please send the rejection reason as text or a captioned photo. \
                     /cancel to abort.",
                )
                .await?;
                return Ok(());
            }
            if state.sessions.take(user_id).is_none() {
                return Ok(());
            }

            let sub = match subscriptions::get(&state.db, subscription_id).await {
                Ok(Some(sub)) => sub,
                Ok(None) => {
                    bot.send_message(msg.chat.id, "That subscription was already processed.")
                        .await?;
                    return Ok(());
                }
                Err(e) => {
                    warn!(error = %e, subscription_id, "subscription lookup failed");
                    bot.send_message(msg.chat.id, INTERNAL_ERROR).await?;
                    return Ok(());
                }
            };

            if let Err(e) = subscriptions::reject(&state.db, subscription_id).await {
                warn!(error = %e, subscription_id, "rejection failed");
                bot.send_message(msg.chat.id, INTERNAL_ERROR).await?;
                return Ok(());
            }

            let reason_text = reason.unwrap_or_else(|| "(see photo)".to_string());
            let notice = format!(
                "❌ Subscription rejected\n\n\
                 Your payment details could not be verified.\n\
                 Reason: {reason_text}"
            );
            // The rejection already happened; a notification failure only
            // costs the user the explanation.
            if let Some(photo) = photo {
                let send = bot
                    .send_photo(
                        ChatId(sub.owner_user_id.0),
                        InputFile::file_id(FileId(photo.file.id.0.clone())),
                    )
                    .caption(notice)
                    .await;
                if let Err(e) = send {
                    warn!(error = %e, "owner rejection notice failed");
                }
            } else if let Err(e) = state.transport.notify_user(sub.owner_user_id, &notice).await {
                warn!(error = %e, "owner rejection notice failed");
            }

            bot.send_message(msg.chat.id, "✅ Rejected; the user has been notified.")
                .await?;
        }

        FlowState::AwaitSettingValue { field } => {
            let Some(text) = msg.text() else {
                bot.send_message(msg.chat.id, "Please send the value as a number.")
                    .await?;
                return Ok(());
            };

            let (patch, confirmation) = match field {
                SettingField::IntervalHours => match flows::parse_interval_hours(text) {
                    Some(hours) => (
                        SettingsPatch {
                            interval_hours: Some(hours),
                            ..SettingsPatch::default()
                        },
                        format!("✅ Interval updated to {hours} hours."),
                    ),
                    None => {
                        bot.send_message(
                            msg.chat.id,
                            "❌ Invalid number; send a value greater than 0, or /cancel.",
                        )
                        .await?;
                        return Ok(());
                    }
                },
                SettingField::ItemsPerRun => match flows::parse_items_per_run(text) {
                    Some(count) => (
                        SettingsPatch {
                            items_per_run: Some(count),
                            ..SettingsPatch::default()
                        },
                        format!("✅ Items per run updated to {count}."),
                    ),
                    None => {
                        bot.send_message(
                            msg.chat.id,
                            "❌ Invalid number; send an integer greater than 0, or /cancel.",
                        )
                        .await?;
                        return Ok(());
                    }
                },
            };

            if state.sessions.take(user_id).is_none() {
                return Ok(());
            }
            match settings::apply_patch(&state.db, &patch).await {
                Ok(()) => {
                    bot.send_message(msg.chat.id, confirmation).await?;
                }
                Err(e) => {
                    warn!(error = %e, "settings update failed");
                    bot.send_message(msg.chat.id, INTERNAL_ERROR).await?;
                }
            }
        }
    }

    Ok(())
}

/// Destination id carried by a message forwarded out of a channel.
fn forwarded_channel(msg: &Message) -> Option<DestinationId> {
    match msg.forward_origin() {
        Some(MessageOrigin::Channel { chat, .. }) => Some(DestinationId(chat.id.0)),
        _ => None,
    }
}

/// Manual indexing path: media DMed by an admin enters the pool
/// regardless of the auto-index gate.
async fn index_admin_media(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    user_id: UserId,
) -> ResponseResult<()> {
    let Some(candidate) = indexing::candidate_from_message(msg) else {
        return Ok(());
    };

    let allowed = match admins::is_admin(&state.db, state.owner(), user_id).await {
        Ok(allowed) => allowed,
        Err(e) => {
            warn!(error = %e, "admin lookup failed");
            return Ok(());
        }
    };
    if !allowed {
        return Ok(());
    }

    match indexing::index_media(&state.db, false, true, &candidate).await {
        Ok(true) => {
            bot.send_message(msg.chat.id, format!("✅ Indexed: {}", candidate.display_name))
                .await?;
        }
        Ok(false) => {
            bot.send_message(msg.chat.id, "Already in the content pool.")
                .await?;
        }
        Err(e) => {
            warn!(error = %e, "manual indexing failed");
            bot.send_message(msg.chat.id, INTERNAL_ERROR).await?;
        }
    }
    Ok(())
}

/// Send the approval request to every payment approver and the admin
/// log channel. Send failures are logged and skipped.
#[allow(clippy::too_many_arguments)]
async fn fan_out_approval_request(
    bot: &Bot,
    state: &AppState,
    sub_id: i64,
    requester: UserId,
    destination: relaypost_core::DestinationId,
    plan: PlanKind,
    method: &str,
    code: &str,
    pin: &str,
) {
    let text = format!(
        "🔔 New subscription request\n\n\
         👤 User: {requester}\n\
         📢 Feed: {destination}\n\
         📅 Plan: {plan}\n\
         💳 Method: {method}\n\
         🎟 Code: {code}\n\
         🔐 PIN: {pin}"
    );
    let markup = InlineKeyboardMarkup::new([[
        InlineKeyboardButton::callback("✅ Approve", format!("approve_{sub_id}")),
        InlineKeyboardButton::callback("❌ Reject", format!("reject_{sub_id}")),
    ]]);

    let approvers = match admins::list_with_capability(
        &state.db,
        state.owner(),
        relaypost_core::Capability::ManagePayments,
    )
    .await
    {
        Ok(approvers) => approvers,
        Err(e) => {
            warn!(error = %e, "listing approvers failed");
            vec![state.owner()]
        }
    };

    let mut recipients: Vec<ChatId> = approvers.into_iter().map(|u| ChatId(u.0)).collect();
    let admin_channel = state.config.channels.admin_channel_id;
    if admin_channel != 0 {
        recipients.push(ChatId(admin_channel));
    }

    for chat in recipients {
        if let Err(e) = bot
            .send_message(chat, text.clone())
            .reply_markup(markup.clone())
            .await
        {
            warn!(error = %e, chat_id = chat.0, "approval request delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaypost_core::SessionRegistry;

    #[test]
    fn terminal_submission_goes_to_exactly_one_message() {
        let sessions: SessionRegistry<FlowState> = SessionRegistry::new();
        let user = UserId(7);
        sessions.start(user, FlowState::AwaitPin {
            plan: PlanKind::Monthly,
            destination: DestinationId(-1001234567890),
            method: "Amazon Pay".into(),
            code: "GC-1".into(),
        });

        // Two concurrently handled messages both see the open session.
        assert!(sessions.get(user).is_some());
        assert!(sessions.get(user).is_some());

        // Removal is the claim: only one of them may submit.
        let first = sessions.take(user);
        let second = sessions.take(user);
        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[test]
    fn reject_reason_is_claimed_once() {
        let sessions: SessionRegistry<FlowState> = SessionRegistry::new();
        let user = UserId(9);
        sessions.start(user, FlowState::AwaitRejectReason { subscription_id: 3 });

        assert!(sessions.take(user).is_some());
        assert!(sessions.take(user).is_none());
    }

    fn forwarded_message(origin: serde_json::Value) -> Message {
        let json = serde_json::json!({
            "message_id": 5,
            "date": 1700000000i64,
            "chat": {"id": 111, "type": "private", "first_name": "U"},
            "from": {"id": 111, "is_bot": false, "first_name": "U"},
            "forward_origin": origin,
            "text": "fwd",
        });
        serde_json::from_value(json).expect("failed to deserialize mock forwarded message")
    }

    #[test]
    fn forwarded_channel_post_yields_destination_id() {
        let msg = forwarded_message(serde_json::json!({
            "type": "channel",
            "date": 1700000000i64,
            "chat": {"id": -1001234567890i64, "type": "channel", "title": "Dest"},
            "message_id": 7,
        }));
        assert_eq!(forwarded_channel(&msg), Some(DestinationId(-1001234567890)));
    }

    #[test]
    fn forward_from_a_user_is_not_a_destination() {
        let msg = forwarded_message(serde_json::json!({
            "type": "user",
            "date": 1700000000i64,
            "sender_user": {"id": 42, "is_bot": false, "first_name": "A"},
        }));
        assert_eq!(forwarded_channel(&msg), None);
    }
}
