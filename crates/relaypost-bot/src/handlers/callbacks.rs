// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inline keyboard callback handlers.
//!
//! Drives the plan chooser and payment-method steps of the onboarding
//! flow, and the Approve/Reject buttons on approval requests.

use std::sync::Arc;

use relaypost_core::{Capability, PlanKind, SubscriptionStatus, UserId};
use relaypost_storage::queries::{admins, subscriptions};
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup};
use tracing::warn;

use crate::handlers::flows::FlowState;
use crate::state::{unix_now, AppState};

const DESTINATION_PROMPT: &str = "1️⃣ Setup step 1:\n\
    Add this bot to your target channel as an admin, then send me the \
    channel id (it starts with -100...).";

const SESSION_EXPIRED: &str = "Session expired. Please start over with /start.";

/// A parsed callback button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    BuySub,
    PlanMonthly,
    PayMethod(&'static str),
    Approve(i64),
    Reject(i64),
}

/// Parse the raw callback data string.
pub fn parse_callback(data: &str) -> Option<CallbackAction> {
    match data {
        "buy_sub" => Some(CallbackAction::BuySub),
        "plan_monthly" => Some(CallbackAction::PlanMonthly),
        "pay_amazon" => Some(CallbackAction::PayMethod("Amazon Pay")),
        "pay_flipkart" => Some(CallbackAction::PayMethod("Flipkart")),
        _ => {
            if let Some(id) = data.strip_prefix("approve_") {
                return id.parse().ok().map(CallbackAction::Approve);
            }
            if let Some(id) = data.strip_prefix("reject_") {
                return id.parse().ok().map(CallbackAction::Reject);
            }
            None
        }
    }
}

/// The plan chooser markup shown after "Buy Subscription".
fn plan_markup() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[InlineKeyboardButton::callback(
        "📅 Monthly Plan",
        "plan_monthly",
    )]])
}

/// The payment-method chooser markup.
pub(crate) fn payment_method_markup() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        [InlineKeyboardButton::callback(
            "Amazon Pay Gift Card",
            "pay_amazon",
        )],
        [InlineKeyboardButton::callback(
            "Flipkart Gift Card",
            "pay_flipkart",
        )],
    ])
}

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let Some(action) = q.data.as_deref().and_then(parse_callback) else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    let user_id = UserId(q.from.id.0 as i64);

    match action {
        CallbackAction::BuySub => {
            bot.answer_callback_query(q.id.clone()).await?;
            if let Some(msg) = q.message.as_ref().and_then(|m| m.regular_message()) {
                bot.edit_message_text(msg.chat.id, msg.id, "📅 Choose a subscription plan")
                    .reply_markup(plan_markup())
                    .await?;
            }
        }

        CallbackAction::PlanMonthly => {
            state.sessions.start(user_id, FlowState::AwaitDestination {
                plan: PlanKind::Monthly,
            });
            bot.answer_callback_query(q.id.clone()).await?;
            if let Some(msg) = q.message.as_ref().and_then(|m| m.regular_message()) {
                bot.edit_message_text(msg.chat.id, msg.id, DESTINATION_PROMPT)
                    .await?;
            }
        }

        CallbackAction::PayMethod(method) => {
            let advanced = match state.sessions.get(user_id) {
                Some(FlowState::AwaitPaymentMethod { plan, destination }) => {
                    state.sessions.advance(user_id, FlowState::AwaitCode {
                        plan,
                        destination,
                        method: method.to_string(),
                    })
                }
                _ => false,
            };

            if advanced {
                bot.answer_callback_query(q.id.clone()).await?;
                if let Some(msg) = q.message.as_ref().and_then(|m| m.regular_message()) {
                    bot.edit_message_text(
                        msg.chat.id,
                        msg.id,
                        format!("🛒 Selected: {method} Gift Card\n\nPlease enter the gift card code:"),
                    )
                    .await?;
                }
            } else {
                bot.answer_callback_query(q.id.clone())
                    .text(SESSION_EXPIRED)
                    .show_alert(true)
                    .await?;
            }
        }

        CallbackAction::Approve(sub_id) => {
            if !approver_allowed(&state, user_id).await {
                bot.answer_callback_query(q.id.clone())
                    .text("You are not allowed to manage payments.")
                    .show_alert(true)
                    .await?;
                return Ok(());
            }

            let sub = match subscriptions::get(&state.db, sub_id).await {
                Ok(Some(sub)) => sub,
                Ok(None) => {
                    bot.answer_callback_query(q.id.clone())
                        .text("Subscription not found or already processed.")
                        .show_alert(true)
                        .await?;
                    return Ok(());
                }
                Err(e) => {
                    warn!(error = %e, sub_id, "subscription lookup failed");
                    bot.answer_callback_query(q.id.clone())
                        .text("Internal error.")
                        .show_alert(true)
                        .await?;
                    return Ok(());
                }
            };

            if sub.status == SubscriptionStatus::Active {
                bot.answer_callback_query(q.id.clone())
                    .text("Already approved.")
                    .show_alert(true)
                    .await?;
                return Ok(());
            }

            let duration = state.config.scheduler.plan_duration_days;
            if let Err(e) = subscriptions::activate(&state.db, sub_id, duration, unix_now()).await {
                warn!(error = %e, sub_id, "activation failed");
                bot.answer_callback_query(q.id.clone())
                    .text("Internal error.")
                    .show_alert(true)
                    .await?;
                return Ok(());
            }

            bot.answer_callback_query(q.id.clone()).text("Approved.").await?;
            if let Some(msg) = q.message.as_ref().and_then(|m| m.regular_message()) {
                let text = format!("{}\n\n✅ APPROVED", msg.text().unwrap_or_default());
                bot.edit_message_text(msg.chat.id, msg.id, text).await?;
            }

            // Notification failures never undo the approval.
            if let Err(e) = state
                .transport
                .notify_user(
                    sub.owner_user_id,
                    "🎉 Subscription approved!\n\nYour feed is now active. \
                     Content delivery will start automatically.",
                )
                .await
            {
                warn!(error = %e, "owner approval notice failed");
            }
            if let Err(e) = state
                .transport
                .notify_destination(sub.destination_id, "✅ Relaypost is now active!")
                .await
            {
                warn!(error = %e, "destination activation notice failed");
            }
        }

        CallbackAction::Reject(sub_id) => {
            if !approver_allowed(&state, user_id).await {
                bot.answer_callback_query(q.id.clone())
                    .text("You are not allowed to manage payments.")
                    .show_alert(true)
                    .await?;
                return Ok(());
            }

            match subscriptions::get(&state.db, sub_id).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    bot.answer_callback_query(q.id.clone())
                        .text("Subscription not found or already processed.")
                        .show_alert(true)
                        .await?;
                    return Ok(());
                }
                Err(e) => {
                    warn!(error = %e, sub_id, "subscription lookup failed");
                    bot.answer_callback_query(q.id.clone())
                        .text("Internal error.")
                        .show_alert(true)
                        .await?;
                    return Ok(());
                }
            }

            state
                .sessions
                .start(user_id, FlowState::AwaitRejectReason {
                    subscription_id: sub_id,
                });
            bot.answer_callback_query(q.id.clone())
                .text("Send the rejection reason in a direct message to me.")
                .await?;
            bot.send_message(
                ChatId(user_id.0),
                "Send the rejection reason (text, or a photo with a caption). /cancel to abort.",
            )
            .await?;
        }
    }

    Ok(())
}

async fn approver_allowed(state: &AppState, user: UserId) -> bool {
    match admins::check_capability(&state.db, state.owner(), user, Capability::ManagePayments).await
    {
        Ok(allowed) => allowed,
        Err(e) => {
            warn!(error = %e, "capability check failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_actions_parse() {
        assert_eq!(parse_callback("buy_sub"), Some(CallbackAction::BuySub));
        assert_eq!(
            parse_callback("plan_monthly"),
            Some(CallbackAction::PlanMonthly)
        );
        assert_eq!(
            parse_callback("pay_amazon"),
            Some(CallbackAction::PayMethod("Amazon Pay"))
        );
        assert_eq!(
            parse_callback("pay_flipkart"),
            Some(CallbackAction::PayMethod("Flipkart"))
        );
    }

    #[test]
    fn id_carrying_actions_parse() {
        assert_eq!(parse_callback("approve_42"), Some(CallbackAction::Approve(42)));
        assert_eq!(parse_callback("reject_7"), Some(CallbackAction::Reject(7)));
    }

    #[test]
    fn malformed_data_is_ignored() {
        assert_eq!(parse_callback(""), None);
        assert_eq!(parse_callback("approve_"), None);
        assert_eq!(parse_callback("approve_abc"), None);
        assert_eq!(parse_callback("verify_42"), None);
        assert_eq!(parse_callback("something_else"), None);
    }
}
