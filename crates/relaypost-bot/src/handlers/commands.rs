// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slash command handlers.
//!
//! Commands are DM-only. Administrative commands call straight into the
//! storage operations; commands that take an argument either act
//! immediately (argument present) or open a conversational session
//! (argument absent).

use std::str::FromStr;
use std::sync::Arc;

use relaypost_core::{Capability, SettingsPatch, UserId};
use relaypost_storage::queries::{admins, content, settings, subscriptions};
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::command::BotCommands;
use tracing::warn;

use crate::handlers::flows::{FlowState, SettingField};
use crate::state::{unix_now, AppState};

const WELCOME: &str = "👋 Welcome to Relaypost!\n\n\
    I deliver content to your channel automatically.\n\
    Purchase a subscription to get started.";

const INTERNAL_ERROR: &str = "Something went wrong on our side. Please try again later.";

const NOT_ADMIN: &str = "This command is restricted to admins.";

/// All slash commands understood by the bot.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "snake_case")]
pub enum Command {
    /// Welcome and subscription entry point.
    Start,
    /// Abort the current conversation.
    Cancel,
    /// List your subscriptions.
    #[command(alias = "subscriptions")]
    MySubs,
    /// Show the distribution settings.
    Settings,
    /// Set the distribution interval in hours.
    SetInterval(String),
    /// Set items delivered per destination per run.
    SetPosts(String),
    /// Grant a user admin access.
    AddAdmin(String),
    /// Revoke a user's admin access.
    RemoveAdmin(String),
    /// Toggle an admin capability.
    Perm(String),
    /// Delete every indexed item.
    ClearPool,
}

/// The "Buy Subscription" entry button shown by `/start` and `/my_subs`.
pub(crate) fn buy_button() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[InlineKeyboardButton::callback(
        "💳 Buy Subscription",
        "buy_sub",
    )]])
}

/// Parse `/perm` arguments: `<user_id> <capability> <on|off>`.
pub fn parse_perm_args(input: &str) -> Option<(UserId, Capability, bool)> {
    let mut parts = input.split_whitespace();
    let user = parts.next()?.parse::<i64>().ok().map(UserId)?;
    let cap = Capability::from_str(parts.next()?).ok()?;
    let value = match parts.next()? {
        "on" | "true" | "1" => true,
        "off" | "false" | "0" => false,
        _ => return None,
    };
    if parts.next().is_some() {
        return None;
    }
    Some((user, cap, value))
}

fn capability_names() -> String {
    Capability::ALL
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    if !super::is_dm(&msg) {
        return Ok(());
    }
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let user_id = UserId(user.id.0 as i64);

    match cmd {
        Command::Start => {
            bot.send_message(msg.chat.id, WELCOME)
                .reply_markup(buy_button())
                .await?;
        }

        Command::Cancel => {
            let text = if state.sessions.cancel(user_id) {
                "Cancelled."
            } else {
                "Nothing to cancel."
            };
            bot.send_message(msg.chat.id, text).await?;
        }

        Command::MySubs => {
            let subs = match subscriptions::list_for_owner(&state.db, user_id).await {
                Ok(subs) => subs,
                Err(e) => {
                    warn!(error = %e, "listing subscriptions failed");
                    bot.send_message(msg.chat.id, INTERNAL_ERROR).await?;
                    return Ok(());
                }
            };

            if subs.is_empty() {
                bot.send_message(
                    msg.chat.id,
                    "You have no subscriptions yet.\nTap the button below to purchase one!",
                )
                .reply_markup(buy_button())
                .await?;
            } else {
                let mut text = String::from("📋 Your subscriptions:\n\n");
                for sub in &subs {
                    let expires = sub
                        .expires_at
                        .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
                        .map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
                        .unwrap_or_else(|| "pending approval".to_string());
                    text.push_str(&format!(
                        "📺 Feed: {}\n📅 Plan: {}\n🔖 Status: {}\n⏳ Expires: {}\n\n",
                        sub.destination_id, sub.plan_kind, sub.status, expires
                    ));
                }
                bot.send_message(msg.chat.id, text)
                    .reply_markup(buy_button())
                    .await?;
            }
        }

        Command::Settings => {
            match admins::is_admin(&state.db, state.owner(), user_id).await {
                Ok(true) => {}
                Ok(false) => {
                    bot.send_message(msg.chat.id, NOT_ADMIN).await?;
                    return Ok(());
                }
                Err(e) => {
                    warn!(error = %e, "admin lookup failed");
                    bot.send_message(msg.chat.id, INTERNAL_ERROR).await?;
                    return Ok(());
                }
            }

            let current = match settings::get_settings(&state.db).await {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "settings lookup failed");
                    bot.send_message(msg.chat.id, INTERNAL_ERROR).await?;
                    return Ok(());
                }
            };

            let text = format!(
                "⚙️ Current settings\n\n\
                 🕒 Interval: {} hours\n\
                 📦 Items per run: {}\n\
                 🗑 Delete source after delivery: {}\n\
                 📥 Auto index: {}\n\n\
                 Commands:\n\
                 /set_interval <hours>\n\
                 /set_posts <number>",
                current.interval_hours,
                current.items_per_run,
                current.delete_after_deliver,
                current.auto_index,
            );
            bot.send_message(msg.chat.id, text).await?;
        }

        Command::SetInterval(arg) => {
            if !require_capability(&bot, &msg, &state, user_id, Capability::ChangeInterval).await? {
                return Ok(());
            }
            if arg.trim().is_empty() {
                state
                    .sessions
                    .start(user_id, FlowState::AwaitSettingValue {
                        field: SettingField::IntervalHours,
                    });
                bot.send_message(
                    msg.chat.id,
                    "Send the new interval in hours (a number greater than 0). /cancel to abort.",
                )
                .await?;
                return Ok(());
            }
            match crate::handlers::flows::parse_interval_hours(&arg) {
                Some(hours) => {
                    apply_settings_patch(
                        &bot,
                        &msg,
                        &state,
                        SettingsPatch {
                            interval_hours: Some(hours),
                            ..SettingsPatch::default()
                        },
                        &format!("✅ Interval updated to {hours} hours."),
                    )
                    .await?;
                }
                None => {
                    bot.send_message(
                        msg.chat.id,
                        "❌ Usage: /set_interval <hours> — a number greater than 0.",
                    )
                    .await?;
                }
            }
        }

        Command::SetPosts(arg) => {
            if !require_capability(&bot, &msg, &state, user_id, Capability::ChangePosts).await? {
                return Ok(());
            }
            if arg.trim().is_empty() {
                state
                    .sessions
                    .start(user_id, FlowState::AwaitSettingValue {
                        field: SettingField::ItemsPerRun,
                    });
                bot.send_message(
                    msg.chat.id,
                    "Send the new items-per-run count (an integer greater than 0). /cancel to abort.",
                )
                .await?;
                return Ok(());
            }
            match crate::handlers::flows::parse_items_per_run(&arg) {
                Some(count) => {
                    apply_settings_patch(
                        &bot,
                        &msg,
                        &state,
                        SettingsPatch {
                            items_per_run: Some(count),
                            ..SettingsPatch::default()
                        },
                        &format!("✅ Items per run updated to {count}."),
                    )
                    .await?;
                }
                None => {
                    bot.send_message(
                        msg.chat.id,
                        "❌ Usage: /set_posts <number> — an integer greater than 0.",
                    )
                    .await?;
                }
            }
        }

        Command::AddAdmin(arg) => {
            if !require_capability(&bot, &msg, &state, user_id, Capability::AddAdmin).await? {
                return Ok(());
            }
            let Some(target) = arg.trim().parse::<i64>().ok().map(UserId) else {
                bot.send_message(msg.chat.id, "❌ Usage: /add_admin <user_id>")
                    .await?;
                return Ok(());
            };
            match admins::add_admin(&state.db, target, Some(user_id), unix_now()).await {
                Ok(true) => {
                    bot.send_message(
                        msg.chat.id,
                        format!("✅ {target} added as admin with default permissions."),
                    )
                    .await?;
                }
                Ok(false) => {
                    bot.send_message(
                        msg.chat.id,
                        format!("{target} is already an admin; permissions unchanged."),
                    )
                    .await?;
                }
                Err(e) => {
                    warn!(error = %e, "add_admin failed");
                    bot.send_message(msg.chat.id, INTERNAL_ERROR).await?;
                }
            }
        }

        Command::RemoveAdmin(arg) => {
            if !require_capability(&bot, &msg, &state, user_id, Capability::AddAdmin).await? {
                return Ok(());
            }
            let Some(target) = arg.trim().parse::<i64>().ok().map(UserId) else {
                bot.send_message(msg.chat.id, "❌ Usage: /remove_admin <user_id>")
                    .await?;
                return Ok(());
            };
            match admins::remove_admin(&state.db, target).await {
                Ok(true) => {
                    bot.send_message(msg.chat.id, format!("✅ {target} removed."))
                        .await?;
                }
                Ok(false) => {
                    bot.send_message(msg.chat.id, format!("{target} is not a stored admin."))
                        .await?;
                }
                Err(e) => {
                    warn!(error = %e, "remove_admin failed");
                    bot.send_message(msg.chat.id, INTERNAL_ERROR).await?;
                }
            }
        }

        Command::Perm(arg) => {
            if !require_capability(&bot, &msg, &state, user_id, Capability::AddAdmin).await? {
                return Ok(());
            }
            let Some((target, cap, value)) = parse_perm_args(&arg) else {
                bot.send_message(
                    msg.chat.id,
                    format!(
                        "❌ Usage: /perm <user_id> <capability> <on|off>\n\
                         Capabilities: {}",
                        capability_names()
                    ),
                )
                .await?;
                return Ok(());
            };
            match admins::set_capability(&state.db, target, cap, value).await {
                Ok(true) => {
                    bot.send_message(
                        msg.chat.id,
                        format!("✅ {cap} set to {value} for {target}."),
                    )
                    .await?;
                }
                Ok(false) => {
                    bot.send_message(
                        msg.chat.id,
                        format!("{target} is not a stored admin. Use /add_admin first."),
                    )
                    .await?;
                }
                Err(e) => {
                    warn!(error = %e, "set_capability failed");
                    bot.send_message(msg.chat.id, INTERNAL_ERROR).await?;
                }
            }
        }

        Command::ClearPool => {
            if user_id != state.owner() {
                bot.send_message(msg.chat.id, "This command is restricted to the owner.")
                    .await?;
                return Ok(());
            }
            match content::clear_items(&state.db).await {
                Ok(cleared) => {
                    bot.send_message(
                        msg.chat.id,
                        format!("✅ Cleared {cleared} items from the content pool."),
                    )
                    .await?;
                }
                Err(e) => {
                    warn!(error = %e, "clear_items failed");
                    bot.send_message(msg.chat.id, INTERNAL_ERROR).await?;
                }
            }
        }
    }

    Ok(())
}

/// Reply with a refusal and return `false` unless `user` holds `cap`.
async fn require_capability(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    user: UserId,
    cap: Capability,
) -> ResponseResult<bool> {
    match admins::check_capability(&state.db, state.owner(), user, cap).await {
        Ok(true) => Ok(true),
        Ok(false) => {
            bot.send_message(msg.chat.id, NOT_ADMIN).await?;
            Ok(false)
        }
        Err(e) => {
            warn!(error = %e, "capability check failed");
            bot.send_message(msg.chat.id, INTERNAL_ERROR).await?;
            Ok(false)
        }
    }
}

/// Apply a settings patch and confirm, or report an internal error.
async fn apply_settings_patch(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    patch: SettingsPatch,
    confirmation: &str,
) -> ResponseResult<()> {
    match settings::apply_patch(&state.db, &patch).await {
        Ok(()) => {
            bot.send_message(msg.chat.id, confirmation).await?;
        }
        Err(e) => {
            warn!(error = %e, "settings update failed");
            bot.send_message(msg.chat.id, INTERNAL_ERROR).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_with_snake_case_names() {
        let cmd = Command::parse("/set_interval 12", "relaypostbot").unwrap();
        assert_eq!(cmd, Command::SetInterval("12".to_string()));

        let cmd = Command::parse("/my_subs", "relaypostbot").unwrap();
        assert_eq!(cmd, Command::MySubs);

        // Long-form alias.
        let cmd = Command::parse("/subscriptions", "relaypostbot").unwrap();
        assert_eq!(cmd, Command::MySubs);

        let cmd = Command::parse("/perm 42 manage_payments on", "relaypostbot").unwrap();
        assert_eq!(cmd, Command::Perm("42 manage_payments on".to_string()));
    }

    #[test]
    fn perm_args_parse_valid_forms() {
        let (user, cap, value) = parse_perm_args("42 manage_payments on").unwrap();
        assert_eq!(user, UserId(42));
        assert_eq!(cap, Capability::ManagePayments);
        assert!(value);

        let (_, cap, value) = parse_perm_args("42 change_interval off").unwrap();
        assert_eq!(cap, Capability::ChangeInterval);
        assert!(!value);
    }

    #[test]
    fn perm_args_reject_malformed_input() {
        assert!(parse_perm_args("").is_none());
        assert!(parse_perm_args("42").is_none());
        assert!(parse_perm_args("42 manage_payments").is_none());
        assert!(parse_perm_args("42 not_a_capability on").is_none());
        assert!(parse_perm_args("42 manage_payments maybe").is_none());
        assert!(parse_perm_args("42 manage_payments on extra").is_none());
        assert!(parse_perm_args("abc manage_payments on").is_none());
    }

    #[test]
    fn capability_names_lists_all() {
        let names = capability_names();
        assert!(names.contains("change_interval"));
        assert!(names.contains("change_posts"));
        assert!(names.contains("add_admin"));
        assert!(names.contains("manage_payments"));
    }
}
