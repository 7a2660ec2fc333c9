// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin commands and the admin panel.
//!
//! Callers check [`DispatchEngine::is_admin`] before entering this module.

use std::time::Duration;

use ravyn_core::{
    AdminAction, Button, CallbackAction, Command, InboundEvent, InteractionKind, Keyboard,
    Outbound, RavynError, UserId,
};
use tracing::{info, warn};

use crate::engine::{
    Dispatch, DispatchEngine, DispatchOutcome, SETTING_COST_PREFIX, SETTING_MAX_REQUESTS,
    SETTING_WINDOW_SECS,
};
use crate::notices;
use crate::rate_limit::RateLimit;

/// Rate-limit presets the settings panel cycles through.
const RATE_LIMIT_PRESETS: [u32; 4] = [5, 10, 20, 3];
const RATE_LIMIT_WINDOW_SECS: u64 = 60;
/// Chat costs the settings panel cycles through.
const CHAT_COST_PRESETS: [i64; 3] = [1, 2, 3];
/// Users per page when broadcasting.
const BROADCAST_PAGE: i64 = 100;
/// Users listed in the user management panel.
const USER_LIST_LIMIT: i64 = 10;

fn panel_button(label: &str, action: AdminAction) -> Button {
    Button::new(label, CallbackAction::Admin(action))
}

fn back_to_panel() -> Vec<Button> {
    vec![panel_button("⬅️ Back to Admin Panel", AdminAction::Panel)]
}

fn admin_panel() -> (String, Keyboard) {
    (
        "🔧 Admin Panel\n\nChoose an option below.".to_string(),
        vec![
            vec![panel_button("👥 User Management", AdminAction::Users)],
            vec![panel_button("🪙 Token Management", AdminAction::Tokens)],
            vec![panel_button("📊 Statistics", AdminAction::Stats)],
            vec![panel_button("⚙️ Settings", AdminAction::Settings)],
            vec![panel_button("📢 Broadcast Message", AdminAction::Broadcast)],
        ],
    )
}

/// Next entry after `current`, wrapping; the first entry when `current` is not listed.
fn next_preset<T: PartialEq + Copy>(presets: &[T], current: T) -> Option<T> {
    let next = match presets.iter().position(|p| *p == current) {
        Some(i) => (i + 1) % presets.len(),
        None => 0,
    };
    presets.get(next).copied()
}

impl DispatchEngine {
    pub(crate) async fn handle_admin_command(
        &self,
        event: &InboundEvent,
        command: &Command,
    ) -> Result<Dispatch, RavynError> {
        let chat_id = event.chat_id;
        let say = |outcome: DispatchOutcome, text: String| {
            Dispatch::reply(outcome, Outbound::text(chat_id, text))
        };

        let dispatch = match command {
            Command::Admin => {
                let (text, buttons) = admin_panel();
                Dispatch::reply(
                    DispatchOutcome::Handled,
                    Outbound::with_buttons(chat_id, text, buttons),
                )
            }
            Command::AddTokens { target, amount } => {
                match self.ledger.credit(*target, *amount).await? {
                    Some(balance) => {
                        info!(admin = ?event.username, target = %target, amount, "admin added tokens");
                        say(
                            DispatchOutcome::Handled,
                            format!(
                                "Successfully added {amount} tokens to user {target}. New balance: {balance}."
                            ),
                        )
                    }
                    None => say(
                        DispatchOutcome::Rejected,
                        format!("User with ID {target} not found."),
                    ),
                }
            }
            Command::UserInfo { target } => self.user_info(chat_id, *target).await?,
            Command::Broadcast { message } => {
                let (sent, total) = self.broadcast(message).await?;
                info!(admin = ?event.username, sent, total, "broadcast delivered");
                say(
                    DispatchOutcome::Handled,
                    format!("Broadcast message sent to {sent} out of {total} users."),
                )
            }
            Command::Stats => {
                let stats = self.recorder.global_stats(chrono::Utc::now()).await?;
                say(DispatchOutcome::Handled, notices::global_stats(&stats))
            }
            Command::Ban { target } => self.set_ban(chat_id, *target, true).await?,
            Command::Unban { target } => self.set_ban(chat_id, *target, false).await?,
            Command::SetModel { provider, model } => {
                if self.router.set_model(provider, model) {
                    info!(admin = ?event.username, provider = %provider, model = %model, "admin selected model");
                    say(
                        DispatchOutcome::Handled,
                        format!("Model for {} set to {model}.", provider.to_uppercase()),
                    )
                } else {
                    let text = match self.router.list_models(provider) {
                        Some(models) => format!(
                            "Unknown model {model} for {}. Available: {}.",
                            provider.to_uppercase(),
                            models.join(", ")
                        ),
                        None => format!("Unknown provider {provider}."),
                    };
                    say(DispatchOutcome::Rejected, text)
                }
            }
            Command::Invalid { usage, .. } => {
                say(DispatchOutcome::Rejected, notices::usage(usage))
            }
            other => {
                warn!(command = ?other, "non-admin command routed to admin handler");
                say(DispatchOutcome::Rejected, notices::HELP.to_string())
            }
        };
        Ok(dispatch)
    }

    pub(crate) async fn handle_admin_callback(
        &self,
        event: &InboundEvent,
        query_id: &str,
        action: &AdminAction,
    ) -> Result<Dispatch, RavynError> {
        let chat_id = event.chat_id;
        let screen = |text: String, buttons: Keyboard| {
            Dispatch::reply(
                DispatchOutcome::Handled,
                Outbound::with_buttons(chat_id, text, buttons),
            )
            .acknowledged(query_id, None)
        };

        let dispatch = match action {
            AdminAction::Panel => {
                let (text, buttons) = admin_panel();
                screen(text, buttons)
            }
            AdminAction::Users => {
                let users = self.storage.list_users(USER_LIST_LIMIT, 0).await?;
                let mut text = String::from("👥 User Management\n\nRecent users:\n\n");
                for user in &users {
                    text.push_str(&format!(
                        "ID: {} | @{} | Tokens: {}\n",
                        user.user_id,
                        user.username.as_deref().unwrap_or("unknown"),
                        user.tokens
                    ));
                }
                text.push_str("\nUse /user_info <user_id> to view detailed user information.");
                screen(text, vec![back_to_panel()])
            }
            AdminAction::Tokens => screen(
                "🪙 Token Management\n\n\
                 Use /add_tokens <user_id> <amount> to add tokens to a user.\n\n\
                 Example: /add_tokens 123456789 10"
                    .to_string(),
                vec![back_to_panel()],
            ),
            AdminAction::Stats => {
                let stats = self.recorder.global_stats(chrono::Utc::now()).await?;
                screen(notices::global_stats(&stats), vec![back_to_panel()])
            }
            AdminAction::Settings => {
                let (text, buttons) = self.settings_panel();
                screen(text, buttons)
            }
            AdminAction::Broadcast => screen(
                "📢 Broadcast Message\n\n\
                 Use /broadcast <message> to send a message to all users.\n\n\
                 Example: /broadcast Hello everyone! We have new features."
                    .to_string(),
                vec![back_to_panel()],
            ),
            AdminAction::AddTokens(target) => match self.storage.get_user(*target).await? {
                Some(user) => screen(
                    format!(
                        "🪙 Add Tokens to User\n\n\
                         User ID: {}\n\
                         Username: @{}\n\
                         Current tokens: {}\n\n\
                         Use /add_tokens {} <amount>\n\
                         Example: /add_tokens {} 10",
                        user.user_id,
                        user.username.as_deref().unwrap_or("unknown"),
                        user.tokens,
                        user.user_id,
                        user.user_id
                    ),
                    vec![back_to_panel()],
                ),
                None => Dispatch::silent(DispatchOutcome::Rejected)
                    .acknowledged(query_id, Some(format!("User with ID {target} not found."))),
            },
            AdminAction::ToggleBan(target) => match self.storage.get_user(*target).await? {
                Some(user) => {
                    let banned = !user.is_banned;
                    self.storage.set_banned(*target, banned).await?;
                    let verb = if banned { "banned" } else { "unbanned" };
                    info!(admin = ?event.username, target = %target, banned, "admin toggled ban");
                    Dispatch::silent(DispatchOutcome::Handled)
                        .acknowledged(query_id, Some(format!("User {target} has been {verb}.")))
                }
                None => Dispatch::silent(DispatchOutcome::Rejected)
                    .acknowledged(query_id, Some(format!("User with ID {target} not found."))),
            },
            AdminAction::SettingRateLimit => {
                let current = self.limiter.limits();
                let max = next_preset(&RATE_LIMIT_PRESETS, current.max_requests)
                    .unwrap_or(current.max_requests);
                let limit = RateLimit::new(max, Duration::from_secs(RATE_LIMIT_WINDOW_SECS));
                self.limiter.update_limits(limit);
                self.storage
                    .set_setting(SETTING_MAX_REQUESTS, &max.to_string())
                    .await?;
                self.storage
                    .set_setting(SETTING_WINDOW_SECS, &RATE_LIMIT_WINDOW_SECS.to_string())
                    .await?;
                info!(admin = ?event.username, max_requests = max, "admin changed rate limit");
                let (text, buttons) = self.settings_panel();
                screen(text, buttons)
            }
            AdminAction::SettingTokenCost => {
                let kind = InteractionKind::Chat;
                let current = self.ledger.cost_of(kind);
                let cost = next_preset(&CHAT_COST_PRESETS, current).unwrap_or(current);
                self.ledger.set_cost(kind, cost)?;
                self.storage
                    .set_setting(&format!("{SETTING_COST_PREFIX}{kind}"), &cost.to_string())
                    .await?;
                info!(admin = ?event.username, cost, "admin changed chat cost");
                let (text, buttons) = self.settings_panel();
                screen(text, buttons)
            }
            AdminAction::Unknown(tag) => {
                warn!(tag = %tag, "unknown admin action");
                Dispatch::silent(DispatchOutcome::Rejected)
                    .acknowledged(query_id, Some(notices::UNKNOWN_ACTION.to_string()))
            }
        };
        Ok(dispatch)
    }

    fn settings_panel(&self) -> (String, Keyboard) {
        let limits = self.limiter.limits();
        let costs = self.ledger.costs();
        let mut text = format!(
            "⚙️ Admin Settings\n\n\
             Rate limit: {} requests per {}s\n\n\
             Token costs:\n",
            limits.max_requests,
            limits.window.as_secs()
        );
        for kind in InteractionKind::BILLABLE {
            text.push_str(&format!("• {}: {}\n", notices::capitalize(&kind.to_string()), costs.cost(kind)));
        }
        let buttons = vec![
            vec![panel_button("🪙 Chat Token Cost", AdminAction::SettingTokenCost)],
            vec![panel_button("⏳ Rate Limit", AdminAction::SettingRateLimit)],
            back_to_panel(),
        ];
        (text, buttons)
    }

    async fn user_info(&self, chat_id: i64, target: UserId) -> Result<Dispatch, RavynError> {
        let Some(user) = self.storage.get_user(target).await? else {
            return Ok(Dispatch::reply(
                DispatchOutcome::Rejected,
                Outbound::text(chat_id, format!("User with ID {target} not found.")),
            ));
        };
        let stats = self.recorder.user_stats(target).await?;
        let mut text = format!(
            "📊 User Information\n\n\
             User ID: {}\n\
             Username: @{}\n\
             Language: {}\n\
             Tokens: {}\n\
             Preferred model: {}\n\
             Memory: {}\n\
             Image style: {}\n\
             Created at: {}\n\
             Last activity: {}\n\
             Premium: {}\n\
             Banned: {}\n\n",
            user.user_id,
            user.username.as_deref().unwrap_or("unknown"),
            user.language,
            user.tokens,
            user.preferred_provider.to_uppercase(),
            notices::on_off(user.memory_enabled),
            notices::capitalize(&user.image.style),
            user.created_at.format("%Y-%m-%d %H:%M"),
            user.last_activity.format("%Y-%m-%d %H:%M"),
            if user.is_premium() { "Yes" } else { "No" },
            if user.is_banned { "Yes" } else { "No" },
        );
        text.push_str(&notices::user_stats(&stats));

        let ban_label = if user.is_banned { "Unban User" } else { "Ban User" };
        let buttons = vec![
            vec![panel_button("🪙 Add Tokens", AdminAction::AddTokens(target))],
            vec![panel_button(ban_label, AdminAction::ToggleBan(target))],
            back_to_panel(),
        ];
        Ok(Dispatch::reply(
            DispatchOutcome::Handled,
            Outbound::with_buttons(chat_id, text, buttons),
        ))
    }

    async fn set_ban(
        &self,
        chat_id: i64,
        target: UserId,
        banned: bool,
    ) -> Result<Dispatch, RavynError> {
        let dispatch = if self.storage.set_banned(target, banned).await? {
            let verb = if banned { "banned" } else { "unbanned" };
            info!(target = %target, banned, "admin changed ban flag");
            Dispatch::reply(
                DispatchOutcome::Handled,
                Outbound::text(chat_id, format!("User {target} has been {verb}.")),
            )
        } else {
            Dispatch::reply(
                DispatchOutcome::Rejected,
                Outbound::text(chat_id, format!("User with ID {target} not found.")),
            )
        };
        Ok(dispatch)
    }

    /// Sends `message` to every account, page by page. Returns (sent, total).
    ///
    /// Private-chat ids equal user ids, so each account is addressed by its id.
    async fn broadcast(&self, message: &str) -> Result<(usize, usize), RavynError> {
        let text = format!("📢 Broadcast Message\n\n{message}");
        let mut offset = 0;
        let (mut sent, mut total) = (0, 0);
        loop {
            let page = self.storage.list_users(BROADCAST_PAGE, offset).await?;
            if page.is_empty() {
                break;
            }
            for user in &page {
                total += 1;
                match self.channel.send(&Outbound::text(user.user_id.0, text.as_str())).await {
                    Ok(()) => sent += 1,
                    Err(e) => warn!(user_id = %user.user_id, error = %e, "broadcast delivery failed"),
                }
            }
            if (page.len() as i64) < BROADCAST_PAGE {
                break;
            }
            offset += BROADCAST_PAGE;
        }
        Ok((sent, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_cycle_and_wrap() {
        assert_eq!(next_preset(&RATE_LIMIT_PRESETS, 5), Some(10));
        assert_eq!(next_preset(&RATE_LIMIT_PRESETS, 3), Some(5));
        assert_eq!(next_preset(&RATE_LIMIT_PRESETS, 7), Some(5));
        assert_eq!(next_preset(&CHAT_COST_PRESETS, 3), Some(1));
        assert_eq!(next_preset::<i64>(&[], 1), None);
    }
}
