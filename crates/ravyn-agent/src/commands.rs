// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slash-command handling.

use ravyn_core::{Command, InboundEvent, Keyboard, MenuTarget, Outbound, RavynError, UserAccount};

use crate::engine::{Dispatch, DispatchEngine, DispatchOutcome};
use crate::notices;

/// Interactions shown by `/usage`.
const USAGE_HISTORY_LIMIT: i64 = 50;

impl DispatchEngine {
    pub(crate) async fn handle_command(
        &self,
        event: &InboundEvent,
        user: &UserAccount,
        command: &Command,
    ) -> Result<Dispatch, RavynError> {
        if command.requires_admin() {
            if !self.is_admin(event) {
                tracing::warn!(user_id = %user.user_id, ?command, "admin command from non-admin");
                return Ok(Dispatch::reply(
                    DispatchOutcome::Unauthorized,
                    Outbound::text(event.chat_id, notices::NOT_AUTHORIZED),
                ));
            }
            return self.handle_admin_command(event, command).await;
        }

        let chat_id = event.chat_id;
        let handled = |text: String, buttons: Keyboard| -> Result<Dispatch, RavynError> {
            Ok(Dispatch::reply(
                DispatchOutcome::Handled,
                Outbound::with_buttons(chat_id, text, buttons),
            ))
        };

        match command {
            Command::Start => self.menu_screen(chat_id, user, MenuTarget::Main).await,
            Command::Help => handled(notices::HELP.to_string(), Vec::new()),
            Command::Settings => self.menu_screen(chat_id, user, MenuTarget::Settings).await,
            Command::Balance => self.menu_screen(chat_id, user, MenuTarget::Balance).await,
            Command::Models => self.menu_screen(chat_id, user, MenuTarget::Models).await,
            Command::Language => self.menu_screen(chat_id, user, MenuTarget::Language).await,
            Command::Subscribe => {
                let (text, buttons) = self.tiers_screen();
                handled(text, buttons)
            }
            Command::Usage => {
                let text = self.usage_report(user).await?;
                handled(text, vec![notices::back_row()])
            }
            Command::Reset => {
                self.memory.reset(user.user_id).await?;
                handled(notices::MEMORY_CLEARED.to_string(), Vec::new())
            }
            Command::Memory => {
                let enabled = self.memory.toggle(user.user_id).await?;
                handled(notices::memory_state(enabled), Vec::new())
            }
            Command::Image { prompt } => self.generate_image(event, user, prompt).await,
            Command::Invalid { usage, .. } => Ok(Dispatch::reply(
                DispatchOutcome::Rejected,
                Outbound::text(chat_id, notices::usage(usage)),
            )),
            Command::Unknown(name) => Ok(Dispatch::reply(
                DispatchOutcome::Rejected,
                Outbound::text(chat_id, notices::unknown_command(name)),
            )),
            // Gated above.
            Command::Admin
            | Command::AddTokens { .. }
            | Command::UserInfo { .. }
            | Command::Broadcast { .. }
            | Command::Stats
            | Command::Ban { .. }
            | Command::Unban { .. }
            | Command::SetModel { .. } => self.handle_admin_command(event, command).await,
        }
    }

    /// Renders one of the navigable menus.
    pub(crate) async fn menu_screen(
        &self,
        chat_id: i64,
        user: &UserAccount,
        target: MenuTarget,
    ) -> Result<Dispatch, RavynError> {
        let (text, buttons) = match target {
            MenuTarget::Main => (notices::WELCOME.to_string(), notices::main_menu()),
            MenuTarget::Settings => notices::settings(user),
            MenuTarget::Balance => {
                // The account snapshot may predate a debit in this same event.
                let mut fresh = user.clone();
                fresh.tokens = self.ledger.get_balance(user.user_id).await?;
                notices::balance(&fresh)
            }
            MenuTarget::Models => {
                let providers: Vec<(String, String)> = self
                    .router
                    .provider_names()
                    .into_iter()
                    .map(|name| {
                        let model = self.router.current_model(&name).unwrap_or_default();
                        (name, model)
                    })
                    .collect();
                notices::models(user, &providers)
            }
            MenuTarget::Language => notices::languages(user, &self.settings.languages),
            MenuTarget::Styles => match &self.image {
                Some(image) => notices::styles(user, &image.styles()),
                None => (notices::IMAGES_DISABLED.to_string(), vec![notices::back_row()]),
            },
        };
        Ok(Dispatch::reply(
            DispatchOutcome::Handled,
            Outbound::with_buttons(chat_id, text, buttons),
        ))
    }

    async fn usage_report(&self, user: &UserAccount) -> Result<String, RavynError> {
        let days = self
            .recorder
            .usage_by_day(user.user_id, USAGE_HISTORY_LIMIT)
            .await?;
        if days.is_empty() {
            return Ok(notices::NO_USAGE.to_string());
        }
        let mut text = String::from("📊 Token usage\n");
        for day in &days {
            text.push_str(&format!(
                "\n{}: {} interactions, {} tokens",
                day.date.format("%Y-%m-%d"),
                day.interactions,
                day.tokens
            ));
        }
        let balance = self.ledger.get_balance(user.user_id).await?;
        text.push_str(&format!("\n\nCurrent balance: {balance} tokens"));
        Ok(text)
    }
}
