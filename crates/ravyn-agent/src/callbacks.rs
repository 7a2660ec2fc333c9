// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inline-button handling.
//!
//! Callbacks are preference mutations, menu navigation, subscription and
//! admin entry points, or feedback. Only upscale is billable. Every
//! callback is acknowledged so the client stops its spinner.

use ravyn_core::types::Preference;
use ravyn_core::{
    CallbackAction, InboundEvent, InteractionKind, Outbound, RavynError, UserAccount,
};
use tracing::{info, warn};

use crate::engine::{Dispatch, DispatchEngine, DispatchOutcome};
use crate::notices;

impl DispatchEngine {
    pub(crate) async fn handle_callback(
        &self,
        event: &InboundEvent,
        user: &UserAccount,
        query_id: &str,
        action: &CallbackAction,
    ) -> Result<Dispatch, RavynError> {
        let user_id = user.user_id;
        let toast = |outcome: DispatchOutcome, text: String| {
            Dispatch::silent(outcome).acknowledged(query_id, Some(text))
        };

        let dispatch = match action {
            CallbackAction::SelectProvider(name) => {
                if !self.router.contains(name) {
                    return Ok(toast(
                        DispatchOutcome::Rejected,
                        format!("Unknown model {name}."),
                    ));
                }
                self.storage
                    .set_preference(user_id, &Preference::Provider(name.clone()))
                    .await?;
                info!(user_id = %user_id, provider = %name, "preferred provider changed");
                toast(
                    DispatchOutcome::Handled,
                    format!("Model changed to {}.", name.to_uppercase()),
                )
            }
            CallbackAction::SelectLanguage(code) => {
                if !self.settings.languages.iter().any(|l| l == code) {
                    return Ok(toast(
                        DispatchOutcome::Rejected,
                        format!("Unsupported language {code}."),
                    ));
                }
                self.storage
                    .set_preference(user_id, &Preference::Language(code.clone()))
                    .await?;
                toast(
                    DispatchOutcome::Handled,
                    format!("Language changed to {}.", code.to_uppercase()),
                )
            }
            CallbackAction::SelectStyle(style) => {
                let known = self
                    .image
                    .as_ref()
                    .is_some_and(|image| image.styles().iter().any(|s| s == style));
                if !known {
                    return Ok(toast(
                        DispatchOutcome::Rejected,
                        format!("Unknown style {style}."),
                    ));
                }
                self.storage
                    .set_preference(user_id, &Preference::ImageStyle(style.clone()))
                    .await?;
                toast(
                    DispatchOutcome::Handled,
                    format!("Default image style set to {}.", notices::capitalize(style)),
                )
            }
            CallbackAction::ToggleMemory => {
                let enabled = self.memory.toggle(user_id).await?;
                toast(DispatchOutcome::Handled, notices::memory_state(enabled))
            }
            CallbackAction::Menu(target) => self
                .menu_screen(event.chat_id, user, *target)
                .await?
                .acknowledged(query_id, None),
            CallbackAction::Subscribe => {
                let (text, buttons) = self.tiers_screen();
                Dispatch::reply(
                    DispatchOutcome::Handled,
                    Outbound::with_buttons(event.chat_id, text, buttons),
                )
                .acknowledged(query_id, None)
            }
            CallbackAction::BuyTier(tier) => {
                self.purchase(event, user, tier)
                    .await?
                    .acknowledged(query_id, None)
            }
            CallbackAction::Upscale(artifact_id) => self
                .upscale(event, user, artifact_id)
                .await?
                .acknowledged(query_id, None),
            CallbackAction::Variation(artifact_id) => self
                .begin_variation(event, user, artifact_id)
                .await?
                .acknowledged(query_id, None),
            CallbackAction::Admin(admin_action) => {
                if !self.is_admin(event) {
                    warn!(user_id = %user_id, ?admin_action, "admin callback from non-admin");
                    return Ok(toast(
                        DispatchOutcome::Unauthorized,
                        notices::NOT_AUTHORIZED.to_string(),
                    ));
                }
                self.handle_admin_callback(event, query_id, admin_action)
                    .await?
            }
            CallbackAction::Feedback { positive } => {
                let verdict = if *positive { "up" } else { "down" };
                self.recorder
                    .record(user_id, InteractionKind::Feedback, verdict, 0)
                    .await?;
                toast(DispatchOutcome::Handled, notices::FEEDBACK_THANKS.to_string())
            }
            CallbackAction::Unknown(data) => {
                warn!(user_id = %user_id, data = %data, "unknown callback data");
                toast(DispatchOutcome::Rejected, notices::UNKNOWN_ACTION.to_string())
            }
        };
        Ok(dispatch)
    }
}
