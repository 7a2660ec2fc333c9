// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subscription tiers, purchases, and the monthly bonus task.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ravyn_core::types::Subscription;
use ravyn_core::{
    Button, CallbackAction, InboundEvent, InteractionKind, Keyboard, Outbound, RavynError,
    UserAccount,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::engine::{Dispatch, DispatchEngine, DispatchOutcome};
use crate::notices;

/// Model recorded for token purchases.
pub const PURCHASE_MODEL: &str = "telegram_stars";
/// Model recorded for monthly bonuses.
pub const BONUS_MODEL: &str = "monthly";

impl DispatchEngine {
    pub(crate) fn tiers_screen(&self) -> (String, Keyboard) {
        let mut text = String::from("💎 Subscription Plans\n\nChoose a plan to buy tokens:");
        let mut keyboard: Keyboard = Vec::new();
        for tier in &self.settings.subscription.tiers {
            text.push_str(&format!(
                "\n\n{} plan (${})\n• {} tokens\n• {} monthly bonus tokens",
                tier.name, tier.price, tier.tokens, tier.monthly_bonus
            ));
            for benefit in &tier.benefits {
                text.push_str(&format!("\n• {benefit}"));
            }
            keyboard.push(vec![Button::new(
                format!("{} - {} tokens (${})", tier.name, tier.tokens, tier.price),
                CallbackAction::BuyTier(tier.id.clone()),
            )]);
        }
        keyboard.push(notices::back_row());
        (text, keyboard)
    }

    /// Settles a tier purchase and, on success, credits and subscribes the user.
    pub(crate) async fn purchase(
        &self,
        event: &InboundEvent,
        user: &UserAccount,
        tier_id: &str,
    ) -> Result<Dispatch, RavynError> {
        let chat_id = event.chat_id;
        let Some(tier) = self.settings.subscription.tier(tier_id).cloned() else {
            warn!(user_id = %user.user_id, tier = %tier_id, "unknown subscription tier");
            return Ok(Dispatch::reply(
                DispatchOutcome::Rejected,
                Outbound::text(chat_id, format!("Unknown plan {tier_id}.")),
            ));
        };
        let Some(payment) = self.payment.clone() else {
            return Ok(Dispatch::reply(
                DispatchOutcome::Rejected,
                Outbound::text(chat_id, notices::PAYMENTS_UNAVAILABLE),
            ));
        };

        match payment.settle(user.user_id, &tier.id, tier.price).await {
            Ok(true) => {}
            Ok(false) => {
                info!(user_id = %user.user_id, tier = %tier.id, "payment declined");
                return Ok(Dispatch::reply(
                    DispatchOutcome::Handled,
                    Outbound::text(chat_id, notices::PAYMENT_DECLINED),
                ));
            }
            Err(e) => {
                error!(user_id = %user.user_id, tier = %tier.id, error = %e, "payment failed");
                return Ok(Dispatch::reply(
                    DispatchOutcome::Handled,
                    Outbound::text(chat_id, notices::PAYMENT_DECLINED),
                ));
            }
        }

        let balance = self
            .ledger
            .credit(user.user_id, tier.tokens)
            .await?
            .unwrap_or(tier.tokens);
        self.recorder
            .record(user.user_id, InteractionKind::Purchase, PURCHASE_MODEL, tier.tokens)
            .await?;

        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(self.settings.subscription.period_days);
        let subscription = Subscription {
            tier: tier.id.clone(),
            started_at: now,
            expires_at,
            last_bonus_at: None,
        };
        self.storage
            .set_subscription(user.user_id, &subscription)
            .await?;
        info!(user_id = %user.user_id, tier = %tier.id, tokens = tier.tokens, "subscription purchased");

        let text = format!(
            "✅ Payment successful!\n\n\
             You have purchased {} tokens for ${}.\n\
             Your new balance: {balance} tokens\n\n\
             Subscription tier: {}\n\
             Expires: {}\n\n\
             You will receive {} bonus tokens every {} days while subscribed.",
            tier.tokens,
            tier.price,
            tier.name,
            expires_at.format("%Y-%m-%d"),
            tier.monthly_bonus,
            self.settings.subscription.period_days,
        );
        Ok(Dispatch::reply(
            DispatchOutcome::Handled,
            Outbound::text(chat_id, text),
        ))
    }

    /// Credits every subscriber whose bonus is due at `now`.
    ///
    /// Each grant is a single conditional store update, so overlapping runs
    /// never pay the same period twice. Returns how many bonuses were granted.
    pub async fn grant_monthly_bonuses(&self, now: DateTime<Utc>) -> Result<usize, RavynError> {
        let period = chrono::Duration::days(self.settings.subscription.period_days);
        let due_before = now - period;
        let mut granted = 0;

        for user in self.storage.list_subscribers().await? {
            let Some(subscription) = &user.subscription else {
                continue;
            };
            let Some(tier) = self.settings.subscription.tier(&subscription.tier) else {
                warn!(user_id = %user.user_id, tier = %subscription.tier, "subscriber on unknown tier");
                continue;
            };
            if tier.monthly_bonus <= 0 {
                continue;
            }

            let Some(balance) = self
                .storage
                .grant_bonus_if_due(user.user_id, tier.monthly_bonus, due_before, now)
                .await?
            else {
                continue;
            };
            granted += 1;
            self.recorder
                .record(user.user_id, InteractionKind::Bonus, BONUS_MODEL, tier.monthly_bonus)
                .await?;
            info!(user_id = %user.user_id, amount = tier.monthly_bonus, balance, "monthly bonus granted");

            let notice = format!(
                "🎁 Monthly Bonus!\n\n\
                 You've received {} bonus tokens as part of your {} subscription.\n\n\
                 Thank you for your continued support!",
                tier.monthly_bonus, tier.name
            );
            if let Err(e) = self
                .channel
                .send(&Outbound::text(user.user_id.0, notice))
                .await
            {
                warn!(user_id = %user.user_id, error = %e, "failed to notify user about bonus");
            }
        }
        Ok(granted)
    }
}

/// Periodically grants bonuses and purges expired in-memory state until cancelled.
pub async fn run_bonus_task(engine: Arc<DispatchEngine>, cancel: CancellationToken) {
    let every = Duration::from_secs(engine.settings.subscription.bonus_check_interval_secs.max(1));
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    info!(interval_secs = every.as_secs(), "bonus task started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match engine.grant_monthly_bonuses(Utc::now()).await {
                    Ok(granted) => debug!(granted, "bonus check completed"),
                    Err(e) => error!(error = %e, "bonus check failed"),
                }
                engine.purge_expired();
            }
            _ = cancel.cancelled() => {
                info!("bonus task stopping");
                break;
            }
        }
    }
}
