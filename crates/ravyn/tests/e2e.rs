// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the dispatch pipeline.
//!
//! Each test creates an isolated TestHarness with temp SQLite and mock
//! adapters. Tests are independent and order-insensitive.

use std::time::Duration;

use chrono::Utc;
use ravyn_agent::{Dispatch, DispatchOutcome, notices};
use ravyn_core::{InteractionKind, Outbound, Role, UserId};
use ravyn_test_utils::{ADMIN_USER_ID, RenderKind, StoreOp, TestHarness};

/// Message texts in a dispatch, skipping callback acknowledgments.
fn texts(dispatch: &Dispatch) -> Vec<String> {
    dispatch
        .replies
        .iter()
        .filter_map(|reply| match reply {
            Outbound::Message { text, .. } => Some(text.clone()),
            Outbound::Artifact { caption, .. } => Some(caption.clone()),
            Outbound::CallbackAnswer { .. } => None,
        })
        .collect()
}

fn artifact_id(dispatch: &Dispatch) -> String {
    dispatch
        .replies
        .iter()
        .find_map(|reply| match reply {
            Outbound::Artifact { artifact, .. } => Some(artifact.id.clone()),
            _ => None,
        })
        .expect("dispatch should carry an artifact")
}

// ---- Chat pipeline ----

#[tokio::test]
async fn chat_reply_is_debited_and_carries_feedback_buttons() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec!["Hello from Ravyn!".to_string()])
        .build()
        .await
        .unwrap();

    let dispatch = harness.send(1, "Hi there").await.unwrap();
    assert_eq!(
        dispatch.outcome,
        DispatchOutcome::Responded {
            kind: InteractionKind::Chat,
            cost: 1
        }
    );
    match &dispatch.replies[..] {
        [Outbound::Message { text, buttons, .. }] => {
            assert_eq!(text, "Hello from Ravyn!");
            assert_eq!(buttons, &notices::feedback_buttons());
        }
        other => panic!("unexpected replies: {other:?}"),
    }
    assert_eq!(harness.balance(1).await.unwrap(), Some(4));

    let log = harness
        .storage
        .recent_interactions(UserId(1), 10)
        .await
        .unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].kind, InteractionKind::Chat);
    assert_eq!(log[0].model, "gpt");
    assert_eq!(log[0].tokens, 1);
}

#[tokio::test]
async fn last_token_is_spent_then_the_user_is_unfunded() {
    let harness = TestHarness::builder()
        .with_starting_balance(1)
        .build()
        .await
        .unwrap();

    let first = harness.send(2, "one").await.unwrap();
    assert!(matches!(first.outcome, DispatchOutcome::Responded { .. }));
    assert_eq!(harness.balance(2).await.unwrap(), Some(0));

    let second = harness.send(2, "two").await.unwrap();
    assert_eq!(
        second.outcome,
        DispatchOutcome::Unfunded {
            kind: InteractionKind::Chat,
            cost: 1,
            balance: 0
        }
    );
    match &second.replies[..] {
        [Outbound::Message { text, buttons, .. }] => {
            assert_eq!(text, notices::NO_TOKENS);
            assert_eq!(buttons, &notices::subscribe_button());
        }
        other => panic!("unexpected replies: {other:?}"),
    }
    assert_eq!(harness.balance(2).await.unwrap(), Some(0));
    assert_eq!(harness.provider.call_count().await, 1);
}

#[tokio::test]
async fn concurrent_messages_never_overdraw() {
    let harness = TestHarness::builder()
        .with_starting_balance(3)
        .build()
        .await
        .unwrap();
    harness.register(3).await.unwrap();

    let results = futures::future::join_all((0..10).map(|_| harness.send(3, "hi"))).await;

    let mut responded = 0;
    let mut unfunded = 0;
    for result in results {
        match result.unwrap().outcome {
            DispatchOutcome::Responded { .. } => responded += 1,
            DispatchOutcome::Unfunded { .. } => unfunded += 1,
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert_eq!(responded, 3);
    assert_eq!(unfunded, 7);
    assert_eq!(harness.balance(3).await.unwrap(), Some(0));
}

#[tokio::test]
async fn provider_timeout_apologizes_and_keeps_the_debit() {
    let harness = TestHarness::builder()
        .with_config(|config| config.providers.timeout_secs = 1)
        .with_provider_delay(Duration::from_secs(3))
        .build()
        .await
        .unwrap();

    let dispatch = harness.send(4, "are you there?").await.unwrap();
    assert_eq!(
        dispatch.outcome,
        DispatchOutcome::Failed {
            kind: InteractionKind::Chat,
            cost: 1
        }
    );
    assert_eq!(texts(&dispatch), vec![harness.config.providers.apology.clone()]);
    assert_eq!(harness.balance(4).await.unwrap(), Some(4));

    let stats = harness.storage.user_stats(UserId(4)).await.unwrap();
    assert_eq!(stats.by_model.get("gpt"), Some(&1));
    assert_eq!(stats.total_tokens, 1);

    // Failed turns are not remembered.
    let history = harness.engine.memory().read(UserId(4)).await.unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn provider_error_is_logged_like_a_timeout() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.provider.set_failing(true);

    let dispatch = harness.send(5, "hello").await.unwrap();
    assert!(matches!(dispatch.outcome, DispatchOutcome::Failed { .. }));
    assert_eq!(texts(&dispatch), vec![harness.engine.router().apology().to_string()]);

    let log = harness
        .storage
        .recent_interactions(UserId(5), 10)
        .await
        .unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].model, "gpt");
}

// ---- Admission ----

#[tokio::test]
async fn third_request_in_window_is_rate_limited() {
    let harness = TestHarness::builder()
        .with_rate_limit(2, 60)
        .build()
        .await
        .unwrap();

    for _ in 0..2 {
        let dispatch = harness.send(6, "hi").await.unwrap();
        assert!(matches!(dispatch.outcome, DispatchOutcome::Responded { .. }));
    }
    let third = harness.send(6, "hi").await.unwrap();
    assert_eq!(third.outcome, DispatchOutcome::RateLimited);
    assert_eq!(texts(&third), vec![notices::RATE_LIMITED.to_string()]);
    assert_eq!(harness.balance(6).await.unwrap(), Some(3));

    // Menus are not throttled.
    let balance = harness.send(6, "/balance").await.unwrap();
    assert_eq!(balance.outcome, DispatchOutcome::Handled);
}

#[tokio::test]
async fn redelivered_update_is_a_duplicate() {
    let harness = TestHarness::builder().build().await.unwrap();

    let event = harness.message(7, "hello");
    let first = harness.engine.handle(&event).await.unwrap();
    assert!(matches!(first.outcome, DispatchOutcome::Responded { .. }));

    let again = harness.engine.handle(&event).await.unwrap();
    assert_eq!(again.outcome, DispatchOutcome::Duplicate);
    assert!(again.replies.is_empty());
    assert_eq!(harness.balance(7).await.unwrap(), Some(4));
    assert_eq!(harness.provider.call_count().await, 1);
}

#[tokio::test]
async fn banned_user_is_turned_away_until_unbanned() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.register(8).await.unwrap();

    let ban = harness.admin("/ban 8").await.unwrap();
    assert_eq!(ban.outcome, DispatchOutcome::Handled);
    assert_eq!(texts(&ban), vec!["User 8 has been banned.".to_string()]);

    let blocked = harness.send(8, "hello").await.unwrap();
    assert_eq!(blocked.outcome, DispatchOutcome::Banned);
    assert_eq!(texts(&blocked), vec![notices::BANNED.to_string()]);
    assert_eq!(harness.provider.call_count().await, 0);

    harness.admin("/unban 8").await.unwrap();
    let back = harness.send(8, "hello").await.unwrap();
    assert!(matches!(back.outcome, DispatchOutcome::Responded { .. }));
}

// ---- Store outages ----

#[tokio::test]
async fn debit_outage_fails_the_dispatch_and_changes_nothing() {
    let harness = TestHarness::builder()
        .with_rate_limit(2, 60)
        .build()
        .await
        .unwrap();
    harness.send(30, "hello").await.unwrap();
    assert_eq!(harness.balance(30).await.unwrap(), Some(4));

    harness.faults.fail(StoreOp::Debit);
    let err = harness.send(30, "again").await.unwrap_err();
    assert!(err.is_infrastructure(), "got: {err}");

    assert_eq!(harness.balance(30).await.unwrap(), Some(4));
    assert_eq!(harness.provider.call_count().await, 1);
    assert_eq!(harness.engine.memory().read(UserId(30)).await.unwrap().len(), 2);
    let stats = harness.storage.user_stats(UserId(30)).await.unwrap();
    assert_eq!(stats.by_kind.get("chat"), Some(&1));

    // The failed attempt gave its rate-limit slot back.
    harness.faults.heal_all();
    let retry = harness.send(30, "again").await.unwrap();
    assert_eq!(
        retry.outcome,
        DispatchOutcome::Responded {
            kind: InteractionKind::Chat,
            cost: 1
        }
    );
    let limited = harness.send(30, "once more").await.unwrap();
    assert_eq!(limited.outcome, DispatchOutcome::RateLimited);
}

#[tokio::test]
async fn image_debit_outage_is_an_error_not_unfunded() {
    let harness = TestHarness::builder()
        .with_starting_balance(20)
        .build()
        .await
        .unwrap();
    harness.register(31).await.unwrap();

    harness.faults.fail(StoreOp::Debit);
    let err = harness.send(31, "/image a harbor").await.unwrap_err();
    assert!(err.is_infrastructure());
    assert_eq!(harness.balance(31).await.unwrap(), Some(20));
    assert!(harness.image.calls().await.is_empty());
}

#[tokio::test]
async fn pending_variation_survives_a_store_outage() {
    let harness = TestHarness::builder()
        .with_starting_balance(20)
        .build()
        .await
        .unwrap();
    let image = harness.send(32, "/image a windmill").await.unwrap();
    let id = artifact_id(&image);
    harness.press(32, &format!("variation_{id}")).await.unwrap();

    for op in [StoreOp::GetArtifact, StoreOp::Debit] {
        harness.faults.fail(op);
        let err = harness.send(32, "at dusk").await.unwrap_err();
        assert!(err.is_infrastructure(), "{op:?}: {err}");
        harness.faults.heal(op);

        let pending = harness.engine.sessions().get_pending(UserId(32));
        assert_eq!(pending.map(|p| p.payload), Some(id.clone()), "{op:?}");
        assert_eq!(harness.balance(32).await.unwrap(), Some(17));
    }

    let done = harness.send(32, "at dusk").await.unwrap();
    assert_eq!(
        done.outcome,
        DispatchOutcome::Responded {
            kind: InteractionKind::Variation,
            cost: 3
        }
    );
    assert_eq!(texts(&done), vec!["🔄 Variation: a windmill, at dusk".to_string()]);
    assert_eq!(harness.balance(32).await.unwrap(), Some(14));
    assert_eq!(harness.provider.call_count().await, 0);
    assert!(harness.engine.sessions().get_pending(UserId(32)).is_none());
}

#[tokio::test]
async fn failed_history_append_still_leaves_an_audit_row() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.register(33).await.unwrap();

    harness.faults.fail(StoreOp::AppendHistory);
    let err = harness.send(33, "hello").await.unwrap_err();
    assert!(err.is_infrastructure());

    // Debit-first: the token is spent and logged, nothing is remembered.
    assert_eq!(harness.balance(33).await.unwrap(), Some(4));
    let stats = harness.storage.user_stats(UserId(33)).await.unwrap();
    assert_eq!(stats.by_kind.get("chat"), Some(&1));
    assert!(harness.engine.memory().read(UserId(33)).await.unwrap().is_empty());
}

// ---- Conversation memory ----

#[tokio::test]
async fn memory_keeps_the_most_recent_exchanges() {
    let harness = TestHarness::builder()
        .with_config(|config| config.memory.max_entries = 4)
        .with_mock_responses(vec![
            "r1".to_string(),
            "r2".to_string(),
            "r3".to_string(),
            "r4".to_string(),
        ])
        .build()
        .await
        .unwrap();

    for text in ["m1", "m2", "m3", "m4"] {
        harness.send(9, text).await.unwrap();
    }

    let calls = harness.provider.calls().await;
    assert_eq!(calls.len(), 4);
    assert!(calls[0].history.is_empty());
    assert_eq!(calls[2].history.len(), 4);

    let fourth: Vec<&str> = calls[3].history.iter().map(|e| e.content.as_str()).collect();
    assert_eq!(fourth, vec!["m2", "r2", "m3", "r3"]);
    assert_eq!(calls[3].history[0].role, Role::User);
    assert_eq!(calls[3].history[1].role, Role::Assistant);
}

#[tokio::test]
async fn reset_and_toggle_control_memory() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.send(10, "remember me").await.unwrap();

    let reset = harness.send(10, "/reset").await.unwrap();
    assert_eq!(texts(&reset), vec![notices::MEMORY_CLEARED.to_string()]);

    let off = harness.send(10, "/memory").await.unwrap();
    assert_eq!(texts(&off), vec![notices::memory_state(false)]);

    harness.send(10, "not stored").await.unwrap();
    harness.send(10, "still not stored").await.unwrap();
    let calls = harness.provider.calls().await;
    assert!(calls.last().unwrap().history.is_empty());
    assert!(harness.engine.memory().read(UserId(10)).await.unwrap().is_empty());
}

// ---- Provider selection ----

#[tokio::test]
async fn unknown_model_is_rejected_and_current_model_kept() {
    let harness = TestHarness::builder().build().await.unwrap();
    let router = harness.engine.router();

    assert!(!router.set_model("gpt", "gpt-5000"));
    assert_eq!(router.current_model("gpt").as_deref(), Some("gpt-4o"));

    let rejected = harness.admin("/set_model gpt gpt-5000").await.unwrap();
    assert_eq!(rejected.outcome, DispatchOutcome::Rejected);
    assert!(texts(&rejected)[0].starts_with("Unknown model gpt-5000 for GPT."));
    assert_eq!(router.current_model("gpt").as_deref(), Some("gpt-4o"));

    let accepted = harness.admin("/set_model gpt gpt-4-turbo").await.unwrap();
    assert_eq!(accepted.outcome, DispatchOutcome::Handled);
    harness.send(11, "hi").await.unwrap();
    let calls = harness.provider.calls().await;
    assert_eq!(calls.last().unwrap().model, "gpt-4-turbo");
}

#[tokio::test]
async fn preferred_provider_routes_later_messages() {
    let harness = TestHarness::builder().build().await.unwrap();

    let picked = harness.press(12, "model_claude").await.unwrap();
    assert_eq!(picked.outcome, DispatchOutcome::Handled);
    assert_eq!(
        harness.user(12).await.unwrap().unwrap().preferred_provider,
        "claude"
    );

    harness.send(12, "hello claude").await.unwrap();
    let claude = harness.provider_named("claude").unwrap();
    assert_eq!(claude.call_count().await, 1);
    assert_eq!(harness.provider.call_count().await, 0);

    let unknown = harness.press(12, "model_llama").await.unwrap();
    assert_eq!(unknown.outcome, DispatchOutcome::Rejected);
}

// ---- Images ----

#[tokio::test]
async fn image_upscale_and_variation_flow() {
    let harness = TestHarness::builder()
        .with_starting_balance(20)
        .build()
        .await
        .unwrap();

    let image = harness.send(13, "/image a red fox").await.unwrap();
    assert_eq!(
        image.outcome,
        DispatchOutcome::Responded {
            kind: InteractionKind::Image,
            cost: 3
        }
    );
    let id = artifact_id(&image);
    assert_eq!(harness.balance(13).await.unwrap(), Some(17));

    let upscaled = harness.press(13, &format!("upscale_{id}")).await.unwrap();
    assert_eq!(
        upscaled.outcome,
        DispatchOutcome::Responded {
            kind: InteractionKind::Upscale,
            cost: 2
        }
    );
    assert_eq!(harness.balance(13).await.unwrap(), Some(15));

    let waiting = harness.press(13, &format!("variation_{id}")).await.unwrap();
    assert_eq!(texts(&waiting), vec![notices::VARIATION_PROMPT.to_string()]);
    assert_eq!(harness.balance(13).await.unwrap(), Some(15));

    let variation = harness.send(13, "at night").await.unwrap();
    assert_eq!(
        variation.outcome,
        DispatchOutcome::Responded {
            kind: InteractionKind::Variation,
            cost: 3
        }
    );
    assert_eq!(texts(&variation), vec!["🔄 Variation: a red fox, at night".to_string()]);

    let kinds: Vec<RenderKind> = harness.image.calls().await.iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![RenderKind::Generate, RenderKind::Upscale, RenderKind::Variation]
    );
}

#[tokio::test]
async fn pending_variation_is_consumed_exactly_once() {
    let harness = TestHarness::builder()
        .with_starting_balance(20)
        .build()
        .await
        .unwrap();

    let image = harness.send(14, "/image a lighthouse").await.unwrap();
    let id = artifact_id(&image);
    harness.press(14, &format!("variation_{id}")).await.unwrap();

    let (a, b) = tokio::join!(harness.send(14, "in fog"), harness.send(14, "in snow"));
    let kinds = [a.unwrap().outcome, b.unwrap().outcome];

    let variations = kinds
        .iter()
        .filter(|o| matches!(o, DispatchOutcome::Responded { kind: InteractionKind::Variation, .. }))
        .count();
    let chats = kinds
        .iter()
        .filter(|o| matches!(o, DispatchOutcome::Responded { kind: InteractionKind::Chat, .. }))
        .count();
    assert_eq!(variations, 1);
    assert_eq!(chats, 1);

    let renders = harness.image.calls().await;
    assert_eq!(
        renders.iter().filter(|c| c.kind == RenderKind::Variation).count(),
        1
    );
    assert_eq!(harness.balance(14).await.unwrap(), Some(20 - 3 - 3 - 1));
    assert!(harness.engine.sessions().get_pending(UserId(14)).is_none());
}

#[tokio::test]
async fn unfunded_variation_stays_pending() {
    let harness = TestHarness::builder()
        .with_starting_balance(3)
        .build()
        .await
        .unwrap();

    let image = harness.send(15, "/image a boat").await.unwrap();
    let id = artifact_id(&image);
    harness.press(15, &format!("variation_{id}")).await.unwrap();

    let unfunded = harness.send(15, "with sails").await.unwrap();
    assert!(matches!(
        unfunded.outcome,
        DispatchOutcome::Unfunded {
            kind: InteractionKind::Variation,
            ..
        }
    ));
    assert!(harness.engine.sessions().get_pending(UserId(15)).is_some());

    harness.admin("/add_tokens 15 3").await.unwrap();
    let done = harness.send(15, "with sails").await.unwrap();
    assert!(matches!(
        done.outcome,
        DispatchOutcome::Responded {
            kind: InteractionKind::Variation,
            ..
        }
    ));
}

#[tokio::test]
async fn image_failure_apologizes_after_debit() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.image.set_failing(true);

    let dispatch = harness.send(16, "/image a castle").await.unwrap();
    assert_eq!(
        dispatch.outcome,
        DispatchOutcome::Failed {
            kind: InteractionKind::Image,
            cost: 3
        }
    );
    assert_eq!(harness.balance(16).await.unwrap(), Some(2));
    let stats = harness.storage.user_stats(UserId(16)).await.unwrap();
    assert_eq!(stats.by_kind.get("image"), Some(&1));
}

#[tokio::test]
async fn images_disabled_are_rejected_without_charge() {
    let harness = TestHarness::builder().without_image().build().await.unwrap();

    let dispatch = harness.send(17, "/image anything").await.unwrap();
    assert_eq!(dispatch.outcome, DispatchOutcome::Rejected);
    assert_eq!(texts(&dispatch), vec![notices::IMAGES_DISABLED.to_string()]);
    assert_eq!(harness.balance(17).await.unwrap(), Some(5));
}

#[tokio::test]
async fn foreign_artifacts_cannot_be_upscaled() {
    let harness = TestHarness::builder().build().await.unwrap();
    let image = harness.send(18, "/image mine").await.unwrap();
    let id = artifact_id(&image);

    let stolen = harness.press(19, &format!("upscale_{id}")).await.unwrap();
    assert_eq!(stolen.outcome, DispatchOutcome::Rejected);
    assert_eq!(texts(&stolen), vec![notices::ARTIFACT_MISSING.to_string()]);
    assert_eq!(harness.balance(19).await.unwrap(), Some(5));
}

// ---- Admin ----

#[tokio::test]
async fn admin_commands_are_gated_by_username() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.register(20).await.unwrap();

    let denied = harness.send(20, "/add_tokens 20 100").await.unwrap();
    assert_eq!(denied.outcome, DispatchOutcome::Unauthorized);
    assert_eq!(texts(&denied), vec![notices::NOT_AUTHORIZED.to_string()]);
    assert_eq!(harness.balance(20).await.unwrap(), Some(5));

    let denied_button = harness.press(20, "admin_panel").await.unwrap();
    assert_eq!(denied_button.outcome, DispatchOutcome::Unauthorized);

    let granted = harness.admin("/add_tokens 20 100").await.unwrap();
    assert_eq!(granted.outcome, DispatchOutcome::Handled);
    assert_eq!(
        texts(&granted),
        vec!["Successfully added 100 tokens to user 20. New balance: 105.".to_string()]
    );

    let missing = harness.admin("/add_tokens 404 1").await.unwrap();
    assert_eq!(missing.outcome, DispatchOutcome::Rejected);
}

#[tokio::test]
async fn broadcast_counts_failed_deliveries() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.register(21).await.unwrap();
    harness.register(22).await.unwrap();
    harness.channel.fail_for(22).await;

    let dispatch = harness.admin("/broadcast Maintenance tonight").await.unwrap();
    // Recipients: 21, 22 and the admin account itself.
    assert_eq!(
        texts(&dispatch),
        vec!["Broadcast message sent to 2 out of 3 users.".to_string()]
    );
    assert_eq!(
        harness.channel.texts_for(21).await,
        vec!["📢 Broadcast Message\n\nMaintenance tonight".to_string()]
    );
    assert!(harness.channel.texts_for(22).await.is_empty());
    assert_eq!(harness.channel.texts_for(ADMIN_USER_ID).await.len(), 1);
}

#[tokio::test]
async fn admin_settings_are_persisted_and_restored() {
    let harness = TestHarness::builder().build().await.unwrap();

    harness.admin_press("admin_setting_token_cost").await.unwrap();
    assert_eq!(harness.engine.ledger().cost_of(InteractionKind::Chat), 2);
    assert_eq!(
        harness.storage.get_setting("costs.chat").await.unwrap().as_deref(),
        Some("2")
    );

    harness.admin_press("admin_setting_rate_limit").await.unwrap();
    assert_eq!(harness.engine.limiter().limits().max_requests, 5);

    // Simulate a restart reading what an earlier run stored.
    harness.storage.set_setting("limits.max_requests", "20").await.unwrap();
    harness.storage.set_setting("costs.image", "4").await.unwrap();
    harness.engine.restore_settings().await.unwrap();
    assert_eq!(harness.engine.limiter().limits().max_requests, 20);
    assert_eq!(harness.engine.ledger().cost_of(InteractionKind::Image), 4);
    assert_eq!(harness.engine.ledger().cost_of(InteractionKind::Chat), 2);
}

// ---- Subscriptions ----

#[tokio::test]
async fn purchase_credits_tokens_and_monthly_bonus_follows() {
    let harness = TestHarness::builder().build().await.unwrap();

    let bought = harness.press(23, "subscribe_basic").await.unwrap();
    assert_eq!(bought.outcome, DispatchOutcome::Handled);
    assert!(texts(&bought)[0].starts_with("✅ Payment successful!"));
    assert_eq!(harness.balance(23).await.unwrap(), Some(55));
    assert_eq!(harness.payment.settlements().await.len(), 1);

    let user = harness.user(23).await.unwrap().unwrap();
    assert_eq!(user.subscription.as_ref().map(|s| s.tier.as_str()), Some("basic"));

    // Nothing is due right after the purchase.
    assert_eq!(harness.engine.grant_monthly_bonuses(Utc::now()).await.unwrap(), 0);

    let period_end = Utc::now() + chrono::Duration::days(30) + chrono::Duration::hours(1);
    assert_eq!(harness.engine.grant_monthly_bonuses(period_end).await.unwrap(), 1);
    assert_eq!(harness.balance(23).await.unwrap(), Some(65));
    assert_eq!(harness.engine.grant_monthly_bonuses(period_end).await.unwrap(), 0);

    assert!(harness.channel.texts_for(23).await[0].starts_with("🎁 Monthly Bonus!"));
    let stats = harness.storage.user_stats(UserId(23)).await.unwrap();
    assert_eq!(stats.by_model.get("telegram_stars"), Some(&1));
    assert_eq!(stats.by_model.get("monthly"), Some(&1));
}

#[tokio::test]
async fn declined_or_unavailable_payment_adds_nothing() {
    let declined = TestHarness::builder().with_payment(false).build().await.unwrap();
    let dispatch = declined.press(24, "subscribe_premium").await.unwrap();
    assert_eq!(texts(&dispatch), vec![notices::PAYMENT_DECLINED.to_string()]);
    assert_eq!(declined.balance(24).await.unwrap(), Some(5));

    let broken = TestHarness::builder().build().await.unwrap();
    broken.payment.set_broken(true);
    let dispatch = broken.press(24, "subscribe_basic").await.unwrap();
    assert_eq!(texts(&dispatch), vec![notices::PAYMENT_DECLINED.to_string()]);
    assert_eq!(broken.balance(24).await.unwrap(), Some(5));

    let unavailable = TestHarness::builder().without_payment().build().await.unwrap();
    let dispatch = unavailable.press(24, "subscribe_basic").await.unwrap();
    assert_eq!(dispatch.outcome, DispatchOutcome::Rejected);
    assert_eq!(texts(&dispatch), vec![notices::PAYMENTS_UNAVAILABLE.to_string()]);
}

// ---- Delivery ----

#[tokio::test]
async fn dispatch_delivers_replies_and_survives_send_failures() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec!["delivered".to_string(), "lost".to_string()])
        .build()
        .await
        .unwrap();

    let outcome = harness.deliver(&harness.message(25, "hi")).await.unwrap();
    assert!(matches!(outcome, DispatchOutcome::Responded { .. }));
    assert_eq!(harness.channel.texts_for(25).await, vec!["delivered".to_string()]);

    harness.channel.fail_for(25).await;
    let outcome = harness.deliver(&harness.message(25, "again")).await.unwrap();
    assert!(matches!(outcome, DispatchOutcome::Responded { .. }));
    assert_eq!(harness.balance(25).await.unwrap(), Some(3));
}

#[tokio::test]
async fn button_presses_are_acknowledged() {
    let harness = TestHarness::builder().build().await.unwrap();

    let dispatch = harness.press(26, "menu_settings").await.unwrap();
    assert!(matches!(
        dispatch.replies.first(),
        Some(Outbound::CallbackAnswer { .. })
    ));
    assert!(texts(&dispatch)[0].starts_with("⚙️ Settings"));

    let unknown = harness.press(26, "does_not_exist").await.unwrap();
    assert_eq!(unknown.outcome, DispatchOutcome::Rejected);
    assert!(matches!(
        &unknown.replies[..],
        [Outbound::CallbackAnswer { text: Some(text), .. }] if text == notices::UNKNOWN_ACTION
    ));
}
