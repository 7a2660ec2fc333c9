// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request admission and dispatch for the Ravyn gateway.
//!
//! The [`DispatchEngine`] is the composition root. For each normalized
//! event it:
//! - drops duplicate deliveries by update id
//! - refuses banned users
//! - admits the request through the per-user [`RateLimiter`]
//! - debits the current cost through the token ledger
//! - completes a pending action from the [`SessionStore`], or routes the
//!   message to the user's provider with their conversation memory
//!
//! Commands, callbacks, the admin panel and subscriptions hang off the
//! same engine.

mod admin;
mod callbacks;
mod commands;
pub mod engine;
pub mod notices;
pub mod rate_limit;
pub mod recording;
pub mod replay;
pub mod session;
pub mod shutdown;
pub mod subscription;

pub use engine::{Adapters, Dispatch, DispatchEngine, DispatchOutcome};
pub use rate_limit::{RateLimit, RateLimiter};
pub use replay::ReplayGuard;
pub use session::{PendingKind, PendingSession, SessionStore};
pub use shutdown::install_signal_handler;
pub use subscription::run_bonus_task;
