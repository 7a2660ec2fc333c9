// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation memory for the Ravyn dispatch gateway.
//!
//! Each user has an ordered, capped list of user/assistant entries. When a
//! new pair pushes the list over its cap, the oldest pair is evicted first.
//! Memory can be switched off per user, in which case reads are empty and
//! appends are dropped.

pub mod memory;

pub use memory::ConversationMemory;
