// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Ravyn dispatch gateway.
//!
//! This crate provides the error taxonomy, domain types, normalized events,
//! and the adapter traits every store, provider, and transport implements.

pub mod error;
pub mod event;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::RavynError;
pub use event::{
    AdminAction, Button, CallbackAction, Command, EventKind, InboundEvent, Keyboard, MenuTarget,
    Outbound,
};
pub use types::{
    AdapterType, Artifact, ConversationExchange, HealthStatus, InteractionKind,
    InteractionLogEntry, Role, UserAccount, UserId,
};

pub use traits::{
    ChannelAdapter, ImageAdapter, PaymentAdapter, PluginAdapter, ProviderAdapter, StorageAdapter,
};
