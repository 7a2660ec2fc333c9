// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seams between the dispatch engine and everything outside the process.
//!
//! Each adapter is held as `Arc<dyn ...>`, so the traits go through
//! `#[async_trait]`; [`PluginAdapter`] is the common supertrait.

pub mod adapter;
pub mod channel;
pub mod image;
pub mod payment;
pub mod provider;
pub mod storage;

pub use adapter::PluginAdapter;
pub use channel::ChannelAdapter;
pub use image::ImageAdapter;
pub use payment::PaymentAdapter;
pub use provider::ProviderAdapter;
pub use storage::StorageAdapter;
