// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Ravyn integration testing.
//!
//! Provides mock adapters and a [`TestHarness`] that builds a complete
//! dispatch engine over a temp SQLite database.

pub mod faulty_storage;
pub mod harness;
pub mod mock_channel;
pub mod mock_image;
pub mod mock_payment;
pub mod mock_provider;

pub use faulty_storage::{FaultyStorage, StoreOp};
pub use harness::{ADMIN_USER_ID, ADMIN_USERNAME, TestHarness, TestHarnessBuilder};
pub use mock_channel::MockChannel;
pub use mock_image::{MockImage, RenderCall, RenderKind};
pub use mock_payment::{MockPayment, Settlement};
pub use mock_provider::{MockProvider, ProviderCall};
