// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider routing for the Ravyn dispatch gateway.
//!
//! [`ProviderRouter`] maps a provider name to a registered
//! [`ProviderAdapter`](ravyn_core::ProviderAdapter), falling back to a fixed
//! provider for unknown names. It owns the selected model of each provider
//! and turns every provider failure into a fixed apology text.

pub mod router;

pub use router::{Generation, ProviderRouter};
