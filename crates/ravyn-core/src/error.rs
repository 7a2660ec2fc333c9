// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Ravyn dispatch gateway.
//!
//! Admission rejections (rate limited, insufficient balance) are not errors
//! and never appear here; they are ordinary dispatch outcomes.

use thiserror::Error;

/// Failure type for every adapter call and engine operation.
#[derive(Debug, Error)]
pub enum RavynError {
    /// Bad or missing settings, including absent API keys.
    #[error("configuration error: {0}")]
    Config(String),

    /// Backing store unavailable or a query failed.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Telegram rejected or could not receive a send.
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Upstream generation failed (non-success status, malformed payload).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Malformed input, unknown command, or an invalid model name.
    #[error("validation error: {0}")]
    Validation(String),

    /// Payment settlement failed outright (not a declined payment).
    #[error("payment error: {message}")]
    Payment { message: String },

    /// A provider or image call exceeded its deadline.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    #[error("internal error: {0}")]
    Internal(String),
}

impl RavynError {
    /// Returns true for failures of the backing store.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, RavynError::Storage { .. })
    }
}
