// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric descriptions and recording helpers.
//!
//! Uses the metrics-rs facade; without an installed recorder every call is
//! a no-op.

use metrics::{describe_counter, describe_histogram};

/// Registers metric descriptions. Call once after installing a recorder.
pub fn register_metrics() {
    describe_counter!("ravyn_dispatch_total", "Inbound events by dispatch outcome");
    describe_counter!("ravyn_tokens_debited_total", "Tokens debited by interaction kind");
    describe_counter!("ravyn_provider_failures_total", "Failed provider calls");
    describe_histogram!(
        "ravyn_generation_latency_seconds",
        "Provider and image call latency in seconds"
    );
}

pub fn record_outcome(outcome: &'static str) {
    metrics::counter!("ravyn_dispatch_total", "outcome" => outcome).increment(1);
}

pub fn record_debit(kind: &str, tokens: i64) {
    metrics::counter!("ravyn_tokens_debited_total", "kind" => kind.to_string())
        .increment(tokens.max(0) as u64);
}

pub fn record_provider_failure(provider: &str) {
    metrics::counter!("ravyn_provider_failures_total", "provider" => provider.to_string())
        .increment(1);
}

pub fn record_latency(seconds: f64) {
    metrics::histogram!("ravyn_generation_latency_seconds").record(seconds);
}
