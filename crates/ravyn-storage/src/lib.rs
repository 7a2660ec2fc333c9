// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite storage for the Ravyn dispatch gateway.
//!
//! Accounts, balances, conversation memory, the interaction log, image
//! artifacts, and runtime settings all live in one WAL-mode database
//! accessed through a single tokio-rusqlite writer connection.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
