// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key/value runtime settings.

use chrono::Utc;
use ravyn_core::types::format_timestamp;
use ravyn_core::RavynError;
use rusqlite::params;
use rusqlite::OptionalExtension;

use crate::database::{map_tr_err, Database};

pub async fn set_setting(db: &Database, key: &str, value: &str) -> Result<(), RavynError> {
    let key = key.to_string();
    let value = value.to_string();
    let now = format_timestamp(&Utc::now());
    db.connection()
        .call(move |conn| -> Result<_, rusqlite::Error> {
            conn.execute(
                "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_setting(db: &Database, key: &str) -> Result<Option<String>, RavynError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| -> Result<_, rusqlite::Error> {
            conn.query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}
