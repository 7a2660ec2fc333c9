// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token balance queries.
//!
//! Every mutation is a single conditional `UPDATE ... RETURNING` so the
//! check and the change happen in one step on the writer thread.

use ravyn_core::{RavynError, UserId};
use rusqlite::params;
use rusqlite::OptionalExtension;

use crate::database::{map_tr_err, Database};

pub async fn balance(db: &Database, user_id: UserId) -> Result<Option<i64>, RavynError> {
    db.connection()
        .call(move |conn| -> Result<_, rusqlite::Error> {
            conn.query_row(
                "SELECT tokens FROM users WHERE user_id = ?1",
                params![user_id.0],
                |row| row.get::<_, i64>(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Debits `amount` if the balance covers it; `None` when it does not.
pub async fn debit_if_sufficient(
    db: &Database,
    user_id: UserId,
    amount: i64,
) -> Result<Option<i64>, RavynError> {
    db.connection()
        .call(move |conn| -> Result<_, rusqlite::Error> {
            conn.query_row(
                "UPDATE users SET tokens = tokens - ?1 \
                 WHERE user_id = ?2 AND tokens >= ?1 \
                 RETURNING tokens",
                params![amount, user_id.0],
                |row| row.get::<_, i64>(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn credit(db: &Database, user_id: UserId, amount: i64) -> Result<Option<i64>, RavynError> {
    db.connection()
        .call(move |conn| -> Result<_, rusqlite::Error> {
            conn.query_row(
                "UPDATE users SET tokens = tokens + ?1 WHERE user_id = ?2 RETURNING tokens",
                params![amount, user_id.0],
                |row| row.get::<_, i64>(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}
