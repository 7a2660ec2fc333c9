// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation memory queries.

use chrono::Utc;
use ravyn_core::types::{format_timestamp, ConversationExchange, Role};
use ravyn_core::{RavynError, UserId};
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::queries::enum_at;

pub async fn read_history(
    db: &Database,
    user_id: UserId,
) -> Result<Vec<ConversationExchange>, RavynError> {
    db.connection()
        .call(move |conn| -> Result<_, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT role, content FROM conversation_entries WHERE user_id = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![user_id.0], |row| {
                Ok(ConversationExchange {
                    role: enum_at::<Role>(row, 0)?,
                    content: row.get(1)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Appends one user/assistant pair and keeps only the newest `max_entries`.
pub async fn append_exchange(
    db: &Database,
    user_id: UserId,
    user_text: &str,
    assistant_text: &str,
    max_entries: usize,
) -> Result<(), RavynError> {
    let user_text = user_text.to_string();
    let assistant_text = assistant_text.to_string();
    let keep = i64::try_from(max_entries).unwrap_or(i64::MAX);
    let now = format_timestamp(&Utc::now());
    db.connection()
        .call(move |conn| -> Result<_, rusqlite::Error> {
            let tx = conn.transaction()?;
            {
                let mut insert = tx.prepare(
                    "INSERT INTO conversation_entries (user_id, role, content, created_at) \
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                insert.execute(params![user_id.0, Role::User.to_string(), user_text, now])?;
                insert.execute(params![
                    user_id.0,
                    Role::Assistant.to_string(),
                    assistant_text,
                    now
                ])?;
            }
            tx.execute(
                "DELETE FROM conversation_entries WHERE user_id = ?1 AND id NOT IN ( \
                     SELECT id FROM conversation_entries WHERE user_id = ?1 \
                     ORDER BY id DESC LIMIT ?2)",
                params![user_id.0, keep],
            )?;
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn clear_history(db: &Database, user_id: UserId) -> Result<(), RavynError> {
    db.connection()
        .call(move |conn| -> Result<_, rusqlite::Error> {
            conn.execute(
                "DELETE FROM conversation_entries WHERE user_id = ?1",
                params![user_id.0],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
