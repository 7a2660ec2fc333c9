// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interaction log queries and aggregates.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ravyn_core::types::{format_timestamp, GlobalStats, InteractionKind, InteractionLogEntry, UserStats};
use ravyn_core::{RavynError, UserId};
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::queries::{enum_at, timestamp_at};

/// `kind IN (...)` clause matching the kinds that consume tokens.
fn billable_clause() -> String {
    let kinds: Vec<String> = InteractionKind::BILLABLE
        .iter()
        .map(|k| format!("'{k}'"))
        .collect();
    format!("kind IN ({})", kinds.join(", "))
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<InteractionLogEntry> {
    Ok(InteractionLogEntry {
        id: row.get(0)?,
        user_id: UserId(row.get(1)?),
        kind: enum_at(row, 2)?,
        model: row.get(3)?,
        tokens: row.get(4)?,
        created_at: timestamp_at(row, 5)?,
    })
}

fn grouped_counts(
    conn: &rusqlite::Connection,
    sql: &str,
    param: Option<i64>,
) -> rusqlite::Result<BTreeMap<String, i64>> {
    let mut stmt = conn.prepare(sql)?;
    let map_row = |row: &rusqlite::Row<'_>| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?));
    let rows = match param {
        Some(p) => stmt
            .query_map(params![p], map_row)?
            .collect::<rusqlite::Result<BTreeMap<String, i64>>>()?,
        None => stmt
            .query_map([], map_row)?
            .collect::<rusqlite::Result<BTreeMap<String, i64>>>()?,
    };
    Ok(rows)
}

pub async fn record_interaction(
    db: &Database,
    entry: &InteractionLogEntry,
) -> Result<(), RavynError> {
    let entry = entry.clone();
    db.connection()
        .call(move |conn| -> Result<_, rusqlite::Error> {
            conn.execute(
                "INSERT INTO interactions (id, user_id, kind, model, tokens, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    entry.id,
                    entry.user_id.0,
                    entry.kind.to_string(),
                    entry.model,
                    entry.tokens,
                    format_timestamp(&entry.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Most recent first.
pub async fn recent_interactions(
    db: &Database,
    user_id: UserId,
    limit: i64,
) -> Result<Vec<InteractionLogEntry>, RavynError> {
    db.connection()
        .call(move |conn| -> Result<_, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, kind, model, tokens, created_at FROM interactions \
                 WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![user_id.0, limit], row_to_entry)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Counts every logged interaction; `total_tokens` sums billable kinds only.
pub async fn user_stats(db: &Database, user_id: UserId) -> Result<UserStats, RavynError> {
    let billable = billable_clause();
    db.connection()
        .call(move |conn| -> Result<_, rusqlite::Error> {
            let total_interactions: i64 = conn.query_row(
                "SELECT COUNT(*) FROM interactions WHERE user_id = ?1",
                params![user_id.0],
                |row| row.get(0),
            )?;
            let total_tokens: i64 = conn.query_row(
                &format!(
                    "SELECT COALESCE(SUM(tokens), 0) FROM interactions \
                     WHERE user_id = ?1 AND {billable}"
                ),
                params![user_id.0],
                |row| row.get(0),
            )?;
            let by_model = grouped_counts(
                conn,
                "SELECT model, COUNT(*) FROM interactions WHERE user_id = ?1 GROUP BY model",
                Some(user_id.0),
            )?;
            let by_kind = grouped_counts(
                conn,
                "SELECT kind, COUNT(*) FROM interactions WHERE user_id = ?1 GROUP BY kind",
                Some(user_id.0),
            )?;
            Ok(UserStats {
                total_interactions,
                total_tokens,
                by_model,
                by_kind,
            })
        })
        .await
        .map_err(map_tr_err)
}

pub async fn global_stats(
    db: &Database,
    active_since: DateTime<Utc>,
) -> Result<GlobalStats, RavynError> {
    let billable = billable_clause();
    let active_since = format_timestamp(&active_since);
    db.connection()
        .call(move |conn| -> Result<_, rusqlite::Error> {
            let total_users: i64 =
                conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            let active_today: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE last_activity >= ?1",
                params![active_since],
                |row| row.get(0),
            )?;
            let total_interactions: i64 =
                conn.query_row("SELECT COUNT(*) FROM interactions", [], |row| row.get(0))?;
            let total_tokens: i64 = conn.query_row(
                &format!("SELECT COALESCE(SUM(tokens), 0) FROM interactions WHERE {billable}"),
                [],
                |row| row.get(0),
            )?;
            let by_model = grouped_counts(
                conn,
                "SELECT model, COUNT(*) FROM interactions GROUP BY model",
                None,
            )?;
            let by_kind = grouped_counts(
                conn,
                "SELECT kind, COUNT(*) FROM interactions GROUP BY kind",
                None,
            )?;
            Ok(GlobalStats {
                total_users,
                active_today,
                total_interactions,
                total_tokens,
                by_model,
                by_kind,
            })
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::{new_user, setup_db};
    use crate::queries::users::ensure_user;

    fn entry(id: &str, user: i64, kind: InteractionKind, model: &str, tokens: i64, at: &str) -> InteractionLogEntry {
        InteractionLogEntry {
            id: id.into(),
            user_id: UserId(user),
            kind,
            model: model.into(),
            tokens,
            created_at: DateTime::parse_from_rfc3339(at).unwrap().with_timezone(&Utc),
        }
    }

    #[tokio::test]
    async fn recent_is_newest_first() {
        let (db, _dir) = setup_db().await;
        record_interaction(&db, &entry("a", 1, InteractionKind::Chat, "gpt", 1, "2026-01-01T00:00:00Z"))
            .await
            .unwrap();
        record_interaction(&db, &entry("b", 1, InteractionKind::Image, "dall-e-3", 3, "2026-01-02T00:00:00Z"))
            .await
            .unwrap();
        record_interaction(&db, &entry("c", 2, InteractionKind::Chat, "claude", 1, "2026-01-03T00:00:00Z"))
            .await
            .unwrap();

        let recent = recent_interactions(&db, UserId(1), 10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, "b");
        assert_eq!(recent[0].kind, InteractionKind::Image);
        assert_eq!(recent[1].id, "a");
    }

    #[tokio::test]
    async fn stats_separate_spend_from_purchases() {
        let (db, _dir) = setup_db().await;
        ensure_user(&db, &new_user(1, 0), Utc::now()).await.unwrap();
        record_interaction(&db, &entry("a", 1, InteractionKind::Chat, "gpt", 1, "2026-01-01T00:00:00Z"))
            .await
            .unwrap();
        record_interaction(&db, &entry("b", 1, InteractionKind::Chat, "gpt", 1, "2026-01-01T00:01:00Z"))
            .await
            .unwrap();
        record_interaction(&db, &entry("c", 1, InteractionKind::Purchase, "basic", 50, "2026-01-01T00:02:00Z"))
            .await
            .unwrap();

        let stats = user_stats(&db, UserId(1)).await.unwrap();
        assert_eq!(stats.total_interactions, 3);
        assert_eq!(stats.total_tokens, 2);
        assert_eq!(stats.by_model.get("gpt"), Some(&2));
        assert_eq!(stats.by_kind.get("purchase"), Some(&1));

        let global = global_stats(
            &db,
            DateTime::parse_from_rfc3339("2000-01-01T00:00:00Z").unwrap().with_timezone(&Utc),
        )
        .await
        .unwrap();
        assert_eq!(global.total_users, 1);
        assert_eq!(global.active_today, 1);
        assert_eq!(global.total_interactions, 3);
        assert_eq!(global.total_tokens, 2);
    }

    #[tokio::test]
    async fn empty_log_has_zero_stats() {
        let (db, _dir) = setup_db().await;
        let stats = user_stats(&db, UserId(1)).await.unwrap();
        assert_eq!(stats, UserStats::default());
    }
}
