// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account queries.

use chrono::{DateTime, Utc};
use ravyn_core::types::{
    format_timestamp, ImagePreferences, NewUser, Preference, Subscription, UserAccount,
};
use ravyn_core::{RavynError, UserId};
use rusqlite::params;
use rusqlite::types::Value;
use rusqlite::OptionalExtension;

use crate::database::{map_tr_err, Database};
use crate::queries::{optional_timestamp_at, timestamp_at};

const USER_COLUMNS: &str = "user_id, username, language, tokens, preferred_provider, \
     memory_enabled, is_banned, image_style, image_size, image_quality, subscription_tier, \
     subscription_started_at, subscription_expires_at, last_bonus_at, created_at, last_activity";

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserAccount> {
    let tier: Option<String> = row.get(10)?;
    let started = optional_timestamp_at(row, 11)?;
    let expires = optional_timestamp_at(row, 12)?;
    let subscription = match (tier, started, expires) {
        (Some(tier), Some(started_at), Some(expires_at)) => Some(Subscription {
            tier,
            started_at,
            expires_at,
            last_bonus_at: optional_timestamp_at(row, 13)?,
        }),
        _ => None,
    };

    Ok(UserAccount {
        user_id: UserId(row.get(0)?),
        username: row.get(1)?,
        language: row.get(2)?,
        tokens: row.get(3)?,
        preferred_provider: row.get(4)?,
        memory_enabled: row.get(5)?,
        is_banned: row.get(6)?,
        image: ImagePreferences {
            style: row.get(7)?,
            size: row.get(8)?,
            quality: row.get(9)?,
        },
        subscription,
        created_at: timestamp_at(row, 14)?,
        last_activity: timestamp_at(row, 15)?,
    })
}

pub async fn get_user(db: &Database, user_id: UserId) -> Result<Option<UserAccount>, RavynError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1");
    db.connection()
        .call(move |conn| -> Result<_, rusqlite::Error> {
            let mut stmt = conn.prepare(&sql)?;
            match stmt.query_row(params![user_id.0], row_to_user) {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Inserts the account if absent, refreshing activity either way.
///
/// A single upsert, so two first events for the same user both see one row
/// and the starting balance is granted once.
pub async fn ensure_user(
    db: &Database,
    new_user: &NewUser,
    now: DateTime<Utc>,
) -> Result<UserAccount, RavynError> {
    let sql = format!(
        "INSERT INTO users (user_id, username, tokens, preferred_provider, memory_enabled, \
             image_style, image_size, image_quality, created_at, last_activity) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9) \
         ON CONFLICT(user_id) DO UPDATE SET \
             last_activity = excluded.last_activity, \
             username = COALESCE(excluded.username, users.username) \
         RETURNING {USER_COLUMNS}"
    );
    let new_user = new_user.clone();
    let now = format_timestamp(&now);
    db.connection()
        .call(move |conn| -> Result<_, rusqlite::Error> {
            conn.query_row(
                &sql,
                params![
                    new_user.user_id.0,
                    new_user.username,
                    new_user.starting_balance,
                    new_user.preferred_provider,
                    new_user.memory_enabled,
                    new_user.image.style,
                    new_user.image.size,
                    new_user.image.quality,
                    now,
                ],
                row_to_user,
            )
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_users(
    db: &Database,
    limit: i64,
    offset: i64,
) -> Result<Vec<UserAccount>, RavynError> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY last_activity DESC, user_id LIMIT ?1 OFFSET ?2"
    );
    db.connection()
        .call(move |conn| -> Result<_, rusqlite::Error> {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![limit, offset], row_to_user)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_preference(
    db: &Database,
    user_id: UserId,
    preference: &Preference,
) -> Result<bool, RavynError> {
    let (column, value) = match preference {
        Preference::Provider(p) => ("preferred_provider", Value::Text(p.clone())),
        Preference::Language(l) => ("language", Value::Text(l.clone())),
        Preference::ImageStyle(s) => ("image_style", Value::Text(s.clone())),
        Preference::MemoryEnabled(b) => ("memory_enabled", Value::Integer(i64::from(*b))),
    };
    let sql = format!("UPDATE users SET {column} = ?1 WHERE user_id = ?2");
    db.connection()
        .call(move |conn| -> Result<_, rusqlite::Error> {
            let changed = conn.execute(&sql, params![value, user_id.0])?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn toggle_memory(db: &Database, user_id: UserId) -> Result<Option<bool>, RavynError> {
    db.connection()
        .call(move |conn| -> Result<_, rusqlite::Error> {
            conn.query_row(
                "UPDATE users SET memory_enabled = NOT memory_enabled WHERE user_id = ?1 \
                 RETURNING memory_enabled",
                params![user_id.0],
                |row| row.get::<_, bool>(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_banned(db: &Database, user_id: UserId, banned: bool) -> Result<bool, RavynError> {
    db.connection()
        .call(move |conn| -> Result<_, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE users SET is_banned = ?1 WHERE user_id = ?2",
                params![banned, user_id.0],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_subscription(
    db: &Database,
    user_id: UserId,
    subscription: &Subscription,
) -> Result<bool, RavynError> {
    let tier = subscription.tier.clone();
    let started = format_timestamp(&subscription.started_at);
    let expires = format_timestamp(&subscription.expires_at);
    let last_bonus = subscription.last_bonus_at.as_ref().map(format_timestamp);
    db.connection()
        .call(move |conn| -> Result<_, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE users SET subscription_tier = ?1, subscription_started_at = ?2, \
                     subscription_expires_at = ?3, last_bonus_at = ?4 \
                 WHERE user_id = ?5",
                params![tier, started, expires, last_bonus, user_id.0],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_subscribers(db: &Database) -> Result<Vec<UserAccount>, RavynError> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users WHERE subscription_tier IS NOT NULL ORDER BY user_id"
    );
    db.connection()
        .call(move |conn| -> Result<_, rusqlite::Error> {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], row_to_user)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Conditional credit for the monthly subscriber bonus.
///
/// The due check and the credit are one statement, so two overlapping
/// bonus sweeps cannot both pay. A subscription that was still active when
/// the period began earns that period's bonus even if it has lapsed since.
pub async fn grant_bonus_if_due(
    db: &Database,
    user_id: UserId,
    amount: i64,
    due_before: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Option<i64>, RavynError> {
    let due_before = format_timestamp(&due_before);
    let now = format_timestamp(&now);
    db.connection()
        .call(move |conn| -> Result<_, rusqlite::Error> {
            conn.query_row(
                "UPDATE users SET tokens = tokens + ?1, last_bonus_at = ?2 \
                 WHERE user_id = ?3 \
                   AND subscription_tier IS NOT NULL \
                   AND subscription_expires_at > ?4 \
                   AND COALESCE(last_bonus_at, subscription_started_at) <= ?4 \
                 RETURNING tokens",
                params![amount, now, user_id.0, due_before],
                |row| row.get::<_, i64>(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::{new_user, setup_db};

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[tokio::test]
    async fn ensure_user_creates_once_with_starting_balance() {
        let (db, _dir) = setup_db().await;

        let first = ensure_user(&db, &new_user(7, 5), ts("2026-01-01T00:00:00Z"))
            .await
            .unwrap();
        assert_eq!(first.tokens, 5);
        assert_eq!(first.language, "en");
        assert!(first.memory_enabled);
        assert!(first.subscription.is_none());

        // A second sighting must not re-grant the starting balance.
        let mut again = new_user(7, 50);
        again.username = None;
        let second = ensure_user(&db, &again, ts("2026-01-02T00:00:00Z"))
            .await
            .unwrap();
        assert_eq!(second.tokens, 5);
        assert_eq!(second.username.as_deref(), Some("user7"));
        assert_eq!(second.created_at, ts("2026-01-01T00:00:00Z"));
        assert_eq!(second.last_activity, ts("2026-01-02T00:00:00Z"));
    }

    #[tokio::test]
    async fn get_user_missing_returns_none() {
        let (db, _dir) = setup_db().await;
        assert!(get_user(&db, UserId(404)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn preferences_and_flags_update() {
        let (db, _dir) = setup_db().await;
        ensure_user(&db, &new_user(1, 5), Utc::now()).await.unwrap();

        assert!(
            set_preference(&db, UserId(1), &Preference::Provider("claude".into()))
                .await
                .unwrap()
        );
        assert!(
            set_preference(&db, UserId(1), &Preference::Language("ar".into()))
                .await
                .unwrap()
        );
        assert!(
            set_preference(&db, UserId(1), &Preference::ImageStyle("anime".into()))
                .await
                .unwrap()
        );
        assert!(
            !set_preference(&db, UserId(2), &Preference::Language("ar".into()))
                .await
                .unwrap()
        );

        assert_eq!(toggle_memory(&db, UserId(1)).await.unwrap(), Some(false));
        assert_eq!(toggle_memory(&db, UserId(1)).await.unwrap(), Some(true));
        assert_eq!(toggle_memory(&db, UserId(2)).await.unwrap(), None);

        assert!(set_banned(&db, UserId(1), true).await.unwrap());

        let user = get_user(&db, UserId(1)).await.unwrap().unwrap();
        assert_eq!(user.preferred_provider, "claude");
        assert_eq!(user.language, "ar");
        assert_eq!(user.image.style, "anime");
        assert!(user.is_banned);
    }

    #[tokio::test]
    async fn subscription_round_trips_and_lists() {
        let (db, _dir) = setup_db().await;
        ensure_user(&db, &new_user(1, 0), Utc::now()).await.unwrap();
        ensure_user(&db, &new_user(2, 0), Utc::now()).await.unwrap();

        let sub = Subscription {
            tier: "basic".into(),
            started_at: ts("2026-01-01T00:00:00Z"),
            expires_at: ts("2026-01-31T00:00:00Z"),
            last_bonus_at: None,
        };
        assert!(set_subscription(&db, UserId(2), &sub).await.unwrap());

        let subs = list_subscribers(&db).await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].user_id, UserId(2));
        assert_eq!(subs[0].subscription.as_ref(), Some(&sub));
        assert!(subs[0].is_premium());
    }

    #[tokio::test]
    async fn bonus_is_granted_once_per_period() {
        let (db, _dir) = setup_db().await;
        ensure_user(&db, &new_user(1, 10), Utc::now()).await.unwrap();
        let sub = Subscription {
            tier: "basic".into(),
            started_at: ts("2026-01-01T00:00:00Z"),
            expires_at: ts("2026-03-01T00:00:00Z"),
            last_bonus_at: None,
        };
        set_subscription(&db, UserId(1), &sub).await.unwrap();

        // Not yet due: last reference point is after the cutoff.
        let early = grant_bonus_if_due(
            &db,
            UserId(1),
            10,
            ts("2025-12-31T00:00:00Z"),
            ts("2026-01-30T00:00:00Z"),
        )
        .await
        .unwrap();
        assert_eq!(early, None);

        let now = ts("2026-02-01T00:00:00Z");
        let cutoff = ts("2026-01-02T00:00:00Z");
        let granted = grant_bonus_if_due(&db, UserId(1), 10, cutoff, now)
            .await
            .unwrap();
        assert_eq!(granted, Some(20));

        // Same sweep again: last_bonus_at moved past the cutoff.
        let again = grant_bonus_if_due(&db, UserId(1), 10, cutoff, now)
            .await
            .unwrap();
        assert_eq!(again, None);

        let user = get_user(&db, UserId(1)).await.unwrap().unwrap();
        assert_eq!(
            user.subscription.unwrap().last_bonus_at,
            Some(ts("2026-02-01T00:00:00Z"))
        );
    }

    #[tokio::test]
    async fn lapsed_subscription_earns_its_last_period_only() {
        let (db, _dir) = setup_db().await;
        ensure_user(&db, &new_user(1, 0), Utc::now()).await.unwrap();
        let sub = Subscription {
            tier: "basic".into(),
            started_at: ts("2026-01-01T00:00:00Z"),
            expires_at: ts("2026-01-31T00:00:00Z"),
            last_bonus_at: None,
        };
        set_subscription(&db, UserId(1), &sub).await.unwrap();

        let granted = grant_bonus_if_due(
            &db,
            UserId(1),
            10,
            ts("2026-01-01T01:00:00Z"),
            ts("2026-01-31T01:00:00Z"),
        )
        .await
        .unwrap();
        assert_eq!(granted, Some(10));

        let later = grant_bonus_if_due(
            &db,
            UserId(1),
            10,
            ts("2026-01-31T02:00:00Z"),
            ts("2026-03-02T02:00:00Z"),
        )
        .await
        .unwrap();
        assert_eq!(later, None);
    }

    #[tokio::test]
    async fn list_users_pages() {
        let (db, _dir) = setup_db().await;
        for id in 1..=5 {
            ensure_user(&db, &new_user(id, 0), Utc::now()).await.unwrap();
        }
        assert_eq!(list_users(&db, 2, 0).await.unwrap().len(), 2);
        assert_eq!(list_users(&db, 10, 4).await.unwrap().len(), 1);
    }
}
