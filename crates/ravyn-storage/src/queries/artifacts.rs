// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generated image records.

use ravyn_core::types::format_timestamp;
use ravyn_core::{Artifact, RavynError, UserId};
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::queries::timestamp_at;

pub async fn put_artifact(db: &Database, artifact: &Artifact) -> Result<(), RavynError> {
    let artifact = artifact.clone();
    db.connection()
        .call(move |conn| -> Result<_, rusqlite::Error> {
            conn.execute(
                "INSERT OR REPLACE INTO artifacts (id, user_id, prompt, style, location, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    artifact.id,
                    artifact.user_id.0,
                    artifact.prompt,
                    artifact.style,
                    artifact.location,
                    format_timestamp(&artifact.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_artifact(db: &Database, id: &str) -> Result<Option<Artifact>, RavynError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<_, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, prompt, style, location, created_at FROM artifacts WHERE id = ?1",
            )?;
            match stmt.query_row(params![id], |row| {
                Ok(Artifact {
                    id: row.get(0)?,
                    user_id: UserId(row.get(1)?),
                    prompt: row.get(2)?,
                    style: row.get(3)?,
                    location: row.get(4)?,
                    created_at: timestamp_at(row, 5)?,
                })
            }) {
                Ok(artifact) => Ok(Some(artifact)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::queries::test_support::setup_db;

    #[tokio::test]
    async fn put_then_get() {
        let (db, _dir) = setup_db().await;
        let artifact = Artifact {
            id: "abc123".into(),
            user_id: UserId(4),
            prompt: "a red fox".into(),
            style: Some("anime".into()),
            location: "https://img.example/fox.png".into(),
            created_at: Utc::now(),
        };
        put_artifact(&db, &artifact).await.unwrap();

        let loaded = get_artifact(&db, "abc123").await.unwrap().unwrap();
        assert_eq!(loaded.prompt, "a red fox");
        assert_eq!(loaded.style.as_deref(), Some("anime"));
        assert!(get_artifact(&db, "missing").await.unwrap().is_none());
    }
}
