// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only interaction log and the aggregates read back from it.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use ravyn_core::types::{GlobalStats, UserStats};
use ravyn_core::{InteractionKind, InteractionLogEntry, RavynError, StorageAdapter, UserId};
use serde::Serialize;
use tracing::info;

/// One day of a user's usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyUsage {
    pub date: NaiveDate,
    pub interactions: i64,
    /// Tokens spent on billable kinds.
    pub tokens: i64,
}

/// Writes [`InteractionLogEntry`] rows and reads usage aggregates.
pub struct InteractionRecorder {
    storage: Arc<dyn StorageAdapter>,
}

impl InteractionRecorder {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Appends one entry stamped with the current time.
    pub async fn record(
        &self,
        user_id: UserId,
        kind: InteractionKind,
        model: &str,
        tokens: i64,
    ) -> Result<InteractionLogEntry, RavynError> {
        let entry = InteractionLogEntry {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            kind,
            model: model.to_string(),
            tokens,
            created_at: Utc::now(),
        };
        self.storage.record_interaction(&entry).await?;
        info!(
            user_id = %user_id,
            kind = %kind,
            model = %model,
            tokens,
            "interaction recorded"
        );
        Ok(entry)
    }

    pub async fn user_stats(&self, user_id: UserId) -> Result<UserStats, RavynError> {
        self.storage.user_stats(user_id).await
    }

    /// Global totals, counting users active since midnight UTC of `now`.
    pub async fn global_stats(&self, now: DateTime<Utc>) -> Result<GlobalStats, RavynError> {
        let midnight = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|t| t.and_utc())
            .unwrap_or(now);
        self.storage.global_stats(midnight).await
    }

    /// Usage grouped by UTC day, newest day first, over the last `limit` entries.
    pub async fn usage_by_day(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<DailyUsage>, RavynError> {
        let entries = self.storage.recent_interactions(user_id, limit).await?;
        Ok(group_by_day(&entries))
    }
}

fn group_by_day(entries: &[InteractionLogEntry]) -> Vec<DailyUsage> {
    let mut days: BTreeMap<NaiveDate, (i64, i64)> = BTreeMap::new();
    for entry in entries {
        let slot = days.entry(entry.created_at.date_naive()).or_default();
        slot.0 += 1;
        if entry.kind.is_billable() {
            slot.1 += entry.tokens;
        }
    }
    days.into_iter()
        .rev()
        .map(|(date, (interactions, tokens))| DailyUsage {
            date,
            interactions,
            tokens,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{storage, user_with_balance};

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn entry(kind: InteractionKind, tokens: i64, when: &str) -> InteractionLogEntry {
        InteractionLogEntry {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: UserId(1),
            kind,
            model: "gpt".into(),
            tokens,
            created_at: at(when),
        }
    }

    #[test]
    fn group_by_day_counts_and_sums_billable_only() {
        let entries = vec![
            entry(InteractionKind::Chat, 1, "2026-02-02T10:00:00Z"),
            entry(InteractionKind::Purchase, 50, "2026-02-02T11:00:00Z"),
            entry(InteractionKind::Image, 3, "2026-02-01T09:00:00Z"),
        ];
        let days = group_by_day(&entries);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2026, 2, 2).unwrap());
        assert_eq!(days[0].interactions, 2);
        assert_eq!(days[0].tokens, 1);
        assert_eq!(days[1].tokens, 3);
    }

    #[tokio::test]
    async fn record_is_visible_in_stats() {
        let (storage, _dir) = storage().await;
        user_with_balance(&storage, 1, 0).await;
        let recorder = InteractionRecorder::new(storage);

        let logged = recorder
            .record(UserId(1), InteractionKind::Chat, "gpt", 1)
            .await
            .unwrap();
        assert_eq!(logged.tokens, 1);
        recorder
            .record(UserId(1), InteractionKind::Feedback, "positive", 0)
            .await
            .unwrap();

        let stats = recorder.user_stats(UserId(1)).await.unwrap();
        assert_eq!(stats.total_interactions, 2);
        assert_eq!(stats.total_tokens, 1);

        let global = recorder.global_stats(Utc::now()).await.unwrap();
        assert_eq!(global.total_users, 1);
        assert_eq!(global.active_today, 1);

        let days = recorder.usage_by_day(UserId(1), 30).await.unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].interactions, 2);
    }
}
