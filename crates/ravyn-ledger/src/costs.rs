// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-interaction token costs.

use std::collections::BTreeMap;
use std::str::FromStr;

use ravyn_config::model::LedgerConfig;
use ravyn_core::InteractionKind;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Token cost of each billable interaction kind.
///
/// Kinds absent from configuration fall back to the built-in defaults.
/// Non-billable kinds always cost zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCostTable {
    costs: BTreeMap<InteractionKind, i64>,
}

impl TokenCostTable {
    /// Built-in cost of a kind.
    pub fn default_cost(kind: InteractionKind) -> i64 {
        match kind {
            InteractionKind::Chat => 1,
            InteractionKind::Image => 3,
            InteractionKind::Upscale => 2,
            InteractionKind::Variation => 3,
            InteractionKind::Purchase | InteractionKind::Bonus | InteractionKind::Feedback => 0,
        }
    }

    /// Builds the table from the `[ledger.costs]` section.
    pub fn from_config(config: &LedgerConfig) -> Self {
        let mut costs = BTreeMap::new();
        for (key, &cost) in &config.costs {
            match InteractionKind::from_str(key) {
                Ok(kind) if kind.is_billable() => {
                    costs.insert(kind, cost);
                }
                _ => warn!(key = %key, "ignoring cost for non-billable interaction kind"),
            }
        }
        Self { costs }
    }

    pub fn cost(&self, kind: InteractionKind) -> i64 {
        if !kind.is_billable() {
            return 0;
        }
        self.costs
            .get(&kind)
            .copied()
            .unwrap_or_else(|| Self::default_cost(kind))
    }

    /// Returns a copy with one kind's cost replaced.
    pub fn with_cost(&self, kind: InteractionKind, cost: i64) -> Self {
        let mut costs = self.costs.clone();
        costs.insert(kind, cost);
        Self { costs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_kinds_use_defaults() {
        let table = TokenCostTable::default();
        assert_eq!(table.cost(InteractionKind::Chat), 1);
        assert_eq!(table.cost(InteractionKind::Image), 3);
        assert_eq!(table.cost(InteractionKind::Upscale), 2);
        assert_eq!(table.cost(InteractionKind::Variation), 3);
        assert_eq!(table.cost(InteractionKind::Purchase), 0);
    }

    #[test]
    fn configured_costs_override_defaults() {
        let mut config = LedgerConfig::default();
        config.costs.clear();
        config.costs.insert("chat".into(), 4);
        config.costs.insert("bonus".into(), 9);
        let table = TokenCostTable::from_config(&config);
        assert_eq!(table.cost(InteractionKind::Chat), 4);
        assert_eq!(table.cost(InteractionKind::Image), 3);
        assert_eq!(table.cost(InteractionKind::Bonus), 0);
    }

    #[test]
    fn with_cost_leaves_original_untouched() {
        let table = TokenCostTable::default();
        let updated = table.with_cost(InteractionKind::Chat, 2);
        assert_eq!(table.cost(InteractionKind::Chat), 1);
        assert_eq!(updated.cost(InteractionKind::Chat), 2);
    }
}
