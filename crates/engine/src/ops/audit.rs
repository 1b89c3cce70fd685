//! Balance audit and recomputation.
//!
//! The denormalized `balance_minor` on each account can drift if a
//! compensation ever fails (`Unreconciled`) or a swallowed reversal error
//! left an effect behind. These operations re-derive every account's balance
//! from the ledger — opening balance plus signed effects of active entries
//! and transfer legs — and either report the drift or rewrite the stored
//! values.

use std::collections::HashMap;

use sea_orm::{ActiveValue, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{EntryKind, ResultEngine, accounts, entries, transfers, util};

use super::Engine;

/// One account whose stored balance disagrees with the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BalanceDrift {
    pub account_id: Uuid,
    pub name: String,
    pub stored_minor: i64,
    pub derived_minor: i64,
}

impl BalanceDrift {
    /// Stored minus derived: what the stored balance is off by.
    #[must_use]
    pub fn drift_minor(&self) -> i64 {
        self.stored_minor - self.derived_minor
    }
}

impl Engine {
    /// Report every owned account whose stored balance drifted from the
    /// value derived from its active ledger records.
    pub async fn audit_balances(&self, user_id: &str) -> ResultEngine<Vec<BalanceDrift>> {
        let derived = self.derive_balances(user_id).await?;

        let mut drifts = Vec::new();
        for (model, derived_minor) in derived {
            if model.balance_minor != derived_minor {
                drifts.push(BalanceDrift {
                    account_id: util::parse_uuid(&model.id, "account")?,
                    name: model.name,
                    stored_minor: model.balance_minor,
                    derived_minor,
                });
            }
        }
        Ok(drifts)
    }

    /// Rewrite every drifted stored balance with the value derived from the
    /// ledger. Returns how many accounts were rewritten.
    ///
    /// This is the manual recovery pass after an `Unreconciled` failure.
    pub async fn recompute_balances(&self, user_id: &str) -> ResultEngine<u64> {
        let drifts = self.audit_balances(user_id).await?;
        let rewritten = drifts.len() as u64;

        for drift in drifts {
            tracing::info!(
                account = %drift.account_id,
                stored_minor = drift.stored_minor,
                derived_minor = drift.derived_minor,
                "rewriting drifted balance"
            );
            let update = accounts::ActiveModel {
                id: ActiveValue::Set(drift.account_id.to_string()),
                balance_minor: ActiveValue::Set(drift.derived_minor),
                ..Default::default()
            };
            update.update(&self.database).await?;
        }
        Ok(rewritten)
    }

    /// Derive each owned account's balance from the ledger: opening balance
    /// plus signed effects of active entries, minus/plus transfer legs.
    ///
    /// Records referencing hard-deleted accounts are skipped; they no longer
    /// have a balance to contribute to.
    async fn derive_balances(
        &self,
        user_id: &str,
    ) -> ResultEngine<Vec<(accounts::Model, i64)>> {
        let account_models = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id.to_string()))
            .all(&self.database)
            .await?;

        let mut derived: HashMap<String, i64> = account_models
            .iter()
            .map(|model| (model.id.clone(), model.opening_balance_minor))
            .collect();

        let entry_models = entries::Entity::find()
            .filter(entries::Column::UserId.eq(user_id.to_string()))
            .filter(entries::Column::DeletedAt.is_null())
            .filter(entries::Column::AccountId.is_not_null())
            .all(&self.database)
            .await?;

        for model in entry_models {
            let Some(account_id) = model.account_id.as_deref() else {
                continue;
            };
            let Some(balance) = derived.get_mut(account_id) else {
                continue;
            };
            let kind = EntryKind::try_from(model.kind.as_str())?;
            *balance += kind.signed_effect(model.amount_minor);
        }

        let transfer_models = transfers::Entity::find()
            .filter(transfers::Column::UserId.eq(user_id.to_string()))
            .all(&self.database)
            .await?;

        for model in transfer_models {
            if let Some(balance) = derived.get_mut(model.from_account_id.as_str()) {
                *balance -= model.amount_minor;
            }
            if let Some(balance) = derived.get_mut(model.to_account_id.as_str()) {
                *balance += model.amount_minor;
            }
        }

        Ok(account_models
            .into_iter()
            .map(|model| {
                let value = derived.get(&model.id).copied().unwrap_or(0);
                (model, value)
            })
            .collect())
    }
}
