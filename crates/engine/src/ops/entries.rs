//! Ledger entry lifecycle: create, amend, soft-delete, restore, purge.
//!
//! Every path computes the signed delta its transition owes the linked
//! account, applies it through the balance ops, and records compensations so
//! a partial failure can be unwound. The order of writes within each
//! operation is part of the contract and is spelled out per method.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, QuerySelect, prelude::*};
use uuid::Uuid;

use crate::{
    Account, CreateEntryCmd, Currency, EngineError, EntryKind, LedgerEntry, ResultEngine,
    UpdateEntryCmd, entries,
    saga::{Compensation, SagaLog},
    util::{ensure_same_currency, normalize_category, normalize_optional_text},
};

use super::Engine;

/// Filter for [`Engine::list_entries`].
#[derive(Clone, Debug)]
pub struct EntryListFilter {
    pub user_id: String,
    pub account_id: Option<Uuid>,
    pub include_deleted: bool,
    pub limit: u64,
}

impl EntryListFilter {
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            account_id: None,
            include_deleted: false,
            limit: 50,
        }
    }

    #[must_use]
    pub fn account_id(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn include_deleted(mut self, include_deleted: bool) -> Self {
        self.include_deleted = include_deleted;
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }
}

impl Engine {
    /// Create a ledger entry, applying its effect to the linked account.
    ///
    /// Write order: balance delta first, entry row second. When the insert
    /// fails the already-applied delta is reversed and the insert error is
    /// surfaced. An expense uses the guarded decrement, so a balance that
    /// cannot cover the amount rejects with `InsufficientFunds` before
    /// anything is written.
    pub async fn create_entry(&self, cmd: CreateEntryCmd) -> ResultEngine<LedgerEntry> {
        let category = normalize_category(cmd.category.as_deref());
        let note = normalize_optional_text(cmd.note.as_deref());

        let account = match cmd.account_id {
            Some(account_id) => Some(Account::try_from(
                self.require_account(&cmd.user_id, account_id).await?,
            )?),
            None => None,
        };

        let currency = match (&account, cmd.currency) {
            (Some(account), Some(currency)) => {
                ensure_same_currency(account.currency, currency)?;
                currency
            }
            (Some(account), None) => account.currency,
            (None, Some(currency)) => currency,
            (None, None) => Currency::default(),
        };

        let entry = LedgerEntry::new(
            cmd.user_id,
            cmd.kind,
            cmd.amount_minor,
            currency,
            category,
            note,
            cmd.occurred_at,
            account.as_ref().map(|a| a.id),
        )?;

        let mut saga = SagaLog::new();
        if let Some(account) = &account {
            match entry.kind {
                EntryKind::Expense => {
                    self.debit_account_guarded(account.id, entry.amount_minor)
                        .await?;
                }
                EntryKind::Income => {
                    self.apply_account_delta(account.id, entry.amount_minor)
                        .await?;
                }
            }
            saga.record(Compensation::AccountDelta {
                account_id: account.id,
                delta_minor: -entry.signed_effect(),
            });
        }

        if let Err(err) = entries::ActiveModel::from(&entry).insert(&self.database).await {
            self.compensate(saga).await?;
            return Err(err.into());
        }
        Ok(entry)
    }

    /// Amend an active entry in place.
    ///
    /// Unspecified fields keep their current values; changing only the kind
    /// keeps the magnitude and re-signs the effect. Write order: entry
    /// fields first (with a restore-old-fields compensation), then balance
    /// reconciliation — one net delta when the account is unchanged,
    /// reverse-then-apply when the entry is retargeted. A vanished old
    /// account is logged and skipped: there is nothing left to reverse on
    /// it.
    pub async fn update_entry(&self, cmd: UpdateEntryCmd) -> ResultEngine<LedgerEntry> {
        let model = self.require_entry_model(&cmd.user_id, cmd.entry_id).await?;
        if model.deleted_at.is_some() {
            return Err(EngineError::Conflict(
                "cannot amend a deleted entry".to_string(),
            ));
        }
        let old = LedgerEntry::try_from(model)?;

        let new_kind = cmd.kind.unwrap_or(old.kind);
        let new_amount = cmd.amount_minor.unwrap_or(old.amount_minor);
        if new_amount <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        let new_account_id = cmd.account_id.or(old.account_id);

        // A retarget must point at a live owned account in the entry's
        // currency.
        if let Some(account_id) = new_account_id
            && Some(account_id) != old.account_id
        {
            let account =
                Account::try_from(self.require_account(&cmd.user_id, account_id).await?)?;
            ensure_same_currency(account.currency, old.currency)?;
        }

        let category = match cmd.category.as_deref() {
            Some(value) => normalize_category(Some(value)),
            None => old.category.clone(),
        };
        let note = match cmd.note.as_deref() {
            Some(value) => normalize_optional_text(Some(value)),
            None => old.note.clone(),
        };
        let occurred_at = cmd.occurred_at.unwrap_or(old.occurred_at);

        // 1. Persist the entry fields.
        let update = entries::ActiveModel {
            id: ActiveValue::Set(old.id.to_string()),
            kind: ActiveValue::Set(new_kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(new_amount),
            account_id: ActiveValue::Set(new_account_id.map(|id| id.to_string())),
            category: ActiveValue::Set(category.clone()),
            note: ActiveValue::Set(note.clone()),
            occurred_at: ActiveValue::Set(occurred_at),
            ..Default::default()
        };
        update.update(&self.database).await?;

        let mut saga = SagaLog::new();
        saga.record(Compensation::EntryFields {
            model: entries::ActiveModel {
                id: ActiveValue::Set(old.id.to_string()),
                kind: ActiveValue::Set(old.kind.as_str().to_string()),
                amount_minor: ActiveValue::Set(old.amount_minor),
                account_id: ActiveValue::Set(old.account_id.map(|id| id.to_string())),
                category: ActiveValue::Set(old.category.clone()),
                note: ActiveValue::Set(old.note.clone()),
                occurred_at: ActiveValue::Set(old.occurred_at),
                ..Default::default()
            },
            account_id: old.account_id.or(new_account_id),
        });

        // 2. Reconcile balances.
        let old_effect = old.signed_effect();
        let new_effect = new_kind.signed_effect(new_amount);

        if old.account_id == new_account_id {
            if let Some(account_id) = new_account_id {
                let net = new_effect - old_effect;
                if net != 0
                    && let Err(err) = self.apply_account_delta(account_id, net).await
                {
                    self.compensate(saga).await?;
                    return Err(err);
                }
            }
        } else {
            if let Some(account_id) = old.account_id {
                match self.apply_account_delta(account_id, -old_effect).await {
                    Ok(()) => saga.record(Compensation::AccountDelta {
                        account_id,
                        delta_minor: old_effect,
                    }),
                    Err(EngineError::KeyNotFound(_)) => {
                        tracing::warn!(
                            account = %account_id,
                            entry = %old.id,
                            "previous account vanished, nothing to reverse"
                        );
                    }
                    Err(err) => {
                        self.compensate(saga).await?;
                        return Err(err);
                    }
                }
            }
            if let Some(account_id) = new_account_id
                && let Err(err) = self.apply_account_delta(account_id, new_effect).await
            {
                self.compensate(saga).await?;
                return Err(err);
            }
        }

        Ok(LedgerEntry {
            id: old.id,
            user_id: old.user_id,
            kind: new_kind,
            amount_minor: new_amount,
            currency: old.currency,
            category,
            note,
            occurred_at,
            account_id: new_account_id,
            deleted_at: None,
            deleted_by: None,
        })
    }

    /// Soft-delete an active entry, reversing its effect on the linked
    /// account.
    ///
    /// A reversal failure is logged and swallowed and the deletion still
    /// proceeds (accepted risk; `recompute_balances` is the recovery path).
    /// A second delete of the same entry is a `Conflict`: the effect can
    /// never be reversed twice.
    pub async fn soft_delete_entry(
        &self,
        user_id: &str,
        entry_id: Uuid,
        deleted_at: DateTime<Utc>,
    ) -> ResultEngine<()> {
        let model = self.require_entry_model(user_id, entry_id).await?;
        if model.deleted_at.is_some() {
            return Err(EngineError::Conflict("entry already deleted".to_string()));
        }
        let entry = LedgerEntry::try_from(model)?;

        let mut saga = SagaLog::new();
        if let Some(account_id) = entry.account_id {
            match self
                .apply_account_delta(account_id, -entry.signed_effect())
                .await
            {
                Ok(()) => saga.record(Compensation::AccountDelta {
                    account_id,
                    delta_minor: entry.signed_effect(),
                }),
                Err(err) => {
                    tracing::error!(
                        account = %account_id,
                        entry = %entry.id,
                        error = %err,
                        "reversing entry effect failed, deleting anyway"
                    );
                }
            }
        }

        let update = entries::ActiveModel {
            id: ActiveValue::Set(entry.id.to_string()),
            deleted_at: ActiveValue::Set(Some(deleted_at)),
            deleted_by: ActiveValue::Set(Some(user_id.to_string())),
            ..Default::default()
        };
        if let Err(err) = update.update(&self.database).await {
            self.compensate(saga).await?;
            return Err(err.into());
        }
        Ok(())
    }

    /// Restore a soft-deleted entry, reapplying its original effect.
    ///
    /// When the linked account no longer exists the restore fails with
    /// `KeyNotFound` and the entry stays deleted: an active entry whose
    /// effect is reflected nowhere is exactly the inconsistency this engine
    /// exists to prevent.
    pub async fn restore_entry(&self, user_id: &str, entry_id: Uuid) -> ResultEngine<LedgerEntry> {
        let model = self.require_entry_model(user_id, entry_id).await?;
        let Some(deleted_at) = model.deleted_at else {
            return Err(EngineError::Conflict("entry is not deleted".to_string()));
        };
        let deleted_by = model.deleted_by.clone();
        let entry = LedgerEntry::try_from(model)?;

        // A soft-deleted account is still a valid reapply target (its
        // balance invariant keeps holding); only a missing row fails.
        if let Some(account_id) = entry.account_id
            && self.find_account_model(user_id, account_id).await?.is_none()
        {
            return Err(EngineError::KeyNotFound("account not exists".to_string()));
        }

        let update = entries::ActiveModel {
            id: ActiveValue::Set(entry.id.to_string()),
            deleted_at: ActiveValue::Set(None),
            deleted_by: ActiveValue::Set(None),
            ..Default::default()
        };
        update.update(&self.database).await?;

        let mut saga = SagaLog::new();
        saga.record(Compensation::MarkEntryDeleted {
            entry_id: entry.id,
            deleted_at,
            deleted_by,
            account_id: entry.account_id,
        });

        if let Some(account_id) = entry.account_id
            && let Err(err) = self.apply_account_delta(account_id, entry.signed_effect()).await
        {
            self.compensate(saga).await?;
            return Err(err);
        }

        Ok(LedgerEntry {
            deleted_at: None,
            deleted_by: None,
            ..entry
        })
    }

    /// Permanently remove an entry in any state.
    ///
    /// Purging an active linked entry first performs the same reversal
    /// soft-delete performs, so the account never keeps a delta with no
    /// record to justify it; purging an already-deleted entry touches no
    /// balance. Terminal: there is no way back.
    pub async fn purge_entry(&self, user_id: &str, entry_id: Uuid) -> ResultEngine<()> {
        let model = self.require_entry_model(user_id, entry_id).await?;
        let entry = LedgerEntry::try_from(model)?;

        let mut saga = SagaLog::new();
        if !entry.is_deleted()
            && let Some(account_id) = entry.account_id
        {
            match self
                .apply_account_delta(account_id, -entry.signed_effect())
                .await
            {
                Ok(()) => saga.record(Compensation::AccountDelta {
                    account_id,
                    delta_minor: entry.signed_effect(),
                }),
                Err(EngineError::KeyNotFound(_)) => {
                    tracing::warn!(
                        account = %account_id,
                        entry = %entry.id,
                        "account vanished before purge, nothing to reverse"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        match entries::Entity::delete_by_id(entry.id.to_string())
            .exec(&self.database)
            .await
        {
            Ok(result) if result.rows_affected > 0 => Ok(()),
            Ok(_) => {
                self.compensate(saga).await?;
                Err(EngineError::KeyNotFound("entry not exists".to_string()))
            }
            Err(err) => {
                self.compensate(saga).await?;
                Err(err.into())
            }
        }
    }

    /// Return a single entry in any state.
    pub async fn entry(&self, user_id: &str, entry_id: Uuid) -> ResultEngine<LedgerEntry> {
        let model = self.require_entry_model(user_id, entry_id).await?;
        LedgerEntry::try_from(model)
    }

    /// List entries, newest first.
    pub async fn list_entries(&self, filter: EntryListFilter) -> ResultEngine<Vec<LedgerEntry>> {
        let mut query = entries::Entity::find()
            .filter(entries::Column::UserId.eq(filter.user_id))
            .order_by_desc(entries::Column::OccurredAt)
            .limit(filter.limit);

        if let Some(account_id) = filter.account_id {
            query = query.filter(entries::Column::AccountId.eq(account_id.to_string()));
        }
        if !filter.include_deleted {
            query = query.filter(entries::Column::DeletedAt.is_null());
        }

        let models = query.all(&self.database).await?;
        models.into_iter().map(LedgerEntry::try_from).collect()
    }
}
