//! Atomic balance mutation and compensation.
//!
//! Balances are mutated with single-field `UPDATE ... SET balance = balance
//! ± ?` increments: correct under concurrent increments to the same field
//! because the database never has to read-then-write. No journal record is
//! written here; undoing an applied delta is the caller's job, either by
//! applying the negated delta directly or through [`Engine::compensate`].

use sea_orm::{ActiveValue, QueryFilter, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, accounts, entries,
    saga::{Compensation, SagaLog},
};

use super::Engine;

impl Engine {
    /// Applies a signed delta to one account balance.
    ///
    /// Returns `KeyNotFound` when no row matched, i.e. the account vanished
    /// between validation and mutation (concurrently hard-deleted). Callers
    /// decide whether that is fatal: forward writes usually fail the
    /// operation, reversals of an already-gone account are logged and
    /// skipped.
    pub(crate) async fn apply_account_delta(
        &self,
        account_id: Uuid,
        delta_minor: i64,
    ) -> ResultEngine<()> {
        let result = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::BalanceMinor,
                Expr::col(accounts::Column::BalanceMinor).add(delta_minor),
            )
            .filter(accounts::Column::Id.eq(account_id.to_string()))
            .exec(&self.database)
            .await?;

        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound("account not exists".to_string()));
        }
        Ok(())
    }

    /// Conditional decrement: only lands when the stored balance covers
    /// `amount_minor`, so concurrent debits can never drive the balance
    /// below zero through this path.
    ///
    /// A rejected guard is `InsufficientFunds` discovered at commit time;
    /// a vanished account is `KeyNotFound`. Either way nothing was written.
    pub(crate) async fn debit_account_guarded(
        &self,
        account_id: Uuid,
        amount_minor: i64,
    ) -> ResultEngine<()> {
        let result = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::BalanceMinor,
                Expr::col(accounts::Column::BalanceMinor).sub(amount_minor),
            )
            .filter(accounts::Column::Id.eq(account_id.to_string()))
            .filter(accounts::Column::BalanceMinor.gte(amount_minor))
            .exec(&self.database)
            .await?;

        if result.rows_affected == 0 {
            // Zero rows matched: either the guard rejected or the row is
            // gone. One follow-up read tells the two apart.
            let model = accounts::Entity::find_by_id(account_id.to_string())
                .one(&self.database)
                .await?;
            return Err(match model {
                Some(model) => EngineError::InsufficientFunds(model.name),
                None => EngineError::KeyNotFound("account not exists".to_string()),
            });
        }
        Ok(())
    }

    /// Unwinds a compensation log in reverse recording order.
    ///
    /// Each undo write gets exactly one attempt. When every attempt lands
    /// the caller can surface its original failure as if nothing had
    /// happened; when any attempt fails the affected accounts are reported
    /// as `Unreconciled` so operators can recompute them — this error must
    /// never be swallowed.
    pub(crate) async fn compensate(&self, log: SagaLog) -> ResultEngine<()> {
        let mut unreconciled: Vec<Uuid> = Vec::new();

        for step in log.into_steps().into_iter().rev() {
            match step {
                Compensation::AccountDelta {
                    account_id,
                    delta_minor,
                } => {
                    if let Err(err) = self.apply_account_delta(account_id, delta_minor).await {
                        tracing::error!(
                            account = %account_id,
                            delta_minor,
                            error = %err,
                            "compensating balance write failed"
                        );
                        unreconciled.push(account_id);
                    }
                }
                Compensation::EntryFields { model, account_id } => {
                    if let Err(err) = model.update(&self.database).await {
                        tracing::error!(error = %err, "restoring entry fields failed");
                        unreconciled.extend(account_id);
                    }
                }
                Compensation::MarkEntryDeleted {
                    entry_id,
                    deleted_at,
                    deleted_by,
                    account_id,
                } => {
                    let model = entries::ActiveModel {
                        id: ActiveValue::Set(entry_id.to_string()),
                        deleted_at: ActiveValue::Set(Some(deleted_at)),
                        deleted_by: ActiveValue::Set(deleted_by),
                        ..Default::default()
                    };
                    if let Err(err) = model.update(&self.database).await {
                        tracing::error!(
                            entry = %entry_id,
                            error = %err,
                            "re-marking entry deleted failed"
                        );
                        unreconciled.extend(account_id);
                    }
                }
            }
        }

        if unreconciled.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Unreconciled {
                accounts: unreconciled,
            })
        }
    }
}
