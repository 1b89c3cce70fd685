//! Two-account transfers.
//!
//! A transfer is a three-step saga: debit the source, credit the
//! destination, record the transfer row. Each step's failure triggers
//! exactly the compensations for the steps already completed, executed in
//! reverse order.

use sea_orm::{Condition, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    Account, ResultEngine, Transfer, TransferCmd,
    saga::{Compensation, SagaLog},
    transfers,
    util::{ensure_same_currency, normalize_optional_text},
};

use super::Engine;

/// A persisted transfer with both account records re-resolved after the
/// writes landed.
#[derive(Clone, Debug)]
pub struct TransferDetail {
    pub transfer: Transfer,
    pub from_account: Account,
    pub to_account: Account,
}

impl Engine {
    /// Move `amount_minor` from one owned account to another.
    ///
    /// On success both accounts reflect the transfer exactly once; on any
    /// failure both balances are exactly their pre-call values (or the
    /// result is `Unreconciled` when a compensation itself failed).
    pub async fn create_transfer(&self, cmd: TransferCmd) -> ResultEngine<TransferDetail> {
        let note = normalize_optional_text(cmd.note.as_deref());

        let from = Account::try_from(
            self.require_account(&cmd.user_id, cmd.from_account_id)
                .await?,
        )?;
        let to = Account::try_from(self.require_account(&cmd.user_id, cmd.to_account_id).await?)?;
        ensure_same_currency(from.currency, to.currency)?;

        // Validates amount > 0 and from != to.
        let transfer = Transfer::new(
            cmd.user_id,
            from.id,
            to.id,
            cmd.amount_minor,
            from.currency,
            note,
            cmd.occurred_at,
        )?;

        let mut saga = SagaLog::new();

        // Step 1: debit the source. The guard re-checks sufficiency at
        // commit time, so a concurrent debit can never overdraw the account.
        self.debit_account_guarded(from.id, transfer.amount_minor)
            .await?;
        saga.record(Compensation::AccountDelta {
            account_id: from.id,
            delta_minor: transfer.amount_minor,
        });

        // Step 2: credit the destination.
        if let Err(err) = self.apply_account_delta(to.id, transfer.amount_minor).await {
            self.compensate(saga).await?;
            return Err(err);
        }
        saga.record(Compensation::AccountDelta {
            account_id: to.id,
            delta_minor: -transfer.amount_minor,
        });

        // Step 3: record the transfer itself.
        if let Err(err) = transfers::ActiveModel::from(&transfer)
            .insert(&self.database)
            .await
        {
            self.compensate(saga).await?;
            return Err(err.into());
        }

        let from_account = self.account(&transfer.user_id, from.id).await?;
        let to_account = self.account(&transfer.user_id, to.id).await?;
        Ok(TransferDetail {
            transfer,
            from_account,
            to_account,
        })
    }

    /// List a user's transfers, newest first, optionally only those
    /// touching one account (as source or destination).
    pub async fn list_transfers(
        &self,
        user_id: &str,
        account_id: Option<Uuid>,
    ) -> ResultEngine<Vec<Transfer>> {
        let mut query = transfers::Entity::find()
            .filter(transfers::Column::UserId.eq(user_id.to_string()))
            .order_by_desc(transfers::Column::OccurredAt);

        if let Some(account_id) = account_id {
            let id = account_id.to_string();
            query = query.filter(
                Condition::any()
                    .add(transfers::Column::FromAccountId.eq(id.clone()))
                    .add(transfers::Column::ToAccountId.eq(id)),
            );
        }

        let models = query.all(&self.database).await?;
        models.into_iter().map(Transfer::try_from).collect()
    }
}
