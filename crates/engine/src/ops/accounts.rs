//! Account CRUD.
//!
//! Deleting an account never touches balances: a soft delete only flips the
//! flag (the stored balance stays put), and a hard delete removes the row
//! without any bookkeeping. Entries keep their `account_id` after a hard
//! delete; the lifecycle paths treat the dangling reference as a vanished
//! account.

use sea_orm::{ActiveValue, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{Account, CreateAccountCmd, EngineError, ResultEngine, accounts};

use super::{Engine, normalize_required_name};

impl Engine {
    /// Create an asset account with an opening balance.
    pub async fn create_account(&self, cmd: CreateAccountCmd) -> ResultEngine<Account> {
        let name = normalize_required_name(&cmd.name, "account")?;

        let existing = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(cmd.user_id.clone()))
            .filter(accounts::Column::Name.eq(name.clone()))
            .one(&self.database)
            .await?;
        if existing.is_some() {
            return Err(EngineError::ExistingKey(name));
        }

        let account = Account::new(
            cmd.user_id,
            name,
            cmd.kind,
            cmd.opening_balance_minor,
            cmd.currency.unwrap_or_default(),
        );
        accounts::ActiveModel::from(&account)
            .insert(&self.database)
            .await?;
        Ok(account)
    }

    /// Return an account in any state (the `deleted` flag is visible to the
    /// caller).
    pub async fn account(&self, user_id: &str, account_id: Uuid) -> ResultEngine<Account> {
        let model = self
            .find_account_model(user_id, account_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;
        Account::try_from(model)
    }

    /// List a user's accounts, ordered by name.
    pub async fn list_accounts(
        &self,
        user_id: &str,
        include_deleted: bool,
    ) -> ResultEngine<Vec<Account>> {
        let mut query = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id.to_string()))
            .order_by_asc(accounts::Column::Name);
        if !include_deleted {
            query = query.filter(accounts::Column::Deleted.eq(false));
        }

        let models = query.all(&self.database).await?;
        models.into_iter().map(Account::try_from).collect()
    }

    /// Soft-delete an account: excluded from listings and aggregates, the
    /// stored balance untouched.
    pub async fn soft_delete_account(&self, user_id: &str, account_id: Uuid) -> ResultEngine<()> {
        let model = self
            .find_account_model(user_id, account_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;
        if model.deleted {
            return Err(EngineError::Conflict("account already deleted".to_string()));
        }

        let update = accounts::ActiveModel {
            id: ActiveValue::Set(model.id),
            deleted: ActiveValue::Set(true),
            ..Default::default()
        };
        update.update(&self.database).await?;
        Ok(())
    }

    /// Permanently remove an account row. No balance adjustment is
    /// performed.
    pub async fn hard_delete_account(&self, user_id: &str, account_id: Uuid) -> ResultEngine<()> {
        // Owner check first so a foreign id cannot be deleted blind.
        self.find_account_model(user_id, account_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;

        let result = accounts::Entity::delete_by_id(account_id.to_string())
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound("account not exists".to_string()));
        }
        Ok(())
    }
}
