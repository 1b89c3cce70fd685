//! Owner-scoped lookups shared by the operation modules.
//!
//! Every lookup filters on `user_id`: a record owned by someone else is
//! indistinguishable from a missing one.

use sea_orm::{QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, accounts, entries};

use super::Engine;

impl Engine {
    /// Lookup of a live (not soft-deleted) account.
    pub(crate) async fn require_account(
        &self,
        user_id: &str,
        account_id: Uuid,
    ) -> ResultEngine<accounts::Model> {
        accounts::Entity::find_by_id(account_id.to_string())
            .filter(accounts::Column::UserId.eq(user_id.to_string()))
            .filter(accounts::Column::Deleted.eq(false))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))
    }

    /// Lookup of an account in any state (soft-deleted included). `None`
    /// means the row is gone or owned by someone else.
    pub(crate) async fn find_account_model(
        &self,
        user_id: &str,
        account_id: Uuid,
    ) -> ResultEngine<Option<accounts::Model>> {
        accounts::Entity::find_by_id(account_id.to_string())
            .filter(accounts::Column::UserId.eq(user_id.to_string()))
            .one(&self.database)
            .await
            .map_err(Into::into)
    }

    /// Lookup of an entry in any state.
    pub(crate) async fn require_entry_model(
        &self,
        user_id: &str,
        entry_id: Uuid,
    ) -> ResultEngine<entries::Model> {
        entries::Entity::find_by_id(entry_id.to_string())
            .filter(entries::Column::UserId.eq(user_id.to_string()))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("entry not exists".to_string()))
    }
}
