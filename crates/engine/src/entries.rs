//! Ledger entry primitives.
//!
//! A `LedgerEntry` records money moving into (`income`) or out of
//! (`expense`) a single account. While an entry is active and linked to an
//! account, exactly one delta of its signed effect has been applied to that
//! account's balance.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, ResultEngine, util};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Income,
    Expense,
}

impl EntryKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// The signed contribution a `amount_minor`-sized entry of this kind
    /// makes to its account balance.
    #[must_use]
    pub fn signed_effect(self, amount_minor: i64) -> i64 {
        match self {
            Self::Income => amount_minor,
            Self::Expense => -amount_minor,
        }
    }
}

impl TryFrom<&str> for EntryKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid entry kind: {other}"
            ))),
        }
    }
}

/// A single ledger entry.
///
/// `amount_minor` is always a positive magnitude; the sign convention lives
/// in [`EntryKind::signed_effect`]. `deleted_at` is the soft-delete marker:
/// a deleted entry is excluded from balances and its effect has been
/// reversed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub user_id: String,
    pub kind: EntryKind,
    pub amount_minor: i64,
    pub currency: Currency,
    pub category: Option<String>,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub account_id: Option<Uuid>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
}

impl LedgerEntry {
    pub fn new(
        user_id: String,
        kind: EntryKind,
        amount_minor: i64,
        currency: Currency,
        category: Option<String>,
        note: Option<String>,
        occurred_at: DateTime<Utc>,
        account_id: Option<Uuid>,
    ) -> ResultEngine<Self> {
        if amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            amount_minor,
            currency,
            category,
            note,
            occurred_at,
            account_id,
            deleted_at: None,
            deleted_by: None,
        })
    }

    /// Signed contribution of this entry to its linked account.
    #[must_use]
    pub fn signed_effect(&self) -> i64 {
        self.kind.signed_effect(self.amount_minor)
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub amount_minor: i64,
    pub currency: String,
    pub category: Option<String>,
    pub note: Option<String>,
    pub occurred_at: DateTimeUtc,
    pub account_id: Option<String>,
    pub deleted_at: Option<DateTimeUtc>,
    pub deleted_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&LedgerEntry> for ActiveModel {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id.to_string()),
            user_id: ActiveValue::Set(entry.user_id.clone()),
            kind: ActiveValue::Set(entry.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(entry.amount_minor),
            currency: ActiveValue::Set(entry.currency.code().to_string()),
            category: ActiveValue::Set(entry.category.clone()),
            note: ActiveValue::Set(entry.note.clone()),
            occurred_at: ActiveValue::Set(entry.occurred_at),
            account_id: ActiveValue::Set(entry.account_id.map(|id| id.to_string())),
            deleted_at: ActiveValue::Set(entry.deleted_at),
            deleted_by: ActiveValue::Set(entry.deleted_by.clone()),
        }
    }
}

impl TryFrom<Model> for LedgerEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: util::parse_uuid(&model.id, "entry")?,
            user_id: model.user_id,
            kind: EntryKind::try_from(model.kind.as_str())?,
            amount_minor: model.amount_minor,
            currency: util::model_currency(&model.currency)?,
            category: model.category,
            note: model.note,
            occurred_at: model.occurred_at,
            account_id: model
                .account_id
                .as_deref()
                .map(|id| util::parse_uuid(id, "account"))
                .transpose()?,
            deleted_at: model.deleted_at,
            deleted_by: model.deleted_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn new_rejects_non_positive_amounts() {
        for amount in [0, -1, -1000] {
            let err = LedgerEntry::new(
                "alice".to_string(),
                EntryKind::Expense,
                amount,
                Currency::Eur,
                None,
                None,
                Utc.timestamp_opt(0, 0).unwrap(),
                None,
            )
            .unwrap_err();
            assert_eq!(
                err,
                EngineError::InvalidAmount("amount_minor must be > 0".to_string())
            );
        }
    }

    #[test]
    fn signed_effect_follows_kind() {
        assert_eq!(EntryKind::Income.signed_effect(250), 250);
        assert_eq!(EntryKind::Expense.signed_effect(250), -250);
    }

    #[test]
    fn kind_parses_storage_form() {
        assert_eq!(EntryKind::try_from("income").unwrap(), EntryKind::Income);
        assert_eq!(EntryKind::try_from("expense").unwrap(), EntryKind::Expense);
        assert!(EntryKind::try_from("transfer").is_err());
    }
}
