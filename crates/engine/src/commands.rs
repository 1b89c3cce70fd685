//! Command structs for engine operations.
//!
//! These types group parameters for write operations
//! (account/entry/transfer creation and amendment), keeping call sites
//! readable and avoiding long argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{AccountKind, Currency, EntryKind};

/// Create an asset account.
#[derive(Clone, Debug)]
pub struct CreateAccountCmd {
    pub user_id: String,
    pub name: String,
    pub kind: AccountKind,
    pub opening_balance_minor: i64,
    pub currency: Option<Currency>,
}

impl CreateAccountCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, kind: AccountKind) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            kind,
            opening_balance_minor: 0,
            currency: None,
        }
    }

    #[must_use]
    pub fn opening_balance_minor(mut self, opening_balance_minor: i64) -> Self {
        self.opening_balance_minor = opening_balance_minor;
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }
}

/// Create a ledger entry.
#[derive(Clone, Debug)]
pub struct CreateEntryCmd {
    pub user_id: String,
    pub kind: EntryKind,
    pub amount_minor: i64,
    pub account_id: Option<Uuid>,
    pub category: Option<String>,
    pub note: Option<String>,
    pub currency: Option<Currency>,
    pub occurred_at: DateTime<Utc>,
}

impl CreateEntryCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        kind: EntryKind,
        amount_minor: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            kind,
            amount_minor,
            account_id: None,
            category: None,
            note: None,
            currency: None,
            occurred_at,
        }
    }

    #[must_use]
    pub fn account_id(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }
}

/// Amend an existing ledger entry.
///
/// Every field defaults to the entry's current value: an amount-only change
/// keeps the kind, a kind-only change keeps the magnitude (re-signed by the
/// new kind), and `account_id` retargets the entry's balance effect.
#[derive(Clone, Debug)]
pub struct UpdateEntryCmd {
    pub user_id: String,
    pub entry_id: Uuid,
    pub amount_minor: Option<i64>,
    pub kind: Option<EntryKind>,
    pub account_id: Option<Uuid>,
    pub category: Option<String>,
    pub note: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
}

impl UpdateEntryCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, entry_id: Uuid) -> Self {
        Self {
            user_id: user_id.into(),
            entry_id,
            amount_minor: None,
            kind: None,
            account_id: None,
            category: None,
            note: None,
            occurred_at: None,
        }
    }

    #[must_use]
    pub fn amount_minor(mut self, amount_minor: i64) -> Self {
        self.amount_minor = Some(amount_minor);
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: EntryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn account_id(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }
}

/// Create a two-account transfer.
#[derive(Clone, Debug)]
pub struct TransferCmd {
    pub user_id: String,
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount_minor: i64,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl TransferCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        from_account_id: Uuid,
        to_account_id: Uuid,
        amount_minor: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            from_account_id,
            to_account_id,
            amount_minor,
            note: None,
            occurred_at,
        }
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}
