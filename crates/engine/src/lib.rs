//! Balance-consistency engine for Gruzzolo.
//!
//! The engine owns the mutation paths of the ledger: asset accounts, income
//! and expense entries, and two-account transfers. Each account carries a
//! denormalized `balance_minor` that must always equal the sum of signed
//! effects of the active ledger records referencing it. Nothing in the
//! storage layer enforces that invariant; every write path in [`ops`] does,
//! by applying atomic single-field increments and compensating already
//! applied writes when a later write in the same operation fails.

pub use accounts::{Account, AccountKind};
pub use commands::{CreateAccountCmd, CreateEntryCmd, TransferCmd, UpdateEntryCmd};
pub use currency::Currency;
pub use entries::{EntryKind, LedgerEntry};
pub use error::EngineError;
pub use money::Money;
pub use ops::{BalanceDrift, Engine, EngineBuilder, EntryListFilter, TransferDetail};
pub use transfers::Transfer;

mod accounts;
mod commands;
mod currency;
mod entries;
mod error;
mod money;
mod ops;
mod saga;
mod transfers;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
