//! The module contains the errors the engine can throw.
//!
//! Validation and lookup errors (`InvalidAmount`, `KeyNotFound`,
//! `InsufficientFunds`, `Conflict`, `CurrencyMismatch`) are raised before any
//! write has landed. [`Unreconciled`] is different: it means a compensating
//! write failed after a partial failure, so the listed accounts' stored
//! balances can no longer be trusted until they are recomputed from the
//! ledger.
//!
//! [`Unreconciled`]: EngineError::Unreconciled
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),
    /// A compensating write failed; the listed accounts need a manual
    /// balance recomputation (`recompute_balances`).
    #[error("compensation failed, accounts left unreconciled: {accounts:?}")]
    Unreconciled { accounts: Vec<Uuid> },
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::CurrencyMismatch(a), Self::CurrencyMismatch(b)) => a == b,
            (Self::Unreconciled { accounts: a }, Self::Unreconciled { accounts: b }) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
