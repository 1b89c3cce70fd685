//! Compensation log for multi-write operations.
//!
//! The engine never wraps its mutation paths in a database transaction: an
//! operation is an ordered sequence of independent single-record writes. To
//! keep "apply N related writes, or none" semantics, each forward write that
//! lands records a [`Compensation`] describing how to undo it. When a later
//! write fails, the log is unwound in reverse order
//! (see `Engine::compensate`); a failed unwind surfaces as
//! [`EngineError::Unreconciled`](crate::EngineError::Unreconciled).

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entries;

/// A recorded undo action for one already-applied forward write.
#[derive(Clone, Debug)]
pub(crate) enum Compensation {
    /// Apply a signed delta to an account balance (the negation of the
    /// forward delta).
    AccountDelta { account_id: Uuid, delta_minor: i64 },
    /// Restore previously persisted entry fields. `account_id` names the
    /// account whose balance depends on those fields, for unreconciled
    /// reporting.
    EntryFields {
        model: entries::ActiveModel,
        account_id: Option<Uuid>,
    },
    /// Put a soft-delete marker back on an entry.
    MarkEntryDeleted {
        entry_id: Uuid,
        deleted_at: DateTime<Utc>,
        deleted_by: Option<String>,
        account_id: Option<Uuid>,
    },
}

/// Ordered log of compensations for the forward writes an operation has
/// already landed.
#[derive(Debug, Default)]
pub(crate) struct SagaLog {
    steps: Vec<Compensation>,
}

impl SagaLog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record the undo action for a forward write that just succeeded.
    pub(crate) fn record(&mut self, step: Compensation) {
        self.steps.push(step);
    }

    /// Consume the log, yielding steps in the order they were recorded.
    /// Callers unwind them in reverse.
    pub(crate) fn into_steps(self) -> Vec<Compensation> {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_preserves_recording_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut log = SagaLog::new();
        log.record(Compensation::AccountDelta {
            account_id: a,
            delta_minor: 100,
        });
        log.record(Compensation::AccountDelta {
            account_id: b,
            delta_minor: -100,
        });

        let steps = log.into_steps();
        assert_eq!(steps.len(), 2);
        match &steps[0] {
            Compensation::AccountDelta { account_id, .. } => assert_eq!(*account_id, a),
            other => panic!("unexpected step: {other:?}"),
        }
    }
}
