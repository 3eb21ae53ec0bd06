//! Action Status Tracker.
//!
//! One [`ActionRecord`] per named operation. Every `set_pending` issues a
//! [`Ticket`]; only the holder of the newest live ticket may settle the
//! record, so a slow response from an older invocation can never overwrite a
//! newer one. Aborting the newest ticket hands ownership back to the newest
//! older ticket still in flight, or restores the last settled state.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rxtriage_types::{ActionStatus, OperationName};

/// Proof of one `set_pending` call, used to settle exactly that invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    #[must_use]
    pub const fn sequence(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionRecord {
    pub status: ActionStatus,
    pub error: Option<String>,
    /// Sequence of the most recently issued ticket (0 = never invoked).
    pub sequence: u64,
}

#[derive(Debug, Default)]
struct Entry {
    record: ActionRecord,
    /// Ticket allowed to settle the record (0 = none).
    owner: u64,
    in_flight: BTreeSet<u64>,
    /// Status and error as of the last settlement.
    settled: (ActionStatus, Option<String>),
}

/// Shared, synchronously readable status table.
///
/// Cloning yields another handle onto the same table. Lookups of operations
/// that were never invoked read as [`ActionStatus::Initial`].
#[derive(Debug, Clone, Default)]
pub struct ActionTracker {
    entries: Arc<Mutex<HashMap<OperationName, Entry>>>,
}

impl ActionTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<OperationName, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new invocation: status `Pending`, error cleared.
    pub fn set_pending(&self, op: &OperationName) -> Ticket {
        let mut entries = self.lock();
        let entry = entries.entry(op.clone()).or_default();
        entry.record.sequence = entry.record.sequence.saturating_add(1);
        entry.record.status = ActionStatus::Pending;
        entry.record.error = None;
        entry.owner = entry.record.sequence;
        entry.in_flight.insert(entry.owner);
        Ticket(entry.owner)
    }

    /// Returns `false` when `ticket` was superseded or already settled.
    pub fn set_fulfilled(&self, op: &OperationName, ticket: Ticket) -> bool {
        self.settle(op, ticket, ActionStatus::Fulfilled, None)
    }

    /// Returns `false` when `ticket` was superseded or already settled.
    pub fn set_rejected(&self, op: &OperationName, ticket: Ticket, message: Option<String>) -> bool {
        self.settle(op, ticket, ActionStatus::Rejected, message)
    }

    fn settle(
        &self,
        op: &OperationName,
        ticket: Ticket,
        status: ActionStatus,
        error: Option<String>,
    ) -> bool {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(op) else {
            return false;
        };
        entry.in_flight.remove(&ticket.0);
        if entry.owner != ticket.0 || !entry.record.status.can_transition_to(status) {
            return false;
        }
        entry.record.status = status;
        entry.record.error.clone_from(&error);
        entry.settled = (status, error);
        true
    }

    /// Withdraw an invocation that was cancelled before it settled.
    ///
    /// If `ticket` owned the record, ownership passes to the newest older
    /// invocation still in flight (status stays `Pending`); with none left,
    /// the last settled status and error are restored. Returns `false` when
    /// `ticket` did not own the record.
    pub fn revert(&self, op: &OperationName, ticket: Ticket) -> bool {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(op) else {
            return false;
        };
        let was_in_flight = entry.in_flight.remove(&ticket.0);
        if entry.owner != ticket.0 || !was_in_flight {
            return false;
        }
        match entry.in_flight.last().copied() {
            Some(older) => entry.owner = older,
            None => {
                entry.owner = 0;
                let (status, error) = entry.settled.clone();
                entry.record.status = status;
                entry.record.error = error;
            }
        }
        true
    }

    /// Whether `ticket` is the one allowed to settle `op`.
    #[must_use]
    pub fn is_current(&self, op: &OperationName, ticket: Ticket) -> bool {
        self.lock()
            .get(op)
            .is_some_and(|entry| entry.owner == ticket.0)
    }

    #[must_use]
    pub fn get(&self, op: &OperationName) -> ActionStatus {
        self.lock()
            .get(op)
            .map_or(ActionStatus::Initial, |entry| entry.record.status)
    }

    #[must_use]
    pub fn error(&self, op: &OperationName) -> Option<String> {
        self.lock()
            .get(op)
            .and_then(|entry| entry.record.error.clone())
    }

    #[must_use]
    pub fn record(&self, op: &OperationName) -> ActionRecord {
        self.lock()
            .get(op)
            .map(|entry| entry.record.clone())
            .unwrap_or_default()
    }

    /// Every known operation, ordered by name.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<OperationName, ActionRecord> {
        self.lock()
            .iter()
            .map(|(op, entry)| (op.clone(), entry.record.clone()))
            .collect()
    }
}
