//! Async Action Executor.
//!
//! Wraps a remote call so its lifecycle is recorded in the [`ActionTracker`]
//! and its result lands in a [`ResultSlot`]. Failures come back as values
//! ([`ActionOutcome::Rejected`]); the executor never panics or propagates.

use std::future::Future;
use std::time::Duration;

use futures_util::future::{AbortRegistration, Abortable, Aborted};
use rxtriage_core::RemoteError;
use rxtriage_types::OperationName;

use crate::slot::ResultSlot;
use crate::tracker::{ActionTracker, Ticket};

/// How one executor invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome<T> {
    /// The call succeeded and its value was committed.
    Fulfilled(T),
    /// The call failed. `placeholder` is the value supplied at call time (if
    /// any), so callers can keep rendering something sensible.
    Rejected {
        error: Option<String>,
        placeholder: Option<T>,
    },
    /// The call settled after a newer invocation of the same operation began.
    /// Nothing was written; the value is handed back for inspection only.
    Superseded(Result<T, Option<String>>),
    /// The call was cancelled before settling. Nothing was written.
    Aborted,
}

impl<T> ActionOutcome<T> {
    #[must_use]
    pub const fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled(_))
    }

    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// The fulfilled value, or the placeholder on rejection.
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Fulfilled(value) => Some(value),
            Self::Rejected { placeholder, .. } => placeholder,
            Self::Superseded(_) | Self::Aborted => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Rejected { error, .. } => error.as_deref(),
            _ => None,
        }
    }
}

/// Bound `work` by `timeout`; expiry becomes [`RemoteError::Timeout`].
pub async fn with_timeout<T, F>(timeout: Duration, work: F) -> Result<T, RemoteError>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    match tokio::time::timeout(timeout, work).await {
        Ok(result) => result,
        Err(_elapsed) => Err(RemoteError::Timeout(timeout)),
    }
}

#[derive(Debug, Clone, Default)]
pub struct ActionExecutor {
    tracker: ActionTracker,
}

impl ActionExecutor {
    #[must_use]
    pub fn new(tracker: ActionTracker) -> Self {
        Self { tracker }
    }

    #[must_use]
    pub fn tracker(&self) -> &ActionTracker {
        &self.tracker
    }

    /// Run `work` under `op`, committing its value into `slot`.
    ///
    /// When a `placeholder` is given it becomes the slot's observable value
    /// until the call settles. On rejection the placeholder is withdrawn so
    /// the last committed value shows again.
    pub async fn run<T, F>(
        &self,
        op: &OperationName,
        slot: &ResultSlot<T>,
        placeholder: Option<T>,
        work: F,
    ) -> ActionOutcome<T>
    where
        T: Clone,
        F: Future<Output = Result<T, RemoteError>>,
    {
        self.execute(op, Some(slot), placeholder, async { Ok::<_, Aborted>(work.await) })
            .await
    }

    /// Like [`Self::run`], but `registration` can cancel the call. A cancelled
    /// call writes nothing and leaves the status as it was before the call.
    pub async fn run_abortable<T, F>(
        &self,
        op: &OperationName,
        slot: &ResultSlot<T>,
        placeholder: Option<T>,
        work: F,
        registration: AbortRegistration,
    ) -> ActionOutcome<T>
    where
        T: Clone,
        F: Future<Output = Result<T, RemoteError>>,
    {
        self.execute(op, Some(slot), placeholder, Abortable::new(work, registration))
            .await
    }

    /// Like [`Self::run`], with `work` bounded by `timeout`.
    pub async fn run_with_timeout<T, F>(
        &self,
        op: &OperationName,
        slot: &ResultSlot<T>,
        placeholder: Option<T>,
        timeout: Duration,
        work: F,
    ) -> ActionOutcome<T>
    where
        T: Clone,
        F: Future<Output = Result<T, RemoteError>>,
    {
        self.run(op, slot, placeholder, with_timeout(timeout, work))
            .await
    }

    /// Track status only; the value is returned but stored nowhere.
    pub async fn run_detached<T, F>(&self, op: &OperationName, work: F) -> ActionOutcome<T>
    where
        T: Clone,
        F: Future<Output = Result<T, RemoteError>>,
    {
        self.execute(op, None, None, async { Ok::<_, Aborted>(work.await) }).await
    }

    async fn execute<T, F>(
        &self,
        op: &OperationName,
        slot: Option<&ResultSlot<T>>,
        placeholder: Option<T>,
        work: F,
    ) -> ActionOutcome<T>
    where
        T: Clone,
        F: Future<Output = Result<Result<T, RemoteError>, Aborted>>,
    {
        let ticket = self.tracker.set_pending(op);
        tracing::debug!(operation = %op, ticket = ticket.sequence(), "action pending");

        if let (Some(slot), Some(placeholder)) = (slot, placeholder.clone()) {
            slot.publish_interim(placeholder);
        }

        match work.await {
            Ok(Ok(value)) => self.fulfil(op, ticket, slot, value),
            Ok(Err(err)) => self.reject(op, ticket, slot, &err, placeholder),
            Err(Aborted) => {
                if self.tracker.revert(op, ticket)
                    && !self.tracker.get(op).is_pending()
                    && let Some(slot) = slot
                {
                    slot.discard_interim();
                }
                tracing::debug!(operation = %op, ticket = ticket.sequence(), "action aborted");
                ActionOutcome::Aborted
            }
        }
    }

    fn fulfil<T>(
        &self,
        op: &OperationName,
        ticket: Ticket,
        slot: Option<&ResultSlot<T>>,
        value: T,
    ) -> ActionOutcome<T>
    where
        T: Clone,
    {
        if !self.tracker.set_fulfilled(op, ticket) {
            tracing::debug!(operation = %op, ticket = ticket.sequence(), "dropping superseded result");
            return ActionOutcome::Superseded(Ok(value));
        }
        if let Some(slot) = slot {
            slot.commit(value.clone());
        }
        tracing::debug!(operation = %op, "action fulfilled");
        ActionOutcome::Fulfilled(value)
    }

    fn reject<T>(
        &self,
        op: &OperationName,
        ticket: Ticket,
        slot: Option<&ResultSlot<T>>,
        err: &RemoteError,
        placeholder: Option<T>,
    ) -> ActionOutcome<T> {
        let message = err.message();
        if !self.tracker.set_rejected(op, ticket, message.clone()) {
            tracing::debug!(operation = %op, ticket = ticket.sequence(), "dropping superseded failure");
            return ActionOutcome::Superseded(Err(message));
        }
        if let Some(slot) = slot {
            slot.discard_interim();
        }
        tracing::warn!(operation = %op, error = %err, "action rejected");
        ActionOutcome::Rejected {
            error: message,
            placeholder,
        }
    }
}
