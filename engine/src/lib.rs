//! Async action core for rxtriage.
//!
//! Tracks the lifecycle of every remote call, runs tab fetches and badge
//! counts, debounces typeahead searches and applies workflow mutations.
//! Nothing here renders; the view layer reads state through the accessors.

mod backend;
mod executor;
mod mutator;
mod queue;
mod search;
mod slot;
mod store;
mod tracker;

#[cfg(test)]
mod test_support;

pub use backend::{MessageBackend, SearchSource};
pub use executor::{ActionExecutor, ActionOutcome, with_timeout};
pub use queue::{Clock, FixedClock, MessageQueue, QueueSettings, SystemClock};
pub use search::{SearchController, SearchPhase, SearchSettings};
pub use slot::ResultSlot;
pub use store::TriageStore;
pub use tracker::{ActionRecord, ActionTracker, Ticket};

pub use rxtriage_core::{Notification, RemoteError};
pub use rxtriage_types::{ActionStatus, OperationName};
