//! Application context tying the queue, the search inputs and the shared
//! status table together.

use std::collections::BTreeMap;
use std::sync::Arc;

use rxtriage_core::{Notification, TriageConfig};
use rxtriage_types::{MessageCounts, MessagePage, OperationName, TabId};

use crate::backend::{MessageBackend, SearchSource};
use crate::executor::ActionOutcome;
use crate::queue::{Clock, MessageQueue, QueueSettings, SystemClock};
use crate::search::{SearchController, SearchSettings};
use crate::tracker::{ActionRecord, ActionTracker};

/// One signed-in session.
///
/// Every component created through the store reports into the same
/// [`ActionTracker`], so a single status table covers tab fetches, counts,
/// mutations and searches.
pub struct TriageStore<B> {
    tracker: ActionTracker,
    queue: Arc<MessageQueue<B>>,
    message_search: SearchSettings,
    autocomplete: SearchSettings,
}

impl<B: MessageBackend> TriageStore<B> {
    #[must_use]
    pub fn from_config(backend: B, config: &TriageConfig) -> Self {
        Self::with_clock(
            backend,
            config,
            QueueSettings::from_config(config),
            Arc::new(SystemClock),
        )
    }

    pub fn with_clock(
        backend: B,
        config: &TriageConfig,
        settings: QueueSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let tracker = ActionTracker::new();
        let queue = MessageQueue::new(backend, tracker.clone(), settings, clock);
        Self {
            tracker,
            queue: Arc::new(queue),
            message_search: SearchSettings::message(config),
            autocomplete: SearchSettings::autocomplete(config),
        }
    }

    #[must_use]
    pub fn queue(&self) -> &Arc<MessageQueue<B>> {
        &self.queue
    }

    #[must_use]
    pub fn tracker(&self) -> &ActionTracker {
        &self.tracker
    }

    /// Load the default tab and every badge counter.
    pub async fn bootstrap(&self) -> (ActionOutcome<MessagePage>, MessageCounts) {
        let tab = self.queue.selected_tab();
        tokio::join!(self.queue.select_tab(tab), self.queue.refresh_counts())
    }

    /// Free-text search input using the message debounce window.
    pub fn message_search<S: SearchSource>(&self, name: &str, source: S) -> SearchController<S> {
        SearchController::new(name, source, self.message_search, self.tracker.clone())
    }

    /// Lookup autocomplete input using the shorter debounce window.
    pub fn autocomplete<S: SearchSource>(&self, name: &str, source: S) -> SearchController<S> {
        SearchController::new(name, source, self.autocomplete, self.tracker.clone())
    }

    pub fn take_notifications(&self) -> Vec<Notification> {
        self.queue.take_notifications()
    }

    #[must_use]
    pub fn statuses(&self) -> BTreeMap<OperationName, ActionRecord> {
        self.tracker.snapshot()
    }

    #[must_use]
    pub fn selected_tab(&self) -> TabId {
        self.queue.selected_tab()
    }
}
