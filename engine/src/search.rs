//! Debounced Search Controller.
//!
//! Turns a stream of keystrokes into at most one in-flight lookup. Each input
//! cancels whatever the previous input started, whether it was still waiting
//! out the debounce window or already fetching. Queries shorter than the
//! minimum length never reach the network and clear the results immediately.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::{AbortHandle, Abortable};
use tokio::task::JoinHandle;

use rxtriage_core::TriageConfig;
use rxtriage_types::{ActionStatus, OperationName, query_len};

use crate::backend::SearchSource;
use crate::executor::{ActionExecutor, ActionOutcome, with_timeout};
use crate::slot::ResultSlot;
use crate::tracker::ActionTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
    pub wait: Duration,
    pub min_chars: usize,
    pub timeout: Duration,
}

impl SearchSettings {
    /// Free-text message search.
    #[must_use]
    pub fn message(config: &TriageConfig) -> Self {
        Self {
            wait: Duration::from_millis(config.message_wait_ms()),
            min_chars: config.min_chars(),
            timeout: Duration::from_secs(config.search_timeout_secs()),
        }
    }

    /// Patient, pharmacy and drug autocomplete.
    #[must_use]
    pub fn autocomplete(config: &TriageConfig) -> Self {
        Self {
            wait: Duration::from_millis(config.autocomplete_wait_ms()),
            ..Self::message(config)
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self::message(&TriageConfig::default())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchPhase {
    #[default]
    Idle,
    Debouncing,
    Fetching,
}

#[derive(Debug, Default)]
struct Session {
    phase: SearchPhase,
    raw_value: String,
    debounced_value: Option<String>,
    generation: u64,
}

fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handles for the work started by one input.
#[derive(Debug)]
struct PendingSearch {
    debounce: AbortHandle,
    fetch: AbortHandle,
    task: JoinHandle<()>,
}

impl PendingSearch {
    fn cancel(&self) {
        self.debounce.abort();
        self.fetch.abort();
    }
}

/// One search input bound to one [`SearchSource`].
///
/// Must be driven from inside a Tokio runtime. Dropping the controller
/// cancels any pending work.
pub struct SearchController<S: SearchSource> {
    op: OperationName,
    source: Arc<S>,
    settings: SearchSettings,
    executor: ActionExecutor,
    results: ResultSlot<Vec<S::Item>>,
    session: Arc<Mutex<Session>>,
    pending: Option<PendingSearch>,
}

impl<S: SearchSource> SearchController<S> {
    /// `name` keys the status record (`search:<name>`) in `tracker`.
    pub fn new(name: &str, source: S, settings: SearchSettings, tracker: ActionTracker) -> Self {
        Self {
            op: OperationName::search(name),
            source: Arc::new(source),
            settings,
            executor: ActionExecutor::new(tracker),
            results: ResultSlot::default(),
            session: Arc::new(Mutex::new(Session::default())),
            pending: None,
        }
    }

    pub fn input(&mut self, value: impl Into<String>) {
        let value = value.into();
        self.cancel_pending();

        let generation = {
            let mut session = lock(&self.session);
            session.raw_value.clone_from(&value);
            session.generation = session.generation.saturating_add(1);
            session.generation
        };

        if query_len(&value) < self.settings.min_chars {
            self.results.commit(Vec::new());
            let mut session = lock(&self.session);
            session.phase = SearchPhase::Idle;
            session.debounced_value = None;
            return;
        }

        lock(&self.session).phase = SearchPhase::Debouncing;
        self.pending = Some(self.spawn(value.trim().to_string(), generation));
    }

    /// Clear the input, its results and any pending work.
    pub fn reset(&mut self) {
        self.cancel_pending();
        self.results.commit(Vec::new());
        let mut session = lock(&self.session);
        session.generation = session.generation.saturating_add(1);
        session.phase = SearchPhase::Idle;
        session.raw_value.clear();
        session.debounced_value = None;
    }

    /// Wait until the work started by the latest input has finished.
    pub async fn settle(&mut self) {
        if let Some(pending) = self.pending.take()
            && let Err(err) = pending.task.await
        {
            tracing::warn!(operation = %self.op, error = %err, "search task failed");
        }
    }

    fn spawn(&self, query: String, generation: u64) -> PendingSearch {
        let (debounce, debounce_registration) = AbortHandle::new_pair();
        let (fetch, fetch_registration) = AbortHandle::new_pair();

        let op = self.op.clone();
        let source = Arc::clone(&self.source);
        let executor = self.executor.clone();
        let results = self.results.clone();
        let session = Arc::clone(&self.session);
        let SearchSettings { wait, timeout, .. } = self.settings;

        let task = tokio::spawn(async move {
            if Abortable::new(tokio::time::sleep(wait), debounce_registration)
                .await
                .is_err()
            {
                return;
            }
            {
                let mut state = lock(&session);
                if state.generation != generation {
                    return;
                }
                state.phase = SearchPhase::Fetching;
                state.debounced_value = Some(query.clone());
            }

            let outcome = executor
                .run_abortable(
                    &op,
                    &results,
                    None,
                    with_timeout(timeout, source.search(query)),
                    fetch_registration,
                )
                .await;

            let mut state = lock(&session);
            if state.generation == generation {
                state.phase = SearchPhase::Idle;
            }
            if let ActionOutcome::Rejected { error, .. } = outcome {
                tracing::debug!(operation = %op, error = ?error, "search rejected");
            }
        });

        PendingSearch {
            debounce,
            fetch,
            task,
        }
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
    }

    #[must_use]
    pub fn state(&self) -> SearchPhase {
        lock(&self.session).phase
    }

    #[must_use]
    pub fn results(&self) -> Vec<S::Item> {
        self.results.get()
    }

    #[must_use]
    pub fn result_slot(&self) -> &ResultSlot<Vec<S::Item>> {
        &self.results
    }

    #[must_use]
    pub fn status(&self) -> ActionStatus {
        self.executor.tracker().get(&self.op)
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.executor.tracker().error(&self.op)
    }

    #[must_use]
    pub fn raw_value(&self) -> String {
        lock(&self.session).raw_value.clone()
    }

    /// The query most recently sent to the source, if any.
    #[must_use]
    pub fn debounced_value(&self) -> Option<String> {
        lock(&self.session).debounced_value.clone()
    }

    #[must_use]
    pub fn operation(&self) -> &OperationName {
        &self.op
    }
}

impl<S: SearchSource> Drop for SearchController<S> {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
