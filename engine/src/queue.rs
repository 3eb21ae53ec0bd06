//! Message Taxonomy & Filter Engine.
//!
//! Holds one [`FilterState`] per filter family, one message page per tab and
//! one counter per badge bucket. Tab fetches merge the tab's fixed predicate
//! into its family's filter state; every fetch and count goes through the
//! executor under its own operation name so their statuses never interfere.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Local, NaiveDate};
use futures_util::future::join_all;

use rxtriage_core::{Notification, NotificationQueue, TriageConfig};
use rxtriage_types::{
    ActionStatus, CountBucket, DoctorId, FilterFamily, FilterPayload, FilterState, FilterUpdate,
    Message, MessageCounts, MessageId, MessagePage, OperationName, PracticeId, TabId, TimeFrame,
    TimeFrameError,
};

use crate::backend::MessageBackend;
use crate::executor::{ActionExecutor, ActionOutcome};
use crate::slot::ResultSlot;
use crate::tracker::ActionTracker;

/// Source of "today" for relative date filters.
pub trait Clock: Send + Sync + 'static {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSettings {
    pub earliest_from_date: NaiveDate,
    pub page_limit: u32,
    pub sorted_by: String,
    pub doctor_ids: Vec<DoctorId>,
    pub practice_id: Option<PracticeId>,
    /// Initial window of the pending family.
    pub pending_frame: TimeFrame,
    /// Initial window of the history family.
    pub history_frame: TimeFrame,
}

impl QueueSettings {
    #[must_use]
    pub fn from_config(config: &TriageConfig) -> Self {
        let queue = config.queue.as_ref();
        Self {
            earliest_from_date: config.earliest_from_date(),
            page_limit: config.page_limit(),
            sorted_by: config.sorted_by(),
            doctor_ids: queue
                .map(|q| q.doctor_ids.iter().copied().map(DoctorId::new).collect())
                .unwrap_or_default(),
            practice_id: queue.and_then(|q| q.practice_id).map(PracticeId::new),
            pending_frame: TimeFrame::All,
            history_frame: TimeFrame::Last30Days,
        }
    }

    fn initial_filter(&self, family: FilterFamily, today: NaiveDate) -> FilterState {
        let frame = match family {
            FilterFamily::Pending => self.pending_frame,
            FilterFamily::History => self.history_frame,
        };
        let mut filter = FilterState::new(
            frame.from_date(today, self.earliest_from_date),
            today,
            self.page_limit,
            &self.sorted_by,
        );
        filter.doctor_id.clone_from(&self.doctor_ids);
        filter.practice_id = self.practice_id;
        filter
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self::from_config(&TriageConfig::default())
    }
}

/// Tab lists, badge counts and filters for one signed-in user.
///
/// All methods take `&self`; share it behind an `Arc` between the view and
/// background refreshers. Lists and counts are written only by the executor
/// and the workflow mutators in this crate.
pub struct MessageQueue<B> {
    pub(crate) backend: Arc<B>,
    pub(crate) executor: ActionExecutor,
    clock: Arc<dyn Clock>,
    settings: QueueSettings,
    filters: Mutex<BTreeMap<FilterFamily, FilterState>>,
    selected: Mutex<TabId>,
    lists: BTreeMap<TabId, ResultSlot<MessagePage>>,
    counts: BTreeMap<CountBucket, ResultSlot<u64>>,
    notifications: Mutex<NotificationQueue>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<B: MessageBackend> MessageQueue<B> {
    pub fn new(
        backend: B,
        tracker: ActionTracker,
        settings: QueueSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let today = clock.today();
        let filters = FilterFamily::ALL
            .into_iter()
            .map(|family| (family, settings.initial_filter(family, today)))
            .collect();
        Self {
            backend: Arc::new(backend),
            executor: ActionExecutor::new(tracker),
            clock,
            settings,
            filters: Mutex::new(filters),
            selected: Mutex::new(TabId::default()),
            lists: TabId::ALL
                .into_iter()
                .map(|tab| (tab, ResultSlot::default()))
                .collect(),
            counts: CountBucket::ALL
                .into_iter()
                .map(|bucket| (bucket, ResultSlot::default()))
                .collect(),
            notifications: Mutex::new(NotificationQueue::new()),
        }
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[must_use]
    pub fn tracker(&self) -> &ActionTracker {
        self.executor.tracker()
    }

    pub(crate) fn slot(&self, tab: TabId) -> &ResultSlot<MessagePage> {
        &self.lists[&tab]
    }

    /// Request body for `tab` under its family's current filter.
    #[must_use]
    pub fn payload_for(&self, tab: TabId) -> FilterPayload {
        let filters = lock(&self.filters);
        let state = &filters[&tab.family()];
        FilterPayload::for_tab(tab.definition(), state)
    }

    /// Make `tab` the visible tab and load it, showing an empty list until
    /// the response arrives.
    pub async fn select_tab(&self, tab: TabId) -> ActionOutcome<MessagePage> {
        *lock(&self.selected) = tab;
        tracing::debug!(tab = tab.as_str(), "tab selected");
        self.fetch(tab, Some(MessagePage::default())).await
    }

    /// Reload `tab` in place; the current list stays visible meanwhile.
    pub async fn refresh_tab(&self, tab: TabId) -> ActionOutcome<MessagePage> {
        self.fetch(tab, None).await
    }

    async fn fetch(&self, tab: TabId, placeholder: Option<MessagePage>) -> ActionOutcome<MessagePage> {
        let payload = self.payload_for(tab);
        self.executor
            .run(
                &OperationName::fetch(tab),
                self.slot(tab),
                placeholder,
                self.backend.fetch_messages(payload),
            )
            .await
    }

    /// Refresh every badge counter concurrently. A failed bucket keeps its
    /// previous value.
    pub async fn refresh_counts(&self) -> MessageCounts {
        join_all(
            CountBucket::ALL
                .into_iter()
                .map(|bucket| self.refresh_count(bucket)),
        )
        .await;
        self.counts()
    }

    pub async fn refresh_count(&self, bucket: CountBucket) -> ActionOutcome<u64> {
        let mut payload = self.payload_for(bucket.tab());
        payload.offset = 0;
        self.executor
            .run(
                &OperationName::count(bucket),
                &self.counts[&bucket],
                None,
                self.backend.count_messages(payload),
            )
            .await
    }

    /// Apply a "last N days" shortcut to the family owning `tab`, then reload
    /// `tab`. Only 0 (all time), 5, 10 and 30 are accepted.
    pub async fn set_time_frame(
        &self,
        tab: TabId,
        days: u32,
    ) -> Result<ActionOutcome<MessagePage>, TimeFrameError> {
        let frame = TimeFrame::from_days(days)?;
        let today = self.clock.today();
        let earliest = self.settings.earliest_from_date;
        self.update_filter(tab.family(), |filter| {
            filter.apply_time_frame(frame, today, earliest);
        });
        Ok(self.select_tab(tab).await)
    }

    /// Apply one field update to the family owning `tab`, then reload `tab`.
    pub async fn reload(&self, tab: TabId, update: FilterUpdate) -> ActionOutcome<MessagePage> {
        tracing::debug!(tab = tab.as_str(), field = update.field_name(), "filter updated");
        self.update_filter(tab.family(), |filter| filter.apply(update));
        self.select_tab(tab).await
    }

    pub async fn set_date_range(
        &self,
        tab: TabId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ActionOutcome<MessagePage> {
        self.update_filter(tab.family(), |filter| {
            filter.apply(FilterUpdate::FromDate(from));
            filter.apply(FilterUpdate::ToDate(to));
        });
        self.select_tab(tab).await
    }

    fn update_filter(&self, family: FilterFamily, f: impl FnOnce(&mut FilterState)) {
        let mut filters = lock(&self.filters);
        if let Some(filter) = filters.get_mut(&family) {
            f(filter);
        }
    }

    /// Tab a mutation of the matching message belongs to: the selected tab if
    /// it shows it, else the first loaded tab that does, else the selected tab.
    pub(crate) fn owning_tab(&self, shows: impl Fn(&MessagePage) -> bool) -> TabId {
        let selected = self.selected_tab();
        if self.slot(selected).with(&shows) {
            return selected;
        }
        TabId::ALL
            .into_iter()
            .find(|tab| {
                let slot = self.slot(*tab);
                slot.version() > 0 && slot.with(&shows)
            })
            .unwrap_or(selected)
    }

    pub(crate) fn owning_tab_of(&self, id: MessageId) -> TabId {
        self.owning_tab(|page| page.contains(id))
    }

    #[must_use]
    pub fn selected_tab(&self) -> TabId {
        *lock(&self.selected)
    }

    #[must_use]
    pub fn page(&self, tab: TabId) -> MessagePage {
        self.slot(tab).get()
    }

    #[must_use]
    pub fn messages(&self, tab: TabId) -> Vec<Message> {
        self.slot(tab).with(|page| page.messages.clone())
    }

    /// Messages of the selected tab.
    #[must_use]
    pub fn visible(&self) -> Vec<Message> {
        self.messages(self.selected_tab())
    }

    #[must_use]
    pub fn counts(&self) -> MessageCounts {
        self.counts
            .iter()
            .map(|(bucket, slot)| (*bucket, slot.get()))
            .collect()
    }

    #[must_use]
    pub fn filter(&self, family: FilterFamily) -> FilterState {
        lock(&self.filters)[&family].clone()
    }

    #[must_use]
    pub fn status(&self, op: &OperationName) -> ActionStatus {
        self.tracker().get(op)
    }

    #[must_use]
    pub fn error(&self, op: &OperationName) -> Option<String> {
        self.tracker().error(op)
    }

    pub(crate) fn notify(&self, notification: Notification) {
        lock(&self.notifications).push(notification);
    }

    /// Drain notifications raised by workflow mutations.
    pub fn take_notifications(&self) -> Vec<Notification> {
        lock(&self.notifications).take()
    }
}
