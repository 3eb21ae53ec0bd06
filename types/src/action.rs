//! Action status vocabulary shared by the tracker and its readers.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tab::{CountBucket, TabId};

/// Lifecycle of one named asynchronous operation.
///
/// Legal edges: `Initial -> Pending`, `Pending -> Fulfilled | Rejected`, and
/// `Fulfilled | Rejected | Pending -> Pending` when the operation is invoked
/// again. There is no edge back to `Initial`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    #[default]
    Initial,
    Pending,
    Fulfilled,
    Rejected,
}

impl ActionStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Pending => "pending",
            Self::Fulfilled => "fulfilled",
            Self::Rejected => "rejected",
        }
    }

    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }

    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match next {
            Self::Initial => false,
            Self::Pending => true,
            Self::Fulfilled | Self::Rejected => matches!(self, Self::Pending),
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name under which an operation's status is tracked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationName(Cow<'static, str>);

impl OperationName {
    pub const APPROVE: Self = Self::from_static("approve");
    pub const DENY: Self = Self::from_static("deny");
    pub const CANCEL: Self = Self::from_static("cancel");
    pub const MARK_REVIEWED: Self = Self::from_static("markReviewed");
    pub const CLEAR_ALL: Self = Self::from_static("clearAll");
    pub const CLEAR_ALL_FOR_PATIENT: Self = Self::from_static("clearAllForPatient");
    pub const DELETE: Self = Self::from_static("delete");

    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// `fetch:<tabId>`
    #[must_use]
    pub fn fetch(tab: TabId) -> Self {
        Self::new(format!("fetch:{}", tab.as_str()))
    }

    /// `count:<bucket>`
    #[must_use]
    pub fn count(bucket: CountBucket) -> Self {
        Self::new(format!("count:{}", bucket.as_str()))
    }

    /// `search:<session>`
    #[must_use]
    pub fn search(session: &str) -> Self {
        Self::new(format!("search:{session}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for OperationName {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}
