//! Tab taxonomy: the static table mapping each triage tab to its predicate.
//!
//! Adding a tab is a new [`TabId`] variant plus one row in [`TAB_DEFINITIONS`];
//! fetch, count and reload code paths are driven entirely by this table.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::message::{MessageStatus, MessageType, Wildcard};
use crate::{EnumKind, EnumParseError};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum TabId {
    #[default]
    Pending,
    RefillRequest,
    ChangeRequest,
    NewPrescription,
    ErrorReviewed,
    History,
    Approved,
    Declined,
    Cancel,
    Error,
    SearchResult,
    InHousePharmacy,
}

const TAB_VALUES: &[&str] = &[
    "pending",
    "refillRequest",
    "changeRequest",
    "newPrescription",
    "errorReviewed",
    "history",
    "approved",
    "declined",
    "cancel",
    "error",
    "searchResult",
    "inHousePharmacy",
];

impl TabId {
    pub const ALL: [Self; 12] = [
        Self::Pending,
        Self::RefillRequest,
        Self::ChangeRequest,
        Self::NewPrescription,
        Self::ErrorReviewed,
        Self::History,
        Self::Approved,
        Self::Declined,
        Self::Cancel,
        Self::Error,
        Self::SearchResult,
        Self::InHousePharmacy,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::RefillRequest => "refillRequest",
            Self::ChangeRequest => "changeRequest",
            Self::NewPrescription => "newPrescription",
            Self::ErrorReviewed => "errorReviewed",
            Self::History => "history",
            Self::Approved => "approved",
            Self::Declined => "declined",
            Self::Cancel => "cancel",
            Self::Error => "error",
            Self::SearchResult => "searchResult",
            Self::InHousePharmacy => "inHousePharmacy",
        }
    }

    /// The predicate row for this tab.
    #[must_use]
    pub fn definition(self) -> &'static TabDefinition {
        TAB_DEFINITIONS
            .iter()
            .find(|def| def.id == self)
            .unwrap_or(&TAB_DEFINITIONS[0])
    }

    #[must_use]
    pub fn family(self) -> FilterFamily {
        self.definition().family
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TabId {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|tab| tab.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| EnumParseError::new(EnumKind::Tab, s, TAB_VALUES))
    }
}

/// Which date-range filter a tab reads from.
///
/// "Pending-style" tabs share `messageFilter`; "history-style" tabs share
/// `messageHistoryFilter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterFamily {
    Pending,
    History,
}

impl FilterFamily {
    pub const ALL: [Self; 2] = [Self::Pending, Self::History];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "messageFilter",
            Self::History => "messageHistoryFilter",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabDefinition {
    pub id: TabId,
    pub message_type: Wildcard<MessageType>,
    pub message_status: Wildcard<MessageStatus>,
    pub family: FilterFamily,
}

const fn tab(
    id: TabId,
    message_type: Wildcard<MessageType>,
    message_status: Wildcard<MessageStatus>,
    family: FilterFamily,
) -> TabDefinition {
    TabDefinition {
        id,
        message_type,
        message_status,
        family,
    }
}

pub static TAB_DEFINITIONS: [TabDefinition; 12] = {
    use FilterFamily::{History, Pending};
    use Wildcard::{Any, Exact};

    [
        tab(TabId::Pending, Any, Exact(MessageStatus::Pending), Pending),
        tab(
            TabId::RefillRequest,
            Exact(MessageType::RxRenewalRequest),
            Exact(MessageStatus::Pending),
            Pending,
        ),
        tab(
            TabId::ChangeRequest,
            Exact(MessageType::RxChangeRequest),
            Exact(MessageStatus::Pending),
            Pending,
        ),
        tab(
            TabId::NewPrescription,
            Exact(MessageType::NewRx),
            Exact(MessageStatus::WaitingApproval),
            Pending,
        ),
        tab(TabId::Error, Any, Exact(MessageStatus::Error), Pending),
        tab(
            TabId::Cancel,
            Exact(MessageType::CancelRx),
            Exact(MessageStatus::Pending),
            Pending,
        ),
        tab(
            TabId::InHousePharmacy,
            Exact(MessageType::NewRx),
            Exact(MessageStatus::InhouseNewRx),
            Pending,
        ),
        tab(
            TabId::ErrorReviewed,
            Any,
            Exact(MessageStatus::ErrorReviewed),
            History,
        ),
        tab(TabId::History, Any, Any, History),
        tab(TabId::Approved, Any, Exact(MessageStatus::Success), History),
        tab(TabId::Declined, Any, Exact(MessageStatus::Declined), History),
        tab(TabId::SearchResult, Any, Any, History),
    ]
};

/// Badge counters fetched independently of any tab's message list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CountBucket {
    ChangeRx,
    RefillRx,
    NewRx,
    Error,
    Approved,
    Declined,
    Cancel,
    ErrorReviewed,
}

const COUNT_BUCKET_VALUES: &[&str] = &[
    "changeRx",
    "refillRx",
    "newRx",
    "error",
    "approved",
    "declined",
    "cancel",
    "errorReviewed",
];

impl CountBucket {
    pub const ALL: [Self; 8] = [
        Self::ChangeRx,
        Self::RefillRx,
        Self::NewRx,
        Self::Error,
        Self::Approved,
        Self::Declined,
        Self::Cancel,
        Self::ErrorReviewed,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ChangeRx => "changeRx",
            Self::RefillRx => "refillRx",
            Self::NewRx => "newRx",
            Self::Error => "error",
            Self::Approved => "approved",
            Self::Declined => "declined",
            Self::Cancel => "cancel",
            Self::ErrorReviewed => "errorReviewed",
        }
    }

    /// The tab whose predicate this bucket counts.
    #[must_use]
    pub const fn tab(self) -> TabId {
        match self {
            Self::ChangeRx => TabId::ChangeRequest,
            Self::RefillRx => TabId::RefillRequest,
            Self::NewRx => TabId::NewPrescription,
            Self::Error => TabId::Error,
            Self::Approved => TabId::Approved,
            Self::Declined => TabId::Declined,
            Self::Cancel => TabId::Cancel,
            Self::ErrorReviewed => TabId::ErrorReviewed,
        }
    }
}

impl fmt::Display for CountBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CountBucket {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|bucket| bucket.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| EnumParseError::new(EnumKind::CountBucket, s, COUNT_BUCKET_VALUES))
    }
}

/// Snapshot of every badge counter. Buckets never fetched read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageCounts(BTreeMap<CountBucket, u64>);

impl MessageCounts {
    #[must_use]
    pub fn get(&self, bucket: CountBucket) -> u64 {
        self.0.get(&bucket).copied().unwrap_or(0)
    }

    pub fn set(&mut self, bucket: CountBucket, count: u64) {
        self.0.insert(bucket, count);
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }
}

impl FromIterator<(CountBucket, u64)> for MessageCounts {
    fn from_iter<I: IntoIterator<Item = (CountBucket, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
