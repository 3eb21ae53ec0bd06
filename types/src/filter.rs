//! Per-family filter state and the payload sent to the backend for a tab fetch.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{DoctorId, MessageId, PatientId, PracticeId};
use crate::message::{Message, MessageStatus, MessageType, Wildcard};
use crate::tab::TabDefinition;

/// Filter fields held independently by each [`crate::FilterFamily`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    #[serde(default)]
    pub doctor_id: Vec<DoctorId>,
    #[serde(default)]
    pub practice_id: Option<PracticeId>,
    #[serde(default)]
    pub message_type: Wildcard<MessageType>,
    #[serde(default)]
    pub message_status: Wildcard<MessageStatus>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub offset: u32,
    pub limit: u32,
    pub sorted_by: String,
}

impl FilterState {
    #[must_use]
    pub fn new(from_date: NaiveDate, to_date: NaiveDate, limit: u32, sorted_by: &str) -> Self {
        Self {
            from_date,
            to_date,
            doctor_id: Vec::new(),
            practice_id: None,
            message_type: Wildcard::Any,
            message_status: Wildcard::Any,
            first_name: String::new(),
            last_name: String::new(),
            offset: 0,
            limit,
            sorted_by: sorted_by.to_string(),
        }
    }

    /// Apply a single-field update. Paging resets to the first page whenever a
    /// predicate field changes, since the old offset no longer addresses the
    /// same rows.
    pub fn apply(&mut self, update: FilterUpdate) {
        match update {
            FilterUpdate::FromDate(date) => self.from_date = date,
            FilterUpdate::ToDate(date) => self.to_date = date,
            FilterUpdate::DoctorIds(ids) => self.doctor_id = ids,
            FilterUpdate::PracticeId(id) => self.practice_id = id,
            FilterUpdate::FirstName(name) => self.first_name = name,
            FilterUpdate::LastName(name) => self.last_name = name,
            FilterUpdate::Offset(offset) => {
                self.offset = offset;
                return;
            }
            FilterUpdate::Limit(limit) => self.limit = limit,
            FilterUpdate::SortedBy(field) => self.sorted_by = field,
        }
        self.offset = 0;
    }

    /// Replace both date bounds from a time-frame shortcut relative to `today`.
    pub fn apply_time_frame(&mut self, frame: TimeFrame, today: NaiveDate, earliest: NaiveDate) {
        self.from_date = frame.from_date(today, earliest);
        self.to_date = today;
        self.offset = 0;
    }
}

/// Partial update of one [`FilterState`] field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterUpdate {
    FromDate(NaiveDate),
    ToDate(NaiveDate),
    DoctorIds(Vec<DoctorId>),
    PracticeId(Option<PracticeId>),
    FirstName(String),
    LastName(String),
    Offset(u32),
    Limit(u32),
    SortedBy(String),
}

impl FilterUpdate {
    #[must_use]
    pub const fn field_name(&self) -> &'static str {
        match self {
            Self::FromDate(_) => "fromDate",
            Self::ToDate(_) => "toDate",
            Self::DoctorIds(_) => "doctorId",
            Self::PracticeId(_) => "practiceId",
            Self::FirstName(_) => "firstName",
            Self::LastName(_) => "lastName",
            Self::Offset(_) => "offset",
            Self::Limit(_) => "limit",
            Self::SortedBy(_) => "sortedBy",
        }
    }
}

/// Body of a tab fetch or count request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterPayload {
    pub doctor_id: Vec<DoctorId>,
    pub practice_id: Option<PracticeId>,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub message_type: Wildcard<MessageType>,
    pub message_status: Wildcard<MessageStatus>,
    pub first_name: String,
    pub last_name: String,
    pub offset: u32,
    pub limit: u32,
    pub sorted_by: String,
}

impl FilterPayload {
    /// Merge a tab's predicate into its family's filter state. The tab's
    /// type/status win over whatever the filter state carries, except where the
    /// tab leaves a field open (`%`).
    #[must_use]
    pub fn for_tab(tab: &TabDefinition, state: &FilterState) -> Self {
        let message_type = match tab.message_type {
            Wildcard::Any => state.message_type,
            exact @ Wildcard::Exact(_) => exact,
        };
        let message_status = match tab.message_status {
            Wildcard::Any => state.message_status,
            exact @ Wildcard::Exact(_) => exact,
        };
        Self {
            doctor_id: state.doctor_id.clone(),
            practice_id: state.practice_id,
            from_date: state.from_date,
            to_date: state.to_date,
            message_type,
            message_status,
            first_name: state.first_name.clone(),
            last_name: state.last_name.clone(),
            offset: state.offset,
            limit: state.limit,
            sorted_by: state.sorted_by.clone(),
        }
    }

    /// Whether a message satisfies this payload's type/status/date predicate.
    #[must_use]
    pub fn matches(&self, message: &Message) -> bool {
        let created = message.created_at.date_naive();
        message.matches(&self.message_type, &self.message_status)
            && created >= self.from_date
            && created <= self.to_date
            && (self.doctor_id.is_empty() || self.doctor_id.contains(&message.doctor_id))
            && self.practice_id.is_none_or(|id| id == message.practice_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unsupported time frame of {0} days; expected 0, 5, 10 or 30")]
pub struct TimeFrameError(pub u32);

/// "Last N days" shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimeFrame {
    /// Everything since the configured earliest date.
    #[default]
    All,
    Last5Days,
    Last10Days,
    Last30Days,
}

impl TimeFrame {
    pub fn from_days(days: u32) -> Result<Self, TimeFrameError> {
        match days {
            0 => Ok(Self::All),
            5 => Ok(Self::Last5Days),
            10 => Ok(Self::Last10Days),
            30 => Ok(Self::Last30Days),
            other => Err(TimeFrameError(other)),
        }
    }

    #[must_use]
    pub const fn days(self) -> u32 {
        match self {
            Self::All => 0,
            Self::Last5Days => 5,
            Self::Last10Days => 10,
            Self::Last30Days => 30,
        }
    }

    #[must_use]
    pub fn from_date(self, today: NaiveDate, earliest: NaiveDate) -> NaiveDate {
        match self {
            Self::All => earliest,
            frame => today
                .checked_sub_days(Days::new(u64::from(frame.days())))
                .unwrap_or(earliest),
        }
    }
}

impl TryFrom<u32> for TimeFrame {
    type Error = TimeFrameError;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        Self::from_days(days)
    }
}

/// Extra data the backend needs to cancel a prescription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelPayload {
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// What a clear-all command applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "camelCase")]
pub enum ClearScope {
    Tab { filter: FilterPayload },
    Patient {
        #[serde(rename = "patientId")]
        patient_id: PatientId,
    },
}

/// One page of messages returned by a tab fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub total: u64,
}

impl MessagePage {
    #[must_use]
    pub fn contains(&self, id: MessageId) -> bool {
        self.messages.iter().any(|message| message.id == id)
    }
}
