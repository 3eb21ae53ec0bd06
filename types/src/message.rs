//! Clinical workflow message model and the backend's type/status vocabulary.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ids::{DoctorId, MessageId, PatientId, PracticeId, RequestId, UserId};
use crate::{EnumKind, EnumParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    NewRx,
    RxChangeRequest,
    RxChangeResponse,
    RxRenewalRequest,
    RxRenewalResponse,
    CancelRx,
    CancelRxResponse,
    RxFillIndicatorChange,
}

const MESSAGE_TYPE_VALUES: &[&str] = &[
    "NewRx",
    "RxChangeRequest",
    "RxChangeResponse",
    "RxRenewalRequest",
    "RxRenewalResponse",
    "CancelRx",
    "CancelRxResponse",
    "RxFillIndicatorChange",
];

impl MessageType {
    pub const ALL: [Self; 8] = [
        Self::NewRx,
        Self::RxChangeRequest,
        Self::RxChangeResponse,
        Self::RxRenewalRequest,
        Self::RxRenewalResponse,
        Self::CancelRx,
        Self::CancelRxResponse,
        Self::RxFillIndicatorChange,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NewRx => "NewRx",
            Self::RxChangeRequest => "RxChangeRequest",
            Self::RxChangeResponse => "RxChangeResponse",
            Self::RxRenewalRequest => "RxRenewalRequest",
            Self::RxRenewalResponse => "RxRenewalResponse",
            Self::CancelRx => "CancelRx",
            Self::CancelRxResponse => "CancelRxResponse",
            Self::RxFillIndicatorChange => "RxFillIndicatorChange",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EnumParseError::new(EnumKind::MessageType, s, MESSAGE_TYPE_VALUES))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageStatus {
    Pending,
    WaitingApproval,
    Success,
    Declined,
    Error,
    #[serde(rename = "Error Reviewed")]
    ErrorReviewed,
    InhouseNewRx,
}

const MESSAGE_STATUS_VALUES: &[&str] = &[
    "Pending",
    "WaitingApproval",
    "Success",
    "Declined",
    "Error",
    "Error Reviewed",
    "InhouseNewRx",
];

impl MessageStatus {
    pub const ALL: [Self; 7] = [
        Self::Pending,
        Self::WaitingApproval,
        Self::Success,
        Self::Declined,
        Self::Error,
        Self::ErrorReviewed,
        Self::InhouseNewRx,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::WaitingApproval => "WaitingApproval",
            Self::Success => "Success",
            Self::Declined => "Declined",
            Self::Error => "Error",
            Self::ErrorReviewed => "Error Reviewed",
            Self::InhouseNewRx => "InhouseNewRx",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageStatus {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EnumParseError::new(EnumKind::MessageStatus, s, MESSAGE_STATUS_VALUES))
    }
}

/// Predicate over one field: either any value (`%` on the wire) or one exact value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Wildcard<T> {
    #[default]
    Any,
    Exact(T),
}

impl<T: PartialEq> Wildcard<T> {
    #[must_use]
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => expected == value,
        }
    }
}

impl<T: Serialize> Serialize for Wildcard<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Any => serializer.serialize_str("%"),
            Self::Exact(value) => value.serialize(serializer),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Wildcard<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw<T> {
            Exact(T),
            Other(String),
        }

        match Raw::<T>::deserialize(deserializer)? {
            Raw::Exact(value) => Ok(Self::Exact(value)),
            Raw::Other(raw) if raw == "%" => Ok(Self::Any),
            Raw::Other(raw) => Err(D::Error::custom(format!(
                "expected '%' or a known value, got '{raw}'"
            ))),
        }
    }
}

/// One clinical workflow item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub patient_id: PatientId,
    pub message_type: MessageType,
    pub message_status: MessageStatus,
    pub request_id: RequestId,
    pub created_at: DateTime<Utc>,
    pub doctor_id: DoctorId,
    pub practice_id: PracticeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Message {
    #[must_use]
    pub fn matches(
        &self,
        message_type: &Wildcard<MessageType>,
        message_status: &Wildcard<MessageStatus>,
    ) -> bool {
        message_type.matches(&self.message_type) && message_status.matches(&self.message_status)
    }
}
