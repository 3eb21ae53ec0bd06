//! Core domain types for rxtriage.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod action;
mod filter;
mod ids;
mod message;
mod tab;

use std::fmt;

use thiserror::Error;

pub use action::{ActionStatus, OperationName};
pub use filter::{
    CancelPayload, ClearScope, FilterPayload, FilterState, FilterUpdate, MessagePage, TimeFrame,
    TimeFrameError,
};
pub use ids::{DoctorId, MessageId, PatientId, PracticeId, RequestId, UserId};
pub use message::{Message, MessageStatus, MessageType, Wildcard};
pub use tab::{CountBucket, FilterFamily, MessageCounts, TAB_DEFINITIONS, TabDefinition, TabId};

// ============================================================================
// Enum parsing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumKind {
    Tab,
    CountBucket,
    MessageType,
    MessageStatus,
}

impl EnumKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            EnumKind::Tab => "tab",
            EnumKind::CountBucket => "count bucket",
            EnumKind::MessageType => "message type",
            EnumKind::MessageStatus => "message status",
        }
    }
}

impl fmt::Display for EnumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} value '{raw}'; expected one of: {expected:?}")]
pub struct EnumParseError {
    kind: EnumKind,
    raw: String,
    expected: &'static [&'static str],
}

impl EnumParseError {
    #[must_use]
    pub fn new(kind: EnumKind, raw: impl Into<String>, expected: &'static [&'static str]) -> Self {
        Self {
            kind,
            raw: raw.into(),
            expected,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> EnumKind {
        self.kind
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub const fn expected(&self) -> &'static [&'static str] {
        self.expected
    }
}

// ============================================================================
// Text helpers
// ============================================================================

/// Number of characters in `value` after trimming surrounding whitespace.
///
/// Search gates compare against this rather than byte length so that
/// non-ASCII patient names are not penalized.
#[must_use]
pub fn query_len(value: &str) -> usize {
    value.trim().chars().count()
}

/// Truncate to `max` characters, appending an ellipsis when shortened.
#[must_use]
pub fn truncate_with_ellipsis(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let kept: String = value.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}
