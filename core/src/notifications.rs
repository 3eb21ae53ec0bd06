//! User-facing notifications raised by store operations.
//!
//! Only mutation outcomes produce notifications. Background list and count
//! refreshes degrade silently to their last known good data.

use crate::errors::describe_failure;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A workflow mutation succeeded.
    MutationApplied {
        operation: String,
    },
    /// A workflow mutation was rejected by the backend.
    MutationFailed {
        operation: String,
        /// Normalized backend message, when the failure carried one.
        message: Option<String>,
    },
}

impl Notification {
    #[must_use]
    pub fn format(&self) -> String {
        match self {
            Self::MutationApplied { operation } => format!("{operation} completed"),
            Self::MutationFailed { operation, message } => {
                describe_failure(operation, message.as_deref())
            }
        }
    }

    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::MutationFailed { .. })
    }
}

/// Queue of notifications waiting to be shown.
///
/// The view layer drains it; identical consecutive notifications collapse
/// into one so a repeated failing click does not stack toasts.
#[derive(Debug, Default)]
pub struct NotificationQueue {
    pending: Vec<Notification>,
}

impl NotificationQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notification: Notification) {
        if self.pending.last() == Some(&notification) {
            return;
        }
        self.pending.push(notification);
    }

    pub fn take(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.pending)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }
}
