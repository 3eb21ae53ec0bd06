//! Remote failure taxonomy and error-message normalization.
//!
//! Every backend failure is reduced to a [`RemoteError`]; the message shown to
//! users is extracted from whatever JSON the backend put in the failure body.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use rxtriage_types::truncate_with_ellipsis;

const MAX_MESSAGE_CHARS: usize = 200;
const TIMEOUT_MESSAGE: &str = "request timed out";

/// A failed remote call. Cancellation is deliberately absent: an aborted call
/// is not an error and never reaches this type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Network-level failure (connection refused, reset, DNS).
    #[error("transport error: {}", .message.as_deref().unwrap_or("no detail"))]
    Transport { message: Option<String> },
    /// Backend answered with a non-2xx status.
    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("no detail"))]
    Http { status: u16, message: Option<String> },
    /// Operation-level timeout elapsed.
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    /// Backend answered 2xx but the body did not match the expected envelope.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Build from a rejection payload (`{"message": "..."}` or similar).
    #[must_use]
    pub fn from_payload(payload: &Value) -> Self {
        Self::Transport {
            message: extract_message_from_value(payload),
        }
    }

    /// Build from a non-2xx response body.
    #[must_use]
    pub fn from_http(status: u16, body: &str) -> Self {
        Self::Http {
            status,
            message: extract_error_message(body),
        }
    }

    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: Some(message.into()),
        }
    }

    /// The normalized, user-facing message; `None` when the failure carried none.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Transport { message } | Self::Http { message, .. } => message.clone(),
            Self::Timeout(_) => Some(TIMEOUT_MESSAGE.to_string()),
            Self::Decode(detail) => Some(truncate_with_ellipsis(detail, MAX_MESSAGE_CHARS)),
        }
    }

    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Pull a human message out of a raw failure body.
///
/// Accepts JSON objects carrying `message`, `error.message` or
/// `response.error.message`, a bare JSON string, or plain text. Returns `None`
/// for empty bodies and for JSON without any recognizable message.
#[must_use]
pub fn extract_error_message(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(payload) => extract_message_from_value(&payload),
        Err(_) => Some(truncate_with_ellipsis(trimmed, MAX_MESSAGE_CHARS)),
    }
}

fn extract_message_from_value(payload: &Value) -> Option<String> {
    payload
        .pointer("/message")
        .and_then(Value::as_str)
        .or_else(|| payload.pointer("/error/message").and_then(Value::as_str))
        .or_else(|| {
            payload
                .pointer("/response/error/message")
                .and_then(Value::as_str)
        })
        .or_else(|| payload.pointer("/error").and_then(Value::as_str))
        .or_else(|| payload.as_str())
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(|message| truncate_with_ellipsis(message, MAX_MESSAGE_CHARS))
}

/// Text for a user notification about a failed operation.
#[must_use]
pub fn describe_failure(operation: &str, message: Option<&str>) -> String {
    match message {
        Some(message) => format!("{operation} failed: {message}"),
        None => format!("{operation} failed. Please try again."),
    }
}
