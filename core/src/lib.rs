//! Core building blocks shared by the rxtriage engine and its clients.
//!
//! This crate holds the pieces with no async runtime dependency: the remote
//! failure taxonomy and message normalization, user notifications, and the
//! TOML configuration.

pub mod config;
pub mod errors;
pub mod notifications;

pub use config::{ApiConfig, ConfigError, QueueConfig, SearchConfig, TriageConfig};
pub use errors::{RemoteError, describe_failure, extract_error_message};
pub use notifications::{Notification, NotificationQueue};
