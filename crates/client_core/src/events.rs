//! Controller events and user-facing notifications.

use std::fmt;

use crate::{customer_controller::CustomerListState, query_controller::QueryState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Warning,
    Error,
}

/// A transient message for the user, the terminal equivalent of a toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.level {
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
        };
        write!(f, "[{label}] {}", self.message)
    }
}

#[derive(Debug, Clone)]
pub enum ControllerEvent {
    QueryUpdated(QueryState),
    CustomersUpdated(CustomerListState),
    Notify(Notification),
    /// The gateway rejected the configured credential (401/403).
    AuthRejected,
}
