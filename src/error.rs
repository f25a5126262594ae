//! Error types used by the viewsync runtime and widget handlers.
//!
//! This module defines two main error types:
//!
//! - [`SyncError`] — errors surfaced by the router and actor runtime.
//! - [`WidgetFault`] — errors raised inside user-written widget handlers.
//!
//! [`SyncError`] provides helper methods (`as_label`, `as_message`) for
//! logging/metrics.

use thiserror::Error;

use crate::protocol::{SessionId, WidgetId};

/// # Errors produced by the synchronization runtime.
///
/// Faults are local to the instance that produced them; they never propagate
/// to sibling instances or to the router itself.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SyncError {
    /// The widget's `init` handler faulted; no instance was produced.
    #[error("widget init failed: {reason}")]
    Init {
        /// Message from the failing handler.
        reason: String,
    },

    /// A command handler faulted; the instance has been terminated and all
    /// attached sessions notified. The instance must be recreated explicitly.
    #[error("widget instance faulted: {reason}")]
    InstanceFault {
        /// Message from the failing handler.
        reason: String,
    },

    /// A stale widget handle was used after the instance was torn down.
    #[error("widget instance not found: {id}")]
    InstanceNotFound {
        /// The unknown instance id.
        id: WidgetId,
    },

    /// A stale session handle was used after detach or instance teardown.
    #[error("session not found: {id}")]
    SessionNotFound {
        /// The unknown session id.
        id: SessionId,
    },
}

impl SyncError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use viewsync::SyncError;
    ///
    /// let err = SyncError::Init { reason: "boom".into() };
    /// assert_eq!(err.as_label(), "init_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SyncError::Init { .. } => "init_failed",
            SyncError::InstanceFault { .. } => "instance_fault",
            SyncError::InstanceNotFound { .. } => "instance_not_found",
            SyncError::SessionNotFound { .. } => "session_not_found",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SyncError::Init { reason } => format!("init failed: {reason}"),
            SyncError::InstanceFault { reason } => format!("instance faulted: {reason}"),
            SyncError::InstanceNotFound { id } => format!("no such instance: {id}"),
            SyncError::SessionNotFound { id } => format!("no such session: {id}"),
        }
    }
}

/// # Error raised inside a widget handler.
///
/// Any `WidgetFault` returned from `handle_command` (or a panic inside it)
/// terminates the instance fail-fast: no partial state is committed, every
/// attached session receives a terminal notice, and the instance must be
/// recreated by its owner. A fault from `init` only aborts that creation
/// attempt.
///
/// # Example
/// ```
/// use viewsync::WidgetFault;
///
/// let fault = WidgetFault::new("unknown op");
/// assert_eq!(fault.message(), "unknown op");
///
/// let fault: WidgetFault = "division by zero".into();
/// assert_eq!(fault.to_string(), "division by zero");
/// ```
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct WidgetFault {
    message: String,
}

impl WidgetFault {
    /// Creates a fault with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The fault message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for WidgetFault {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for WidgetFault {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
