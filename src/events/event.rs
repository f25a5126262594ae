//! # Lifecycle events emitted by the router and widget actors.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Instance events**: widget lifecycle (created, stopped, faulted)
//! - **Session events**: attach/detach of viewers
//! - **Delivery events**: broadcast fan-out and its failure modes
//!
//! The [`Event`] struct carries additional metadata such as timestamps,
//! widget/session ids, broadcast names, and fault reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! observed out of order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::protocol::{SessionId, WidgetId};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Instance events ===
    /// A widget instance was created (`init` succeeded, actor spawned).
    ///
    /// Sets: `widget`, `name` (widget behavior name), `at`, `seq`.
    WidgetCreated,

    /// A widget instance stopped cleanly (explicit stop or shutdown).
    ///
    /// Sets: `widget`, `reason`, `at`, `seq`.
    WidgetStopped,

    /// A command handler faulted; the instance terminated fail-fast.
    ///
    /// Sets: `widget`, `reason` (fault message), `at`, `seq`.
    WidgetFaulted,

    // === Session events ===
    /// A session attached and received its snapshot.
    ///
    /// Sets: `widget`, `session`, `at`, `seq`.
    SessionAttached,

    /// A session detached (explicit detach, dropped receiver, or instance
    /// teardown).
    ///
    /// Sets: `widget`, `session`, `at`, `seq`.
    SessionDetached,

    // === Delivery events ===
    /// A broadcast was fanned out to the instance's sessions.
    ///
    /// Sets: `widget`, `name` (broadcast name), `at`, `seq`.
    BroadcastSent,

    /// A broadcast was dropped for one session (its queue was full).
    ///
    /// Affects that session only; the instance and its other sessions are
    /// untouched.
    ///
    /// Sets: `widget`, `session`, `name`, `at`, `seq`.
    DeliveryDropped,

    /// An inbound client event could not be routed (stale session or
    /// terminated instance) or was sent from an already-detached session.
    ///
    /// Sets: `session`, `reason`, `at`, `seq`; `widget` and `name` when the
    /// event reached the instance before being rejected.
    EventRejected,
}

/// Lifecycle event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Widget instance the event concerns, if applicable.
    pub widget: Option<WidgetId>,
    /// Session the event concerns, if applicable.
    pub session: Option<SessionId>,
    /// Widget behavior name or broadcast name, depending on the kind.
    pub name: Option<Arc<str>>,
    /// Human-readable reason (fault messages, rejection details).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next
    /// sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            widget: None,
            session: None,
            name: None,
            reason: None,
        }
    }

    /// Attaches a widget id.
    #[inline]
    pub fn with_widget(mut self, widget: WidgetId) -> Self {
        self.widget = Some(widget);
        self
    }

    /// Attaches a session id.
    #[inline]
    pub fn with_session(mut self, session: SessionId) -> Self {
        self.session = Some(session);
        self
    }

    /// Attaches a widget or broadcast name.
    #[inline]
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_set_fields() {
        let w = WidgetId::next();
        let ev = Event::new(EventKind::WidgetFaulted)
            .with_widget(w)
            .with_reason("boom");
        assert_eq!(ev.kind, EventKind::WidgetFaulted);
        assert_eq!(ev.widget, Some(w));
        assert_eq!(ev.reason.as_deref(), Some("boom"));
        assert!(ev.session.is_none());
    }

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::BroadcastSent);
        let b = Event::new(EventKind::BroadcastSent);
        assert!(a.seq < b.seq);
    }
}
