//! # Event envelope: the message shape exchanged between parties.
//!
//! Every message that crosses a component boundary — a viewer attaching, a
//! server-side call, a client-originated event, a broadcast fanned out to
//! sessions — is an [`Envelope`]. The payload is opaque to the core; only
//! [`EnvelopeKind`] and the addressing fields are interpreted.
//!
//! ## Ordering
//! Each envelope is stamped with a globally unique, monotonically increasing
//! sequence number at construction time. Within one widget instance the
//! mailbox preserves arrival order, so `seq` restores the exact total order
//! when envelopes are observed out of band (logs, traces).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use serde_json::Value;

use super::id::{SessionId, WidgetId};

/// Global sequence counter for envelope ordering.
static ENVELOPE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of envelopes.
#[derive(Debug, Clone)]
pub enum EnvelopeKind {
    /// A new session is attaching to a widget instance.
    Connect {
        /// Identifier assigned to the attaching session.
        session: SessionId,
    },

    /// A server-side command addressed to a widget instance.
    ServerCommand {
        /// Opaque command payload, interpreted by the widget's handler.
        payload: Value,
    },

    /// A client-originated named event, tagged with the session it came from.
    ///
    /// The originating session is used for attribution only; handlers are not
    /// required to treat it specially.
    ClientEvent {
        /// Session the event originated from.
        session: SessionId,
        /// Event name chosen by the client (e.g. `"bump"`).
        name: Arc<str>,
        /// Opaque event payload, interpreted by the widget's handler.
        payload: Value,
    },

    /// A named delta fanned out to every attached session of one instance.
    ///
    /// Implicitly scoped to the emitting instance, so it carries no `target`.
    Broadcast {
        /// Delta name delivered to the sessions (e.g. `"update"`).
        name: Arc<str>,
        /// Opaque delta payload, forwarded as-is.
        payload: Value,
    },
}

/// Immutable message exchanged between router, actors, and sessions.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp (for logs).
    pub at: SystemTime,
    /// Widget instance the envelope is addressed to; `None` for broadcasts.
    pub target: Option<WidgetId>,
    /// Message classification and payload.
    pub kind: EnvelopeKind,
}

impl Envelope {
    fn stamp(target: Option<WidgetId>, kind: EnvelopeKind) -> Self {
        Self {
            seq: ENVELOPE_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            target,
            kind,
        }
    }

    /// Builds a `Connect` envelope for an attaching session.
    pub fn connect(widget: WidgetId, session: SessionId) -> Self {
        Self::stamp(Some(widget), EnvelopeKind::Connect { session })
    }

    /// Builds a `ServerCommand` envelope.
    pub fn server_command(widget: WidgetId, payload: Value) -> Self {
        Self::stamp(Some(widget), EnvelopeKind::ServerCommand { payload })
    }

    /// Builds a `ClientEvent` envelope attributed to `session`.
    pub fn client_event(
        widget: WidgetId,
        session: SessionId,
        name: impl Into<Arc<str>>,
        payload: Value,
    ) -> Self {
        Self::stamp(
            Some(widget),
            EnvelopeKind::ClientEvent {
                session,
                name: name.into(),
                payload,
            },
        )
    }

    /// Builds a `Broadcast` envelope (no target; scoped to the emitter).
    pub fn broadcast(name: impl Into<Arc<str>>, payload: Value) -> Self {
        Self::stamp(
            None,
            EnvelopeKind::Broadcast {
                name: name.into(),
                payload,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_seq_is_strictly_increasing() {
        let w = WidgetId::next();
        let a = Envelope::server_command(w, json!(1));
        let b = Envelope::server_command(w, json!(2));
        let c = Envelope::broadcast("update", json!(3));
        assert!(a.seq < b.seq);
        assert!(b.seq < c.seq);
    }

    #[test]
    fn test_broadcast_has_no_target() {
        let env = Envelope::broadcast("update", json!(1));
        assert!(env.target.is_none());

        let w = WidgetId::next();
        let env = Envelope::server_command(w, Value::Null);
        assert_eq!(env.target, Some(w));
    }
}
