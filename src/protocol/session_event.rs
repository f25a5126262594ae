//! # Per-session delivery stream items.
//!
//! After the snapshot handed over at attach time, a session receives a
//! sequence of [`SessionEvent`]s: zero or more ordered broadcasts, optionally
//! closed by a single terminal notice. The type serializes cleanly so a
//! transport layer can put it on the wire as-is.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

/// One item on a session's delivery stream.
///
/// ### Ordering
/// For a single session, `Broadcast` items arrive in the same order the
/// underlying commands were processed by the widget actor; `seq` carries the
/// sequence number of the envelope that produced the delta, tying each
/// delivery back to the total order.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A named delta produced by a command.
    Broadcast {
        name: Arc<str>,
        payload: Value,
        seq: u64,
    },

    /// The instance is gone (explicit stop or handler fault). Always the last
    /// item a session observes; the stream ends after it.
    Terminated { reason: Arc<str> },
}

impl SessionEvent {
    /// The broadcast name, if this is a broadcast.
    pub fn name(&self) -> Option<&str> {
        match self {
            SessionEvent::Broadcast { name, .. } => Some(name),
            SessionEvent::Terminated { .. } => None,
        }
    }

    /// True for the terminal notice.
    pub fn is_terminated(&self) -> bool {
        matches!(self, SessionEvent::Terminated { .. })
    }
}
