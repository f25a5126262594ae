//! # Session: one viewer's attachment to a widget instance.
//!
//! A [`Session`] is a thin forwarding shim between the client runtime and the
//! instance's actor. It holds no state beyond its ids and its two channels:
//! the delivery queue fed by the actor's fan-out, and a clone of the actor's
//! mailbox sender for client-originated events.
//!
//! ## Contract with the client runtime
//! 1. Exactly one snapshot is delivered at attach time (returned by
//!    [`Router::attach`](crate::Router::attach) alongside this handle).
//! 2. Thereafter, [`recv`](Session::recv) yields zero or more broadcasts in
//!    the order the underlying commands were processed, optionally closed by
//!    one [`SessionEvent::Terminated`].
//! 3. [`send_event`](Session::send_event) forwards named client events with
//!    no implied response; any resulting state change comes back only via a
//!    later broadcast (possibly to this same session).

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;

use crate::core::actor::Op;
use crate::protocol::{Envelope, SessionEvent, SessionId, WidgetId};

/// Client-side handle for one attachment.
///
/// Dropping the handle closes the delivery queue; the actor notices on its
/// next delivery and detaches the session, so an explicit
/// [`detach`](Session::detach) is preferred but not required.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    widget_id: WidgetId,
    ops: mpsc::Sender<Op>,
    rx: mpsc::Receiver<SessionEvent>,
}

impl Session {
    pub(crate) fn new(
        id: SessionId,
        widget_id: WidgetId,
        ops: mpsc::Sender<Op>,
        rx: mpsc::Receiver<SessionEvent>,
    ) -> Self {
        Self {
            id,
            widget_id,
            ops,
            rx,
        }
    }

    /// This attachment's identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The widget instance this session is attached to (lookup only).
    pub fn widget_id(&self) -> WidgetId {
        self.widget_id
    }

    /// Receives the next delivery for this session.
    ///
    /// Returns `None` once the session is detached and the queue is drained.
    /// A [`SessionEvent::Terminated`] is always the last item, if one is
    /// delivered at all.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }

    /// Forwards a named client event to the instance.
    ///
    /// Fire-and-forget: failures (the instance is gone) are reported in the
    /// log, not raised, matching the client-runtime contract. An event sent
    /// after [`detach`](Session::detach) is rejected at the actor and
    /// surfaces as `EventRejected` on the bus; it never mutates state.
    pub async fn send_event(&self, name: impl Into<Arc<str>>, payload: Value) {
        let envelope = Envelope::client_event(self.widget_id, self.id, name, payload);
        let op = Op::Deliver {
            envelope,
            slot: None,
            reply: None,
        };
        if self.ops.send(op).await.is_err() {
            warn!(session = %self.id, widget = %self.widget_id, "client event dropped; instance is gone");
        }
    }

    /// Detaches this session from the instance.
    ///
    /// Immediate and unconditional: no broadcast produced by a later command
    /// reaches this session. Idempotent; detaching an already-detached or
    /// torn-down session is a no-op.
    pub async fn detach(&self) {
        let _ = self.ops.send(Op::Detach { session: self.id }).await;
    }
}
