//! # WidgetActor: single-threaded owner of one instance's state.
//!
//! The actor serializes every mutation of its instance: connects, server
//! commands, and client events are drained from one mailbox, one at a time,
//! in arrival order. That single-consumer discipline is what produces the
//! total order every session observes.
//!
//! ## Envelope flow
//! ```text
//! Router / Session ── Op ──► mailbox ──► actor loop
//!                                          │
//!   Connect ──────► handle_connect(state) ─┤ insert slot, reply snapshot
//!   ServerCommand ► handle_command(...) ───┤ commit state, apply Effect
//!   ClientEvent ──► handle_command(...) ───┤ commit state, apply Effect
//!   Broadcast ────► fan-out as-is ─────────┤ no state change
//!   Detach ───────► remove slot ───────────┘
//!
//!   Effect::Broadcast ──► try_send to every session queue (per-session FIFO)
//!   Effect::Reply ──────► oneshot back to the caller (server-call only)
//! ```
//!
//! ## Rules
//! - **Snapshot-then-subscribe is atomic**: a `Connect` inserts the session's
//!   queue and computes its snapshot as one mailbox op, so no command can
//!   interleave between the two and no broadcast can be missed or duplicated.
//! - **Fan-out never blocks the loop**: delivery uses `try_send`; a full
//!   session queue drops that broadcast for that session only
//!   (`DeliveryDropped`), a closed queue detaches the session.
//! - **Fail-fast**: an `Err` or panic from a handler terminates the instance.
//!   The mailbox is closed first, then every session receives
//!   [`SessionEvent::Terminated`] — a session with a full queue gets it as
//!   soon as it drains — then the terminal event is published. Ops
//!   still buffered in the mailbox are discarded; their repliers observe a
//!   closed channel. There is no automatic restart.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{SyncError, WidgetFault};
use crate::events::{Bus, Event, EventKind};
use crate::protocol::{Command, Effect, Envelope, EnvelopeKind, SessionEvent, SessionId, WidgetId};
use crate::widget::WidgetRef;

/// One message on an instance's mailbox.
///
/// `Deliver` carries a protocol envelope plus the channels that cannot travel
/// inside it: the session's delivery queue (connect only) and an optional
/// reply channel (connect and server-call).
pub(crate) enum Op {
    Deliver {
        envelope: Envelope,
        slot: Option<mpsc::Sender<SessionEvent>>,
        reply: Option<oneshot::Sender<Result<Value, SyncError>>>,
    },
    Detach {
        session: SessionId,
    },
}

/// Runs a handler future, converting panics into [`WidgetFault`]s.
pub(crate) async fn guard<T, F>(fut: F) -> Result<T, WidgetFault>
where
    F: Future<Output = Result<T, WidgetFault>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(res) => res,
        Err(panic) => Err(WidgetFault::new(panic_message(panic.as_ref()))),
    }
}

fn panic_message(any: &(dyn Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Exclusive owner of one widget instance's state.
pub(crate) struct WidgetActor {
    id: WidgetId,
    widget: WidgetRef,
    state: Value,
    sessions: HashMap<SessionId, mpsc::Sender<SessionEvent>>,
    ops: mpsc::Receiver<Op>,
    bus: Bus,
}

impl WidgetActor {
    pub(crate) fn new(
        id: WidgetId,
        widget: WidgetRef,
        state: Value,
        ops: mpsc::Receiver<Op>,
        bus: Bus,
    ) -> Self {
        Self {
            id,
            widget,
            state,
            sessions: HashMap::new(),
            ops,
            bus,
        }
    }

    /// Drains the mailbox until cancellation, handle loss, or a handler
    /// fault.
    ///
    /// ### Exit conditions
    /// - `token` cancelled (explicit stop or router shutdown) → clean stop
    /// - every mailbox sender dropped (router pruned, all sessions gone) →
    ///   clean stop
    /// - a handler returned `Err` or panicked → fault termination
    pub(crate) async fn run(mut self, token: CancellationToken) {
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    self.terminate("stopped", EventKind::WidgetStopped);
                    return;
                }
                op = self.ops.recv() => match op {
                    Some(op) => {
                        if let Err(fault) = self.process(op).await {
                            warn!(widget = %self.id, reason = %fault, "widget handler faulted; terminating instance");
                            let reason = fault.message().to_string();
                            self.terminate(&reason, EventKind::WidgetFaulted);
                            return;
                        }
                    }
                    None => {
                        self.terminate("stopped", EventKind::WidgetStopped);
                        return;
                    }
                }
            }
        }
    }

    /// Processes one mailbox op. `Err` means the instance must die.
    async fn process(&mut self, op: Op) -> Result<(), WidgetFault> {
        let (envelope, slot, reply) = match op {
            Op::Deliver {
                envelope,
                slot,
                reply,
            } => (envelope, slot, reply),
            Op::Detach { session } => {
                self.remove_session(session);
                return Ok(());
            }
        };

        let seq = envelope.seq;
        match envelope.kind {
            EnvelopeKind::Connect { session } => self.connect(session, slot, reply).await,
            EnvelopeKind::ServerCommand { payload } => {
                self.command(Command::Call { payload }, reply, seq).await
            }
            EnvelopeKind::ClientEvent {
                session,
                name,
                payload,
            } => {
                // A detach that reached the mailbox first revokes the
                // handle's write access; a late event is rejected, not
                // applied.
                if !self.sessions.contains_key(&session) {
                    warn!(widget = %self.id, session = %session, event = %name, "client event from detached session; rejecting");
                    self.bus.publish(
                        Event::new(EventKind::EventRejected)
                            .with_widget(self.id)
                            .with_session(session)
                            .with_name(name)
                            .with_reason("session is detached"),
                    );
                    return Ok(());
                }
                // Originating session is attribution only; no directed reply.
                self.command(
                    Command::ClientEvent {
                        session,
                        name,
                        payload,
                    },
                    None,
                    seq,
                )
                .await
            }
            EnvelopeKind::Broadcast { name, payload } => {
                // Server-initiated broadcast: no state change, but it goes
                // through the mailbox so it is ordered against commands.
                self.fan_out(name, payload, seq);
                Ok(())
            }
        }
    }

    /// Handles a `Connect` op: insert the session, evaluate `handle_connect`
    /// against the state as of insertion time, reply with the snapshot.
    async fn connect(
        &mut self,
        session: SessionId,
        slot: Option<mpsc::Sender<SessionEvent>>,
        reply: Option<oneshot::Sender<Result<Value, SyncError>>>,
    ) -> Result<(), WidgetFault> {
        let Some(slot) = slot else {
            debug!(widget = %self.id, session = %session, "connect without delivery queue; dropping");
            return Ok(());
        };
        self.sessions.insert(session, slot);

        match guard(self.widget.handle_connect(&self.state)).await {
            Ok(connected) => {
                if let Some(state) = connected.state {
                    self.state = state;
                }
                self.bus.publish(
                    Event::new(EventKind::SessionAttached)
                        .with_widget(self.id)
                        .with_session(session),
                );
                if let Some(tx) = reply {
                    let _ = tx.send(Ok(connected.snapshot));
                }
                Ok(())
            }
            Err(fault) => {
                if let Some(tx) = reply {
                    let _ = tx.send(Err(SyncError::InstanceFault {
                        reason: fault.message().to_string(),
                    }));
                }
                Err(fault)
            }
        }
    }

    /// Handles one command: run the handler, commit the new state, apply the
    /// effect. A resulting broadcast carries `seq`, the sequence number of
    /// the envelope that produced it, so deliveries can be tied back to the
    /// total order.
    async fn command(
        &mut self,
        command: Command,
        reply: Option<oneshot::Sender<Result<Value, SyncError>>>,
        seq: u64,
    ) -> Result<(), WidgetFault> {
        let state = std::mem::take(&mut self.state);
        match guard(self.widget.handle_command(command, state)).await {
            Ok((effect, state)) => {
                self.state = state;
                match effect {
                    Effect::None => {
                        if let Some(tx) = reply {
                            let _ = tx.send(Ok(Value::Null));
                        }
                    }
                    Effect::Reply(value) => {
                        if let Some(tx) = reply {
                            let _ = tx.send(Ok(value));
                        }
                    }
                    Effect::Broadcast { name, payload } => {
                        self.fan_out(name, payload, seq);
                        if let Some(tx) = reply {
                            let _ = tx.send(Ok(Value::Null));
                        }
                    }
                }
                Ok(())
            }
            Err(fault) => {
                if let Some(tx) = reply {
                    let _ = tx.send(Err(SyncError::InstanceFault {
                        reason: fault.message().to_string(),
                    }));
                }
                Err(fault)
            }
        }
    }

    /// Delivers one broadcast to every attached session.
    ///
    /// Per-session FIFO order is the queue's order; cross-session order is
    /// unspecified. Delivery failures affect only the session in question.
    fn fan_out(&mut self, name: Arc<str>, payload: Value, seq: u64) {
        let mut dead = Vec::new();

        for (session, tx) in &self.sessions {
            let ev = SessionEvent::Broadcast {
                name: name.clone(),
                payload: payload.clone(),
                seq,
            };
            match tx.try_send(ev) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(widget = %self.id, session = %session, event = %name, "session queue full; dropping broadcast");
                    self.bus.publish(
                        Event::new(EventKind::DeliveryDropped)
                            .with_widget(self.id)
                            .with_session(*session)
                            .with_name(name.clone()),
                    );
                }
                Err(TrySendError::Closed(_)) => dead.push(*session),
            }
        }
        for session in dead {
            self.remove_session(session);
        }

        self.bus.publish(
            Event::new(EventKind::BroadcastSent)
                .with_widget(self.id)
                .with_name(name),
        );
    }

    /// Removes one session; idempotent for unknown ids.
    fn remove_session(&mut self, session: SessionId) {
        if self.sessions.remove(&session).is_some() {
            debug!(widget = %self.id, session = %session, "session detached");
            self.bus.publish(
                Event::new(EventKind::SessionDetached)
                    .with_widget(self.id)
                    .with_session(session),
            );
        }
    }

    /// Tears the instance down: close the mailbox, notify every session, and
    /// publish the terminal event.
    ///
    /// The mailbox is closed before sessions are notified so that once a
    /// viewer observes `Terminated`, further dispatches to this instance are
    /// guaranteed to fail rather than vanish.
    fn terminate(&mut self, reason: &str, kind: EventKind) {
        self.ops.close();

        let reason: Arc<str> = Arc::from(reason);
        for (session, tx) in self.sessions.drain() {
            let notice = SessionEvent::Terminated {
                reason: reason.clone(),
            };
            match tx.try_send(notice) {
                Ok(()) | Err(TrySendError::Closed(_)) => {}
                // A full queue must not lose the terminal notice: the viewer
                // has undrained broadcasts ahead of it, so hand the send to a
                // detached task that waits for a slot. The actor is exiting,
                // so nothing can enqueue behind it.
                Err(TrySendError::Full(notice)) => {
                    tokio::spawn(async move {
                        let _ = tx.send(notice).await;
                    });
                }
            }
            self.bus.publish(
                Event::new(EventKind::SessionDetached)
                    .with_widget(self.id)
                    .with_session(session),
            );
        }

        self.bus
            .publish(Event::new(kind).with_widget(self.id).with_reason(reason));
    }
}
