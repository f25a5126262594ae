//! # Synchronization router: registry and dispatch.
//!
//! The [`Router`] maps widget ids to live actors and session ids to their
//! widgets, addresses inbound envelopes to the right mailbox, and exposes the
//! lifecycle event stream. It is an explicit, injectable object — never
//! ambient global state — so the core stays testable in isolation.
//!
//! ## Architecture
//! ```text
//! create(widget, arg) ──► init() ──► spawn WidgetActor ──► widgets[id]
//!
//! call / call_with_reply(id, ..) ──► widgets[id].mailbox ──► actor
//! broadcast(id, name, ..) ───────► widgets[id].mailbox ──► actor (fan-out)
//! attach(id) ────────────────────► widgets[id].mailbox ──► actor (snapshot)
//! send_event(session, ..) ──► sessions[session] ──► widgets[id].mailbox
//!
//! Bus ──► Router::spawn_listener()
//!          ├─► SessionDetached(session)   → prune session index
//!          └─► WidgetStopped/Faulted(id)  → prune widget handle
//! ```
//!
//! ## Rules
//! - The router owns the actor handles (mailbox sender, `JoinHandle`,
//!   `CancellationToken`); actors never hold a back-reference to the router.
//! - Pruning is event-driven via the bus, the same listener pattern the
//!   actors use for everything else; no polling.
//! - A dispatch racing an instance's death resolves to `InstanceNotFound`
//!   (the mailbox is closed before sessions learn of the termination).

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{RwLock, broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::RouterConfig;
use crate::core::actor::{Op, WidgetActor, guard};
use crate::core::session::Session;
use crate::error::SyncError;
use crate::events::{Bus, Event, EventKind};
use crate::protocol::{Envelope, SessionId, WidgetId};
use crate::widget::WidgetRef;

/// Handle to a running widget actor.
struct WidgetHandle {
    /// Mailbox sender; cloning it is how every dispatcher reaches the actor.
    ops: mpsc::Sender<Op>,
    /// Individual cancellation token for this instance.
    cancel: CancellationToken,
    /// Join handle for the actor task.
    join: JoinHandle<()>,
}

/// Registry of widget instances and dispatcher of envelopes.
pub struct Router {
    cfg: RouterConfig,
    bus: Bus,
    widgets: RwLock<HashMap<WidgetId, WidgetHandle>>,
    sessions: RwLock<HashMap<SessionId, WidgetId>>,
    runtime_token: CancellationToken,
}

impl Router {
    /// Creates a router with the default configuration.
    pub fn new() -> Arc<Self> {
        Self::with_config(RouterConfig::default())
    }

    /// Creates a router with the given configuration and starts its pruning
    /// listener.
    pub fn with_config(cfg: RouterConfig) -> Arc<Self> {
        let bus = Bus::new(cfg.bus_capacity);
        let router = Arc::new(Self {
            cfg,
            bus,
            widgets: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            runtime_token: CancellationToken::new(),
        });
        router.clone().spawn_listener();
        router
    }

    /// Subscribes to the bus and prunes registry entries for terminated
    /// instances and detached sessions.
    fn spawn_listener(self: Arc<Self>) {
        let mut rx = self.bus.subscribe();
        let token = self.runtime_token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(ev) => self.prune(&ev).await,
                        Err(broadcast::error::RecvError::Closed) => break,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "router listener lagged behind the event bus");
                            continue;
                        }
                    }
                }
            }
        });
    }

    /// Handles one bus event on the pruning path.
    async fn prune(&self, event: &Event) {
        match event.kind {
            EventKind::SessionDetached => {
                if let Some(session) = event.session {
                    self.sessions.write().await.remove(&session);
                }
            }
            EventKind::WidgetStopped | EventKind::WidgetFaulted => {
                if let Some(widget) = event.widget {
                    if let Some(handle) = self.widgets.write().await.remove(&widget) {
                        debug!(widget = %widget, "pruned terminated instance");
                        drop(handle);
                    }
                }
            }
            _ => {}
        }
    }

    /// Creates a widget instance: runs `init` once and spawns its actor.
    ///
    /// A fault (or panic) in `init` aborts the creation with
    /// [`SyncError::Init`]; no instance is produced.
    pub async fn create(&self, widget: WidgetRef, init_arg: Value) -> Result<WidgetId, SyncError> {
        let state = guard(widget.init(init_arg))
            .await
            .map_err(|fault| SyncError::Init {
                reason: fault.message().to_string(),
            })?;

        let id = WidgetId::next();
        let name = widget.name().to_string();
        let (ops, mailbox) = mpsc::channel(self.cfg.mailbox_capacity.max(1));
        let cancel = self.runtime_token.child_token();

        let actor = WidgetActor::new(id, widget, state, mailbox, self.bus.clone());
        let join = tokio::spawn(actor.run(cancel.clone()));

        self.widgets
            .write()
            .await
            .insert(id, WidgetHandle { ops, cancel, join });
        self.bus
            .publish(Event::new(EventKind::WidgetCreated).with_widget(id).with_name(name));
        Ok(id)
    }

    /// Enqueues a server command, fire-and-forget.
    ///
    /// Accepted unless the instance has terminated, in which case it fails
    /// with [`SyncError::InstanceNotFound`].
    pub async fn call(&self, id: WidgetId, payload: Value) -> Result<(), SyncError> {
        let ops = self.handle_of(id).await?;
        let op = Op::Deliver {
            envelope: Envelope::server_command(id, payload),
            slot: None,
            reply: None,
        };
        ops.send(op)
            .await
            .map_err(|_| SyncError::InstanceNotFound { id })
    }

    /// Enqueues a server command and waits for its directed reply.
    ///
    /// A handler answering with [`Effect::Reply`](crate::Effect::Reply)
    /// yields that value; any other effect yields `Value::Null`. An instance
    /// that dies before answering yields [`SyncError::InstanceNotFound`].
    pub async fn call_with_reply(&self, id: WidgetId, payload: Value) -> Result<Value, SyncError> {
        let ops = self.handle_of(id).await?;
        let (tx, rx) = oneshot::channel();
        let op = Op::Deliver {
            envelope: Envelope::server_command(id, payload),
            slot: None,
            reply: Some(tx),
        };
        ops.send(op)
            .await
            .map_err(|_| SyncError::InstanceNotFound { id })?;
        rx.await.map_err(|_| SyncError::InstanceNotFound { id })?
    }

    /// Attaches a new session to an instance.
    ///
    /// Returns the session handle and the snapshot computed by the widget's
    /// `handle_connect`. Snapshot-then-subscribe is a single atomic step from
    /// the actor's point of view: the snapshot reflects exactly the state
    /// before any command the session has not been told about, and the
    /// session receives every broadcast produced afterwards.
    pub async fn attach(&self, id: WidgetId) -> Result<(Session, Value), SyncError> {
        let ops = self.handle_of(id).await?;
        let session = SessionId::next();
        let (slot, delivery) = mpsc::channel(self.cfg.session_capacity.max(1));
        let (tx, rx) = oneshot::channel();

        // Index first so a concurrent send_event routed by id cannot observe
        // an attached session the index does not know about.
        self.sessions.write().await.insert(session, id);

        let op = Op::Deliver {
            envelope: Envelope::connect(id, session),
            slot: Some(slot),
            reply: Some(tx),
        };
        let sent = ops.send(op).await;
        let snapshot = match sent {
            Ok(()) => match rx.await {
                Ok(Ok(snapshot)) => snapshot,
                Ok(Err(err)) => {
                    self.sessions.write().await.remove(&session);
                    return Err(err);
                }
                Err(_) => {
                    self.sessions.write().await.remove(&session);
                    return Err(SyncError::InstanceNotFound { id });
                }
            },
            Err(_) => {
                self.sessions.write().await.remove(&session);
                return Err(SyncError::InstanceNotFound { id });
            }
        };

        Ok((Session::new(session, id, ops, delivery), snapshot))
    }

    /// Delivers a named broadcast to every session of an instance without
    /// touching its state.
    ///
    /// Goes through the mailbox, so it is ordered against commands like any
    /// other envelope. For state-derived deltas prefer returning
    /// [`Effect::Broadcast`](crate::Effect::Broadcast) from a handler.
    pub async fn broadcast(
        &self,
        id: WidgetId,
        name: impl Into<Arc<str>>,
        payload: Value,
    ) -> Result<(), SyncError> {
        let ops = self.handle_of(id).await?;
        let op = Op::Deliver {
            envelope: Envelope::broadcast(name, payload),
            slot: None,
            reply: None,
        };
        ops.send(op)
            .await
            .map_err(|_| SyncError::InstanceNotFound { id })
    }

    /// Routes a client event by session id.
    ///
    /// For transports that hold only ids; a live [`Session`] handle can send
    /// directly via [`Session::send_event`]. Stale session ids fail with
    /// [`SyncError::SessionNotFound`]; both failure modes are also reported
    /// on the event bus as `EventRejected`.
    pub async fn send_event(
        &self,
        session: SessionId,
        name: impl Into<Arc<str>>,
        payload: Value,
    ) -> Result<(), SyncError> {
        let widget = match self.sessions.read().await.get(&session).copied() {
            Some(widget) => widget,
            None => {
                let err = SyncError::SessionNotFound { id: session };
                self.reject(session, &err);
                return Err(err);
            }
        };
        let ops = match self.handle_of(widget).await {
            Ok(ops) => ops,
            Err(err) => {
                self.reject(session, &err);
                return Err(err);
            }
        };
        let op = Op::Deliver {
            envelope: Envelope::client_event(widget, session, name, payload),
            slot: None,
            reply: None,
        };
        if ops.send(op).await.is_err() {
            let err = SyncError::InstanceNotFound { id: widget };
            self.reject(session, &err);
            return Err(err);
        }
        Ok(())
    }

    /// Detaches a session by id; idempotent, unknown ids are a no-op.
    pub async fn detach(&self, session: SessionId) {
        let widget = { self.sessions.write().await.remove(&session) };
        let Some(widget) = widget else { return };
        if let Ok(ops) = self.handle_of(widget).await {
            let _ = ops.send(Op::Detach { session }).await;
        }
    }

    /// Stops one instance: cancel → join. Attached sessions receive a
    /// `"stopped"` terminal notice.
    pub async fn stop(&self, id: WidgetId) -> Result<(), SyncError> {
        let handle = self
            .widgets
            .write()
            .await
            .remove(&id)
            .ok_or(SyncError::InstanceNotFound { id })?;
        handle.cancel.cancel();
        let _ = handle.join.await;
        Ok(())
    }

    /// Stops every instance and the pruning listener: cancel all → join all.
    pub async fn shutdown(&self) {
        let handles: Vec<(WidgetId, WidgetHandle)> =
            { self.widgets.write().await.drain().collect() };

        for (_, handle) in &handles {
            handle.cancel.cancel();
        }
        for (_, handle) in handles {
            let _ = handle.join.await;
        }
        self.runtime_token.cancel();
    }

    /// Returns the sorted list of live instance ids.
    pub async fn list(&self) -> Vec<WidgetId> {
        let widgets = self.widgets.read().await;
        let mut ids: Vec<WidgetId> = widgets.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// True if no instance is registered.
    pub async fn is_empty(&self) -> bool {
        self.widgets.read().await.is_empty()
    }

    /// Subscribes to the lifecycle event stream.
    ///
    /// Each call creates an independent receiver that observes events
    /// published after it subscribes; slow receivers observe
    /// `RecvError::Lagged`.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    async fn handle_of(&self, id: WidgetId) -> Result<mpsc::Sender<Op>, SyncError> {
        self.widgets
            .read()
            .await
            .get(&id)
            .map(|handle| handle.ops.clone())
            .ok_or(SyncError::InstanceNotFound { id })
    }

    fn reject(&self, session: SessionId, err: &SyncError) {
        warn!(session = %session, error = %err, "client event rejected");
        self.bus.publish(
            Event::new(EventKind::EventRejected)
                .with_session(session)
                .with_reason(err.as_message()),
        );
    }
}
