//! # viewsync
//!
//! **Viewsync** is a live, multi-viewer state-synchronization core for Rust.
//!
//! One server-owned piece of state per widget instance is observed and
//! mutated concurrently by many independent client views. Every viewer —
//! including ones that attach after state has already changed — converges to
//! a consistent, ordered view of that state.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │    Widget    │   │    Widget    │   │    Widget    │
//!     │ (behavior 1) │   │ (behavior 2) │   │ (behavior 3) │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Router (registry + dispatch)                                     │
//! │  - widgets: id → actor mailbox                                    │
//! │  - sessions: id → widget (routing index)                          │
//! │  - Bus (lifecycle events)                                         │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ WidgetActor  │   │ WidgetActor  │   │ WidgetActor  │
//!     │ (mailbox)    │   │ (mailbox)    │   │ (mailbox)    │
//!     └┬─────────────┘   └──────────────┘   └──────────────┘
//!      │ fan-out (per-session FIFO queues)
//!      ├────────────┬────────────┐
//!      ▼            ▼            ▼
//!   Session 1    Session 2    Session N ──► client runtime
//!   (snapshot,   (snapshot,   (snapshot,
//!    deltas…)     deltas…)     deltas…)
//! ```
//!
//! ### Lifecycle
//! ```text
//! Router::create(widget, arg)
//!   └─► widget.init(arg) ─► initial state ─► spawn actor
//!
//! Router::attach(id)
//!   └─► Connect op: insert session + handle_connect(state) atomically
//!        └─► (Session, snapshot)
//!
//! Router::call / Session::send_event
//!   └─► mailbox (strict arrival order)
//!        └─► handle_command(cmd, state) ─► (Effect, new state)
//!             ├─ Effect::None       → commit only
//!             ├─ Effect::Reply      → oneshot back to caller
//!             └─ Effect::Broadcast  → every attached session, in order
//!
//! handler Err / panic
//!   └─► fail-fast: close mailbox → Terminated to all sessions
//!        → WidgetFaulted on the bus → recreate explicitly if desired
//! ```
//!
//! ## Ordering guarantees
//! - Commands of one instance are processed in a single total order.
//! - Per-session broadcast delivery matches that total order.
//! - A snapshot on attach is gap-free and duplication-free relative to the
//!   broadcasts that session subsequently receives.
//!
//! ## Features
//! | Area          | Description                                          | Key types                       |
//! |---------------|------------------------------------------------------|---------------------------------|
//! | **Behavior**  | Define widgets as traits or closures.                | [`Widget`], [`WidgetFn`]        |
//! | **Routing**   | Create, call, attach, detach, stop.                  | [`Router`], [`Session`]         |
//! | **Protocol**  | Message shapes exchanged between parties.            | [`Envelope`], [`SessionEvent`]  |
//! | **Errors**    | Typed errors for the runtime and handlers.           | [`SyncError`], [`WidgetFault`]  |
//! | **Observability** | Ordered lifecycle event stream.                  | [`Event`], [`Router::events`]   |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use serde_json::{json, Value};
//! use viewsync::{Command, Effect, Router, SessionEvent, WidgetFn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = Router::new();
//!
//!     let counter = WidgetFn::new(
//!         "counter",
//!         |arg: Value| async move { Ok(if arg.is_null() { json!(0) } else { arg }) },
//!         |_cmd: Command, state: Value| async move {
//!             let next = state.as_i64().unwrap_or(0) + 1;
//!             Ok((Effect::broadcast("update", json!(next)), json!(next)))
//!         },
//!     );
//!     let id = router.create(counter.arc(), Value::Null).await?;
//!
//!     let (mut session, snapshot) = router.attach(id).await?;
//!     assert_eq!(snapshot, json!(0));
//!
//!     session.send_event("bump", Value::Null).await;
//!     match session.recv().await {
//!         Some(SessionEvent::Broadcast { name, payload, .. }) => {
//!             assert_eq!(&*name, "update");
//!             assert_eq!(payload, json!(1));
//!         }
//!         other => panic!("unexpected delivery: {other:?}"),
//!     }
//!
//!     router.shutdown().await;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod protocol;
mod widget;

// ---- Public re-exports ----

pub use config::RouterConfig;
pub use crate::core::{Router, Session};
pub use error::{SyncError, WidgetFault};
pub use events::{Event, EventKind};
pub use protocol::{
    Command, Connected, Effect, Envelope, EnvelopeKind, SessionEvent, SessionId, WidgetId,
};
pub use widget::{Widget, WidgetFn, WidgetRef};

// Optional: expose a simple built-in stdout observer (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
mod observers;
#[cfg(feature = "logging")]
pub use observers::LogWriter;
