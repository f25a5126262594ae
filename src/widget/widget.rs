//! # Widget behavior trait.
//!
//! A [`Widget`] is the user-supplied behavior behind a live instance: how the
//! state is born, what an attaching viewer is handed, and how commands mutate
//! the state. The runtime calls these handlers from the instance's single
//! mailbox task, one at a time, so implementations never see concurrent
//! invocations for the same instance.
//!
//! Handlers must not block on external I/O; when a command needs external
//! work, issue it outside the actor and feed the result back in as a new
//! command.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::WidgetFault;
use crate::protocol::{Command, Connected, Effect};

/// Shared reference to a widget behavior (`Arc<dyn Widget>`).
pub type WidgetRef = std::sync::Arc<dyn Widget>;

/// # Behavior of one widget kind.
///
/// The state is an arbitrary, server-defined [`Value`] — opaque to the core,
/// owned exclusively by the instance's actor, and mutated only through these
/// handlers.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use serde_json::{json, Value};
/// use viewsync::{Command, Effect, Widget, WidgetFault};
///
/// struct Counter;
///
/// #[async_trait]
/// impl Widget for Counter {
///     fn name(&self) -> &str { "counter" }
///
///     async fn init(&self, _arg: Value) -> Result<Value, WidgetFault> {
///         Ok(json!(0))
///     }
///
///     async fn handle_command(
///         &self,
///         _command: Command,
///         state: Value,
///     ) -> Result<(Effect, Value), WidgetFault> {
///         let next = state.as_i64().unwrap_or(0) + 1;
///         Ok((Effect::broadcast("update", json!(next)), json!(next)))
///     }
/// }
/// ```
#[async_trait]
pub trait Widget: Send + Sync + 'static {
    /// Stable, human-readable behavior name (for events and logs).
    fn name(&self) -> &str {
        "widget"
    }

    /// Produces the initial state from the creation argument.
    ///
    /// Runs exactly once per instance; a fault aborts creation and is
    /// surfaced to the caller of [`Router::create`](crate::Router::create) as
    /// [`SyncError::Init`](crate::SyncError::Init).
    async fn init(&self, arg: Value) -> Result<Value, WidgetFault>;

    /// Called once per newly attaching session, against the state as of
    /// insertion time.
    ///
    /// Should be pure or side-effect-light. The default hands the full state
    /// to the new session and leaves it untouched.
    async fn handle_connect(&self, state: &Value) -> Result<Connected, WidgetFault> {
        Ok(Connected::snapshot(state.clone()))
    }

    /// Processes one command and returns the effect plus the new state.
    ///
    /// Commands arrive strictly serialized per instance. A fault (or panic)
    /// terminates the instance fail-fast with no partial-state commit.
    async fn handle_command(
        &self,
        command: Command,
        state: Value,
    ) -> Result<(Effect, Value), WidgetFault>;
}
