//! # Closure-backed widget (`WidgetFn`)
//!
//! [`WidgetFn`] builds a [`Widget`] out of plain closures, which keeps tests
//! and demos free of one-off trait impls. Each handler closure produces a
//! fresh future per call, so there is no hidden shared state between
//! invocations; share state explicitly via `Arc` inside the closure if you
//! need it.
//!
//! ## Example
//! ```
//! use serde_json::{json, Value};
//! use viewsync::{Command, Effect, Widget, WidgetFn};
//!
//! let counter = WidgetFn::new(
//!     "counter",
//!     |arg: Value| async move { Ok(if arg.is_null() { json!(0) } else { arg }) },
//!     |_cmd: Command, state: Value| async move {
//!         let next = state.as_i64().unwrap_or(0) + 1;
//!         Ok((Effect::broadcast("update", json!(next)), json!(next)))
//!     },
//! );
//! assert_eq!(counter.name(), "counter");
//! ```

use std::borrow::Cow;
use std::future::Future;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::WidgetFault;
use crate::protocol::{Command, Connected, Effect};
use crate::widget::widget::{Widget, WidgetRef};

type InitFn = Box<dyn Fn(Value) -> BoxFuture<'static, Result<Value, WidgetFault>> + Send + Sync>;
type ConnectFn =
    Box<dyn Fn(Value) -> BoxFuture<'static, Result<Connected, WidgetFault>> + Send + Sync>;
type CommandFn = Box<
    dyn Fn(Command, Value) -> BoxFuture<'static, Result<(Effect, Value), WidgetFault>>
        + Send
        + Sync,
>;

/// Closure-backed widget implementation.
///
/// Wraps an `init` and a `handle_command` closure; `handle_connect` keeps the
/// trait default (snapshot the full state) unless overridden with
/// [`WidgetFn::on_connect`].
pub struct WidgetFn {
    name: Cow<'static, str>,
    init: InitFn,
    connect: Option<ConnectFn>,
    command: CommandFn,
}

impl WidgetFn {
    /// Creates a widget from an `init` and a `handle_command` closure.
    pub fn new<I, IF, C, CF>(name: impl Into<Cow<'static, str>>, init: I, command: C) -> Self
    where
        I: Fn(Value) -> IF + Send + Sync + 'static,
        IF: Future<Output = Result<Value, WidgetFault>> + Send + 'static,
        C: Fn(Command, Value) -> CF + Send + Sync + 'static,
        CF: Future<Output = Result<(Effect, Value), WidgetFault>> + Send + 'static,
    {
        let init: InitFn = Box::new(move |arg| Box::pin(init(arg)));
        let command: CommandFn = Box::new(move |cmd, state| Box::pin(command(cmd, state)));
        Self {
            name: name.into(),
            init,
            connect: None,
            command,
        }
    }

    /// Overrides `handle_connect`. The closure receives a clone of the state
    /// as of insertion time.
    pub fn on_connect<F, Fut>(mut self, connect: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Connected, WidgetFault>> + Send + 'static,
    {
        let connect: ConnectFn = Box::new(move |state| Box::pin(connect(state)));
        self.connect = Some(connect);
        self
    }

    /// Returns the widget as a shared handle (`Arc<dyn Widget>`).
    pub fn arc(self) -> WidgetRef {
        std::sync::Arc::new(self)
    }
}

#[async_trait]
impl Widget for WidgetFn {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self, arg: Value) -> Result<Value, WidgetFault> {
        (self.init)(arg).await
    }

    async fn handle_connect(&self, state: &Value) -> Result<Connected, WidgetFault> {
        match &self.connect {
            Some(connect) => connect(state.clone()).await,
            None => Ok(Connected::snapshot(state.clone())),
        }
    }

    async fn handle_command(
        &self,
        command: Command,
        state: Value,
    ) -> Result<(Effect, Value), WidgetFault> {
        (self.command)(command, state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bump() -> WidgetFn {
        WidgetFn::new(
            "bump",
            |arg: Value| async move { Ok(arg) },
            |_cmd: Command, state: Value| async move {
                let next = state.as_i64().unwrap_or(0) + 1;
                Ok((Effect::broadcast("update", json!(next)), json!(next)))
            },
        )
    }

    #[tokio::test]
    async fn test_default_connect_snapshots_full_state() {
        let w = bump();
        let state = w.init(json!(7)).await.unwrap();
        let connected = w.handle_connect(&state).await.unwrap();
        assert_eq!(connected.snapshot, json!(7));
        assert!(connected.state.is_none());
    }

    #[tokio::test]
    async fn test_on_connect_override_can_mutate_state() {
        let w = bump().on_connect(|state: Value| async move {
            let viewers = state["viewers"].as_i64().unwrap_or(0) + 1;
            Ok(Connected::snapshot(state).with_state(json!({ "viewers": viewers })))
        });
        let connected = w.handle_connect(&json!({ "viewers": 0 })).await.unwrap();
        assert_eq!(connected.state, Some(json!({ "viewers": 1 })));
    }
}
