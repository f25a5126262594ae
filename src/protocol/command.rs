//! # Handler-facing command and effect types.
//!
//! A [`Command`] is what a widget's `handle_command` receives: either a
//! server-side call or a client-originated event. The handler answers with an
//! [`Effect`] describing what (if anything) should leave the actor, plus the
//! new state.

use std::sync::Arc;

use serde_json::Value;

use super::id::SessionId;

/// A state-mutating request processed by a widget actor.
///
/// Commands are processed one at a time, strictly in arrival order; that
/// serialization is what gives every observer the same total order of
/// effects.
#[derive(Debug, Clone)]
pub enum Command {
    /// Originated from a server-side [`call`](crate::Router::call).
    Call {
        /// Opaque command payload, interpreted by the widget's handler.
        payload: Value,
    },

    /// Originated from a client via
    /// [`send_event`](crate::Session::send_event), tagged with the session it
    /// came from (attribution only).
    ClientEvent {
        /// Session the event originated from.
        session: SessionId,
        /// Event name chosen by the client.
        name: Arc<str>,
        /// Opaque event payload.
        payload: Value,
    },
}

impl Command {
    /// The opaque payload, regardless of origin.
    pub fn payload(&self) -> &Value {
        match self {
            Command::Call { payload } => payload,
            Command::ClientEvent { payload, .. } => payload,
        }
    }

    /// The originating session, if this command came from a client.
    pub fn session(&self) -> Option<SessionId> {
        match self {
            Command::Call { .. } => None,
            Command::ClientEvent { session, .. } => Some(*session),
        }
    }

    /// The event name, if this command came from a client.
    pub fn name(&self) -> Option<&str> {
        match self {
            Command::Call { .. } => None,
            Command::ClientEvent { name, .. } => Some(name),
        }
    }
}

/// What a command handler asks the actor to do besides committing state.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Commit the state and do nothing else.
    None,

    /// Deliver a named delta to every currently attached session.
    Broadcast { name: Arc<str>, payload: Value },

    /// Answer the caller directly (server-call case only; ignored for client
    /// events, which never get a synchronous response).
    Reply(Value),
}

impl Effect {
    /// Shorthand for [`Effect::None`].
    #[inline]
    pub fn none() -> Self {
        Effect::None
    }

    /// Shorthand for [`Effect::Broadcast`].
    #[inline]
    pub fn broadcast(name: impl Into<Arc<str>>, payload: Value) -> Self {
        Effect::Broadcast {
            name: name.into(),
            payload,
        }
    }

    /// Shorthand for [`Effect::Reply`].
    #[inline]
    pub fn reply(value: Value) -> Self {
        Effect::Reply(value)
    }
}

/// Result of a widget's `handle_connect`: the snapshot handed to the new
/// session, and optionally a mutated state (e.g. to record that a viewer
/// joined).
#[derive(Debug, Clone)]
pub struct Connected {
    /// Full state value delivered to the attaching session, exactly once.
    pub snapshot: Value,
    /// Replacement state, if connecting mutates the instance.
    pub state: Option<Value>,
}

impl Connected {
    /// Hands `snapshot` to the new session and leaves the state untouched.
    pub fn snapshot(snapshot: Value) -> Self {
        Self {
            snapshot,
            state: None,
        }
    }

    /// Also replaces the instance state.
    #[inline]
    pub fn with_state(mut self, state: Value) -> Self {
        self.state = Some(state);
        self
    }
}
