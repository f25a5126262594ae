//! # Protocol data model.
//!
//! The immutable message shapes exchanged between the router, widget actors,
//! and sessions:
//! - [`WidgetId`], [`SessionId`] opaque identifiers
//! - [`Envelope`], [`EnvelopeKind`] the inbound/outbound message shape
//! - [`Command`], [`Effect`], [`Connected`] handler-facing types
//! - [`SessionEvent`] items on a session's delivery stream
//!
//! All payloads are [`serde_json::Value`]: opaque to the core, interpreted
//! only by widget handlers and the client runtime.

mod command;
mod envelope;
mod id;
mod session_event;

pub use command::{Command, Connected, Effect};
pub use envelope::{Envelope, EnvelopeKind};
pub use id::{SessionId, WidgetId};
pub use session_event::SessionEvent;
