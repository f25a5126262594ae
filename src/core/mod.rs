//! Runtime core: actors, sessions, and routing.
//!
//! The public API from this module is [`Router`] (registry + dispatch) and
//! [`Session`] (one viewer's attachment).
//!
//! Internal modules:
//! - [`actor`]: owns one instance's state and serializes all mutation;
//! - [`session`]: client-side forwarding shim;
//! - [`router`]: registry, envelope dispatch, event-driven pruning.

mod actor;
mod router;
mod session;

pub use router::Router;
pub use session::Session;
