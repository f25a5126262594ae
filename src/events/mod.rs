//! Lifecycle events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted by the router and widget
//! actors.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - `Bus` thin wrapper over `tokio::sync::broadcast` (crate-internal; consume
//!   the stream via [`Router::events`](crate::Router::events))
//!
//! ## Quick reference
//! - **Publishers**: `Router` (create/reject paths), `WidgetActor` (attach,
//!   detach, fan-out, termination).
//! - **Consumers**: the router's own pruning listener, plus any receiver
//!   obtained from [`Router::events`](crate::Router::events).

mod bus;
mod event;

pub(crate) use bus::Bus;
pub use event::{Event, EventKind};
