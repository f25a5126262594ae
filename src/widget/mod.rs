//! # Widget behavior abstractions.
//!
//! This module provides the user-facing behavior types:
//! - [`Widget`] - trait for implementing a widget's handlers
//! - [`WidgetFn`] - closure-backed widget implementation
//! - [`WidgetRef`] - shared reference to a behavior (`Arc<dyn Widget>`)

mod widget;
mod widget_fn;

pub use widget::{Widget, WidgetRef};
pub use widget_fn::WidgetFn;
