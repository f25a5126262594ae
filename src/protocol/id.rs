//! # Opaque identifiers for widget instances and sessions.
//!
//! Both id types are generated from process-wide atomic counters, so they are
//! unique for the lifetime of the process, `Copy`, and cheap to use as map
//! keys. They carry no meaning beyond identity.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static WIDGET_SEQ: AtomicU64 = AtomicU64::new(1);
static SESSION_SEQ: AtomicU64 = AtomicU64::new(1);

/// Identifier of one live widget instance.
///
/// Assigned by [`Router::create`](crate::Router::create), immutable for the
/// instance's lifetime, never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetId(u64);

impl WidgetId {
    pub(crate) fn next() -> Self {
        Self(WIDGET_SEQ.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, for logs and external indexing.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// Identifier of one viewer attachment.
///
/// Unique per [`attach`](crate::Router::attach); a viewer that detaches and
/// re-attaches gets a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    pub(crate) fn next() -> Self {
        Self(SESSION_SEQ.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, for logs and external indexing.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_monotonic() {
        let a = WidgetId::next();
        let b = WidgetId::next();
        assert!(b > a);

        let x = SessionId::next();
        let y = SessionId::next();
        assert!(y > x);
    }
}
