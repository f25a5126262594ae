//! # Router configuration.
//!
//! [`RouterConfig`] defines the channel capacities behind the runtime: the
//! per-instance mailbox, the per-session delivery queue, and the lifecycle
//! event bus.
//!
//! # Example
//! ```
//! use viewsync::RouterConfig;
//!
//! let mut cfg = RouterConfig::default();
//! cfg.session_capacity = 256;
//!
//! assert_eq!(cfg.mailbox_capacity, 64);
//! assert_eq!(cfg.session_capacity, 256);
//! ```

/// Channel capacities for the router and its widget actors.
///
/// All capacities are clamped to a minimum of 1 at use sites.
#[derive(Clone, Debug)]
pub struct RouterConfig {
    /// Capacity of each widget instance's command mailbox. Dispatchers wait
    /// (asynchronously) when the mailbox is full, so commands are never lost
    /// while the instance lives.
    pub mailbox_capacity: usize,
    /// Capacity of each session's delivery queue. Fan-out uses `try_send`; a
    /// full queue drops that broadcast for that session only.
    pub session_capacity: usize,
    /// Capacity of the lifecycle event bus channel.
    pub bus_capacity: usize,
}

impl Default for RouterConfig {
    /// Provides a default configuration:
    /// - `mailbox_capacity = 64`
    /// - `session_capacity = 64`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            mailbox_capacity: 64,
            session_capacity: 64,
            bus_capacity: 1024,
        }
    }
}
