//! # Simple logging observer for debugging and demos.
//!
//! [`LogWriter`] prints lifecycle events to stdout in a human-readable
//! format. This is primarily useful for development, debugging, and examples.
//!
//! ## Output format
//! ```text
//! [created] widget=w1 name=counter
//! [attached] widget=w1 session=s1
//! [broadcast] widget=w1 event=update
//! [detached] widget=w1 session=s1
//! [faulted] widget=w1 reason="division by zero"
//! ```

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::events::{Event, EventKind};

/// Simple stdout logging observer.
///
/// Enabled via the `logging` feature. Not intended for production use —
/// consume [`Router::events`](crate::Router::events) directly for structured
/// logging or metrics collection.
pub struct LogWriter;

impl LogWriter {
    /// Spawns a task that prints every event from `rx` until the stream
    /// closes.
    ///
    /// ```no_run
    /// # use viewsync::{LogWriter, Router};
    /// # async fn demo() {
    /// let router = Router::new();
    /// LogWriter::spawn(router.events());
    /// # }
    /// ```
    pub fn spawn(mut rx: broadcast::Receiver<Event>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => Self::write(&ev),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    fn write(e: &Event) {
        match e.kind {
            EventKind::WidgetCreated => {
                println!("[created] widget={:?} name={:?}", e.widget, e.name);
            }
            EventKind::WidgetStopped => {
                println!("[stopped] widget={:?}", e.widget);
            }
            EventKind::WidgetFaulted => {
                println!("[faulted] widget={:?} reason={:?}", e.widget, e.reason);
            }
            EventKind::SessionAttached => {
                println!("[attached] widget={:?} session={:?}", e.widget, e.session);
            }
            EventKind::SessionDetached => {
                println!("[detached] widget={:?} session={:?}", e.widget, e.session);
            }
            EventKind::BroadcastSent => {
                println!("[broadcast] widget={:?} event={:?}", e.widget, e.name);
            }
            EventKind::DeliveryDropped => {
                println!(
                    "[dropped] widget={:?} session={:?} event={:?}",
                    e.widget, e.session, e.name
                );
            }
            EventKind::EventRejected => {
                println!("[rejected] session={:?} reason={:?}", e.session, e.reason);
            }
        }
    }
}
