//! Shared counter walkthrough: one widget instance, three viewers, live
//! ordered updates, late attach, and explicit teardown.
//!
//! Run with: `cargo run --example counter --features logging`

use serde_json::{Value, json};
use viewsync::{Command, Effect, LogWriter, Router, SessionEvent, WidgetFn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let router = Router::new();
    LogWriter::spawn(router.events());

    let counter = WidgetFn::new(
        "counter",
        |arg: Value| async move { Ok(if arg.is_null() { json!(0) } else { arg }) },
        |cmd: Command, state: Value| async move {
            let n = state.as_i64().unwrap_or(0);
            if cmd.payload()["op"] == "read" {
                return Ok((Effect::reply(json!(n)), state));
            }
            let next = n + 1;
            Ok((Effect::broadcast("update", json!(next)), json!(next)))
        },
    );
    let id = router.create(counter.arc(), Value::Null).await?;

    // Three viewers attach; each gets the current state as its snapshot.
    let (mut a, snap_a) = router.attach(id).await?;
    let (mut b, snap_b) = router.attach(id).await?;
    let (c, snap_c) = router.attach(id).await?;
    println!("snapshots: a={snap_a} b={snap_b} c={snap_c}");

    // Viewer C bumps the counter; every viewer (C included) sees update(1).
    c.send_event("bump", Value::Null).await;
    for (label, viewer) in [("a", &mut a), ("b", &mut b)] {
        if let Some(SessionEvent::Broadcast { name, payload, .. }) = viewer.recv().await {
            println!("viewer {label}: {name}({payload})");
        }
    }

    // A server-side call mutates the same state through the same mailbox.
    router.call(id, json!({"op": "bump"})).await?;
    let total = router.call_with_reply(id, json!({"op": "read"})).await?;
    println!("server read: {total}");

    // A late viewer starts from the folded state, not from zero.
    let (_late, snapshot) = router.attach(id).await?;
    println!("late snapshot: {snapshot}");

    router.shutdown().await;
    Ok(())
}
