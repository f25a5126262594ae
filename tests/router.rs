//! End-to-end tests for the router/actor/session core: total ordering,
//! snapshot continuity, detach semantics, and fail-fast termination.

use std::time::Duration;

use serde_json::{Value, json};
use tokio::time::timeout;
use viewsync::{
    Command, Connected, Effect, EventKind, Router, RouterConfig, Session, SessionEvent, SyncError,
    WidgetFault, WidgetFn, WidgetRef,
};

/// A counter widget: any unrecognized command bumps the count and broadcasts
/// `update(n)`; `{"op":"read"}` replies with the current count; `"explode"`
/// and `"panic"` fault the handler in the two possible ways.
fn counter() -> WidgetRef {
    WidgetFn::new(
        "counter",
        |arg: Value| async move { Ok(if arg.is_null() { json!(0) } else { arg }) },
        |cmd: Command, state: Value| async move {
            let n = state.as_i64().unwrap_or(0);
            if cmd.payload()["op"] == "read" {
                return Ok((Effect::reply(json!(n)), state));
            }
            if cmd.payload()["op"] == "explode" {
                return Err(WidgetFault::new("boom"));
            }
            if cmd.payload()["op"] == "panic" {
                panic!("kaboom");
            }
            let next = n + 1;
            Ok((Effect::broadcast("update", json!(next)), json!(next)))
        },
    )
    .arc()
}

async fn next_broadcast(session: &mut Session) -> (String, Value) {
    match timeout(Duration::from_secs(5), session.recv()).await {
        Ok(Some(SessionEvent::Broadcast { name, payload, .. })) => (name.to_string(), payload),
        other => panic!("expected broadcast, got {other:?}"),
    }
}

async fn next_termination(session: &mut Session) -> String {
    match timeout(Duration::from_secs(5), session.recv()).await {
        Ok(Some(SessionEvent::Terminated { reason })) => reason.to_string(),
        other => panic!("expected termination notice, got {other:?}"),
    }
}

#[tokio::test]
async fn test_counter_scenario_with_late_attach() {
    let router = Router::new();
    let id = router.create(counter(), Value::Null).await.unwrap();

    // Three sessions attach in sequence, each receiving snapshot 0.
    let (mut s1, snap1) = router.attach(id).await.unwrap();
    let (mut s2, snap2) = router.attach(id).await.unwrap();
    let (mut s3, snap3) = router.attach(id).await.unwrap();
    assert_eq!(snap1, json!(0));
    assert_eq!(snap2, json!(0));
    assert_eq!(snap3, json!(0));

    // A bump from session 2 reaches all three sessions, including itself.
    s2.send_event("bump", Value::Null).await;
    for s in [&mut s1, &mut s2, &mut s3] {
        let (name, payload) = next_broadcast(s).await;
        assert_eq!(name, "update");
        assert_eq!(payload, json!(1));
    }

    // A fourth session attaching afterwards sees the folded state.
    let (_s4, snap4) = router.attach(id).await.unwrap();
    assert_eq!(snap4, json!(1));

    router.shutdown().await;
}

#[tokio::test]
async fn test_final_state_equals_fold_of_commands_in_arrival_order() {
    let router = Router::new();
    let id = router.create(counter(), Value::Null).await.unwrap();
    let (s, snap) = router.attach(id).await.unwrap();
    assert_eq!(snap, json!(0));

    // Interleave server calls and client events; all funnel through one
    // mailbox, so the fold is 5 bumps regardless of origin.
    router.call(id, json!({"op": "bump"})).await.unwrap();
    s.send_event("bump", Value::Null).await;
    router.call(id, json!({"op": "bump"})).await.unwrap();
    s.send_event("bump", Value::Null).await;
    router.call(id, json!({"op": "bump"})).await.unwrap();

    let total = router.call_with_reply(id, json!({"op": "read"})).await.unwrap();
    assert_eq!(total, json!(5));

    router.shutdown().await;
}

#[tokio::test]
async fn test_snapshot_continues_the_fold_without_gaps_or_duplicates() {
    let router = Router::new();
    let id = router.create(counter(), Value::Null).await.unwrap();

    router.call(id, json!({"op": "bump"})).await.unwrap();
    router.call(id, json!({"op": "bump"})).await.unwrap();

    // Attaching mid-stream: snapshot reflects both bumps, and the first
    // delivered broadcast is the one produced by the next command.
    let (mut s, snap) = router.attach(id).await.unwrap();
    assert_eq!(snap, json!(2));

    router.call(id, json!({"op": "bump"})).await.unwrap();
    let (name, payload) = next_broadcast(&mut s).await;
    assert_eq!(name, "update");
    assert_eq!(payload, json!(3));

    router.shutdown().await;
}

#[tokio::test]
async fn test_n_sessions_receive_identical_ordered_sequences() {
    let router = Router::new();
    let id = router.create(counter(), Value::Null).await.unwrap();

    let mut sessions = Vec::new();
    for _ in 0..3 {
        let (s, _) = router.attach(id).await.unwrap();
        sessions.push(s);
    }
    for _ in 0..5 {
        router.call(id, json!({"op": "bump"})).await.unwrap();
    }

    let mut sequences = Vec::new();
    for s in &mut sessions {
        let mut seq = Vec::new();
        for _ in 0..5 {
            seq.push(next_broadcast(s).await);
        }
        sequences.push(seq);
    }
    let expected: Vec<(String, Value)> =
        (1..=5).map(|n| ("update".to_string(), json!(n))).collect();
    for seq in &sequences {
        assert_eq!(seq, &expected);
    }

    router.shutdown().await;
}

#[tokio::test]
async fn test_server_broadcast_is_ordered_against_commands() {
    let router = Router::new();
    let id = router.create(counter(), Value::Null).await.unwrap();
    let (mut s, _) = router.attach(id).await.unwrap();

    router.call(id, json!({"op": "bump"})).await.unwrap();
    router.broadcast(id, "ping", json!("hello")).await.unwrap();
    router.call(id, json!({"op": "bump"})).await.unwrap();

    assert_eq!(next_broadcast(&mut s).await, ("update".to_string(), json!(1)));
    assert_eq!(next_broadcast(&mut s).await, ("ping".to_string(), json!("hello")));
    assert_eq!(next_broadcast(&mut s).await, ("update".to_string(), json!(2)));

    // The pure broadcast did not touch the state.
    let total = router.call_with_reply(id, json!({"op": "read"})).await.unwrap();
    assert_eq!(total, json!(2));

    router.shutdown().await;
}

#[tokio::test]
async fn test_detached_session_receives_nothing_further() {
    let router = Router::new();
    let id = router.create(counter(), Value::Null).await.unwrap();
    let (mut s, _) = router.attach(id).await.unwrap();

    s.detach().await;
    router.call(id, json!({"op": "bump"})).await.unwrap();
    router.call(id, json!({"op": "bump"})).await.unwrap();

    // The detach op precedes the bumps in the mailbox, so the delivery queue
    // closes without ever carrying a broadcast.
    let leftover = timeout(Duration::from_secs(5), s.recv()).await.unwrap();
    assert!(leftover.is_none(), "got {leftover:?} after detach");

    router.shutdown().await;
}

#[tokio::test]
async fn test_detach_is_idempotent() {
    let router = Router::new();
    let id = router.create(counter(), Value::Null).await.unwrap();
    let (mut s, _) = router.attach(id).await.unwrap();
    let sid = s.id();

    router.detach(sid).await;
    router.detach(sid).await;
    s.detach().await;

    let leftover = timeout(Duration::from_secs(5), s.recv()).await.unwrap();
    assert!(leftover.is_none());

    // The id is stale now; routing by id reports SessionNotFound.
    let err = router.send_event(sid, "bump", Value::Null).await.unwrap_err();
    assert!(matches!(err, SyncError::SessionNotFound { .. }));

    router.shutdown().await;
}

#[tokio::test]
async fn test_detached_handle_no_longer_mutates_state() {
    let router = Router::new();
    let id = router.create(counter(), Value::Null).await.unwrap();
    let (_s1, _) = router.attach(id).await.unwrap();
    let (s2, _) = router.attach(id).await.unwrap();
    let mut events = router.events();

    s2.detach().await;
    s2.send_event("bump", Value::Null).await;

    // Detach revoked the handle's write access, so the fold never sees the
    // late event.
    let total = router.call_with_reply(id, json!({"op": "read"})).await.unwrap();
    assert_eq!(total, json!(0));

    // The rejection is reported on the bus, attributed to the stale session.
    loop {
        let ev = timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        if ev.kind == EventKind::EventRejected {
            assert_eq!(ev.session, Some(s2.id()));
            break;
        }
    }

    router.shutdown().await;
}

#[tokio::test]
async fn test_full_queue_still_receives_terminated_notice() {
    let cfg = RouterConfig {
        session_capacity: 1,
        ..RouterConfig::default()
    };
    let router = Router::with_config(cfg);
    let id = router.create(counter(), Value::Null).await.unwrap();
    let (mut s, _) = router.attach(id).await.unwrap();

    // One undrained broadcast fills the delivery queue before the fault, so
    // the terminal notice cannot be enqueued immediately.
    router.call(id, json!({"op": "bump"})).await.unwrap();
    router.call(id, json!({"op": "explode"})).await.unwrap();

    // Draining the queue frees a slot; the notice still arrives, last.
    assert_eq!(next_broadcast(&mut s).await, ("update".to_string(), json!(1)));
    assert_eq!(next_termination(&mut s).await, "boom");

    router.shutdown().await;
}

#[tokio::test]
async fn test_handler_fault_terminates_instance_and_notifies_sessions() {
    let router = Router::new();
    let id = router.create(counter(), Value::Null).await.unwrap();
    let (mut s1, _) = router.attach(id).await.unwrap();
    let (mut s2, _) = router.attach(id).await.unwrap();

    router.call(id, json!({"op": "explode"})).await.unwrap();

    assert_eq!(next_termination(&mut s1).await, "boom");
    assert_eq!(next_termination(&mut s2).await, "boom");

    // The mailbox closed before the notices went out, so anything dispatched
    // after observing one fails instead of vanishing.
    let err = router.call(id, json!({"op": "bump"})).await.unwrap_err();
    assert!(matches!(err, SyncError::InstanceNotFound { .. }));
    let err = router.call_with_reply(id, json!({"op": "read"})).await.unwrap_err();
    assert!(matches!(err, SyncError::InstanceNotFound { .. }));

    router.shutdown().await;
}

#[tokio::test]
async fn test_handler_panic_is_contained_as_a_fault() {
    let router = Router::new();
    let id = router.create(counter(), Value::Null).await.unwrap();
    let (mut s, _) = router.attach(id).await.unwrap();

    router.call(id, json!({"op": "panic"})).await.unwrap();
    assert_eq!(next_termination(&mut s).await, "kaboom");

    // Sibling instances are unaffected.
    let other = router.create(counter(), Value::Null).await.unwrap();
    let reply = router
        .call_with_reply(other, json!({"op": "read"}))
        .await
        .unwrap();
    assert_eq!(reply, json!(0));

    router.shutdown().await;
}

#[tokio::test]
async fn test_init_fault_aborts_creation() {
    let router = Router::new();
    let failing = WidgetFn::new(
        "failing",
        |_arg: Value| async move { Err(WidgetFault::new("bad argument")) },
        |_cmd: Command, state: Value| async move { Ok((Effect::none(), state)) },
    )
    .arc();

    let err = router.create(failing, Value::Null).await.unwrap_err();
    assert!(matches!(err, SyncError::Init { .. }));
    assert_eq!(err.as_label(), "init_failed");
    assert!(router.is_empty().await);

    router.shutdown().await;
}

#[tokio::test]
async fn test_connect_handler_can_mutate_state() {
    let router = Router::new();
    let greeter = WidgetFn::new(
        "greeter",
        |_arg: Value| async move { Ok(json!({"viewers": 0})) },
        |_cmd: Command, state: Value| async move { Ok((Effect::reply(state.clone()), state)) },
    )
    .on_connect(|state: Value| async move {
        let viewers = state["viewers"].as_i64().unwrap_or(0) + 1;
        Ok(Connected::snapshot(state).with_state(json!({"viewers": viewers})))
    })
    .arc();

    let id = router.create(greeter, Value::Null).await.unwrap();
    let (_s1, snap1) = router.attach(id).await.unwrap();
    let (_s2, snap2) = router.attach(id).await.unwrap();

    // Each snapshot reflects the state as of that session's insertion.
    assert_eq!(snap1, json!({"viewers": 0}));
    assert_eq!(snap2, json!({"viewers": 1}));

    let state = router.call_with_reply(id, Value::Null).await.unwrap();
    assert_eq!(state, json!({"viewers": 2}));

    router.shutdown().await;
}

#[tokio::test]
async fn test_stop_notifies_sessions_and_clears_registry() {
    let router = Router::new();
    let id = router.create(counter(), Value::Null).await.unwrap();
    let (mut s, _) = router.attach(id).await.unwrap();

    assert_eq!(router.list().await, vec![id]);
    router.stop(id).await.unwrap();

    assert_eq!(next_termination(&mut s).await, "stopped");
    assert!(router.is_empty().await);

    let err = router.call(id, json!({"op": "bump"})).await.unwrap_err();
    assert!(matches!(err, SyncError::InstanceNotFound { .. }));

    router.shutdown().await;
}

#[tokio::test]
async fn test_stale_widget_handle_is_reported_not_fatal() {
    let router = Router::new();
    let id = router.create(counter(), Value::Null).await.unwrap();
    router.stop(id).await.unwrap();

    let err = router.attach(id).await.unwrap_err();
    assert!(matches!(err, SyncError::InstanceNotFound { .. }));

    // The router itself is fine; new instances work.
    let other = router.create(counter(), Value::Null).await.unwrap();
    let (_s, snap) = router.attach(other).await.unwrap();
    assert_eq!(snap, json!(0));

    router.shutdown().await;
}

#[tokio::test]
async fn test_lifecycle_events_are_published_in_order() {
    let router = Router::new();
    let mut events = router.events();

    let id = router.create(counter(), Value::Null).await.unwrap();
    let (s, _) = router.attach(id).await.unwrap();
    s.send_event("bump", Value::Null).await;

    let mut seen = Vec::new();
    let mut last_seq = 0;
    while !seen.contains(&EventKind::BroadcastSent) {
        let ev = timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(ev.seq >= last_seq);
        last_seq = ev.seq;
        seen.push(ev.kind);
    }
    assert!(seen.contains(&EventKind::WidgetCreated));
    assert!(seen.contains(&EventKind::SessionAttached));

    router.shutdown().await;
}
