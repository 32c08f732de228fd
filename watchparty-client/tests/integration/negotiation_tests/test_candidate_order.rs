use serde_json::json;
use std::sync::Arc;
use watchparty_client::{LinkRole, LinkState};
use watchparty_core::{IceCandidate, Member, SessionDescription, SignalKind};

use crate::integration::init_tracing;
use crate::utils::{MockOptions, RecordingSink, session, spawn_mesh, wait_for};

fn quiet() -> MockOptions {
    MockOptions {
        emit_candidates: false,
        ..Default::default()
    }
}

fn candidate(n: usize) -> serde_json::Value {
    IceCandidate::new(format!("candidate:{}", n)).to_payload()
}

#[tokio::test]
async fn test_candidates_before_offer_are_held_until_link_exists() {
    init_tracing();
    let sink = Arc::new(RecordingSink::default());
    let b = spawn_mesh(session(2), quiet(), sink.clone());
    let a = session(1);

    for n in 0..3 {
        b.mesh
            .signal(SignalKind::IceCandidate, a, candidate(n))
            .await
            .unwrap();
    }
    assert!(b.links().await.is_empty());
    assert!(b.factory.all().is_empty());

    b.mesh
        .signal(SignalKind::Offer, a, SessionDescription::offer("v=0").to_payload())
        .await
        .unwrap();

    let sink_ref = &sink;
    wait_for("answer sent", move || async move {
        sink_ref.count(SignalKind::Answer) == 1
    })
    .await;
    b.wait_connected(1).await;

    let conn = b.factory.latest(a).unwrap();
    conn.snapshot(|r| {
        assert_eq!(
            r.candidates,
            vec!["candidate:0", "candidate:1", "candidate:2"]
        );
        assert_eq!(r.early_candidates, 0);
    });
    let links = b.links().await;
    assert_eq!(links[0].role, LinkRole::Responder);
}

#[tokio::test]
async fn test_candidates_before_answer_are_queued_in_link() {
    init_tracing();
    let sink = Arc::new(RecordingSink::default());
    let b = spawn_mesh(session(2), quiet(), sink.clone());
    let a = session(1);

    b.mesh
        .update_members(vec![Member::new(a, "A"), Member::new(b.id, "B")])
        .await
        .unwrap();
    let sink_ref = &sink;
    wait_for("offer sent", move || async move {
        sink_ref.count(SignalKind::Offer) == 1
    })
    .await;

    for n in 0..2 {
        b.mesh
            .signal(SignalKind::IceCandidate, a, candidate(n))
            .await
            .unwrap();
    }
    let conn = b.factory.latest(a).unwrap();
    assert!(conn.snapshot(|r| r.candidates.is_empty()));
    assert_eq!(b.links().await[0].state, LinkState::Connecting);

    b.mesh
        .signal(SignalKind::Answer, a, SessionDescription::answer("v=0").to_payload())
        .await
        .unwrap();
    b.wait_connected(1).await;

    b.mesh
        .signal(SignalKind::IceCandidate, a, candidate(2))
        .await
        .unwrap();
    let conn_ref = &conn;
    wait_for("late candidate applied", move || async move {
        conn_ref.snapshot(|r| r.candidates.len() == 3)
    })
    .await;

    conn.snapshot(|r| {
        assert_eq!(
            r.candidates,
            vec!["candidate:0", "candidate:1", "candidate:2"]
        );
        assert_eq!(r.early_candidates, 0);
    });
}

#[tokio::test]
async fn test_held_candidates_of_absent_member_are_discarded() {
    init_tracing();
    let sink = Arc::new(RecordingSink::default());
    let b = spawn_mesh(session(2), quiet(), sink.clone());
    let a = session(1);

    b.mesh
        .signal(SignalKind::IceCandidate, a, candidate(0))
        .await
        .unwrap();
    b.mesh
        .update_members(vec![Member::new(b.id, "B")])
        .await
        .unwrap();
    b.mesh
        .signal(SignalKind::Offer, a, SessionDescription::offer("v=0").to_payload())
        .await
        .unwrap();
    b.wait_connected(1).await;

    let conn = b.factory.latest(a).unwrap();
    assert!(conn.snapshot(|r| r.candidates.is_empty()));
}

#[tokio::test]
async fn test_malformed_payloads_are_dropped() {
    init_tracing();
    let sink = Arc::new(RecordingSink::default());
    let b = spawn_mesh(session(2), quiet(), sink.clone());
    let a = session(1);

    b.mesh
        .signal(SignalKind::Offer, a, json!({"nope": 1}))
        .await
        .unwrap();
    b.mesh
        .signal(SignalKind::Offer, a, SessionDescription::answer("v=0").to_payload())
        .await
        .unwrap();
    b.mesh
        .signal(SignalKind::Answer, a, SessionDescription::answer("v=0").to_payload())
        .await
        .unwrap();
    b.mesh
        .signal(SignalKind::IceCandidate, a, json!("candidate"))
        .await
        .unwrap();

    assert!(b.links().await.is_empty());
    assert!(b.factory.all().is_empty());
    assert!(sink.sent().is_empty());

    b.mesh
        .signal(SignalKind::Offer, a, SessionDescription::offer("v=0").to_payload())
        .await
        .unwrap();
    b.wait_connected(1).await;
}
