use watchparty_client::{ClientEvent, LinkRole, LinkState};

use crate::integration::{drain_events, init_tracing};
use crate::utils::{MockOptions, SignalHub, session, spawn_peer, wait_for};

#[tokio::test]
async fn test_departed_member_links_are_torn_down() {
    init_tracing();
    let hub = SignalHub::new();
    let mut a = spawn_peer(&hub, session(1), MockOptions::default());
    let b = spawn_peer(&hub, session(2), MockOptions::default());
    let c = spawn_peer(&hub, session(3), MockOptions::default());
    hub.join(a.id, "A").await;
    hub.join(b.id, "B").await;
    hub.join(c.id, "C").await;
    for peer in [&a, &b, &c] {
        peer.wait_connected(2).await;
    }
    drain_events(&mut a.events);

    hub.leave(c.id).await;

    let (a_ref, b_ref) = (&a, &b);
    wait_for("links to C gone", move || async move {
        a_ref.links().await.len() == 1 && b_ref.links().await.len() == 1
    })
    .await;
    assert_eq!(a.connected_to().await, vec![b.id]);
    assert_eq!(b.connected_to().await, vec![a.id]);

    for conn in a.factory.connections_to(c.id) {
        let conn = &conn;
        wait_for("A's connection to C closed", move || async move {
            conn.snapshot(|r| r.closed)
        })
        .await;
    }

    let events = drain_events(&mut a.events);
    assert!(events.contains(&ClientEvent::LinkStateChanged {
        remote: c.id,
        state: LinkState::Closed,
    }));
}

#[tokio::test]
async fn test_rejoin_under_new_session_gets_fresh_links() {
    init_tracing();
    let hub = SignalHub::new();
    let a = spawn_peer(&hub, session(1), MockOptions::default());
    let b = spawn_peer(&hub, session(2), MockOptions::default());
    hub.join(a.id, "A").await;
    hub.join(b.id, "B").await;
    a.wait_connected(1).await;
    b.wait_connected(1).await;

    hub.leave(b.id).await;
    let a_ref = &a;
    wait_for("A has no links", move || async move {
        a_ref.links().await.is_empty()
    })
    .await;

    let b2 = spawn_peer(&hub, session(5), MockOptions::default());
    hub.join(b2.id, "B").await;
    a.wait_connected(1).await;
    b2.wait_connected(1).await;

    assert_eq!(a.connected_to().await, vec![b2.id]);
    assert_eq!(b2.links().await[0].role, LinkRole::Initiator);
    assert_eq!(a.factory.connections_to(b.id).len(), 1);
    assert_eq!(a.factory.connections_to(b2.id).len(), 1);
}
