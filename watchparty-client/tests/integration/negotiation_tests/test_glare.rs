use watchparty_client::LinkRole;
use watchparty_core::{ClientMessage, Member, SignalKind};

use crate::integration::init_tracing;
use crate::utils::{MockOptions, SignalHub, session, spawn_peer, wait_for};

#[tokio::test]
async fn test_simultaneous_offers_resolve_to_one_link() {
    init_tracing();
    let hub = SignalHub::new();
    hub.hold();
    let a = spawn_peer(&hub, session(1), MockOptions::default());
    let b = spawn_peer(&hub, session(2), MockOptions::default());

    // Diverging snapshots: each side believes it joined last.
    a.mesh
        .update_members(vec![Member::new(b.id, "B"), Member::new(a.id, "A")])
        .await
        .unwrap();
    b.mesh
        .update_members(vec![Member::new(a.id, "A"), Member::new(b.id, "B")])
        .await
        .unwrap();

    let hub_ref = &hub;
    wait_for("both offers queued", move || async move {
        hub_ref
            .queued()
            .await
            .iter()
            .filter(|(_, m)| matches!(m, ClientMessage::Offer { .. }))
            .count()
            == 2
    })
    .await;
    hub.release().await;

    a.wait_connected(1).await;
    b.wait_connected(1).await;

    // The smaller session id yields and answers.
    assert_eq!(a.links().await[0].role, LinkRole::Responder);
    assert_eq!(b.links().await[0].role, LinkRole::Initiator);

    let a_conns = a.factory.connections_to(b.id);
    assert_eq!(a_conns.len(), 2);
    assert!(a_conns[0].snapshot(|r| r.closed));
    assert!(!a_conns[1].snapshot(|r| r.closed));
    assert_eq!(b.factory.connections_to(a.id).len(), 1);

    let offers_from_a = hub
        .relayed()
        .into_iter()
        .filter(|(kind, from, _)| *kind == SignalKind::Offer && *from == a.id)
        .count();
    assert_eq!(offers_from_a, 1);
}
