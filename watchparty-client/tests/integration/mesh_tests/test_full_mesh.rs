use std::sync::Arc;
use watchparty_client::LinkRole;
use watchparty_core::SignalKind;

use crate::integration::init_tracing;
use crate::utils::{MockOptions, SignalHub, TestPeer, session, spawn_peer};

/// Joins `n` peers one after another; peer `i` has session id `i`.
async fn assemble(n: u128) -> (Arc<SignalHub>, Vec<TestPeer>) {
    let hub = SignalHub::new();
    let mut peers = Vec::new();
    for i in 1..=n {
        let peer = spawn_peer(&hub, session(i), MockOptions::default());
        hub.join(peer.id, &format!("user{}", i)).await;
        peers.push(peer);
    }
    (hub, peers)
}

async fn assert_full_mesh(n: u128) {
    let (hub, peers) = assemble(n).await;
    let others = peers.len() - 1;

    for peer in &peers {
        peer.wait_connected(others).await;
    }

    let total: usize = {
        let mut total = 0;
        for peer in &peers {
            total += peer.connected_to().await.len();
        }
        total
    };
    assert_eq!(total / 2, peers.len() * others / 2);

    // The later joiner initiates every pair.
    for (i, peer) in peers.iter().enumerate() {
        for link in peer.links().await {
            let other = peers.iter().position(|p| p.id == link.remote).unwrap();
            let expected = if i > other {
                LinkRole::Initiator
            } else {
                LinkRole::Responder
            };
            assert_eq!(link.role, expected, "{} -> {}", peer.id, link.remote);
        }
    }

    for (kind, from, to) in hub.relayed() {
        if kind == SignalKind::Offer {
            assert!(from > to, "offer from earlier joiner {} to {}", from, to);
        }
    }

    for peer in &peers {
        for conn in peer.factory.all() {
            conn.snapshot(|r| {
                assert_eq!(r.early_candidates, 0);
                assert!(!r.closed);
            });
        }
    }
}

#[tokio::test]
async fn test_two_members_form_one_link() {
    init_tracing();
    assert_full_mesh(2).await;
}

#[tokio::test]
async fn test_three_members_form_full_mesh() {
    init_tracing();
    assert_full_mesh(3).await;
}

#[tokio::test]
async fn test_four_members_form_full_mesh() {
    init_tracing();
    assert_full_mesh(4).await;
}

#[tokio::test]
async fn test_each_pair_negotiates_once() {
    init_tracing();
    let (hub, peers) = assemble(3).await;
    for peer in &peers {
        peer.wait_connected(2).await;
    }

    let offers = hub
        .relayed()
        .into_iter()
        .filter(|(kind, _, _)| *kind == SignalKind::Offer)
        .count();
    let answers = hub
        .relayed()
        .into_iter()
        .filter(|(kind, _, _)| *kind == SignalKind::Answer)
        .count();
    assert_eq!(offers, 3);
    assert_eq!(answers, 3);

    for peer in &peers {
        for other in &peers {
            if other.id != peer.id {
                assert_eq!(peer.factory.connections_to(other.id).len(), 1);
            }
        }
    }
}

#[tokio::test]
async fn test_repeated_snapshot_keeps_existing_links() {
    init_tracing();
    let (hub, peers) = assemble(2).await;
    for peer in &peers {
        peer.wait_connected(1).await;
    }

    // A member with no mesh comes and goes; established links are left alone.
    hub.join(session(99), "ghost").await;
    hub.leave(session(99)).await;

    for peer in &peers {
        assert_eq!(peer.connected_to().await.len(), 1);
    }
    assert_eq!(peers[1].factory.connections_to(peers[0].id).len(), 1);
    assert_eq!(peers[0].factory.connections_to(peers[1].id).len(), 1);
}
