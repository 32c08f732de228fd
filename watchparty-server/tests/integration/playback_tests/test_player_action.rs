use watchparty_core::{ClientMessage, PlayerAction, RoomId, ServerMessage};

use crate::integration::init_tracing;
use crate::utils::{TestClient, spawn_server};

#[tokio::test]
async fn test_seek_fans_out_without_echo() {
    init_tracing();
    let addr = spawn_server().await;

    let mut a = TestClient::connect(addr).await.unwrap();
    let mut b = TestClient::connect(addr).await.unwrap();
    let mut c = TestClient::connect(addr).await.unwrap();
    a.join("abc123", "A").await.unwrap();
    b.join("abc123", "B").await.unwrap();
    c.join("abc123", "C").await.unwrap();
    for client in [&mut a, &mut b] {
        client
            .recv_until(
                |m| matches!(m, ServerMessage::UsersUpdate { members, .. } if members.len() == 3),
            )
            .await
            .unwrap();
    }

    a.player_action("abc123", PlayerAction::Seek, Some(215))
        .await
        .unwrap();

    let expected = ServerMessage::PlayerAction {
        action: PlayerAction::Seek,
        time: Some(215),
        from_user: "A".to_owned(),
    };
    assert_eq!(b.recv().await.unwrap(), expected);
    assert_eq!(c.recv().await.unwrap(), expected);
    a.expect_silence().await.unwrap();
}

#[tokio::test]
async fn test_late_joiner_reads_stored_state() {
    init_tracing();
    let addr = spawn_server().await;

    let mut a = TestClient::connect(addr).await.unwrap();
    let mut b = TestClient::connect(addr).await.unwrap();
    a.join("abc123", "A").await.unwrap();
    b.join("abc123", "B").await.unwrap();

    a.player_action("abc123", PlayerAction::Seek, Some(215))
        .await
        .unwrap();
    a.player_action("abc123", PlayerAction::Play, None)
        .await
        .unwrap();
    b.recv_until(|m| {
        matches!(
            m,
            ServerMessage::PlayerAction {
                action: PlayerAction::Play,
                ..
            }
        )
    })
    .await
    .unwrap();

    let mut d = TestClient::connect(addr).await.unwrap();
    d.join("abc123", "D").await.unwrap();
    d.send(&ClientMessage::PlayerGetState {
        room_id: RoomId::from("abc123"),
    })
    .await
    .unwrap();

    assert_eq!(
        d.recv().await.unwrap(),
        ServerMessage::PlayerState {
            playing: true,
            time: 215,
        }
    );
}

#[tokio::test]
async fn test_untouched_room_reports_paused_at_zero() {
    init_tracing();
    let addr = spawn_server().await;

    let mut a = TestClient::connect(addr).await.unwrap();
    a.join("fresh", "A").await.unwrap();
    a.send(&ClientMessage::PlayerGetState {
        room_id: RoomId::from("fresh"),
    })
    .await
    .unwrap();

    assert_eq!(
        a.recv().await.unwrap(),
        ServerMessage::PlayerState {
            playing: false,
            time: 0,
        }
    );
}

#[tokio::test]
async fn test_seek_without_time_is_dropped() {
    init_tracing();
    let addr = spawn_server().await;

    let mut a = TestClient::connect(addr).await.unwrap();
    let mut b = TestClient::connect(addr).await.unwrap();
    a.join("abc123", "A").await.unwrap();
    b.join("abc123", "B").await.unwrap();
    a.recv_until(|m| matches!(m, ServerMessage::UsersUpdate { members, .. } if members.len() == 2))
        .await
        .unwrap();

    a.player_action("abc123", PlayerAction::Seek, None)
        .await
        .unwrap();

    b.expect_silence().await.unwrap();
}
