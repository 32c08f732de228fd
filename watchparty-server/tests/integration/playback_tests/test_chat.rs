use watchparty_core::{ClientMessage, RoomId, ServerMessage};

use crate::integration::init_tracing;
use crate::utils::{TestClient, spawn_server};

#[tokio::test]
async fn test_chat_reaches_everyone_including_sender() {
    init_tracing();
    let addr = spawn_server().await;

    let mut a = TestClient::connect(addr).await.unwrap();
    let mut b = TestClient::connect(addr).await.unwrap();
    a.join("abc123", "A").await.unwrap();
    b.join("abc123", "B").await.unwrap();
    a.recv_until(|m| matches!(m, ServerMessage::UsersUpdate { members, .. } if members.len() == 2))
        .await
        .unwrap();

    a.send(&ClientMessage::ChatMessage {
        room_id: RoomId::from("abc123"),
        user_name: "A".to_owned(),
        message: "hello".to_owned(),
    })
    .await
    .unwrap();

    let expected = ServerMessage::ChatMessage {
        user_name: "A".to_owned(),
        message: "hello".to_owned(),
    };
    assert_eq!(a.recv().await.unwrap(), expected);
    assert_eq!(b.recv().await.unwrap(), expected);
}
