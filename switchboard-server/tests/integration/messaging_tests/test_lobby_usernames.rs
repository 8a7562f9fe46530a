use switchboard_core::{Envelope, SignalMessage, UserId};

use crate::integration::init_tracing;
use crate::utils::{TestClient, TestServer};

fn username(name: &str) -> Envelope {
    Envelope::new(SignalMessage::Username {
        name: name.into(),
        id: None,
    })
}

#[tokio::test]
async fn test_username_collision_and_userlist() {
    init_tracing();

    let server = TestServer::start().await.expect("Failed to start server");
    let mut first = TestClient::connect(&server.url()).await.expect("connect first");
    let mut second = TestClient::connect(&server.url()).await.expect("connect second");

    first.send(username("carol")).await.expect("first username");
    let list = first.recv_kind("userlist").await.expect("userlist");
    assert_eq!(list.body, SignalMessage::UserList { users: vec!["carol".into()] });

    second.send(username("carol")).await.expect("second username");
    let rejected = second.recv_kind("rejectusername").await.expect("rejectusername");
    assert_eq!(rejected.body, SignalMessage::RejectUsername { name: "carol-1".into() });

    let list = first
        .recv_matching(|e| matches!(&e.body, SignalMessage::UserList { users } if users.len() == 2))
        .await
        .expect("updated userlist");
    assert_eq!(
        list.body,
        SignalMessage::UserList {
            users: vec!["carol".into(), "carol-1".into()],
        }
    );

    // Lobby routing resolves display names.
    first
        .send(Envelope::new(SignalMessage::Chat { message: "psst".into() }).to_user(UserId::from("carol-1")))
        .await
        .expect("send chat");
    let chat = second.recv_kind("chat").await.expect("chat by name");
    assert_eq!(chat.sender, Some(first.assigned_id.clone()));
    assert_eq!(chat.target, Some(second.assigned_id.clone()));

    second.close().await.expect("close second");
    let list = first
        .recv_matching(|e| matches!(&e.body, SignalMessage::UserList { users } if users.len() == 1))
        .await
        .expect("userlist after disconnect");
    assert_eq!(list.body, SignalMessage::UserList { users: vec!["carol".into()] });
}
