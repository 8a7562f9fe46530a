use switchboard_core::{Envelope, SignalMessage, UserId};

use crate::integration::init_tracing;
use crate::utils::{TestClient, TestServer};

fn left_count(seen: &[Envelope], who: &str) -> usize {
    seen.iter()
        .filter(|e| matches!(&e.body, SignalMessage::UserLeft { user_id } if user_id.as_str() == who))
        .count()
}

#[tokio::test]
async fn test_leave_then_close_announces_once() {
    init_tracing();

    let server = TestServer::start().await.expect("Failed to start server");
    let mut alice = TestClient::connect(&server.url()).await.expect("connect alice");
    let mut bob = TestClient::connect(&server.url()).await.expect("connect bob");

    alice.join("r1", Some("alice")).await.expect("alice join");
    bob.join("r1", Some("bob")).await.expect("bob join");
    alice.recv_kind("user-joined").await.expect("user-joined");

    bob.send(Envelope::new(SignalMessage::LeaveRoom))
        .await
        .expect("leave");
    bob.send(Envelope::new(SignalMessage::LeaveRoom))
        .await
        .expect("second leave");
    bob.close().await.expect("close bob");

    let left = alice.recv_kind("user-left").await.expect("user-left");
    assert_eq!(left.body, SignalMessage::UserLeft { user_id: UserId::from("bob") });

    let rest = alice.drain().await.expect("alice still connected");
    assert_eq!(left_count(&rest, "bob"), 0, "Leave and close must announce once");
}

#[tokio::test]
async fn test_close_without_leave_announces_once() {
    init_tracing();

    let server = TestServer::start().await.expect("Failed to start server");
    let mut alice = TestClient::connect(&server.url()).await.expect("connect alice");
    let mut bob = TestClient::connect(&server.url()).await.expect("connect bob");

    alice.join("r1", Some("alice")).await.expect("alice join");
    bob.join("r1", Some("bob")).await.expect("bob join");
    alice.recv_kind("user-joined").await.expect("user-joined");

    bob.close().await.expect("close bob");

    alice.recv_kind("user-left").await.expect("user-left");
    let rest = alice.drain().await.expect("alice still connected");
    assert_eq!(left_count(&rest, "bob"), 0);

    let rooms = server.service.rooms();
    assert_eq!(rooms.members(&"r1".into()).await, vec![UserId::from("alice")]);
}
