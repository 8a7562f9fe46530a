use switchboard_client::NegotiationConfig;
use switchboard_core::{SignalMessage, UserId};

use crate::integration::init_tracing;
use crate::utils::{TestPeer, candidate};

#[tokio::test]
async fn test_local_candidates_sent() {
    init_tracing();

    let mut alice = TestPeer::spawn("alice", "bob", NegotiationConfig::default());

    alice.capability.emit_candidate(Some(candidate("candidate:local-1")));
    alice.capability.emit_candidate(None);

    let first = alice.next_outbound().await.expect("first candidate");
    assert_eq!(first.target, Some(UserId::from("bob")));
    assert_eq!(first.sender, Some(UserId::from("alice")));
    assert_eq!(
        first.body,
        SignalMessage::NewIceCandidate {
            candidate: Some(candidate("candidate:local-1")),
        }
    );

    let end = alice.next_outbound().await.expect("end marker");
    assert_eq!(end.body, SignalMessage::NewIceCandidate { candidate: None });
}
