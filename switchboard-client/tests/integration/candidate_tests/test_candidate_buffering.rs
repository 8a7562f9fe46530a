use switchboard_client::{CandidatePolicy, NegotiationConfig, NegotiationState};
use switchboard_core::{Descriptor, SignalMessage};

use crate::integration::init_tracing;
use crate::utils::{CapabilityCall, TestPeer, candidate, from_peer};

fn remote_candidate(line: Option<&str>) -> switchboard_core::Envelope {
    from_peer(
        "alice",
        SignalMessage::NewIceCandidate {
            candidate: line.map(candidate),
        },
    )
}

fn remote_offer() -> switchboard_core::Envelope {
    from_peer(
        "alice",
        SignalMessage::VideoOffer {
            name: "alice".into(),
            sdp: Descriptor::offer("v=0 alice"),
        },
    )
}

#[tokio::test]
async fn test_early_candidates_flushed_in_order() {
    init_tracing();

    let mut bob = TestPeer::spawn("bob", "alice", NegotiationConfig::default());

    for line in [Some("candidate:1"), Some("candidate:2"), None] {
        bob.engine.handle_envelope(remote_candidate(line)).expect("candidate");
    }
    bob.engine.handle_envelope(remote_offer()).expect("offer");
    bob.engine
        .handle_envelope(remote_candidate(Some("candidate:3")))
        .expect("late candidate");

    bob.next_outbound_kind("video-answer").await.expect("answer");
    bob.drain_outbound().await;

    let calls = bob.capability.calls();
    let offer_at = calls
        .iter()
        .position(|c| matches!(c, CapabilityCall::ApplyRemote(_)))
        .expect("offer applied");
    let first_candidate_at = calls
        .iter()
        .position(|c| matches!(c, CapabilityCall::AddCandidate(_)))
        .expect("candidates applied");
    assert!(offer_at < first_candidate_at, "Nothing is applied before the descriptor");

    assert_eq!(
        bob.capability.added_candidates(),
        vec![
            Some(candidate("candidate:1")),
            Some(candidate("candidate:2")),
            None,
            Some(candidate("candidate:3")),
        ]
    );
    assert_eq!(bob.engine.state(), NegotiationState::Stable);
}

#[tokio::test]
async fn test_drop_policy_discards_early_candidates() {
    init_tracing();

    let config = NegotiationConfig {
        candidate_policy: CandidatePolicy::Drop,
        ..NegotiationConfig::default()
    };
    let mut bob = TestPeer::spawn("bob", "alice", config);

    bob.engine
        .handle_envelope(remote_candidate(Some("candidate:early")))
        .expect("candidate");
    bob.engine.handle_envelope(remote_offer()).expect("offer");
    bob.engine
        .handle_envelope(remote_candidate(Some("candidate:late")))
        .expect("late candidate");

    bob.next_outbound_kind("video-answer").await.expect("answer");
    bob.drain_outbound().await;

    assert_eq!(
        bob.capability.added_candidates(),
        vec![Some(candidate("candidate:late"))]
    );
}

#[tokio::test]
async fn test_stale_candidate_is_not_fatal() {
    init_tracing();

    let mut bob = TestPeer::spawn("bob", "alice", NegotiationConfig::default());
    bob.engine.handle_envelope(remote_offer()).expect("offer");
    bob.next_outbound_kind("video-answer").await.expect("answer");

    bob.engine
        .handle_envelope(remote_candidate(Some("candidate:stale")))
        .expect("stale candidate");
    bob.engine
        .handle_envelope(remote_candidate(Some("candidate:fresh")))
        .expect("fresh candidate");
    bob.drain_outbound().await;

    assert_eq!(bob.capability.added_candidates().len(), 2);
    assert_eq!(bob.engine.state(), NegotiationState::Stable);
    assert!(bob.statuses().iter().all(|s| !matches!(s, switchboard_client::SessionStatus::Failed(_))));
}
