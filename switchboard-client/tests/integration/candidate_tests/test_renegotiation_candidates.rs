use switchboard_client::{NegotiationConfig, NegotiationState};
use switchboard_core::SignalMessage;

use crate::integration::init_tracing;
use crate::utils::{CapabilityCall, ENGINE_TIMEOUT_MS, TestPeer, candidate, from_peer, wait_until};

fn is_remote_descriptor(call: &CapabilityCall) -> bool {
    matches!(call, CapabilityCall::ApplyRemote(_))
}

#[tokio::test]
async fn test_renegotiation_buffers_candidates_until_new_answer() {
    init_tracing();

    let mut alice = TestPeer::spawn("alice", "bob", NegotiationConfig::default());
    let mut bob = TestPeer::spawn("bob", "alice", NegotiationConfig::default());

    alice.engine.request_negotiation().expect("intent");
    alice.deliver_to(&bob, "video-offer").await.expect("offer");
    bob.deliver_to(&alice, "video-answer").await.expect("answer");
    assert!(
        wait_until(ENGINE_TIMEOUT_MS, || alice.capability.count(is_remote_descriptor) == 1).await,
        "First answer applied"
    );

    // Second exchange: bob's candidate overtakes his answer.
    alice.engine.request_negotiation().expect("renegotiate");
    let offer = alice
        .next_outbound_kind("video-offer")
        .await
        .expect("second offer");
    alice
        .wait_state(NegotiationState::HaveLocalOffer)
        .await
        .expect("alice has second local offer");

    alice
        .engine
        .handle_envelope(from_peer(
            "bob",
            SignalMessage::NewIceCandidate {
                candidate: Some(candidate("candidate:renegotiated")),
            },
        ))
        .expect("early candidate");
    alice.drain_outbound().await;
    assert!(
        alice.capability.added_candidates().is_empty(),
        "Candidate waits for the answer of the current exchange"
    );

    bob.engine.handle_envelope(offer).expect("second offer");
    bob.deliver_to(&alice, "video-answer").await.expect("second answer");
    assert!(
        wait_until(ENGINE_TIMEOUT_MS, || alice.capability.added_candidates().len() == 1).await,
        "Buffered candidate flushed after the answer"
    );

    let calls = alice.capability.calls();
    let second_answer_at = calls
        .iter()
        .enumerate()
        .filter(|(_, c)| is_remote_descriptor(c))
        .nth(1)
        .map(|(i, _)| i)
        .expect("second answer applied");
    let candidate_at = calls
        .iter()
        .position(|c| matches!(c, CapabilityCall::AddCandidate(_)))
        .expect("candidate applied");
    assert!(second_answer_at < candidate_at);
    assert_eq!(alice.engine.state(), NegotiationState::Stable);
}
