use switchboard_client::{NegotiationConfig, NegotiationState};
use switchboard_core::SignalMessage;

use crate::integration::init_tracing;
use crate::utils::{TestPeer, candidate, from_peer};

#[tokio::test]
async fn test_ignored_offer_candidates_discarded() {
    init_tracing();

    let mut alice = TestPeer::spawn("alice", "bob", NegotiationConfig::default());
    let mut bob = TestPeer::spawn("bob", "alice", NegotiationConfig::default());

    alice.engine.request_negotiation().expect("alice intent");
    bob.engine.request_negotiation().expect("bob intent");
    alice
        .wait_state(NegotiationState::HaveLocalOffer)
        .await
        .expect("alice offering");
    bob.wait_state(NegotiationState::HaveLocalOffer)
        .await
        .expect("bob offering");

    // Impolite bob ignores alice's offer and the candidates that follow it.
    alice.deliver_to(&bob, "video-offer").await.expect("alice offer");
    bob.engine
        .handle_envelope(from_peer(
            "alice",
            SignalMessage::NewIceCandidate {
                candidate: Some(candidate("candidate:for-ignored-offer")),
            },
        ))
        .expect("candidate");

    bob.deliver_to(&alice, "video-offer").await.expect("bob offer");
    alice.deliver_to(&bob, "video-answer").await.expect("alice answer");
    bob.wait_state(NegotiationState::Stable).await.expect("bob stable");

    // Once the answer lands, candidates apply again.
    bob.engine
        .handle_envelope(from_peer(
            "alice",
            SignalMessage::NewIceCandidate {
                candidate: Some(candidate("candidate:after-answer")),
            },
        ))
        .expect("candidate");
    bob.drain_outbound().await;

    assert_eq!(
        bob.capability.added_candidates(),
        vec![Some(candidate("candidate:after-answer"))]
    );
}
