use crate::engine::{NegotiationState, PeerSession};
use crate::error::NegotiationError;
use switchboard_core::Descriptor;
use tracing::info;

impl PeerSession {
    pub(super) async fn handle_remote_answer(
        &mut self,
        answer: Descriptor,
    ) -> Result<(), NegotiationError> {
        if self.state != NegotiationState::HaveLocalOffer {
            return Err(NegotiationError::StateConflict {
                kind: "video-answer",
                state: self.state,
            });
        }

        self.capability.apply_remote_descriptor(&answer).await?;
        self.remote_descriptor_applied = true;
        self.ignore_offer = false;
        self.set_state(NegotiationState::Stable);
        info!("Answer from {} applied", self.remote);

        self.flush_pending_candidates().await;
        Ok(())
    }
}
