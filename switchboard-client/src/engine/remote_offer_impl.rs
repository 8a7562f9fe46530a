use crate::engine::{NegotiationState, PeerSession, SessionStatus};
use crate::error::{CapabilityError, NegotiationError};
use switchboard_core::{Descriptor, SignalMessage};
use tracing::info;

impl PeerSession {
    pub(super) async fn handle_remote_offer(
        &mut self,
        offer: Descriptor,
    ) -> Result<(), NegotiationError> {
        let collision = self.state != NegotiationState::Stable || self.making_offer;

        self.ignore_offer = !self.role.is_polite() && collision;
        if self.ignore_offer {
            info!(
                "Offer collision with {}: keeping our offer, remote offer ignored",
                self.remote
            );
            return Ok(());
        }
        if collision {
            info!(
                "Offer collision with {}: rolling back our offer",
                self.remote
            );
        }

        self.remote_descriptor_applied = false;
        self.capability.apply_remote_descriptor(&offer).await?;
        self.remote_descriptor_applied = true;
        self.set_state(NegotiationState::HaveRemoteOffer);
        self.notify(SessionStatus::Negotiating);
        self.flush_pending_candidates().await;

        // The remote offer is already applied; without an answer the session
        // cannot get back to `stable`.
        let answer = match self.create_local_answer().await {
            Ok(answer) => answer,
            Err(e) => {
                self.report(e.into());
                self.end_call("failed to answer");
                return Ok(());
            }
        };
        self.set_state(NegotiationState::Stable);

        info!("Sending answer to {}", self.remote);
        self.send(SignalMessage::VideoAnswer {
            name: self.config.local_name.clone(),
            sdp: answer,
        });
        Ok(())
    }

    async fn create_local_answer(&self) -> Result<Descriptor, CapabilityError> {
        let answer = self.capability.generate_answer().await?;
        self.capability.apply_local_descriptor(&answer).await?;
        Ok(answer)
    }
}
