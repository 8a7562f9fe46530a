use crate::engine::{NegotiationState, PeerSession, SessionStatus};
use crate::error::{CapabilityError, NegotiationError};
use switchboard_core::{Descriptor, SignalMessage};
use tracing::{debug, info};

impl PeerSession {
    /// Local intent. Only a `stable` session starts an offer; anything else
    /// is already mid-negotiation and the request is dropped.
    pub(super) async fn negotiate(&mut self) -> Result<(), NegotiationError> {
        if self.state != NegotiationState::Stable {
            debug!(
                "Negotiation with {} requested in state {}, skipping",
                self.remote, self.state
            );
            return Ok(());
        }

        self.making_offer = true;
        let result = self.create_local_offer().await;
        self.making_offer = false;
        let offer = result?;
        // Remote candidates from here on belong to the answer to this offer.
        self.remote_descriptor_applied = false;

        self.set_state(NegotiationState::HaveLocalOffer);
        self.notify(SessionStatus::Negotiating);
        info!("Sending offer to {}", self.remote);
        self.send(SignalMessage::VideoOffer {
            name: self.config.local_name.clone(),
            sdp: offer,
        });
        Ok(())
    }

    async fn create_local_offer(&self) -> Result<Descriptor, CapabilityError> {
        let offer = self.capability.generate_offer().await?;
        self.capability.apply_local_descriptor(&offer).await?;
        Ok(offer)
    }
}
