use crate::config::CandidatePolicy;
use crate::engine::PeerSession;
use crate::error::NegotiationError;
use switchboard_core::{IceCandidate, SignalMessage};
use tracing::debug;

impl PeerSession {
    pub(super) async fn handle_remote_candidate(
        &mut self,
        candidate: Option<IceCandidate>,
    ) -> Result<(), NegotiationError> {
        if self.ignore_offer {
            debug!("Discarding candidate of ignored offer from {}", self.remote);
            return Ok(());
        }

        if !self.remote_descriptor_applied {
            match self.config.candidate_policy {
                CandidatePolicy::Buffer => {
                    debug!(
                        "Buffering early candidate from {} ({} pending)",
                        self.remote,
                        self.pending_candidates.len() + 1
                    );
                    self.pending_candidates.push(candidate);
                }
                CandidatePolicy::Drop => {
                    debug!("Dropping early candidate from {}", self.remote);
                }
            }
            return Ok(());
        }

        self.capability.add_candidate(candidate.as_ref()).await?;
        Ok(())
    }

    /// Applies buffered candidates in arrival order.
    pub(super) async fn flush_pending_candidates(&mut self) {
        if self.pending_candidates.is_empty() {
            return;
        }

        let pending = std::mem::take(&mut self.pending_candidates);
        debug!(
            "Applying {} buffered candidates from {}",
            pending.len(),
            self.remote
        );
        for candidate in pending {
            if let Err(e) = self.capability.add_candidate(candidate.as_ref()).await {
                debug!("Buffered candidate from {} rejected: {}", self.remote, e);
            }
        }
    }

    pub(super) fn send_local_candidate(&self, candidate: Option<IceCandidate>) {
        self.send(SignalMessage::NewIceCandidate { candidate });
    }
}
