use crate::capability::ConnectivityState;
use crate::engine::{EngineInput, PeerSession, SessionStatus};
use crate::error::NegotiationError;
use tracing::{debug, info, warn};

impl PeerSession {
    pub(super) fn handle_connectivity(&mut self, state: ConnectivityState) {
        match state {
            ConnectivityState::Connected => {
                if self.restart_attempts > 0 {
                    info!(
                        "Connectivity with {} restored after {} restart(s)",
                        self.remote, self.restart_attempts
                    );
                }
                self.restart_attempts = 0;
                self.notify(SessionStatus::Connected);
            }
            ConnectivityState::Failed => self.connectivity_failed(),
            other => debug!("Connectivity with {}: {}", self.remote, other),
        }
    }

    fn connectivity_failed(&mut self) {
        if self.retry_scheduled {
            debug!("Restart with {} already scheduled", self.remote);
            return;
        }

        if self.restart_attempts >= self.config.restart_budget {
            let e = NegotiationError::ConnectivityFailure {
                attempts: self.restart_attempts,
            };
            warn!("Session with {}: {}", self.remote, e);
            self.end_call("connection lost");
            return;
        }

        self.restart_attempts += 1;
        self.retry_scheduled = true;
        self.notify(SessionStatus::Reconnecting {
            attempt: self.restart_attempts,
        });

        let delay = self.config.restart_delay;
        let input_tx = self.input_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tx) = input_tx.upgrade() {
                let _ = tx.send(EngineInput::RetryConnectivity);
            }
        });
    }

    pub(super) async fn retry_connectivity(&mut self) -> Result<(), NegotiationError> {
        self.retry_scheduled = false;
        info!(
            "Restarting connectivity with {} (attempt {}/{})",
            self.remote, self.restart_attempts, self.config.restart_budget
        );

        self.capability.restart_connectivity().await?;
        self.negotiate().await
    }
}
