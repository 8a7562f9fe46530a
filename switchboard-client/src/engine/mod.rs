use crate::capability::{Capability, ConnectivityState};
use crate::config::NegotiationConfig;
use crate::error::{EngineError, NegotiationError};
use crate::role::{Role, role_for};
use std::fmt;
use std::sync::Arc;
use switchboard_core::{Envelope, IceCandidate, SignalMessage, UserId};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

mod candidate_impl;
mod connectivity_impl;
mod local_offer_impl;
mod remote_answer_impl;
mod remote_offer_impl;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    /// Terminal.
    Closed,
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NegotiationState::Stable => "stable",
            NegotiationState::HaveLocalOffer => "have-local-offer",
            NegotiationState::HaveRemoteOffer => "have-remote-offer",
            NegotiationState::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

/// What the owner of a session hears about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Negotiating,
    Connected,
    Reconnecting { attempt: u32 },
    /// A negotiation step failed. The session stays open.
    Failed(String),
    /// The session is closed for good.
    CallEnded(String),
}

pub type StatusCallback = Arc<dyn Fn(&UserId, SessionStatus) + Send + Sync>;

#[derive(Debug)]
pub(crate) enum EngineInput {
    Envelope(Envelope),
    Negotiate,
    LocalCandidate(Option<IceCandidate>),
    Connectivity(ConnectivityState),
    RetryConnectivity,
    HangUp,
}

/// Handle to one peer session. The session itself runs as a task that
/// processes envelopes, local intents and capability events one at a time, in
/// arrival order.
///
/// Dropping the handle closes the session.
pub struct NegotiationEngine {
    remote: UserId,
    role: Role,
    input_tx: mpsc::UnboundedSender<EngineInput>,
    state_rx: watch::Receiver<NegotiationState>,
    cancel_tx: watch::Sender<bool>,
}

impl NegotiationEngine {
    pub fn spawn(
        local: UserId,
        remote: UserId,
        capability: Arc<dyn Capability>,
        outbound: mpsc::UnboundedSender<Envelope>,
        status: StatusCallback,
        config: NegotiationConfig,
    ) -> Self {
        let role = role_for(config.role_strategy, &local, &remote);
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(NegotiationState::Stable);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let tx = input_tx.clone();
        capability.on_candidate_discovered(Box::new(move |candidate| {
            let _ = tx.send(EngineInput::LocalCandidate(candidate));
        }));
        let tx = input_tx.clone();
        capability.on_connectivity_state_changed(Box::new(move |state| {
            let _ = tx.send(EngineInput::Connectivity(state));
        }));

        info!("Session {} -> {} started ({})", local, remote, role);

        let session = PeerSession {
            local,
            remote: remote.clone(),
            role,
            config,
            capability,
            outbound,
            status,
            input_tx: input_tx.downgrade(),
            state: NegotiationState::Stable,
            state_tx,
            making_offer: false,
            ignore_offer: false,
            remote_descriptor_applied: false,
            pending_candidates: Vec::new(),
            restart_attempts: 0,
            retry_scheduled: false,
        };
        tokio::spawn(session.run(input_rx, cancel_rx));

        Self {
            remote,
            role,
            input_tx,
            state_rx,
            cancel_tx,
        }
    }

    /// Queues an envelope from the remote peer (or a room notice about it).
    pub fn handle_envelope(&self, envelope: Envelope) -> Result<(), EngineError> {
        if let Some(sender) = &envelope.sender {
            if sender != &self.remote {
                return Err(EngineError::WrongPeer {
                    sender: sender.clone(),
                    remote: self.remote.clone(),
                });
            }
        }
        self.submit(EngineInput::Envelope(envelope))
    }

    /// Local intent to (re)negotiate: call start, or a track added/removed.
    pub fn request_negotiation(&self) -> Result<(), EngineError> {
        self.submit(EngineInput::Negotiate)
    }

    /// Tells the remote peer and closes the session.
    pub fn hang_up(&self) -> Result<(), EngineError> {
        self.submit(EngineInput::HangUp)
    }

    /// Closes the session, abandoning any capability call in flight, and
    /// waits for the teardown to finish.
    pub async fn close(&self) {
        self.cancel_tx.send_replace(true);
        self.closed().await;
    }

    /// Resolves once the session reaches `closed`.
    pub async fn closed(&self) {
        let mut state_rx = self.state_rx.clone();
        let _ = state_rx
            .wait_for(|s| *s == NegotiationState::Closed)
            .await;
    }

    pub fn state(&self) -> NegotiationState {
        *self.state_rx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<NegotiationState> {
        self.state_rx.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state() == NegotiationState::Closed || *self.cancel_tx.borrow()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn remote(&self) -> &UserId {
        &self.remote
    }

    fn submit(&self, input: EngineInput) -> Result<(), EngineError> {
        if self.is_closed() {
            return Err(EngineError::Closed(self.remote.clone()));
        }
        self.input_tx
            .send(input)
            .map_err(|_| EngineError::Closed(self.remote.clone()))
    }
}

/// Resolves when the owner asked to close or went away.
async fn cancelled(cancel_rx: &mut watch::Receiver<bool>) {
    loop {
        if *cancel_rx.borrow_and_update() {
            return;
        }
        if cancel_rx.changed().await.is_err() {
            return;
        }
    }
}

struct PeerSession {
    local: UserId,
    remote: UserId,
    role: Role,
    config: NegotiationConfig,
    capability: Arc<dyn Capability>,
    outbound: mpsc::UnboundedSender<Envelope>,
    status: StatusCallback,
    input_tx: mpsc::WeakUnboundedSender<EngineInput>,

    state: NegotiationState,
    state_tx: watch::Sender<NegotiationState>,
    making_offer: bool,
    ignore_offer: bool,
    remote_descriptor_applied: bool,
    pending_candidates: Vec<Option<IceCandidate>>,
    restart_attempts: u32,
    retry_scheduled: bool,
}

impl PeerSession {
    async fn run(
        mut self,
        mut input_rx: mpsc::UnboundedReceiver<EngineInput>,
        mut cancel_rx: watch::Receiver<bool>,
    ) {
        loop {
            let input = tokio::select! {
                biased;
                _ = cancelled(&mut cancel_rx) => break,
                input = input_rx.recv() => match input {
                    Some(input) => input,
                    None => break,
                },
            };

            // Dropping `process` on cancellation discards the pending
            // capability result; it never reaches the session state.
            tokio::select! {
                biased;
                _ = cancelled(&mut cancel_rx) => {
                    debug!("Session with {} cancelled mid-step", self.remote);
                    break;
                }
                _ = self.process(input) => {}
            }

            if self.state == NegotiationState::Closed {
                break;
            }
        }

        self.shutdown().await;
    }

    async fn process(&mut self, input: EngineInput) {
        let result = match input {
            EngineInput::Envelope(envelope) => self.handle_envelope(envelope).await,
            EngineInput::Negotiate => self.negotiate().await,
            EngineInput::LocalCandidate(candidate) => {
                self.send_local_candidate(candidate);
                Ok(())
            }
            EngineInput::Connectivity(state) => {
                self.handle_connectivity(state);
                Ok(())
            }
            EngineInput::RetryConnectivity => self.retry_connectivity().await,
            EngineInput::HangUp => {
                self.send(SignalMessage::HangUp {
                    name: self.config.local_name.clone(),
                });
                self.end_call("hung up");
                Ok(())
            }
        };

        if let Err(e) = result {
            self.report(e);
        }
    }

    async fn handle_envelope(&mut self, envelope: Envelope) -> Result<(), NegotiationError> {
        match envelope.body {
            SignalMessage::VideoOffer { sdp, .. } => self.handle_remote_offer(sdp).await,
            SignalMessage::VideoAnswer { sdp, .. } => self.handle_remote_answer(sdp).await,
            SignalMessage::NewIceCandidate { candidate } => {
                self.handle_remote_candidate(candidate).await
            }
            SignalMessage::HangUp { .. } => {
                self.end_call("remote hung up");
                Ok(())
            }
            SignalMessage::UserLeft { user_id } if user_id == self.remote => {
                self.end_call("peer left");
                Ok(())
            }
            other => {
                debug!("Session with {} ignores `{}`", self.remote, other.kind());
                Ok(())
            }
        }
    }

    fn report(&self, e: NegotiationError) {
        match e {
            NegotiationError::StaleCandidate(reason) => {
                debug!("Stale candidate from {}: {}", self.remote, reason);
            }
            NegotiationError::StateConflict { .. } => {
                warn!("Ignoring message from {}: {}", self.remote, e);
            }
            NegotiationError::ConnectivityFailure { .. } | NegotiationError::Capability(_) => {
                warn!("Session with {} failed a step: {}", self.remote, e);
                self.notify(SessionStatus::Failed(format!(
                    "Failed to establish connection with {}: {}",
                    self.remote, e
                )));
            }
        }
    }

    fn set_state(&mut self, state: NegotiationState) {
        if self.state != state {
            debug!("Session with {}: {} -> {}", self.remote, self.state, state);
        }
        self.state = state;
        self.state_tx.send_replace(state);
    }

    fn notify(&self, status: SessionStatus) {
        (self.status)(&self.remote, status);
    }

    fn send(&self, body: SignalMessage) {
        let envelope = Envelope::new(body)
            .from_user(self.local.clone())
            .to_user(self.remote.clone());
        if self.outbound.send(envelope).is_err() {
            warn!("Signaling channel closed, message to {} lost", self.remote);
        }
    }

    fn end_call(&mut self, reason: &str) {
        info!("Call with {} ended: {}", self.remote, reason);
        self.set_state(NegotiationState::Closed);
        self.notify(SessionStatus::CallEnded(reason.to_owned()));
    }

    async fn shutdown(&mut self) {
        self.pending_candidates.clear();
        self.capability.teardown().await;
        self.set_state(NegotiationState::Closed);
        info!("Session with {} closed", self.remote);
    }
}
