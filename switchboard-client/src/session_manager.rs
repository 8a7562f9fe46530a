use crate::capability::{Capability, WebRtcCapability, WebRtcConfig};
use crate::config::NegotiationConfig;
use crate::engine::{NegotiationEngine, NegotiationState, StatusCallback};
use crate::error::{CapabilityError, EngineError};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use switchboard_core::{Envelope, SignalMessage, UserId};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Builds one capability per remote peer.
#[async_trait]
pub trait CapabilityFactory: Send + Sync {
    async fn create(&self, remote: &UserId) -> Result<Arc<dyn Capability>, CapabilityError>;
}

pub struct WebRtcCapabilityFactory {
    config: WebRtcConfig,
}

impl WebRtcCapabilityFactory {
    pub fn new(config: WebRtcConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl CapabilityFactory for WebRtcCapabilityFactory {
    async fn create(&self, _remote: &UserId) -> Result<Arc<dyn Capability>, CapabilityError> {
        Ok(Arc::new(WebRtcCapability::new(self.config.clone()).await?))
    }
}

/// All sessions of one local user, at most one per remote peer.
///
/// Feed it every envelope the relay delivers: offers from unknown peers open
/// a callee session, `user-joined` opens a caller session, and everything
/// else is routed by its stamped `sender`.
pub struct SessionManager {
    local: UserId,
    config: NegotiationConfig,
    factory: Arc<dyn CapabilityFactory>,
    outbound: mpsc::UnboundedSender<Envelope>,
    status: StatusCallback,
    sessions: DashMap<UserId, NegotiationEngine>,
}

impl SessionManager {
    pub fn new(
        local: UserId,
        config: NegotiationConfig,
        factory: Arc<dyn CapabilityFactory>,
        outbound: mpsc::UnboundedSender<Envelope>,
        status: StatusCallback,
    ) -> Self {
        Self {
            local,
            config,
            factory,
            outbound,
            status,
            sessions: DashMap::new(),
        }
    }

    pub fn local(&self) -> &UserId {
        &self.local
    }

    /// Starts (or renegotiates) a call with `remote`.
    pub async fn call(&self, remote: &UserId) -> Result<(), EngineError> {
        if remote == &self.local {
            warn!("Refusing to call ourselves ({})", remote);
            return Ok(());
        }

        self.reap();
        self.ensure_session(remote).await?;
        match self.sessions.get(remote) {
            Some(engine) => engine.request_negotiation(),
            None => Err(EngineError::Closed(remote.clone())),
        }
    }

    pub async fn handle_envelope(&self, envelope: Envelope) -> Result<(), EngineError> {
        self.reap();

        let remote = match &envelope.body {
            SignalMessage::UserJoined { user_id } => {
                if user_id != &self.local {
                    info!("{} joined, calling", user_id);
                    self.call(user_id).await?;
                }
                return Ok(());
            }
            SignalMessage::UserLeft { user_id } => user_id.clone(),
            body if body.is_peer_message() => match &envelope.sender {
                Some(sender) => sender.clone(),
                None => {
                    debug!("Dropping `{}` without sender", envelope.kind());
                    return Ok(());
                }
            },
            _ => return Ok(()),
        };

        if matches!(envelope.body, SignalMessage::VideoOffer { .. }) {
            self.ensure_session(&remote).await?;
        }
        self.forward(&remote, envelope)
    }

    pub fn hang_up(&self, remote: &UserId) -> Result<(), EngineError> {
        match self.sessions.get(remote) {
            Some(engine) => engine.hang_up(),
            None => Err(EngineError::Closed(remote.clone())),
        }
    }

    pub fn session_state(&self, remote: &UserId) -> Option<NegotiationState> {
        self.sessions.get(remote).map(|engine| engine.state())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Closes every session.
    pub async fn close_all(&self) {
        let remotes: Vec<UserId> = self.sessions.iter().map(|e| e.key().clone()).collect();
        for remote in remotes {
            if let Some((_, engine)) = self.sessions.remove(&remote) {
                engine.close().await;
            }
        }
    }

    fn forward(&self, remote: &UserId, envelope: Envelope) -> Result<(), EngineError> {
        match self.sessions.get(remote) {
            Some(engine) => engine.handle_envelope(envelope),
            None => {
                debug!("No session with {}, dropping `{}`", remote, envelope.kind());
                Ok(())
            }
        }
    }

    async fn ensure_session(&self, remote: &UserId) -> Result<(), EngineError> {
        if self.sessions.contains_key(remote) {
            return Ok(());
        }

        let capability = self.factory.create(remote).await?;
        let spare = match self.sessions.entry(remote.clone()) {
            Entry::Occupied(_) => Some(capability),
            Entry::Vacant(slot) => {
                slot.insert(NegotiationEngine::spawn(
                    self.local.clone(),
                    remote.clone(),
                    capability,
                    self.outbound.clone(),
                    self.status.clone(),
                    self.config.clone(),
                ));
                None
            }
        };

        if let Some(capability) = spare {
            capability.teardown().await;
        }
        Ok(())
    }

    fn reap(&self) {
        self.sessions.retain(|remote, engine| {
            let open = !engine.is_closed();
            if !open {
                debug!("Reaping closed session with {}", remote);
            }
            open
        });
    }
}
