use crate::config::{DuplicatePolicy, RelayConfig};
use crate::error::RelayError;
use crate::registry::{Connection, ConnectionId, SessionRegistry};
use crate::room::RoomManager;
use std::sync::Arc;
use switchboard_core::{Envelope, ProtocolError, RoomId, SignalMessage, UserId};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

struct SignalingInner {
    registry: Arc<SessionRegistry>,
    rooms: RoomManager,
    config: RelayConfig,
    shutdown: watch::Sender<bool>,
}

/// The relay: validates inbound envelopes per connection and routes them
/// through the registry and the room actors.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl SignalingService {
    pub fn new(config: RelayConfig) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let rooms = RoomManager::new(registry.clone());
        let (shutdown, _) = watch::channel(false);

        Self {
            inner: Arc::new(SignalingInner {
                registry,
                rooms,
                config,
                shutdown,
            }),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.inner.registry
    }

    pub fn rooms(&self) -> &RoomManager {
        &self.inner.rooms
    }

    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    /// Registers a new transport and greets it with its assigned `id`.
    pub fn connect(&self, tx: mpsc::UnboundedSender<Envelope>) -> Arc<Connection> {
        let connection_id = ConnectionId::next();
        let user_id = self.inner.registry.register(connection_id, tx.clone());
        let connection = Arc::new(Connection::new(connection_id, user_id.clone(), tx));

        connection.send(Envelope::new(SignalMessage::Id { id: user_id }));
        connection
    }

    /// Decodes and dispatches one text frame. Bad frames are logged and
    /// dropped; the connection stays open.
    pub async fn handle_text(&self, connection: &Connection, text: &str) {
        match Envelope::decode(text) {
            Ok(envelope) => self.handle_envelope(connection, envelope).await,
            Err(ProtocolError::UnknownType(kind)) => {
                warn!("Unknown envelope type `{}` from {}, dropped", kind, connection.id());
            }
            Err(e) => warn!("Invalid envelope from {}: {}", connection.id(), e),
        }
    }

    pub async fn handle_envelope(&self, connection: &Connection, envelope: Envelope) {
        if connection.is_closed() {
            debug!("Ignoring `{}` on closed {}", envelope.kind(), connection.id());
            return;
        }

        if envelope.body.is_peer_message() {
            self.relay(connection, envelope).await;
            return;
        }

        match &envelope.body {
            SignalMessage::JoinRoom => {
                let Some(room_id) = envelope.room_id.clone() else {
                    let e = ProtocolError::MissingField {
                        kind: "join-room",
                        field: "roomId",
                    };
                    warn!("Invalid envelope from {}: {}", connection.id(), e);
                    return;
                };
                if let Err(e) = self.join(connection, room_id.clone(), envelope.sender.clone()).await {
                    connection.send(
                        Envelope::new(SignalMessage::JoinRejected {
                            reason: e.to_string(),
                        })
                        .in_room(room_id),
                    );
                }
            }

            SignalMessage::LeaveRoom => {
                self.leave(connection).await;
            }

            SignalMessage::Username { name, .. } => {
                let name = name.clone();
                self.set_username(connection, &name);
            }

            _ => {
                let e = ProtocolError::Unexpected {
                    kind: envelope.kind(),
                    reason: "server-to-client message sent by a client".to_owned(),
                };
                warn!("Dropping envelope from {}: {}", connection.id(), e);
            }
        }
    }

    /// Binds the connection to `requested` (if given) and enters `room_id`.
    /// A connection sits in at most one room; the current one is left only
    /// once the new join has succeeded, so a rejected join changes nothing.
    pub async fn join(
        &self,
        connection: &Connection,
        room_id: RoomId,
        requested: Option<UserId>,
    ) -> Result<UserId, RelayError> {
        if connection.room_id().as_ref() == Some(&room_id) {
            return Err(RelayError::DuplicateIdentity(
                requested.unwrap_or_else(|| connection.user_id()),
            ));
        }

        let current = connection.user_id();
        let user_id = match requested {
            Some(requested) => self.inner.registry.claim(
                connection.id(),
                &current,
                &requested,
                self.inner.config.duplicate_policy,
            )?,
            None => current.clone(),
        };

        if let Err(e) = self.inner.rooms.join(&room_id, &user_id).await {
            if user_id != current {
                self.release_claim(connection, &user_id, &current);
            }
            return Err(e);
        }

        if let Some(previous) = connection.take_room_id() {
            self.inner.rooms.leave(&previous, &current).await;
        }
        connection.set_user_id(user_id.clone());
        connection.set_room_id(Some(room_id));
        Ok(user_id)
    }

    /// Gives a freshly claimed identity back after a failed join.
    fn release_claim(&self, connection: &Connection, claimed: &UserId, previous: &UserId) {
        if let Err(e) = self.inner.registry.claim(
            connection.id(),
            claimed,
            previous,
            DuplicatePolicy::Reject,
        ) {
            warn!(
                "{} could not return to identity {}: {}",
                connection.id(),
                previous,
                e
            );
        }
    }

    /// Routes a peer message. Inside a room the room actor decides; in the
    /// lobby the target is resolved by identity or display name.
    pub async fn relay(&self, connection: &Connection, mut envelope: Envelope) {
        let sender = connection.user_id();
        envelope.sender = Some(sender.clone());

        if let Some(room_id) = connection.room_id() {
            if envelope.room_id.as_ref().is_some_and(|r| r != &room_id) {
                warn!(
                    "Dropping `{}` from {}: addressed to room {:?} but sender is in {}",
                    envelope.kind(),
                    sender,
                    envelope.room_id,
                    room_id
                );
                return;
            }
            envelope.room_id = Some(room_id.clone());
            self.inner.rooms.relay(&room_id, envelope).await;
            return;
        }

        match envelope.target.clone() {
            Some(target) => match self.inner.registry.resolve(&target) {
                Some(user_id) => {
                    envelope.target = Some(user_id.clone());
                    self.inner.registry.send(&user_id, envelope);
                }
                None => warn!(
                    "Dropping `{}` from {}: target {} is not connected",
                    envelope.kind(),
                    sender,
                    target
                ),
            },
            None if matches!(envelope.body, SignalMessage::Chat { .. }) => {
                self.inner.registry.broadcast(&envelope, Some(&sender));
            }
            None => warn!(
                "Dropping `{}` from {}: no target and not in a room",
                envelope.kind(),
                sender
            ),
        }
    }

    /// Leaves the current room, if any. Safe to call repeatedly.
    pub async fn leave(&self, connection: &Connection) -> bool {
        let Some(room_id) = connection.take_room_id() else {
            return false;
        };
        let user_id = connection.user_id();
        self.inner.rooms.leave(&room_id, &user_id).await.was_member
    }

    /// Transport-level close. Shares the leave path and runs once per
    /// connection regardless of how many times it is signalled.
    pub async fn connection_closed(&self, connection: &Connection) {
        if !connection.mark_closed() {
            return;
        }

        self.leave(connection).await;

        let user_id = connection.user_id();
        if self.inner.registry.unregister(&user_id, connection.id()) {
            self.broadcast_userlist();
        }
        info!("Connection {} ({}) closed", connection.id(), user_id);
    }

    fn set_username(&self, connection: &Connection, requested: &str) {
        let user_id = connection.user_id();
        let Some((assigned, renamed)) = self.inner.registry.set_display_name(&user_id, requested)
        else {
            return;
        };

        if renamed {
            info!("Display name `{}` taken, {} gets `{}`", requested, user_id, assigned);
            connection.send(Envelope::new(SignalMessage::RejectUsername { name: assigned }));
        }
        self.broadcast_userlist();
    }

    fn broadcast_userlist(&self) {
        let users = self.inner.registry.display_names();
        let envelope = Envelope::new(SignalMessage::UserList { users });
        self.inner.registry.broadcast(&envelope, None);
    }

    /// Tells every open connection to close.
    pub fn shutdown(&self) {
        self.inner.shutdown.send_replace(true);
    }

    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.inner.shutdown.subscribe()
    }
}
