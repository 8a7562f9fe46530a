use crate::config::DuplicatePolicy;
use crate::error::RelayError;
use crate::registry::connection::ConnectionId;
use crate::signaling::SignalingOutput;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use switchboard_core::{Envelope, UserId};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

struct UserEntry {
    connection: ConnectionId,
    display_name: Option<String>,
    tx: mpsc::UnboundedSender<Envelope>,
}

/// Directory of connected users: identity -> delivery handle, plus the
/// display-name index used by the lobby protocol.
///
/// Owned by the server process and shared by handle; nothing here survives a
/// restart.
#[derive(Default)]
pub struct SessionRegistry {
    users: DashMap<UserId, UserEntry>,
    names: DashMap<String, UserId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fresh connection under a server-generated identity.
    pub fn register(
        &self,
        connection: ConnectionId,
        tx: mpsc::UnboundedSender<Envelope>,
    ) -> UserId {
        loop {
            let user_id = UserId::generate();
            if let Entry::Vacant(slot) = self.users.entry(user_id.clone()) {
                slot.insert(UserEntry {
                    connection,
                    display_name: None,
                    tx,
                });
                debug!("Registered {} as {}", connection, user_id);
                return user_id;
            }
        }
    }

    /// Moves `connection` from `current` to the identity it asked for.
    ///
    /// Fails with `DuplicateIdentity` when another connection holds
    /// `requested`, unless the policy allows picking `<requested>-<n>`.
    pub fn claim(
        &self,
        connection: ConnectionId,
        current: &UserId,
        requested: &UserId,
        policy: DuplicatePolicy,
    ) -> Result<UserId, RelayError> {
        if current == requested {
            return Ok(current.clone());
        }

        let Some((_, entry)) = self
            .users
            .remove_if(current, |_, e| e.connection == connection)
        else {
            return Err(RelayError::TransportClosed(current.clone()));
        };

        let (user_id, entry) = match self.insert_vacant(requested.clone(), entry) {
            Ok(()) => (requested.clone(), None),
            Err(entry) => match policy {
                DuplicatePolicy::Reject => (requested.clone(), Some(entry)),
                DuplicatePolicy::Rename => {
                    let mut entry = entry;
                    let mut n = 1;
                    loop {
                        let candidate = UserId::new(format!("{requested}-{n}"));
                        match self.insert_vacant(candidate.clone(), entry) {
                            Ok(()) => break (candidate, None),
                            Err(back) => entry = back,
                        }
                        n += 1;
                    }
                }
            },
        };

        if let Some(entry) = entry {
            self.users.insert(current.clone(), entry);
            warn!(
                "{} asked for identity `{}` which is already active",
                connection, requested
            );
            return Err(RelayError::DuplicateIdentity(requested.clone()));
        }

        let display_name = self
            .users
            .get(&user_id)
            .and_then(|e| e.display_name.clone());
        if let Some(name) = display_name {
            self.names.insert(name, user_id.clone());
        }

        info!("{} is now known as `{}` (was `{}`)", connection, user_id, current);
        Ok(user_id)
    }

    fn insert_vacant(&self, user_id: UserId, entry: UserEntry) -> Result<(), UserEntry> {
        match self.users.entry(user_id) {
            Entry::Vacant(slot) => {
                slot.insert(entry);
                Ok(())
            }
            Entry::Occupied(_) => Err(entry),
        }
    }

    /// Drops the user if it still belongs to `connection`. Returns whether the
    /// user had a display name, so the caller knows to refresh the user list.
    pub fn unregister(&self, user_id: &UserId, connection: ConnectionId) -> bool {
        let Some((_, entry)) = self
            .users
            .remove_if(user_id, |_, e| e.connection == connection)
        else {
            return false;
        };

        debug!("Unregistered {} ({})", user_id, connection);
        match entry.display_name {
            Some(name) => {
                self.names.remove_if(&name, |_, owner| owner == user_id);
                true
            }
            None => false,
        }
    }

    /// Sets the display name, appending `-<n>` while the name is taken by
    /// someone else. Returns the name actually assigned and whether it differs
    /// from the one requested.
    pub fn set_display_name(&self, user_id: &UserId, requested: &str) -> Option<(String, bool)> {
        let previous = self.users.get(user_id)?.display_name.clone();
        if previous.as_deref() == Some(requested) {
            return Some((requested.to_owned(), false));
        }

        let mut assigned = requested.to_owned();
        let mut n = 1;
        loop {
            match self.names.entry(assigned.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(user_id.clone());
                    break;
                }
                Entry::Occupied(_) => {
                    assigned = format!("{requested}-{n}");
                    n += 1;
                }
            }
        }

        if let Some(old) = previous {
            self.names.remove_if(&old, |_, owner| owner == user_id);
        }

        match self.users.get_mut(user_id) {
            Some(mut entry) => entry.display_name = Some(assigned.clone()),
            None => {
                // Disconnected while we were picking a name.
                self.names.remove(&assigned);
                return None;
            }
        }

        let renamed = assigned != requested;
        Some((assigned, renamed))
    }

    pub fn display_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.names.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Resolves a message target given either as an identity or a display name.
    pub fn resolve(&self, target: &UserId) -> Option<UserId> {
        if self.users.contains_key(target) {
            return Some(target.clone());
        }
        self.names.get(target.as_str()).map(|e| e.value().clone())
    }

    pub fn is_connected(&self, user_id: &UserId) -> bool {
        self.users.contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Best-effort delivery. A missing or closed user drops the message.
    pub fn send(&self, user_id: &UserId, envelope: Envelope) -> bool {
        let Some(user) = self.users.get(user_id) else {
            warn!(
                "Attempted to send `{}` to disconnected user {}",
                envelope.kind(),
                user_id
            );
            return false;
        };

        if user.tx.send(envelope).is_err() {
            warn!("Outbound queue for {} is closed", user_id);
            return false;
        }
        true
    }

    /// Sends to every registered user except `except`.
    pub fn broadcast(&self, envelope: &Envelope, except: Option<&UserId>) {
        let recipients: Vec<UserId> = self
            .users
            .iter()
            .map(|e| e.key().clone())
            .filter(|id| Some(id) != except)
            .collect();

        for user_id in recipients {
            self.send(&user_id, envelope.clone());
        }
    }
}

#[async_trait]
impl SignalingOutput for SessionRegistry {
    async fn deliver(&self, user_id: &UserId, envelope: Envelope) -> bool {
        self.send(user_id, envelope)
    }
}
