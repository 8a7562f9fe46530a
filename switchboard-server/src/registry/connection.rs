use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use switchboard_core::{Envelope, RoomId, UserId};
use tokio::sync::mpsc;
use tracing::warn;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Transport-level handle, stable across identity changes of the user behind it.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

struct ConnectionState {
    user_id: UserId,
    room_id: Option<RoomId>,
}

/// Per-socket state owned by the WebSocket handler.
pub struct Connection {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Envelope>,
    state: Mutex<ConnectionState>,
    closed: AtomicBool,
}

impl Connection {
    pub(crate) fn new(
        id: ConnectionId,
        user_id: UserId,
        tx: mpsc::UnboundedSender<Envelope>,
    ) -> Self {
        Self {
            id,
            tx,
            state: Mutex::new(ConnectionState {
                user_id,
                room_id: None,
            }),
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.lock().user_id.clone()
    }

    pub fn room_id(&self) -> Option<RoomId> {
        self.lock().room_id.clone()
    }

    pub(crate) fn set_user_id(&self, user_id: UserId) {
        self.lock().user_id = user_id;
    }

    pub(crate) fn set_room_id(&self, room_id: Option<RoomId>) {
        self.lock().room_id = room_id;
    }

    /// Clears the room binding; only the first caller gets it back.
    pub(crate) fn take_room_id(&self) -> Option<RoomId> {
        self.lock().room_id.take()
    }

    /// Marks the connection closed. True exactly once.
    pub(crate) fn mark_closed(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn send(&self, envelope: Envelope) {
        if self.tx.send(envelope).is_err() {
            warn!("Outbound queue for {} is gone, message dropped", self.id);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ConnectionState> {
        // No cross-field invariant, so a poisoned guard is still consistent.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
