use crate::error::RelayError;
use crate::room::{LeaveOutcome, Room, RoomCommand};
use crate::signaling::SignalingOutput;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use switchboard_core::{Envelope, RoomId, UserId};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

const ROOM_QUEUE_CAPACITY: usize = 100;

#[derive(Clone)]
struct RoomHandle {
    generation: u64,
    tx: mpsc::Sender<RoomCommand>,
}

/// Index of live room actors. Rooms are spawned on first join and removed
/// once they report empty; independent rooms never share a lock beyond the
/// map shard lookup.
#[derive(Clone)]
pub struct RoomManager {
    rooms: Arc<DashMap<RoomId, RoomHandle>>,
    generations: Arc<AtomicU64>,
    signaling: Arc<dyn SignalingOutput>,
}

impl RoomManager {
    pub fn new(signaling: Arc<dyn SignalingOutput>) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            generations: Arc::new(AtomicU64::new(0)),
            signaling,
        }
    }

    fn get_or_create(&self, room_id: &RoomId) -> RoomHandle {
        if let Some(handle) = self.rooms.get(room_id) {
            return handle.clone();
        }

        self.rooms
            .entry(room_id.clone())
            .or_insert_with(|| {
                info!("Creating new room: {}", room_id);
                let (tx, rx) = mpsc::channel(ROOM_QUEUE_CAPACITY);
                let generation = self.generations.fetch_add(1, Ordering::Relaxed);

                let room = Room::new(room_id.clone(), rx, self.signaling.clone());
                let rooms = self.rooms.clone();
                let id = room_id.clone();
                tokio::spawn(async move {
                    room.run().await;
                    rooms.remove_if(&id, |_, h| h.generation == generation);
                });

                RoomHandle { generation, tx }
            })
            .clone()
    }

    fn get(&self, room_id: &RoomId) -> Option<RoomHandle> {
        self.rooms.get(room_id).map(|h| h.clone())
    }

    fn forget(&self, room_id: &RoomId, generation: u64) {
        if self
            .rooms
            .remove_if(room_id, |_, h| h.generation == generation)
            .is_some()
        {
            debug!("Room {} removed from index", room_id);
        }
    }

    /// Adds `user_id` to the room, creating it if needed. Returns the members
    /// that were present before.
    pub async fn join(&self, room_id: &RoomId, user_id: &UserId) -> Result<Vec<UserId>, RelayError> {
        loop {
            let handle = self.get_or_create(room_id);
            let (reply, reply_rx) = oneshot::channel();
            let cmd = RoomCommand::Join {
                user_id: user_id.clone(),
                reply,
            };

            if handle.tx.send(cmd).await.is_err() {
                // The room emptied and shut down between lookup and send.
                self.forget(room_id, handle.generation);
                continue;
            }

            match reply_rx.await {
                Ok(result) => return result,
                Err(_) => {
                    self.forget(room_id, handle.generation);
                    continue;
                }
            }
        }
    }

    /// Removes `user_id` from the room. A no-op for unknown rooms or
    /// non-members.
    pub async fn leave(&self, room_id: &RoomId, user_id: &UserId) -> LeaveOutcome {
        let gone = LeaveOutcome {
            was_member: false,
            remaining: 0,
        };
        let Some(handle) = self.get(room_id) else {
            return gone;
        };

        let (reply, reply_rx) = oneshot::channel();
        let cmd = RoomCommand::Leave {
            user_id: user_id.clone(),
            reply: Some(reply),
        };
        if handle.tx.send(cmd).await.is_err() {
            self.forget(room_id, handle.generation);
            return gone;
        }

        let outcome = reply_rx.await.unwrap_or(gone);
        if outcome.remaining == 0 {
            self.forget(room_id, handle.generation);
        }
        outcome
    }

    pub async fn relay(&self, room_id: &RoomId, envelope: Envelope) {
        let Some(handle) = self.get(room_id) else {
            warn!("Dropping `{}` for unknown room {}", envelope.kind(), room_id);
            return;
        };
        if handle.tx.send(RoomCommand::Relay { envelope }).await.is_err() {
            warn!("Room {} closed before relaying", room_id);
        }
    }

    pub async fn members(&self, room_id: &RoomId) -> Vec<UserId> {
        let Some(handle) = self.get(room_id) else {
            return Vec::new();
        };
        let (reply, reply_rx) = oneshot::channel();
        if handle.tx.send(RoomCommand::Members { reply }).await.is_err() {
            return Vec::new();
        }
        reply_rx.await.unwrap_or_default()
    }

    pub fn contains_room(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
