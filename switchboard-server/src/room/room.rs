use crate::error::RelayError;
use crate::room::room_command::{LeaveOutcome, RoomCommand};
use crate::signaling::SignalingOutput;
use std::collections::BTreeSet;
use std::sync::Arc;
use switchboard_core::{Envelope, RoomId, SignalMessage, UserId};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// One room's actor. Membership changes and the broadcasts announcing them
/// happen inside a single command, so concurrent joins and leaves on the
/// same room are serialized. The actor exits as soon as the room is empty.
pub struct Room {
    id: RoomId,
    members: BTreeSet<UserId>,
    command_rx: mpsc::Receiver<RoomCommand>,
    signaling: Arc<dyn SignalingOutput>,
}

impl Room {
    pub fn new(
        id: RoomId,
        command_rx: mpsc::Receiver<RoomCommand>,
        signaling: Arc<dyn SignalingOutput>,
    ) -> Self {
        Self {
            id,
            members: BTreeSet::new(),
            command_rx,
            signaling,
        }
    }

    pub async fn run(mut self) {
        info!("Room {} event loop started", self.id);

        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd).await;

            if self.members.is_empty() {
                info!("Room {} is empty. Shutting down room.", self.id);
                break;
            }
        }

        // Commands still queued are dropped with the receiver; joiners see
        // their reply channel close and retry on a fresh room.
        info!("Room {} event loop finished", self.id);
    }

    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join { user_id, reply } => {
                let result = self.join(user_id).await;
                let _ = reply.send(result);
            }

            RoomCommand::Leave { user_id, reply } => {
                let outcome = self.leave(&user_id).await;
                if let Some(reply) = reply {
                    let _ = reply.send(outcome);
                }
            }

            RoomCommand::Relay { envelope } => self.relay(envelope).await,

            RoomCommand::Members { reply } => {
                let _ = reply.send(self.members.iter().cloned().collect());
            }
        }
    }

    async fn join(&mut self, user_id: UserId) -> Result<Vec<UserId>, RelayError> {
        if self.members.contains(&user_id) {
            warn!("{} is already a member of room {}", user_id, self.id);
            return Err(RelayError::DuplicateIdentity(user_id));
        }

        let existing: Vec<UserId> = self.members.iter().cloned().collect();
        self.members.insert(user_id.clone());
        info!(
            "User {} joined room {} ({} members)",
            user_id,
            self.id,
            self.members.len()
        );

        let success = Envelope::new(SignalMessage::JoinSuccess {
            user_id: user_id.clone(),
            members: existing.clone(),
        })
        .in_room(self.id.clone());
        self.signaling.deliver(&user_id, success).await;

        let joined = Envelope::new(SignalMessage::UserJoined {
            user_id: user_id.clone(),
        })
        .in_room(self.id.clone());
        self.broadcast(&joined, Some(&user_id)).await;

        Ok(existing)
    }

    async fn leave(&mut self, user_id: &UserId) -> LeaveOutcome {
        let was_member = self.members.remove(user_id);

        if was_member {
            info!(
                "User {} left room {} ({} members)",
                user_id,
                self.id,
                self.members.len()
            );
            let left = Envelope::new(SignalMessage::UserLeft {
                user_id: user_id.clone(),
            })
            .in_room(self.id.clone());
            self.broadcast(&left, Some(user_id)).await;
        } else {
            debug!("Leave for non-member {} in room {} ignored", user_id, self.id);
        }

        LeaveOutcome {
            was_member,
            remaining: self.members.len(),
        }
    }

    async fn relay(&self, envelope: Envelope) {
        let Some(sender) = envelope.sender.clone() else {
            warn!("Dropping `{}` without sender in room {}", envelope.kind(), self.id);
            return;
        };
        if !self.members.contains(&sender) {
            warn!(
                "Dropping `{}` from {}: not a member of room {}",
                envelope.kind(),
                sender,
                self.id
            );
            return;
        }

        match envelope.target.clone() {
            Some(target) if target == sender => {
                debug!("Dropping `{}` that {} addressed to itself", envelope.kind(), sender);
            }
            Some(target) if self.members.contains(&target) => {
                if !self.signaling.deliver(&target, envelope).await {
                    warn!("Target {} in room {} is unreachable", target, self.id);
                }
            }
            Some(target) => {
                warn!(
                    "Dropping `{}` from {}: target {} is not in room {}",
                    envelope.kind(),
                    sender,
                    target,
                    self.id
                );
            }
            None => self.broadcast(&envelope, Some(&sender)).await,
        }
    }

    async fn broadcast(&self, envelope: &Envelope, except: Option<&UserId>) {
        for member in &self.members {
            if Some(member) == except {
                continue;
            }
            self.signaling.deliver(member, envelope.clone()).await;
        }
    }
}
