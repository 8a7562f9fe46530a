use crate::error::RelayError;
use switchboard_core::{Envelope, UserId};
use tokio::sync::oneshot;

/// Commands a room actor accepts. Everything that mutates or reads one
/// room's membership goes through its queue.
#[derive(Debug)]
pub enum RoomCommand {
    /// Add a member. Replies with the members that were already present.
    Join {
        user_id: UserId,
        reply: oneshot::Sender<Result<Vec<UserId>, RelayError>>,
    },

    /// Remove a member if present. Replies with the outcome.
    Leave {
        user_id: UserId,
        reply: Option<oneshot::Sender<LeaveOutcome>>,
    },

    /// Forward a peer message on behalf of `envelope.sender`.
    Relay { envelope: Envelope },

    /// Snapshot of the current membership.
    Members { reply: oneshot::Sender<Vec<UserId>> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub was_member: bool,
    pub remaining: usize,
}
