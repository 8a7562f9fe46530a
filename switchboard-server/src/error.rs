use switchboard_core::{ProtocolError, RoomId, UserId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("identity `{0}` is already active")]
    DuplicateIdentity(UserId),

    #[error("user `{user_id}` is not a member of room `{room_id}`")]
    NotInRoom { user_id: UserId, room_id: RoomId },

    #[error("connection for `{0}` is closed")]
    TransportClosed(UserId),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
