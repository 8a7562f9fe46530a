mod envelope;
mod room;
mod signaling;
mod user;

pub use envelope::Envelope;
pub use room::RoomId;
pub use signaling::{Descriptor, DescriptorKind, IceCandidate, IceServerConfig, SignalMessage};
pub use user::UserId;
