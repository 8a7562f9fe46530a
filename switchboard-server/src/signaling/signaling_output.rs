use async_trait::async_trait;
use switchboard_core::{Envelope, UserId};

/// Delivery side of the relay. Rooms push envelopes through this without
/// knowing how users are connected.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Hands `envelope` to one connected user. Returns false when the user is
    /// gone; the message is dropped, never queued.
    async fn deliver(&self, user_id: &UserId, envelope: Envelope) -> bool;
}
