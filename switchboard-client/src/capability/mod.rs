mod webrtc_capability;

pub use webrtc_capability::*;

use crate::error::CapabilityError;
use async_trait::async_trait;
use std::fmt;
use switchboard_core::{Descriptor, IceCandidate};

/// Transport connectivity as reported by the media engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    New,
    Checking,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectivityState::New => "new",
            ConnectivityState::Checking => "checking",
            ConnectivityState::Connected => "connected",
            ConnectivityState::Disconnected => "disconnected",
            ConnectivityState::Failed => "failed",
            ConnectivityState::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

/// Called for every locally discovered candidate; `None` is the end marker.
pub type CandidateCallback = Box<dyn Fn(Option<IceCandidate>) + Send + Sync>;

pub type ConnectivityCallback = Box<dyn Fn(ConnectivityState) + Send + Sync>;

/// The media engine a negotiation session drives. Descriptors and
/// candidates are opaque here; the engine only sequences the calls.
///
/// `apply_remote_descriptor` with an offer while a local offer is pending
/// must discard the local offer first (implicit rollback).
#[async_trait]
pub trait Capability: Send + Sync {
    async fn generate_offer(&self) -> Result<Descriptor, CapabilityError>;

    async fn generate_answer(&self) -> Result<Descriptor, CapabilityError>;

    async fn apply_local_descriptor(&self, descriptor: &Descriptor) -> Result<(), CapabilityError>;

    async fn apply_remote_descriptor(&self, descriptor: &Descriptor) -> Result<(), CapabilityError>;

    /// `None` signals the end of the remote candidate sequence.
    async fn add_candidate(&self, candidate: Option<&IceCandidate>) -> Result<(), CapabilityError>;

    fn on_candidate_discovered(&self, callback: CandidateCallback);

    fn on_connectivity_state_changed(&self, callback: ConnectivityCallback);

    /// Prepares an ICE restart; the next generated offer carries it.
    async fn restart_connectivity(&self) -> Result<(), CapabilityError>;

    async fn teardown(&self);
}
