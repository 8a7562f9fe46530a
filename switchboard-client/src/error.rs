use crate::engine::NegotiationState;
use switchboard_core::UserId;
use thiserror::Error;

/// Failures reported by a [`Capability`](crate::Capability).
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The candidate belongs to a descriptor that is no longer current.
    /// Never fatal.
    #[error("stale candidate: {0}")]
    StaleCandidate(String),

    #[error("{operation} failed: {reason}")]
    Operation {
        operation: &'static str,
        reason: String,
    },

    #[error("capability has been torn down")]
    Closed,
}

impl CapabilityError {
    pub fn operation(operation: &'static str, reason: impl ToString) -> Self {
        Self::Operation {
            operation,
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("`{kind}` is not valid in state {state}")]
    StateConflict {
        kind: &'static str,
        state: NegotiationState,
    },

    #[error("stale candidate: {0}")]
    StaleCandidate(String),

    #[error("connectivity lost after {attempts} restart attempts")]
    ConnectivityFailure { attempts: u32 },

    #[error(transparent)]
    Capability(CapabilityError),
}

impl From<CapabilityError> for NegotiationError {
    fn from(e: CapabilityError) -> Self {
        match e {
            CapabilityError::StaleCandidate(reason) => NegotiationError::StaleCandidate(reason),
            other => NegotiationError::Capability(other),
        }
    }
}

/// Errors returned to the owner of a session handle.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("session with `{0}` is closed")]
    Closed(UserId),

    #[error("envelope from `{sender}` does not belong to the session with `{remote}`")]
    WrongPeer { sender: UserId, remote: UserId },

    #[error(transparent)]
    Capability(#[from] CapabilityError),
}
