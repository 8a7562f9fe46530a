use crate::role::Role;
use std::time::Duration;

/// How the two ends of a session pick their collision roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoleStrategy {
    /// The lexicographically lower id is polite.
    #[default]
    LowerIdPolite,
    HigherIdPolite,
    /// Use this role regardless of ids. Both ends must be configured with
    /// opposite roles.
    Fixed(Role),
}

/// What to do with a remote candidate that arrives before the remote
/// descriptor has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CandidatePolicy {
    /// Keep it and apply it, in arrival order, right after the descriptor.
    #[default]
    Buffer,
    Drop,
}

#[derive(Debug, Clone)]
pub struct NegotiationConfig {
    /// Display name sent in the `name` field of offers, answers and hang-ups.
    pub local_name: String,
    pub role_strategy: RoleStrategy,
    pub candidate_policy: CandidatePolicy,
    /// Connectivity restarts attempted before the call is ended.
    pub restart_budget: u32,
    /// Pause between a connectivity failure and the restart.
    pub restart_delay: Duration,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            local_name: String::new(),
            role_strategy: RoleStrategy::default(),
            candidate_policy: CandidatePolicy::default(),
            restart_budget: 3,
            restart_delay: Duration::from_secs(1),
        }
    }
}
