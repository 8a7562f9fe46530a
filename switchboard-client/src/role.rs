use crate::config::RoleStrategy;
use std::fmt;
use switchboard_core::UserId;

/// Collision-resolution role. The polite side yields its own pending offer
/// when both sides negotiate at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Polite,
    Impolite,
}

impl Role {
    pub fn is_polite(self) -> bool {
        self == Role::Polite
    }

    pub fn opposite(self) -> Role {
        match self {
            Role::Polite => Role::Impolite,
            Role::Impolite => Role::Polite,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Polite => write!(f, "polite"),
            Role::Impolite => write!(f, "impolite"),
        }
    }
}

/// Role of `local` towards `remote`. For the id-ordered strategies both ends
/// compute opposite roles from the same pair of ids without talking to each
/// other.
pub fn role_for(strategy: RoleStrategy, local: &UserId, remote: &UserId) -> Role {
    match strategy {
        RoleStrategy::LowerIdPolite if local <= remote => Role::Polite,
        RoleStrategy::LowerIdPolite => Role::Impolite,
        RoleStrategy::HigherIdPolite => role_for(RoleStrategy::LowerIdPolite, local, remote).opposite(),
        RoleStrategy::Fixed(role) => role,
    }
}
