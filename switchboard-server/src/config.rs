use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use switchboard_core::utils::{DEFAULT_HOST, DEFAULT_PORT};

/// What to do when a client asks for an identity another connection holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Refuse the join with `join-rejected`.
    #[default]
    Reject,
    /// Hand out `<requested>-<n>` instead and report it in `join-success`.
    Rename,
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "rename" => Ok(Self::Rename),
            other => Err(format!(
                "unknown duplicate policy `{other}` (expected `reject` or `rename`)"
            )),
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => write!(f, "reject"),
            Self::Rename => write!(f, "rename"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub duplicate_policy: DuplicatePolicy,
}

impl RelayConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}
