mod connection;
mod session_registry;

pub use connection::*;
pub use session_registry::*;
