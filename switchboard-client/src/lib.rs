pub mod capability;
pub mod config;
pub mod engine;
pub mod error;
pub mod role;
pub mod session_manager;

pub use capability::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use role::*;
pub use session_manager::*;
