pub mod mock_capability;

pub use mock_capability::*;
pub use test_peer::*;
