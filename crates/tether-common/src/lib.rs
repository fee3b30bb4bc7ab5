pub mod errors;
pub mod id;

pub use errors::{ConfigError, TetherError};
pub use id::{new_id, ConnectionId};
