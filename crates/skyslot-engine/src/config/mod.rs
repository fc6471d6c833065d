pub mod loader;
pub mod schema;
pub mod secrets;

pub use loader::{ConfigError, ConfigLoader, parse_utc_offset, validate};
pub use schema::*;
pub use secrets::{CloudinaryCredentials, Secrets};
