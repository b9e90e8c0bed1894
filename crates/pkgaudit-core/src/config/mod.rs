//! pkgaudit configuration layer
//!
//! All environment variable reads live here; the rest of the workspace goes
//! through the typed structs below instead of calling `std::env::var`.
//!
//! - `loader`: env_optional, env_flag, env_parse, `.env` loading
//! - `schema`: AuditConfig, ObservabilityConfig
//! - `env_keys`: key constants

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{env_flag, env_optional, env_parse, load_dotenv, load_dotenv_from_dir};
pub use schema::{AuditConfig, ObservabilityConfig};
