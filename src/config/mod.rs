//! Configuration: JSON file, environment overrides, code defaults.
//!
//! - [`types`]: root `Config` struct
//! - [`server`]: connection and lifecycle tuning
//! - [`room`]: deployment defaults for per-room game options
//! - [`providers`]: outbound adapter endpoints and budgets
//! - [`logging`]: log level, format, optional file output
//! - [`loader`]: loading and override order
//! - [`validation`]: startup bounds checks

pub mod loader;
pub mod logging;
pub mod providers;
pub mod room;
pub mod server;
pub mod types;
pub mod validation;

pub use loader::load;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use providers::ProviderConfig;
pub use room::RoomDefaultsConfig;
pub use server::ServerConfig;
pub use types::Config;
pub use validation::validate;
