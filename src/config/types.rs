use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use super::providers::ProviderConfig;
use super::room::RoomDefaultsConfig;
use super::server::ServerConfig;

/// Root configuration, loadable from `config.json` with environment
/// overrides. Every field has a sensible default so an empty file (or no
/// file at all) yields a working server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// TCP port to bind.
    pub port: u16,
    /// Comma-separated allowed CORS origins, or "*" for permissive.
    pub cors_origins: String,
    pub server: ServerConfig,
    pub room: RoomDefaultsConfig,
    pub providers: ProviderConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3580,
            cors_origins: "*".to_string(),
            server: ServerConfig::default(),
            room: RoomDefaultsConfig::default(),
            providers: ProviderConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
