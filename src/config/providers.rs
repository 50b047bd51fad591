use serde::{Deserialize, Serialize};

/// Outbound adapter endpoints. Either URL may be absent, in which case the
/// corresponding provider runs in degraded mode (empty suggestions, fallback
/// emoji) and the server stays fully playable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL of the global item store.
    pub item_store_url: Option<String>,
    /// Endpoint of the emoji lookup service.
    pub emoji_service_url: Option<String>,
    /// Process-wide daily cap on emoji lookups.
    pub emoji_daily_budget: u32,
    /// Outbound request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            item_store_url: None,
            emoji_service_url: None,
            emoji_daily_budget: 500,
            request_timeout_secs: 5,
        }
    }
}
