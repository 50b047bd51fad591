use serde::{Deserialize, Serialize};

/// Connection and lifecycle tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Expected client heartbeat cadence in seconds.
    pub heartbeat_interval_secs: u64,
    /// Consecutive missed heartbeats before a subscriber is closed.
    pub heartbeat_miss_allowance: u64,
    /// Per-subscriber outbound queue; a subscriber that falls this far
    /// behind is closed rather than allowed to slow the room.
    pub subscriber_queue_capacity: usize,
    /// Room actor inbound command queue.
    pub actor_queue_capacity: usize,
    /// Idle room lifetime in seconds, measured from last activity with no
    /// subscribers attached.
    pub room_ttl_secs: u64,
    /// Cadence of the registry eviction sweep in seconds.
    pub sweep_interval_secs: u64,
    /// Maximum accepted WebSocket frame size in bytes.
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 20,
            heartbeat_miss_allowance: 2,
            subscriber_queue_capacity: 64,
            actor_queue_capacity: 64,
            room_ttl_secs: 600,
            sweep_interval_secs: 60,
            max_message_size: 16 * 1024,
        }
    }
}
