use crate::protocol::validation::validate_options_patch;
use crate::protocol::RoomOptionsPatch;

use super::types::Config;

/// Validate configuration at startup; the collected problems fail the boot
/// rather than surfacing later as stuck rooms or dead timers.
pub fn validate(config: &Config) -> Result<(), String> {
    let mut problems = Vec::new();

    if config.port == 0 {
        problems.push("port must be non-zero".to_string());
    }
    if config.server.heartbeat_interval_secs == 0 {
        problems.push("server.heartbeat_interval_secs must be positive".to_string());
    }
    if config.server.heartbeat_miss_allowance == 0 {
        problems.push("server.heartbeat_miss_allowance must be at least 1".to_string());
    }
    if config.server.subscriber_queue_capacity == 0 {
        problems.push("server.subscriber_queue_capacity must be positive".to_string());
    }
    if config.server.actor_queue_capacity == 0 {
        problems.push("server.actor_queue_capacity must be positive".to_string());
    }
    if config.server.sweep_interval_secs == 0 {
        problems.push("server.sweep_interval_secs must be positive".to_string());
    }
    if config.server.max_message_size < 256 {
        problems.push("server.max_message_size must be at least 256 bytes".to_string());
    }

    // Room defaults go through the same bounds as a client-supplied patch.
    let defaults = config.room.defaults();
    let as_patch = RoomOptionsPatch {
        submission_mode: Some(defaults.submission_mode),
        timer_enabled: Some(defaults.timer_enabled),
        timer_duration_s: Some(defaults.timer_duration_s),
        ranking_timeout_s: Some(defaults.ranking_timeout_s),
        items_per_game: Some(defaults.items_per_game),
    };
    if let Err(error) = validate_options_patch(&as_patch) {
        problems.push(format!("room defaults: {}", error.message));
    }

    if config.providers.request_timeout_secs == 0 {
        problems.push("providers.request_timeout_secs must be positive".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems.join("\n"))
    }
}
