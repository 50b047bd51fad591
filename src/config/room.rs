use serde::{Deserialize, Serialize};

use crate::protocol::{RoomOptions, SubmissionMode};

/// Deployment-level defaults for per-room game options. A room's `create`
/// request may override any of these within the validator's bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomDefaultsConfig {
    pub submission_mode: SubmissionMode,
    pub timer_enabled: bool,
    pub timer_duration_s: u32,
    pub ranking_timeout_s: u32,
    pub items_per_game: u32,
}

impl RoomDefaultsConfig {
    pub fn defaults(&self) -> RoomOptions {
        RoomOptions {
            submission_mode: self.submission_mode,
            timer_enabled: self.timer_enabled,
            timer_duration_s: self.timer_duration_s,
            ranking_timeout_s: self.ranking_timeout_s,
            items_per_game: self.items_per_game,
        }
    }
}

impl Default for RoomDefaultsConfig {
    fn default() -> Self {
        let options = RoomOptions::default();
        Self {
            submission_mode: options.submission_mode,
            timer_enabled: options.timer_enabled,
            timer_duration_s: options.timer_duration_s,
            ranking_timeout_s: options.ranking_timeout_s,
            items_per_game: options.items_per_game,
        }
    }
}
