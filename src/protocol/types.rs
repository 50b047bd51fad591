use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for players; stable for the lifetime of the room and
/// survives reconnects.
pub type PlayerId = Uuid;
/// Unique identifier for submitted items.
pub type ItemId = Uuid;
/// Unique identifier for a single live message channel. Multiple subscribers
/// may be bound to one player id (duplicate browser tabs).
pub type SubscriberId = Uuid;

/// Number of letters in a room code.
pub const ROOM_CODE_LENGTH: usize = 4;
/// Room code alphabet: uppercase A-Z minus the visually confusable I and O.
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";

pub const MAX_NICKNAME_LENGTH: usize = 20;
pub const MAX_ITEM_TEXT_LENGTH: usize = 100;
/// Upper byte bound for a single emoji; rejects pathological sequences.
pub const MAX_EMOJI_BYTES: usize = 32;

pub const MIN_TIMER_DURATION_S: u32 = 10;
pub const MAX_TIMER_DURATION_S: u32 = 300;
pub const MAX_RANKING_TIMEOUT_S: u32 = 300;
pub const MIN_ITEMS_PER_GAME: u32 = 2;
pub const MAX_ITEMS_PER_GAME: u32 = 50;

/// Room lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    #[default]
    Lobby,
    InProgress,
    Ended,
}

/// Who is allowed to submit the next item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionMode {
    /// Turns rotate across players on each submission.
    #[default]
    RoundRobin,
    /// Only the host submits; the turn index never advances.
    HostOnly,
}

/// Per-room game options, set at creation and editable by the host while the
/// room is in the lobby.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomOptions {
    pub submission_mode: SubmissionMode,
    pub timer_enabled: bool,
    /// Submission-turn budget in seconds.
    pub timer_duration_s: u32,
    /// Per-item ranking budget in seconds; 0 disables auto-assignment.
    pub ranking_timeout_s: u32,
    /// Number of items that, when reached, ends the game.
    pub items_per_game: u32,
}

impl Default for RoomOptions {
    fn default() -> Self {
        Self {
            submission_mode: SubmissionMode::RoundRobin,
            timer_enabled: true,
            timer_duration_s: 60,
            ranking_timeout_s: 30,
            items_per_game: 10,
        }
    }
}

impl RoomOptions {
    /// Merge a validated patch on top of these options.
    pub fn merged(&self, patch: &RoomOptionsPatch) -> Self {
        Self {
            submission_mode: patch.submission_mode.unwrap_or(self.submission_mode),
            timer_enabled: patch.timer_enabled.unwrap_or(self.timer_enabled),
            timer_duration_s: patch.timer_duration_s.unwrap_or(self.timer_duration_s),
            ranking_timeout_s: patch.ranking_timeout_s.unwrap_or(self.ranking_timeout_s),
            items_per_game: patch.items_per_game.unwrap_or(self.items_per_game),
        }
    }
}

/// Partial update of [`RoomOptions`]; absent fields are left unchanged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RoomOptionsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_mode: Option<SubmissionMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_duration_s: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranking_timeout_s: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items_per_game: Option<u32>,
}
