use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error_codes::ErrorCode;
use super::types::{ItemId, PlayerId, RoomOptions, RoomOptionsPatch, RoomStatus};

/// Control messages sent from client to server over the message channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Bind this subscriber to a player id; the reuse path after a page
    /// refresh. Idempotent: re-identifying yields a fresh full-state event.
    #[serde(rename_all = "camelCase")]
    Identify { player_id: PlayerId },
    /// Heartbeat; the server replies with `pong` on the same channel.
    Ping,
    /// Submit the next item (requires submission rights).
    SubmitItem { text: String },
    /// Assign a rank to an item.
    #[serde(rename_all = "camelCase")]
    RankItem { item_id: ItemId, ranking: u32 },
    /// Pass the current submission turn without an item.
    SkipTurn,
    /// Host-only: merge a config patch while in the lobby.
    UpdateConfig { config: RoomOptionsPatch },
    /// Host-only: wipe an ended game back to the lobby.
    ResetRoom,
}

/// Events fanned out from server to room subscribers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full current room state; follows every mutation.
    RoomUpdated { room: RoomSnapshot },
    /// A new item entered the room, carrying its final emoji.
    ItemSubmitted { item: ItemSnapshot },
    PlayerJoined { player: PlayerSnapshot },
    /// Emitted only when the last subscriber bound to the player is gone.
    #[serde(rename_all = "camelCase")]
    PlayerLeft { player_id: PlayerId },
    #[serde(rename_all = "camelCase")]
    PlayerReconnected { player_id: PlayerId },
    /// The submission turn moved; `timer_end_at` is null when timers are off.
    #[serde(rename_all = "camelCase")]
    TurnChanged {
        player_id: PlayerId,
        timer_end_at: Option<DateTime<Utc>>,
    },
    GameStarted,
    GameEnded,
    RoomReset { room: RoomSnapshot },
    ConfigUpdated { config: RoomOptions },
    Pong,
    /// Targeted error reply; never broadcast.
    Error { code: ErrorCode, message: String },
}

/// Snapshot of a room as broadcast to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub code: String,
    pub host_id: PlayerId,
    pub status: RoomStatus,
    pub config: RoomOptions,
    /// Insertion order preserved; turn order derives from this.
    pub players: Vec<PlayerSnapshot>,
    pub items: Vec<ItemSnapshot>,
    pub current_turn_index: Option<usize>,
    pub current_turn_player_id: Option<PlayerId>,
    pub turn_deadline: Option<DateTime<Utc>>,
    pub ranking_deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    /// Aggregate results; present once the game has ended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<AggregateEntry>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub nickname: String,
    pub connected: bool,
    /// Item id -> rank assigned by this player.
    pub rankings: BTreeMap<ItemId, u32>,
    pub joined_at: DateTime<Utc>,
    pub catching_up: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemSnapshot {
    pub id: ItemId,
    pub text: String,
    pub emoji: String,
    pub submitted_by: PlayerId,
    pub submitted_at: DateTime<Utc>,
}

/// One row of the aggregate ranking computed when a game ends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AggregateEntry {
    pub item_id: ItemId,
    pub text: String,
    pub emoji: String,
    pub total_points: u32,
    pub average_rank: f64,
    /// Final aggregate rank, 1..N over the room's items.
    pub rank: u32,
}

/// Body of `POST /room/{code}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RoomActionRequest {
    Create {
        nickname: String,
        #[serde(default)]
        config: Option<RoomOptionsPatch>,
    },
    Join {
        nickname: String,
    },
    Start {
        #[serde(default, rename = "playerId", alias = "player_id")]
        player_id: Option<PlayerId>,
    },
}

/// Successful reply to `create` / `join`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinReply {
    pub player_id: PlayerId,
    pub room: RoomSnapshot,
}

/// Successful reply to `start` and to `GET /room/{code}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomReply {
    pub room: RoomSnapshot,
}

/// Error body shared by the HTTP surface and the message channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: ErrorCode,
    pub message: String,
}
