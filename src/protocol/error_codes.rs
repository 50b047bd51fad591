use serde::{Deserialize, Serialize};
use std::fmt;

use axum::http::StatusCode;

/// Error codes for structured error handling.
///
/// The serialized names are the stable wire contract; clients branch on them
/// programmatically. Codes are grouped by the phase that rejects the request:
/// input shape, room state preconditions, or resource exhaustion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Input-shape errors (rejected before touching room state)
    InvalidNickname,
    InvalidRoomCode,
    InvalidItemText,
    InvalidEmoji,
    InvalidRanking,
    InvalidConfig,

    // State errors (preconditions fail)
    RoomNotFound,
    RoomEnded,
    GameAlreadyStarted,
    NotYourTurn,
    NotHost,
    NotEnoughPlayers,
    NicknameTaken,
    DuplicateItem,
    RankingSlotTaken,
    ItemNotFound,
    PlayerNotFound,
    NoHostAvailable,

    // Resource errors
    CodeExhausted,
    RoomClosed,
}

impl ErrorCode {
    /// Returns a human-readable description of this error code.
    ///
    /// These are the default `message` bodies sent alongside the code; call
    /// sites may substitute a more specific message.
    pub fn description(&self) -> &'static str {
        match self {
            // Input-shape errors
            Self::InvalidNickname => {
                "Nicknames must be 1-20 characters after trimming whitespace."
            }
            Self::InvalidRoomCode => {
                "Room codes are exactly four uppercase letters, excluding I and O."
            }
            Self::InvalidItemText => {
                "Item text must be 1-100 characters after trimming whitespace."
            }
            Self::InvalidEmoji => "An item emoji must be exactly one emoji character.",
            Self::InvalidRanking => {
                "Rankings must be integers between 1 and the configured item count."
            }
            Self::InvalidConfig => {
                "One or more room configuration values are outside the allowed bounds."
            }

            // State errors
            Self::RoomNotFound => {
                "The requested room could not be found. It may have expired or the code is wrong."
            }
            Self::RoomEnded => {
                "The game in this room has already ended. Ask the host to reset the room."
            }
            Self::GameAlreadyStarted => {
                "The game has already started; this action is only valid in the lobby."
            }
            Self::NotYourTurn => {
                "It is not your turn to submit. Wait for the turn to come around."
            }
            Self::NotHost => "Only the room host can perform this action.",
            Self::NotEnoughPlayers => "At least one player is required to start the game.",
            Self::NicknameTaken => {
                "That nickname is already taken in this room. Pick a different one."
            }
            Self::DuplicateItem => "An identical item has already been submitted in this room.",
            Self::RankingSlotTaken => {
                "You have already used that ranking slot, or already ranked this item."
            }
            Self::ItemNotFound => "No item with that id exists in this room.",
            Self::PlayerNotFound => "No player with that id exists in this room.",
            Self::NoHostAvailable => {
                "The host is disconnected and no other player is connected to take over."
            }

            // Resource errors
            Self::CodeExhausted => {
                "Could not allocate a free room code. Please try creating the room again."
            }
            Self::RoomClosed => "This room has been closed by the server.",
        }
    }

    /// HTTP status class for responses carrying this code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidNickname
            | Self::InvalidRoomCode
            | Self::InvalidItemText
            | Self::InvalidEmoji
            | Self::InvalidRanking
            | Self::InvalidConfig => StatusCode::BAD_REQUEST,

            Self::RoomNotFound | Self::ItemNotFound | Self::PlayerNotFound => {
                StatusCode::NOT_FOUND
            }

            Self::RoomEnded
            | Self::GameAlreadyStarted
            | Self::NotYourTurn
            | Self::NotHost
            | Self::NotEnoughPlayers
            | Self::NicknameTaken
            | Self::DuplicateItem
            | Self::RankingSlotTaken
            | Self::NoHostAvailable => StatusCode::CONFLICT,

            Self::CodeExhausted | Self::RoomClosed => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// An error reply to a single room command.
///
/// Errors are returned to the originator only and never broadcast.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct RoomError {
    pub code: ErrorCode,
    pub message: String,
}

impl RoomError {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.description().to_string(),
        }
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<ErrorCode> for RoomError {
    fn from(code: ErrorCode) -> Self {
        Self::new(code)
    }
}
