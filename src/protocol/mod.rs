//! Wire protocol: message shapes, error taxonomy, identifiers, validation.

pub mod codes;
pub mod emoji;
pub mod error_codes;
pub mod messages;
pub mod types;
pub mod validation;

pub use codes::generate_room_code;
pub use emoji::is_valid_emoji;
pub use error_codes::{ErrorCode, RoomError};
pub use messages::{
    AggregateEntry, ClientMessage, ErrorReply, ItemSnapshot, JoinReply, PlayerSnapshot,
    RoomActionRequest, RoomReply, RoomSnapshot, ServerEvent,
};
pub use types::{
    ItemId, PlayerId, RoomOptions, RoomOptionsPatch, RoomStatus, SubmissionMode, SubscriberId,
};
