//! The command vocabulary of the room actor.
//!
//! Commands arrive from three sources: the HTTP surface (carrying a oneshot
//! responder), subscriber message channels (carrying the originating
//! subscriber id so errors can be answered in place), and the timer engine
//! (carrying an epoch checked against the live one).

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use crate::protocol::{ClientMessage, JoinReply, PlayerId, RoomError, RoomReply, SubscriberId};

pub type Responder<T> = oneshot::Sender<Result<T, RoomError>>;

#[derive(Debug)]
pub enum RoomCommand {
    /// HTTP `join`: add a player and reply with their id plus the snapshot.
    Join {
        nickname: String,
        resp: Responder<JoinReply>,
    },
    /// HTTP `start`: host begins the game.
    Start {
        by: PlayerId,
        resp: Responder<RoomReply>,
    },
    /// HTTP `GET`: current snapshot, no mutation.
    Snapshot { resp: Responder<RoomReply> },

    /// A new message channel attached; starts anonymous.
    Subscribe {
        subscriber_id: SubscriberId,
        tx: mpsc::Sender<Bytes>,
    },
    /// The channel went away (socket closed, read error, write overflow).
    Unsubscribe { subscriber_id: SubscriberId },
    /// A parsed control message from a subscriber.
    Client {
        subscriber_id: SubscriberId,
        message: ClientMessage,
    },

    /// Completion of the async emoji lookup for a reserved submission.
    EmojiResolved { submission_id: u64, emoji: String },
    /// Submission-turn timer fired.
    TurnTimerExpired { epoch: u64 },
    /// Per-item ranking timer fired.
    RankingTimerExpired { epoch: u64 },
}
