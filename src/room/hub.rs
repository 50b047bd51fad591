//! Per-room connection hub: the set of live subscribers and their binding to
//! player ids.
//!
//! The hub is owned by the room actor, so every membership change is
//! serialized with the state mutations it reflects. Outbound events are
//! serialized once to `Bytes` and fanned out by cheap handle clones; a
//! subscriber whose queue overflows is closed rather than allowed to slow
//! the room down.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use smallvec::SmallVec;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::protocol::{PlayerId, ServerEvent, SubscriberId};

/// Stack-allocation budget for per-broadcast bookkeeping; rooms are small.
pub const TYPICAL_ROOM_SIZE: usize = 8;

pub type DoomedList = SmallVec<[SubscriberId; TYPICAL_ROOM_SIZE]>;

/// One live message channel.
#[derive(Debug)]
pub struct Subscriber {
    tx: mpsc::Sender<Bytes>,
    pub player_id: Option<PlayerId>,
    pub last_heartbeat: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct Hub {
    subscribers: HashMap<SubscriberId, Subscriber>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Register a new anonymous subscriber.
    pub fn insert(&mut self, id: SubscriberId, tx: mpsc::Sender<Bytes>, now: DateTime<Utc>) {
        self.subscribers.insert(
            id,
            Subscriber {
                tx,
                player_id: None,
                last_heartbeat: now,
            },
        );
    }

    pub fn remove(&mut self, id: SubscriberId) -> Option<Subscriber> {
        self.subscribers.remove(&id)
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.contains_key(&id)
    }

    /// Bind a subscriber to a player id. Returns the previous binding, or
    /// `None` if the subscriber is unknown (already closed).
    pub fn bind(&mut self, id: SubscriberId, player_id: PlayerId) -> Option<Option<PlayerId>> {
        let sub = self.subscribers.get_mut(&id)?;
        Some(sub.player_id.replace(player_id))
    }

    pub fn player_of(&self, id: SubscriberId) -> Option<PlayerId> {
        self.subscribers.get(&id).and_then(|s| s.player_id)
    }

    /// Presence: a player is connected while any subscriber is bound to it.
    pub fn is_player_connected(&self, player_id: PlayerId) -> bool {
        self.subscribers
            .values()
            .any(|s| s.player_id == Some(player_id))
    }

    pub fn record_heartbeat(&mut self, id: SubscriberId, now: DateTime<Utc>) {
        if let Some(sub) = self.subscribers.get_mut(&id) {
            sub.last_heartbeat = now;
        }
    }

    /// Subscribers whose last heartbeat is older than `cutoff`.
    pub fn expired(&self, cutoff: DateTime<Utc>) -> DoomedList {
        self.subscribers
            .iter()
            .filter(|(_, s)| s.last_heartbeat < cutoff)
            .map(|(&id, _)| id)
            .collect()
    }

    /// Fan an event out to every subscriber. Returns the subscribers whose
    /// channel was closed or full; the caller removes them and downgrades
    /// presence.
    pub fn broadcast(&self, event: &ServerEvent) -> DoomedList {
        let Some(frame) = serialize(event) else {
            return DoomedList::new();
        };
        let mut doomed = DoomedList::new();
        for (&id, sub) in &self.subscribers {
            match sub.tx.try_send(frame.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(subscriber_id = %id, "subscriber queue full, closing");
                    doomed.push(id);
                }
                Err(TrySendError::Closed(_)) => doomed.push(id),
            }
        }
        doomed
    }

    /// Send an event to a single subscriber. Returns false when the channel
    /// is gone or saturated, in which case the caller should drop it.
    pub fn send(&self, id: SubscriberId, event: &ServerEvent) -> bool {
        let Some(sub) = self.subscribers.get(&id) else {
            return true;
        };
        let Some(frame) = serialize(event) else {
            return true;
        };
        sub.tx.try_send(frame).is_ok()
    }

    /// Close every subscriber, best-effort delivering a final event first.
    /// Used on room teardown.
    pub fn close_all(&mut self, event: &ServerEvent) {
        if let Some(frame) = serialize(event) {
            for sub in self.subscribers.values() {
                let _ = sub.tx.try_send(frame.clone());
            }
        }
        self.subscribers.clear();
    }
}

fn serialize(event: &ServerEvent) -> Option<Bytes> {
    match serde_json::to_vec(event) {
        Ok(json) => Some(Bytes::from(json)),
        Err(error) => {
            tracing::error!(%error, "failed to serialize server event");
            None
        }
    }
}
