//! Process-wide room directory.
//!
//! Maps room code -> room actor handle. Rooms are created on demand by the
//! HTTP `create` action and evicted when idle past the TTL with no
//! subscribers attached, or explicitly on teardown.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::protocol::validation::{validate_nickname, validate_options_patch, validate_room_code};
use crate::protocol::{
    generate_room_code, ErrorCode, JoinReply, RoomError, RoomOptionsPatch,
};
use crate::providers::EmojiService;
use crate::room::{spawn_room, Room, RoomHandle};

/// Bounded attempts at sampling a free code before giving up with
/// `CODE_EXHAUSTED`. Collisions are rare at 24^4 codes but must not be
/// silently masked.
const CODE_ATTEMPTS: usize = 16;

pub struct RoomRegistry {
    rooms: DashMap<String, RoomHandle>,
    emoji: Arc<dyn EmojiService>,
    config: Arc<Config>,
    cancel: CancellationToken,
}

impl RoomRegistry {
    pub fn new(config: Arc<Config>, emoji: Arc<dyn EmojiService>) -> Arc<Self> {
        Arc::new(Self {
            rooms: DashMap::new(),
            emoji,
            config,
            cancel: CancellationToken::new(),
        })
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn get(&self, code: &str) -> Option<RoomHandle> {
        self.rooms.get(code).map(|entry| entry.value().clone())
    }

    /// Create a room, either under an explicit code or a freshly sampled one,
    /// with the caller as host. The host connects over the message channel
    /// afterwards and identifies with the returned player id.
    pub fn create_room(
        &self,
        code: Option<&str>,
        nickname: &str,
        config_patch: Option<&RoomOptionsPatch>,
    ) -> Result<JoinReply, RoomError> {
        let nickname = validate_nickname(nickname)?.to_owned();
        let mut options = self.config.room.defaults();
        if let Some(patch) = config_patch {
            validate_options_patch(patch)?;
            options = options.merged(patch);
        }

        let now = Utc::now();
        match code {
            Some(code) => {
                validate_room_code(code)?;
                self.try_insert(code.to_string(), |code| {
                    Room::new(code, nickname.clone(), options, now)
                })
                .ok_or_else(|| {
                    RoomError::with_message(
                        ErrorCode::CodeExhausted,
                        format!("room code {code} is already in use"),
                    )
                })
            }
            None => {
                for _ in 0..CODE_ATTEMPTS {
                    let candidate = generate_room_code();
                    if let Some(reply) = self.try_insert(candidate, |code| {
                        Room::new(code, nickname.clone(), options, now)
                    }) {
                        return Ok(reply);
                    }
                }
                tracing::error!("room code space exhausted after {CODE_ATTEMPTS} attempts");
                Err(RoomError::new(ErrorCode::CodeExhausted))
            }
        }
    }

    /// Atomically claim `code` and spawn the actor; None if taken.
    fn try_insert(
        &self,
        code: String,
        build: impl FnOnce(String) -> Room,
    ) -> Option<JoinReply> {
        match self.rooms.entry(code.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => None,
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let room = build(code.clone());
                let player_id = room.host_id;
                let snapshot = room.snapshot();
                let handle = spawn_room(
                    room,
                    Arc::clone(&self.emoji),
                    Arc::clone(&self.config),
                    &self.cancel,
                );
                vacant.insert(handle);
                tracing::info!(room_code = %code, "room created");
                Some(JoinReply {
                    player_id,
                    room: snapshot,
                })
            }
        }
    }

    /// Tear one room down; straggling subscribers are closed with
    /// `ROOM_CLOSED`.
    pub fn destroy(&self, code: &str) {
        if let Some((_, handle)) = self.rooms.remove(code) {
            handle.shutdown();
            tracing::info!(room_code = %code, "room destroyed");
        }
    }

    /// Periodic eviction of idle rooms: no subscribers attached and no
    /// activity for longer than the TTL. Runs until shutdown.
    pub async fn sweep_task(self: Arc<Self>) {
        let interval = std::time::Duration::from_secs(self.config.server.sweep_interval_secs);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                _ = ticker.tick() => self.sweep_once(),
            }
        }
    }

    /// One eviction pass; exposed for tests.
    pub fn sweep_once(&self) {
        let ttl = self.config.server.room_ttl_secs as i64;
        let now = Utc::now().timestamp();
        // Collect first: removing while iterating would hold shard locks.
        let expired: Vec<String> = self
            .rooms
            .iter()
            .filter(|entry| {
                let handle = entry.value();
                handle.subscriber_count() == 0 && now - handle.last_activity_unix() > ttl
            })
            .map(|entry| entry.key().clone())
            .collect();
        for code in expired {
            tracing::info!(room_code = %code, "evicting idle room");
            self.destroy(&code);
        }
    }

    /// Tear everything down; used on process shutdown.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        let codes: Vec<String> = self.rooms.iter().map(|e| e.key().clone()).collect();
        for code in codes {
            self.destroy(&code);
        }
    }
}
