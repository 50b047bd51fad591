//! Room state and its transitions.
//!
//! Everything here is synchronous and owned by a single writer (the room
//! actor). Methods validate preconditions, mutate, and report what changed;
//! broadcasting and timer plumbing live in the actor.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::protocol::validation::{normalize_item_text, normalize_nickname, validate_ranking};
use crate::protocol::{
    ErrorCode, ItemId, ItemSnapshot, PlayerId, PlayerSnapshot, RoomError, RoomOptions,
    RoomOptionsPatch, RoomSnapshot, RoomStatus, SubmissionMode,
};

use super::aggregate::aggregate_ranks;

/// A player, stable for the lifetime of the room. Players are never removed;
/// presence is tracked by the `connected` flag.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub nickname: String,
    pub connected: bool,
    /// Item id -> rank; within one player's map no two items share a rank.
    pub rankings: BTreeMap<ItemId, u32>,
    pub joined_at: DateTime<Utc>,
    /// Joined after items already existed and has not yet ranked all of them.
    pub catching_up: bool,
}

#[derive(Debug, Clone)]
pub struct Item {
    pub id: ItemId,
    pub text: String,
    pub emoji: String,
    pub submitted_by: PlayerId,
    pub submitted_at: DateTime<Utc>,
}

/// The authoritative state of one room.
#[derive(Debug, Clone)]
pub struct Room {
    pub code: String,
    pub host_id: PlayerId,
    pub status: RoomStatus,
    pub config: RoomOptions,
    /// Insertion order preserved; turn order derives from this.
    pub players: Vec<Player>,
    pub items: Vec<Item>,
    pub current_turn_index: usize,
    pub turn_deadline: Option<DateTime<Utc>>,
    pub ranking_deadline: Option<DateTime<Utc>>,
    /// Item whose ranking window is currently open.
    pub ranking_item_id: Option<ItemId>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    /// Incremented on reset; in-flight async completions carrying an older
    /// epoch are dropped.
    pub epoch: u64,
}

impl Room {
    /// Create a room with the host as sole player. The nickname must already
    /// be validated and trimmed.
    pub fn new(code: String, host_nickname: String, config: RoomOptions, now: DateTime<Utc>) -> Self {
        let host = Player {
            id: Uuid::new_v4(),
            nickname: host_nickname,
            connected: false,
            rankings: BTreeMap::new(),
            joined_at: now,
            catching_up: false,
        };
        let host_id = host.id;
        Self {
            code,
            host_id,
            status: RoomStatus::Lobby,
            config,
            players: vec![host],
            items: Vec::new(),
            current_turn_index: 0,
            turn_deadline: None,
            ranking_deadline: None,
            ranking_item_id: None,
            created_at: now,
            last_activity_at: now,
            epoch: 0,
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    /// The player whose turn it currently is; None outside `in_progress`.
    pub fn current_turn_player(&self) -> Option<&Player> {
        if self.status == RoomStatus::InProgress {
            self.players.get(self.current_turn_index)
        } else {
            None
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity_at = now;
    }

    /// Add a player. Fails on ended rooms and duplicate nicknames.
    pub fn add_player(&mut self, nickname: String, now: DateTime<Utc>) -> Result<PlayerId, RoomError> {
        if self.status == RoomStatus::Ended {
            return Err(RoomError::new(ErrorCode::RoomEnded));
        }
        let normalized = normalize_nickname(&nickname);
        if self
            .players
            .iter()
            .any(|p| normalize_nickname(&p.nickname) == normalized)
        {
            return Err(RoomError::with_message(
                ErrorCode::NicknameTaken,
                format!("nickname '{nickname}' is already taken in this room"),
            ));
        }
        let catching_up = self.status == RoomStatus::InProgress && !self.items.is_empty();
        let player = Player {
            id: Uuid::new_v4(),
            nickname,
            connected: false,
            rankings: BTreeMap::new(),
            joined_at: now,
            catching_up,
        };
        let id = player.id;
        self.players.push(player);
        Ok(id)
    }

    /// Host-authority check shared by `start`, `update_config`, and `reset`.
    ///
    /// When the host is disconnected and nobody else is connected either,
    /// authority is vacant rather than merely denied.
    pub fn require_host(&self, by: PlayerId) -> Result<(), RoomError> {
        if by == self.host_id {
            return Ok(());
        }
        if self.player(by).is_none() {
            return Err(RoomError::new(ErrorCode::PlayerNotFound));
        }
        let host_connected = self.player(self.host_id).is_some_and(|p| p.connected);
        let any_connected = self.players.iter().any(|p| p.connected);
        if !host_connected && !any_connected {
            Err(RoomError::new(ErrorCode::NoHostAvailable))
        } else {
            Err(RoomError::new(ErrorCode::NotHost))
        }
    }

    /// Transition lobby -> in_progress.
    pub fn start(&mut self, by: PlayerId, now: DateTime<Utc>) -> Result<(), RoomError> {
        self.require_host(by)?;
        match self.status {
            RoomStatus::InProgress => {
                return Err(RoomError::new(ErrorCode::GameAlreadyStarted));
            }
            RoomStatus::Ended => return Err(RoomError::new(ErrorCode::RoomEnded)),
            RoomStatus::Lobby => {}
        }
        if self.players.is_empty() {
            return Err(RoomError::new(ErrorCode::NotEnoughPlayers));
        }
        self.status = RoomStatus::InProgress;
        self.current_turn_index = 0;
        self.turn_deadline = self.next_turn_deadline(now);
        Ok(())
    }

    fn next_turn_deadline(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.config
            .timer_enabled
            .then(|| now + Duration::seconds(i64::from(self.config.timer_duration_s)))
    }

    /// Whether `by` currently holds the right to submit an item.
    pub fn require_submission_right(&self, by: PlayerId) -> Result<(), RoomError> {
        match self.status {
            RoomStatus::Ended => return Err(RoomError::new(ErrorCode::RoomEnded)),
            RoomStatus::Lobby => {
                return Err(RoomError::with_message(
                    ErrorCode::NotYourTurn,
                    "The game has not started yet",
                ))
            }
            RoomStatus::InProgress => {}
        }
        if self.player(by).is_none() {
            return Err(RoomError::new(ErrorCode::PlayerNotFound));
        }
        let allowed = match self.config.submission_mode {
            SubmissionMode::RoundRobin => {
                self.current_turn_player().is_some_and(|p| p.id == by)
            }
            SubmissionMode::HostOnly => by == self.host_id,
        };
        if allowed {
            Ok(())
        } else {
            Err(RoomError::new(ErrorCode::NotYourTurn))
        }
    }

    /// Reject text that collides with an existing item (case-insensitive,
    /// whitespace-collapsed).
    pub fn require_item_text_free(&self, text: &str) -> Result<(), RoomError> {
        let normalized = normalize_item_text(text);
        if self
            .items
            .iter()
            .any(|i| normalize_item_text(&i.text) == normalized)
        {
            Err(RoomError::new(ErrorCode::DuplicateItem))
        } else {
            Ok(())
        }
    }

    /// Append a fully-resolved item and open its ranking window.
    ///
    /// Returns the new item's id. The caller is responsible for having
    /// validated text, uniqueness, and emoji beforehand.
    pub fn push_item(
        &mut self,
        text: String,
        emoji: String,
        submitted_by: PlayerId,
        now: DateTime<Utc>,
    ) -> ItemId {
        let item = Item {
            id: Uuid::new_v4(),
            text,
            emoji,
            submitted_by,
            submitted_at: now,
        };
        let id = item.id;
        self.items.push(item);
        self.ranking_item_id = Some(id);
        self.ranking_deadline = (self.config.ranking_timeout_s > 0)
            .then(|| now + Duration::seconds(i64::from(self.config.ranking_timeout_s)));
        id
    }

    /// True once the room holds its configured number of items.
    pub fn is_full(&self) -> bool {
        self.items.len() as u32 >= self.config.items_per_game
    }

    /// Transition in_progress -> ended at the item-count boundary.
    pub fn end_game(&mut self) {
        self.status = RoomStatus::Ended;
        self.turn_deadline = None;
    }

    /// Advance the submission turn after a successful submit or a skip.
    ///
    /// In round-robin mode the index moves to the next connected player,
    /// wrapping; if nobody is connected it stays on the last active seat so
    /// the next reconnect resumes there. In host-only mode the index never
    /// moves. Returns the submitter the turn now rests on, plus the fresh
    /// deadline.
    pub fn advance_turn(&mut self, now: DateTime<Utc>) -> (PlayerId, Option<DateTime<Utc>>) {
        if self.config.submission_mode == SubmissionMode::RoundRobin {
            let n = self.players.len();
            if self.players.iter().any(|p| p.connected) {
                let mut idx = (self.current_turn_index + 1) % n;
                while !self.players[idx].connected {
                    idx = (idx + 1) % n;
                }
                self.current_turn_index = idx;
            }
        }
        self.turn_deadline = self.next_turn_deadline(now);
        (self.players[self.current_turn_index].id, self.turn_deadline)
    }

    /// Whether `by` may skip the current turn: the current submitter or the
    /// host, nobody else.
    pub fn require_skip_right(&self, by: PlayerId) -> Result<(), RoomError> {
        match self.status {
            RoomStatus::Ended => return Err(RoomError::new(ErrorCode::RoomEnded)),
            RoomStatus::Lobby => {
                return Err(RoomError::with_message(
                    ErrorCode::NotYourTurn,
                    "The game has not started yet",
                ))
            }
            RoomStatus::InProgress => {}
        }
        if self.player(by).is_none() {
            return Err(RoomError::new(ErrorCode::PlayerNotFound));
        }
        let is_current = self.current_turn_player().is_some_and(|p| p.id == by);
        if is_current || by == self.host_id {
            Ok(())
        } else {
            Err(RoomError::new(ErrorCode::NotYourTurn))
        }
    }

    /// Assign `ranking` to `item_id` for player `by`.
    pub fn set_rank(
        &mut self,
        by: PlayerId,
        item_id: ItemId,
        ranking: u32,
    ) -> Result<(), RoomError> {
        validate_ranking(ranking, self.config.items_per_game)?;
        if self.item(item_id).is_none() {
            return Err(RoomError::new(ErrorCode::ItemNotFound));
        }
        let item_count = self.items.len();
        let Some(player) = self.players.iter_mut().find(|p| p.id == by) else {
            return Err(RoomError::new(ErrorCode::PlayerNotFound));
        };
        if player.rankings.contains_key(&item_id) {
            return Err(RoomError::with_message(
                ErrorCode::RankingSlotTaken,
                "You have already ranked this item",
            ));
        }
        if player.rankings.values().any(|&r| r == ranking) {
            return Err(RoomError::with_message(
                ErrorCode::RankingSlotTaken,
                format!("You have already used rank {ranking}"),
            ));
        }
        player.rankings.insert(item_id, ranking);
        if player.catching_up && player.rankings.len() >= item_count {
            player.catching_up = false;
        }
        Ok(())
    }

    /// True when every connected player has ranked the item; closes the
    /// ranking window early.
    pub fn all_connected_ranked(&self, item_id: ItemId) -> bool {
        self.players
            .iter()
            .filter(|p| p.connected)
            .all(|p| p.rankings.contains_key(&item_id))
    }

    pub fn clear_ranking_window(&mut self) {
        self.ranking_deadline = None;
        self.ranking_item_id = None;
    }

    /// Ranking-timer expiry: every player still missing a rank for the item
    /// gets the lowest rank they have not used yet. Deterministic by player
    /// insertion order, then by ascending free rank.
    pub fn auto_assign_ranks(&mut self, item_id: ItemId) {
        let item_count = self.items.len();
        let items_per_game = self.config.items_per_game;
        for player in &mut self.players {
            if player.rankings.contains_key(&item_id) {
                continue;
            }
            let free = (1..=items_per_game)
                .find(|rank| !player.rankings.values().any(|r| r == rank));
            if let Some(rank) = free {
                player.rankings.insert(item_id, rank);
            }
            if player.catching_up && player.rankings.len() >= item_count {
                player.catching_up = false;
            }
        }
    }

    /// Host-only lobby config update; returns the merged options.
    pub fn update_config(
        &mut self,
        by: PlayerId,
        patch: &RoomOptionsPatch,
    ) -> Result<RoomOptions, RoomError> {
        self.require_host(by)?;
        match self.status {
            RoomStatus::Lobby => {}
            RoomStatus::InProgress => {
                return Err(RoomError::new(ErrorCode::GameAlreadyStarted))
            }
            RoomStatus::Ended => return Err(RoomError::new(ErrorCode::RoomEnded)),
        }
        crate::protocol::validation::validate_options_patch(patch)?;
        self.config = self.config.merged(patch);
        Ok(self.config)
    }

    /// Wipe an ended game back to the lobby: items and rankings cleared,
    /// players and nicknames preserved.
    pub fn reset(&mut self, by: PlayerId) -> Result<(), RoomError> {
        self.require_host(by)?;
        if self.status != RoomStatus::Ended {
            return Err(RoomError::with_message(
                ErrorCode::GameAlreadyStarted,
                "Only an ended game can be reset",
            ));
        }
        self.items.clear();
        self.status = RoomStatus::Lobby;
        self.current_turn_index = 0;
        self.turn_deadline = None;
        self.clear_ranking_window();
        for player in &mut self.players {
            player.rankings.clear();
            player.catching_up = false;
        }
        self.epoch += 1;
        Ok(())
    }

    /// Mark presence for a player; returns the previous value.
    pub fn set_connected(&mut self, player_id: PlayerId, connected: bool) -> Option<bool> {
        let player = self.players.iter_mut().find(|p| p.id == player_id)?;
        let was = player.connected;
        player.connected = connected;
        Some(was)
    }

    /// Recompute the host after a presence change. The host keeps the seat
    /// while connected; otherwise the earliest-joined connected player takes
    /// over. With nobody connected the formal assignment stays so a later
    /// reconnect restores it. Returns the new host id if it changed.
    pub fn migrate_host(&mut self) -> Option<PlayerId> {
        if self.player(self.host_id).is_some_and(|p| p.connected) {
            return None;
        }
        let next = self.players.iter().find(|p| p.connected)?.id;
        if next == self.host_id {
            return None;
        }
        self.host_id = next;
        Some(next)
    }

    /// Wire-shaped view of the room. Aggregate results are attached once the
    /// game has ended.
    pub fn snapshot(&self) -> RoomSnapshot {
        let in_progress = self.status == RoomStatus::InProgress;
        RoomSnapshot {
            code: self.code.clone(),
            host_id: self.host_id,
            status: self.status,
            config: self.config,
            players: self.players.iter().map(player_snapshot).collect(),
            items: self.items.iter().map(item_snapshot).collect(),
            current_turn_index: in_progress.then_some(self.current_turn_index),
            current_turn_player_id: self.current_turn_player().map(|p| p.id),
            turn_deadline: self.turn_deadline,
            ranking_deadline: self.ranking_deadline,
            created_at: self.created_at,
            last_activity_at: self.last_activity_at,
            results: (self.status == RoomStatus::Ended).then(|| {
                aggregate_ranks(&self.items, &self.players, self.config.items_per_game)
            }),
        }
    }
}

pub(crate) fn player_snapshot(player: &Player) -> PlayerSnapshot {
    PlayerSnapshot {
        id: player.id,
        nickname: player.nickname.clone(),
        connected: player.connected,
        rankings: player.rankings.clone(),
        joined_at: player.joined_at,
        catching_up: player.catching_up,
    }
}

pub(crate) fn item_snapshot(item: &Item) -> ItemSnapshot {
    ItemSnapshot {
        id: item.id,
        text: item.text.clone(),
        emoji: item.emoji.clone(),
        submitted_by: item.submitted_by,
        submitted_at: item.submitted_at,
    }
}
