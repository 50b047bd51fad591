//! The room actor: single writer over one [`Room`].
//!
//! Every mutation is a command handled serially off a bounded queue.
//! Commands arrive from the HTTP surface, from subscriber message channels,
//! and from the timer engine. The actor never awaits external I/O while
//! holding the state: the emoji lookup runs as a spawned task and re-enters
//! through [`RoomCommand::EmojiResolved`].

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use smallvec::smallvec;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::protocol::{
    is_valid_emoji, ClientMessage, ErrorCode, ItemId, JoinReply, PlayerId, RoomError,
    RoomOptionsPatch, RoomReply, ServerEvent, SubscriberId,
};
use crate::providers::emoji::{fallback_emoji, EmojiService};

use super::commands::{Responder, RoomCommand};
use super::hub::{DoomedList, Hub};
use super::state::{item_snapshot, player_snapshot, Room};
use super::timer::{TimerKind, Timers};

/// Cheap, lock-free view of a room for the registry's eviction sweep.
#[derive(Debug)]
pub struct RoomMeta {
    /// Unix seconds of the last state-mutating command.
    pub last_activity: AtomicI64,
    /// Live subscriber count.
    pub subscribers: AtomicUsize,
}

/// Cloneable handle used by the HTTP surface, the WebSocket layer, and the
/// registry to talk to one room actor.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    code: String,
    cmd_tx: mpsc::Sender<RoomCommand>,
    meta: Arc<RoomMeta>,
    cancel: CancellationToken,
}

impl RoomHandle {
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn subscriber_count(&self) -> usize {
        self.meta.subscribers.load(Ordering::Relaxed)
    }

    pub fn last_activity_unix(&self) -> i64 {
        self.meta.last_activity.load(Ordering::Relaxed)
    }

    pub async fn join(&self, nickname: String) -> Result<JoinReply, RoomError> {
        self.request(|resp| RoomCommand::Join { nickname, resp })
            .await
    }

    pub async fn start(&self, by: PlayerId) -> Result<RoomReply, RoomError> {
        self.request(|resp| RoomCommand::Start { by, resp }).await
    }

    pub async fn snapshot(&self) -> Result<RoomReply, RoomError> {
        self.request(|resp| RoomCommand::Snapshot { resp }).await
    }

    /// Attach a new anonymous subscriber channel.
    pub async fn subscribe(
        &self,
        subscriber_id: SubscriberId,
        tx: mpsc::Sender<Bytes>,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Subscribe { subscriber_id, tx }).await
    }

    pub async fn unsubscribe(&self, subscriber_id: SubscriberId) {
        let _ = self.send(RoomCommand::Unsubscribe { subscriber_id }).await;
    }

    /// Forward a parsed control message from a subscriber.
    pub async fn client_message(&self, subscriber_id: SubscriberId, message: ClientMessage) {
        let _ = self
            .send(RoomCommand::Client {
                subscriber_id,
                message,
            })
            .await;
    }

    /// Tear the room down; subscribers are closed with `ROOM_CLOSED`.
    pub(crate) fn shutdown(&self) {
        self.cancel.cancel();
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Responder<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (resp, rx) = oneshot::channel();
        self.send(build(resp)).await?;
        rx.await
            .map_err(|_| RoomError::new(ErrorCode::RoomClosed))?
    }

    async fn send(&self, command: RoomCommand) -> Result<(), RoomError> {
        self.cmd_tx
            .send(command)
            .await
            .map_err(|_| RoomError::new(ErrorCode::RoomClosed))
    }
}

/// A submission whose emoji lookup is still in flight. At most one exists per
/// room; the turn is considered consumed while it resolves.
#[derive(Debug)]
struct PendingSubmission {
    id: u64,
    player_id: PlayerId,
    subscriber_id: SubscriberId,
    text: String,
    room_epoch: u64,
}

pub struct RoomActor {
    room: Room,
    hub: Hub,
    timers: Timers,
    pending: Option<PendingSubmission>,
    next_submission_id: u64,
    emoji: Arc<dyn EmojiService>,
    config: Arc<Config>,
    meta: Arc<RoomMeta>,
    cmd_tx: mpsc::Sender<RoomCommand>,
    cmd_rx: mpsc::Receiver<RoomCommand>,
    cancel: CancellationToken,
}

/// Spawn the actor task for a freshly created room and return its handle.
pub fn spawn_room(
    room: Room,
    emoji: Arc<dyn EmojiService>,
    config: Arc<Config>,
    parent: &CancellationToken,
) -> RoomHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(config.server.actor_queue_capacity);
    let meta = Arc::new(RoomMeta {
        last_activity: AtomicI64::new(room.last_activity_at.timestamp()),
        subscribers: AtomicUsize::new(0),
    });
    let cancel = parent.child_token();
    let handle = RoomHandle {
        code: room.code.clone(),
        cmd_tx: cmd_tx.clone(),
        meta: Arc::clone(&meta),
        cancel: cancel.clone(),
    };

    let actor = RoomActor {
        timers: Timers::new(cmd_tx.clone()),
        room,
        hub: Hub::new(),
        pending: None,
        next_submission_id: 0,
        emoji,
        config,
        meta,
        cmd_tx,
        cmd_rx,
        cancel,
    };
    tokio::spawn(actor.run());
    handle
}

impl RoomActor {
    async fn run(mut self) {
        let interval = std::time::Duration::from_secs(self.config.server.heartbeat_interval_secs);
        let mut sweep = tokio::time::interval(interval);
        sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    self.hub
                        .close_all(&ServerEvent::Error {
                            code: ErrorCode::RoomClosed,
                            message: ErrorCode::RoomClosed.description().to_string(),
                        });
                    self.meta.subscribers.store(0, Ordering::Relaxed);
                    tracing::debug!(room_code = %self.room.code, "room actor stopped");
                    break;
                }
                command = self.cmd_rx.recv() => {
                    match command {
                        Some(command) => self.handle(command),
                        None => break,
                    }
                }
                _ = sweep.tick() => self.sweep_heartbeats(),
            }
        }
    }

    fn handle(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Join { nickname, resp } => self.handle_join(nickname, resp),
            RoomCommand::Start { by, resp } => self.handle_start(by, resp),
            RoomCommand::Snapshot { resp } => {
                let _ = resp.send(Ok(RoomReply {
                    room: self.room.snapshot(),
                }));
            }
            RoomCommand::Subscribe { subscriber_id, tx } => {
                self.hub.insert(subscriber_id, tx, Utc::now());
                self.sync_subscriber_gauge();
            }
            RoomCommand::Unsubscribe { subscriber_id } => {
                self.drop_subscribers(smallvec![subscriber_id]);
            }
            RoomCommand::Client {
                subscriber_id,
                message,
            } => self.handle_client(subscriber_id, message),
            RoomCommand::EmojiResolved {
                submission_id,
                emoji,
            } => self.handle_emoji_resolved(submission_id, emoji),
            RoomCommand::TurnTimerExpired { epoch } => self.handle_turn_expired(epoch),
            RoomCommand::RankingTimerExpired { epoch } => self.handle_ranking_expired(epoch),
        }
    }

    // ------------------------------------------------------------------
    // HTTP-originated commands
    // ------------------------------------------------------------------

    fn handle_join(&mut self, nickname: String, resp: Responder<JoinReply>) {
        let result = crate::protocol::validation::validate_nickname(&nickname)
            .map(str::to_owned)
            .and_then(|trimmed| {
                let now = Utc::now();
                let player_id = self.room.add_player(trimmed, now)?;
                self.touch(now);
                Ok(player_id)
            });

        match result {
            Ok(player_id) => {
                tracing::info!(
                    room_code = %self.room.code,
                    %player_id,
                    "player joined"
                );
                if let Some(player) = self.room.player(player_id) {
                    let event = ServerEvent::PlayerJoined {
                        player: player_snapshot(player),
                    };
                    self.broadcast(&event);
                }
                self.broadcast_room_updated();
                let _ = resp.send(Ok(JoinReply {
                    player_id,
                    room: self.room.snapshot(),
                }));
            }
            Err(error) => {
                let _ = resp.send(Err(error));
            }
        }
    }

    fn handle_start(&mut self, by: PlayerId, resp: Responder<RoomReply>) {
        let now = Utc::now();
        match self.room.start(by, now) {
            Ok(()) => {
                self.touch(now);
                if let Some(deadline) = self.room.turn_deadline {
                    self.timers.arm(TimerKind::Turn, deadline);
                }
                tracing::info!(room_code = %self.room.code, "game started");
                self.broadcast(&ServerEvent::GameStarted);
                self.broadcast_room_updated();
                let _ = resp.send(Ok(RoomReply {
                    room: self.room.snapshot(),
                }));
            }
            Err(error) => {
                let _ = resp.send(Err(error));
            }
        }
    }

    // ------------------------------------------------------------------
    // Subscriber-originated commands
    // ------------------------------------------------------------------

    fn handle_client(&mut self, subscriber_id: SubscriberId, message: ClientMessage) {
        match message {
            ClientMessage::Ping => {
                self.hub.record_heartbeat(subscriber_id, Utc::now());
                self.send_to(subscriber_id, &ServerEvent::Pong);
            }
            ClientMessage::Identify { player_id } => {
                self.handle_identify(subscriber_id, player_id);
            }
            ClientMessage::SubmitItem { text } => self.handle_submit(subscriber_id, text),
            ClientMessage::RankItem { item_id, ranking } => {
                self.handle_rank(subscriber_id, item_id, ranking);
            }
            ClientMessage::SkipTurn => self.handle_skip(subscriber_id),
            ClientMessage::UpdateConfig { config } => {
                self.handle_update_config(subscriber_id, config);
            }
            ClientMessage::ResetRoom => self.handle_reset(subscriber_id),
        }
    }

    fn handle_identify(&mut self, subscriber_id: SubscriberId, player_id: PlayerId) {
        if self.room.player(player_id).is_none() {
            self.send_error(
                subscriber_id,
                RoomError::with_message(
                    ErrorCode::PlayerNotFound,
                    "Unknown player id; join the room over HTTP first",
                ),
            );
            return;
        }
        let Some(previous) = self.hub.bind(subscriber_id, player_id) else {
            return; // subscriber already gone
        };

        if previous == Some(player_id) {
            // Idempotent re-identify: just refresh this subscriber's view.
            self.send_to(
                subscriber_id,
                &ServerEvent::RoomUpdated {
                    room: self.room.snapshot(),
                },
            );
            return;
        }

        if let Some(old_player) = previous {
            let doomed = self.downgrade_presence_if_gone(old_player);
            self.drop_subscribers(doomed);
        }

        let was_connected = self
            .room
            .player(player_id)
            .is_some_and(|p| p.connected);
        self.room.set_connected(player_id, true);
        self.touch(Utc::now());

        if !was_connected {
            tracing::info!(
                room_code = %self.room.code,
                %player_id,
                "player reconnected"
            );
            self.broadcast(&ServerEvent::PlayerReconnected { player_id });
            if let Some(new_host) = self.room.migrate_host() {
                tracing::info!(room_code = %self.room.code, %new_host, "host migrated");
            }
        }
        // Full state to everyone, the newcomer included.
        self.broadcast_room_updated();
    }

    fn handle_submit(&mut self, subscriber_id: SubscriberId, text: String) {
        let Some(by) = self.bound_player(subscriber_id) else {
            return;
        };
        let trimmed = match crate::protocol::validation::validate_item_text(&text) {
            Ok(trimmed) => trimmed.to_owned(),
            Err(error) => {
                self.send_error(subscriber_id, error);
                return;
            }
        };
        // Duplicate text is reported ahead of turn ownership, so a re-submit
        // of an existing item reads as DUPLICATE_ITEM whoever sends it.
        if let Err(error) = self.room.require_item_text_free(&trimmed) {
            self.send_error(subscriber_id, error);
            return;
        }
        if let Err(error) = self.room.require_submission_right(by) {
            self.send_error(subscriber_id, error);
            return;
        }
        if let Some(pending) = &self.pending {
            let error = if crate::protocol::validation::normalize_item_text(&pending.text)
                == crate::protocol::validation::normalize_item_text(&trimmed)
            {
                RoomError::new(ErrorCode::DuplicateItem)
            } else {
                RoomError::with_message(
                    ErrorCode::NotYourTurn,
                    "A submission is already being processed",
                )
            };
            self.send_error(subscriber_id, error);
            return;
        }

        // Reserve the turn and resolve the emoji off the command loop; the
        // submission completes when EmojiResolved re-enters.
        self.next_submission_id += 1;
        let submission_id = self.next_submission_id;
        self.pending = Some(PendingSubmission {
            id: submission_id,
            player_id: by,
            subscriber_id,
            text: trimmed.clone(),
            room_epoch: self.room.epoch,
        });

        let emoji = Arc::clone(&self.emoji);
        let cmd_tx = self.cmd_tx.clone();
        tokio::spawn(async move {
            let emoji = emoji.emoji_for(&trimmed).await;
            let _ = cmd_tx
                .send(RoomCommand::EmojiResolved {
                    submission_id,
                    emoji,
                })
                .await;
        });
    }

    fn handle_emoji_resolved(&mut self, submission_id: u64, emoji: String) {
        let Some(pending) = self
            .pending
            .take_if(|p| p.id == submission_id)
        else {
            tracing::warn!(submission_id, "dropping emoji resolution with no reservation");
            return;
        };

        if pending.room_epoch != self.room.epoch
            || self.room.status != crate::protocol::RoomStatus::InProgress
        {
            self.send_error(
                pending.subscriber_id,
                RoomError::with_message(
                    ErrorCode::RoomEnded,
                    "The room changed while the submission was being processed",
                ),
            );
            return;
        }

        let emoji = if is_valid_emoji(&emoji) {
            emoji
        } else {
            fallback_emoji(&pending.text).to_string()
        };

        let now = Utc::now();
        let item_id = self
            .room
            .push_item(pending.text, emoji, pending.player_id, now);
        self.touch(now);

        if let Some(item) = self.room.item(item_id) {
            let event = ServerEvent::ItemSubmitted {
                item: item_snapshot(item),
            };
            self.broadcast(&event);
        }

        if self.room.is_full() {
            self.room.end_game();
            self.timers.cancel(TimerKind::Turn);
            tracing::info!(room_code = %self.room.code, "game ended");
            self.broadcast(&ServerEvent::GameEnded);
        } else {
            let (player_id, deadline) = self.room.advance_turn(now);
            match deadline {
                Some(deadline) => self.timers.arm(TimerKind::Turn, deadline),
                None => self.timers.cancel(TimerKind::Turn),
            }
            self.broadcast(&ServerEvent::TurnChanged {
                player_id,
                timer_end_at: deadline,
            });
        }

        // A fresh item opens a fresh ranking window; a previous window, if
        // any, is superseded either way.
        match self.room.ranking_deadline {
            Some(deadline) => self.timers.arm(TimerKind::Ranking, deadline),
            None => self.timers.cancel(TimerKind::Ranking),
        }

        self.broadcast_room_updated();
    }

    fn handle_rank(&mut self, subscriber_id: SubscriberId, item_id: ItemId, ranking: u32) {
        let Some(by) = self.bound_player(subscriber_id) else {
            return;
        };
        if let Err(error) = self.room.set_rank(by, item_id, ranking) {
            self.send_error(subscriber_id, error);
            return;
        }
        self.touch(Utc::now());

        // Close the window early once every present player has ranked the
        // item it tracks.
        if self.room.ranking_item_id == Some(item_id)
            && self.room.all_connected_ranked(item_id)
        {
            self.room.clear_ranking_window();
            self.timers.cancel(TimerKind::Ranking);
        }
        self.broadcast_room_updated();
    }

    fn handle_skip(&mut self, subscriber_id: SubscriberId) {
        let Some(by) = self.bound_player(subscriber_id) else {
            return;
        };
        if let Err(error) = self.room.require_skip_right(by) {
            self.send_error(subscriber_id, error);
            return;
        }
        if self.pending.is_some() {
            self.send_error(
                subscriber_id,
                RoomError::with_message(
                    ErrorCode::NotYourTurn,
                    "A submission is already being processed",
                ),
            );
            return;
        }
        self.touch(Utc::now());
        self.advance_turn_and_broadcast();
    }

    fn handle_update_config(&mut self, subscriber_id: SubscriberId, patch: RoomOptionsPatch) {
        let Some(by) = self.bound_player(subscriber_id) else {
            return;
        };
        match self.room.update_config(by, &patch) {
            Ok(config) => {
                self.touch(Utc::now());
                self.broadcast(&ServerEvent::ConfigUpdated { config });
                self.broadcast_room_updated();
            }
            Err(error) => self.send_error(subscriber_id, error),
        }
    }

    fn handle_reset(&mut self, subscriber_id: SubscriberId) {
        let Some(by) = self.bound_player(subscriber_id) else {
            return;
        };
        match self.room.reset(by) {
            Ok(()) => {
                self.touch(Utc::now());
                self.timers.cancel(TimerKind::Turn);
                self.timers.cancel(TimerKind::Ranking);
                tracing::info!(room_code = %self.room.code, "room reset to lobby");
                let event = ServerEvent::RoomReset {
                    room: self.room.snapshot(),
                };
                self.broadcast(&event);
                self.broadcast_room_updated();
            }
            Err(error) => self.send_error(subscriber_id, error),
        }
    }

    // ------------------------------------------------------------------
    // Timer-originated commands
    // ------------------------------------------------------------------

    fn handle_turn_expired(&mut self, epoch: u64) {
        if epoch != self.timers.turn_epoch() {
            tracing::trace!(room_code = %self.room.code, epoch, "stale turn timer dropped");
            return;
        }
        if self.room.status != crate::protocol::RoomStatus::InProgress {
            return;
        }
        if self.pending.is_some() {
            // A submission is resolving; the turn advance it performs will
            // arm the next timer.
            return;
        }
        tracing::debug!(room_code = %self.room.code, "turn timer expired, skipping turn");
        self.advance_turn_and_broadcast();
    }

    fn handle_ranking_expired(&mut self, epoch: u64) {
        if epoch != self.timers.ranking_epoch() {
            tracing::trace!(room_code = %self.room.code, epoch, "stale ranking timer dropped");
            return;
        }
        let Some(item_id) = self.room.ranking_item_id else {
            return;
        };
        tracing::debug!(
            room_code = %self.room.code,
            %item_id,
            "ranking window expired, auto-assigning ranks"
        );
        self.room.auto_assign_ranks(item_id);
        self.room.clear_ranking_window();
        self.broadcast_room_updated();
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    /// Shared by skip and turn expiry. Deliberately does not bump
    /// `last_activity`: a timer rotating turns in an abandoned room must not
    /// keep deferring its TTL eviction.
    fn advance_turn_and_broadcast(&mut self) {
        let now = Utc::now();
        let (player_id, deadline) = self.room.advance_turn(now);
        match deadline {
            Some(deadline) => self.timers.arm(TimerKind::Turn, deadline),
            None => self.timers.cancel(TimerKind::Turn),
        }
        self.broadcast(&ServerEvent::TurnChanged {
            player_id,
            timer_end_at: deadline,
        });
        self.broadcast_room_updated();
    }

    /// Resolve a subscriber to its bound player; anonymous subscribers get a
    /// targeted error since they cannot mutate room state.
    fn bound_player(&mut self, subscriber_id: SubscriberId) -> Option<PlayerId> {
        let player = self.hub.player_of(subscriber_id);
        if player.is_none() {
            self.send_error(
                subscriber_id,
                RoomError::with_message(
                    ErrorCode::PlayerNotFound,
                    "Identify before issuing room commands",
                ),
            );
        }
        player
    }

    fn broadcast_room_updated(&mut self) {
        let event = ServerEvent::RoomUpdated {
            room: self.room.snapshot(),
        };
        self.broadcast(&event);
    }

    fn broadcast(&mut self, event: &ServerEvent) {
        let doomed = self.hub.broadcast(event);
        self.drop_subscribers(doomed);
    }

    fn send_to(&mut self, subscriber_id: SubscriberId, event: &ServerEvent) {
        if !self.hub.send(subscriber_id, event) {
            self.drop_subscribers(smallvec![subscriber_id]);
        }
    }

    fn send_error(&mut self, subscriber_id: SubscriberId, error: RoomError) {
        let event = ServerEvent::Error {
            code: error.code,
            message: error.message,
        };
        self.send_to(subscriber_id, &event);
    }

    /// Remove subscribers and downgrade presence for players that lost their
    /// last channel. Presence changes broadcast, which can doom further slow
    /// subscribers, so this drains a worklist rather than recursing.
    fn drop_subscribers(&mut self, mut doomed: DoomedList) {
        while let Some(id) = doomed.pop() {
            let Some(subscriber) = self.hub.remove(id) else {
                continue;
            };
            self.sync_subscriber_gauge();
            if let Some(player_id) = subscriber.player_id {
                doomed.extend(self.downgrade_presence_if_gone(player_id));
            }
        }
    }

    /// If no subscriber remains for the player, mark them disconnected,
    /// announce the departure, and migrate the host seat. Returns any
    /// subscribers doomed by those broadcasts.
    fn downgrade_presence_if_gone(&mut self, player_id: PlayerId) -> DoomedList {
        let mut doomed = DoomedList::new();
        if self.hub.is_player_connected(player_id) {
            return doomed;
        }
        let was_connected = self.room.set_connected(player_id, false);
        if was_connected != Some(true) {
            return doomed;
        }
        tracing::info!(room_code = %self.room.code, %player_id, "player disconnected");
        doomed.extend(self.hub.broadcast(&ServerEvent::PlayerLeft { player_id }));
        if let Some(new_host) = self.room.migrate_host() {
            tracing::info!(room_code = %self.room.code, %new_host, "host migrated");
        }
        doomed.extend(self.hub.broadcast(&ServerEvent::RoomUpdated {
            room: self.room.snapshot(),
        }));
        doomed
    }

    fn sweep_heartbeats(&mut self) {
        let grace = Duration::seconds(
            (self.config.server.heartbeat_interval_secs
                * self.config.server.heartbeat_miss_allowance) as i64,
        );
        let cutoff = Utc::now() - grace;
        let expired = self.hub.expired(cutoff);
        if !expired.is_empty() {
            tracing::debug!(
                room_code = %self.room.code,
                count = expired.len(),
                "closing subscribers after missed heartbeats"
            );
            self.drop_subscribers(expired);
        }
    }

    fn sync_subscriber_gauge(&self) {
        self.meta
            .subscribers
            .store(self.hub.subscriber_count(), Ordering::Relaxed);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.room.touch(now);
        self.meta
            .last_activity
            .store(now.timestamp(), Ordering::Relaxed);
    }
}
