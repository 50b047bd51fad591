//! Per-room timer engine.
//!
//! Each logical timer (submission turn, per-item ranking) carries an epoch
//! that is bumped on every (re)arm and cancel. Expiry is delivered as a
//! command into the actor's queue; the actor compares the carried epoch to
//! the current one and drops mismatches, which removes every race between a
//! rearm/reset and an already-sleeping expiry task.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::commands::RoomCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Turn,
    Ranking,
}

#[derive(Debug)]
pub struct Timers {
    cmd_tx: mpsc::Sender<RoomCommand>,
    turn_epoch: u64,
    ranking_epoch: u64,
}

impl Timers {
    pub fn new(cmd_tx: mpsc::Sender<RoomCommand>) -> Self {
        Self {
            cmd_tx,
            turn_epoch: 0,
            ranking_epoch: 0,
        }
    }

    pub fn turn_epoch(&self) -> u64 {
        self.turn_epoch
    }

    pub fn ranking_epoch(&self) -> u64 {
        self.ranking_epoch
    }

    /// Arm (or rearm) a timer to fire at `deadline`. Any previously armed
    /// instance of the same timer becomes stale.
    pub fn arm(&mut self, kind: TimerKind, deadline: DateTime<Utc>) {
        let epoch = self.bump(kind);
        let cmd_tx = self.cmd_tx.clone();
        tokio::spawn(async move {
            let wait = (deadline - Utc::now())
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);
            tokio::time::sleep(wait).await;
            let command = match kind {
                TimerKind::Turn => RoomCommand::TurnTimerExpired { epoch },
                TimerKind::Ranking => RoomCommand::RankingTimerExpired { epoch },
            };
            // The room may already be gone; a dead actor is fine.
            let _ = cmd_tx.send(command).await;
        });
    }

    /// Invalidate any in-flight expiry of this timer.
    pub fn cancel(&mut self, kind: TimerKind) {
        self.bump(kind);
    }

    fn bump(&mut self, kind: TimerKind) -> u64 {
        let slot = match kind {
            TimerKind::Turn => &mut self.turn_epoch,
            TimerKind::Ranking => &mut self.ranking_epoch,
        };
        *slot += 1;
        *slot
    }
}
