//! Coalescing of rapid score adjustments.
//!
//! Button mashing produces many tiny adjustments. The batcher sums them per
//! player while a window is open and hands back one adjustment per player
//! when the window closes. It sits entirely outside the reducer: the store
//! only ever sees the coalesced increments/decrements.

use chrono::{DateTime, Duration, Utc};

use super::config::StoreConfig;
use super::game::{Command, ScoreError};

/// A player's accumulated delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAdjustment {
    pub player_id: String,
    pub delta: i64,
}

#[derive(Debug, Clone)]
pub struct AdjustmentBatcher {
    window: Duration,

    /// Pending deltas in first-touch order
    pending: Vec<PendingAdjustment>,

    /// When the current window opened
    opened_at: Option<DateTime<Utc>>,
}

impl AdjustmentBatcher {
    pub fn new(window: std::time::Duration) -> Self {
        Self {
            window: Duration::from_std(window).unwrap_or(Duration::MAX),
            pending: Vec::new(),
            opened_at: None,
        }
    }

    /// Batcher for the configured window, or `None` when batching is off.
    pub fn from_config(config: &StoreConfig) -> Option<Self> {
        if config.batch_window_ms == 0 {
            return None;
        }
        Some(Self::new(config.batch_window()))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a signed adjustment. Opens a window if none is open.
    ///
    /// A push that would take a player's net delta beyond what one
    /// adjustment can carry is rejected and leaves the batch as it was.
    pub fn push(
        &mut self,
        player_id: &str,
        delta: i64,
        now: DateTime<Utc>,
    ) -> Result<(), ScoreError> {
        if delta == 0 {
            return Ok(());
        }

        let net = self
            .pending_delta(player_id)
            .checked_add(delta)
            .filter(|net| net.unsigned_abs() <= u64::from(u32::MAX))
            .ok_or(ScoreError::AdjustmentOutOfRange(delta))?;

        match self.pending.iter_mut().find(|p| p.player_id == player_id) {
            Some(entry) => entry.delta = net,
            None => self.pending.push(PendingAdjustment {
                player_id: player_id.to_string(),
                delta: net,
            }),
        }
        self.opened_at.get_or_insert(now);
        Ok(())
    }

    /// Net delta currently pending for a player.
    pub fn pending_delta(&self, player_id: &str) -> i64 {
        self.pending
            .iter()
            .find(|p| p.player_id == player_id)
            .map(|p| p.delta)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Check whether the open window has elapsed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.opened_at {
            Some(opened) => now - opened >= self.window,
            None => false,
        }
    }

    /// Take the pending adjustments as commands, closing the window.
    ///
    /// Players whose adjustments cancelled out produce nothing.
    pub fn drain(&mut self) -> Vec<Command> {
        self.opened_at = None;
        self.pending
            .drain(..)
            // push keeps every net delta within a single adjustment's range
            .filter_map(|p| Command::adjust(p.player_id, p.delta).ok().flatten())
            .collect()
    }
}
