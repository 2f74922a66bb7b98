//! Game state and the score reducer.
//!
//! [`GameState`] is an immutable snapshot. Every command produces a brand new
//! snapshot (or reports that nothing changed); the previous one is never
//! touched, so readers can keep holding old snapshots safely.
//!
//! ```text
//! GameState + Command + now  →  apply()  →  Outcome::Changed(GameState)
//!                                            Outcome::Unchanged
//!                                            Err(ScoreError)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::history::{history_view, history_view_in, Direction, HistoryLine, ScoreChange};
use super::player::{default_player_name, Player};

/// Baseline score for a fresh game.
pub const DEFAULT_SCORE: i64 = 50;

/// Adjustment size used when the caller does not name one.
pub const DEFAULT_AMOUNT: u32 = 1;

/// Commands accepted by the reducer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    AddPlayer { id: String, name: String },
    RemovePlayer { id: String },
    Increment { id: String, amount: u32 },
    Decrement { id: String, amount: u32 },
    SetDefaultScore { score: i64 },
    RenamePlayer { id: String, name: String },
    ResetAll,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddPlayer { .. } => "add_player",
            Self::RemovePlayer { .. } => "remove_player",
            Self::Increment { .. } => "increment",
            Self::Decrement { .. } => "decrement",
            Self::SetDefaultScore { .. } => "set_default_score",
            Self::RenamePlayer { .. } => "rename_player",
            Self::ResetAll => "reset_all",
        }
    }

    /// Build the increment/decrement command for a signed delta.
    ///
    /// Returns `Ok(None)` for a zero delta. Deltas larger than a single
    /// adjustment can carry are rejected.
    pub fn adjust(id: impl Into<String>, delta: i64) -> Result<Option<Self>, ScoreError> {
        let amount = u32::try_from(delta.unsigned_abs())
            .map_err(|_| ScoreError::AdjustmentOutOfRange(delta))?;
        let id = id.into();
        Ok(match delta.signum() {
            1 => Some(Self::Increment { id, amount }),
            -1 => Some(Self::Decrement { id, amount }),
            _ => None,
        })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddPlayer { id, name } => write!(f, "add_player({}, {})", id, name),
            Self::RemovePlayer { id } => write!(f, "remove_player({})", id),
            Self::Increment { id, amount } => write!(f, "increment({}, {})", id, amount),
            Self::Decrement { id, amount } => write!(f, "decrement({}, {})", id, amount),
            Self::SetDefaultScore { score } => write!(f, "set_default_score({})", score),
            Self::RenamePlayer { id, name } => write!(f, "rename_player({}, {})", id, name),
            Self::ResetAll => write!(f, "reset_all"),
        }
    }
}

/// Command rejections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    #[error("Player id already in use: {0}")]
    DuplicatePlayerId(String),

    #[error("Adjustment out of range: {0}")]
    AdjustmentOutOfRange(i64),
}

/// Result of applying a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A new snapshot was produced
    Changed(GameState),
    /// The command was accepted but nothing differs
    Unchanged,
}

impl Outcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed(_))
    }

    /// The resulting state, falling back to `current` when unchanged.
    pub fn into_state(self, current: &GameState) -> GameState {
        match self {
            Self::Changed(state) => state,
            Self::Unchanged => current.clone(),
        }
    }
}

/// Full scoreboard snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGameState")]
pub struct GameState {
    /// Players in insertion order, ids unique
    players: Vec<Player>,

    /// Score given to new players and restored on reset
    default_score: i64,

    /// Accepted adjustments, oldest first
    history: Vec<ScoreChange>,
}

/// Unvalidated wire shape of [`GameState`].
#[derive(Deserialize)]
struct RawGameState {
    players: Vec<Player>,
    default_score: i64,
    #[serde(default)]
    history: Vec<ScoreChange>,
}

impl TryFrom<RawGameState> for GameState {
    type Error = ScoreError;

    fn try_from(raw: RawGameState) -> Result<Self, Self::Error> {
        Self::from_parts(raw.players, raw.default_score, raw.history)
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(DEFAULT_SCORE)
    }
}

impl GameState {
    /// Empty game with the given default score.
    pub fn new(default_score: i64) -> Self {
        Self {
            players: Vec::new(),
            default_score,
            history: Vec::new(),
        }
    }

    /// Rebuild a snapshot from its parts, enforcing unique player ids.
    pub fn from_parts(
        players: Vec<Player>,
        default_score: i64,
        history: Vec<ScoreChange>,
    ) -> Result<Self, ScoreError> {
        let mut seen = std::collections::HashSet::new();
        for player in &players {
            if !seen.insert(player.id.as_str()) {
                return Err(ScoreError::DuplicatePlayerId(player.id.clone()));
            }
        }

        Ok(Self {
            players,
            default_score,
            history,
        })
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn default_score(&self) -> i64 {
        self.default_score
    }

    pub fn history(&self) -> &[ScoreChange] {
        &self.history
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn get_player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn has_player(&self, id: &str) -> bool {
        self.get_player(id).is_some()
    }

    pub fn player_ids(&self) -> impl Iterator<Item = &str> {
        self.players.iter().map(|p| p.id.as_str())
    }

    /// Name of the next player added through the settings flow.
    pub fn next_player_name(&self) -> String {
        default_player_name(self.players.len() + 1)
    }

    /// History resolved for display, newest first, in local time.
    pub fn history_view(&self) -> Vec<HistoryLine> {
        history_view(&self.history, &self.players)
    }

    /// History resolved for display with times rendered in `tz`.
    pub fn history_view_in<Tz>(&self, tz: &Tz) -> Vec<HistoryLine>
    where
        Tz: chrono::TimeZone,
        Tz::Offset: fmt::Display,
    {
        history_view_in(&self.history, &self.players, tz)
    }

    /// Apply a command, returning the next snapshot.
    pub fn apply(&self, command: &Command, now: DateTime<Utc>) -> Result<Outcome, ScoreError> {
        match command {
            Command::AddPlayer { id, name } => self.add_player(id, name),
            Command::RemovePlayer { id } => Ok(self.remove_player(id)),
            Command::Increment { id, amount } => {
                Ok(self.adjust_score(id, Direction::Increment, *amount, now))
            }
            Command::Decrement { id, amount } => {
                Ok(self.adjust_score(id, Direction::Decrement, *amount, now))
            }
            Command::SetDefaultScore { score } => Ok(self.set_default_score_for_all(*score)),
            Command::RenamePlayer { id, name } => Ok(self.rename_player(id, name)),
            Command::ResetAll => Ok(self.reset_all()),
        }
    }

    /// Append a player starting at the default score.
    pub fn add_player(&self, id: &str, name: &str) -> Result<Outcome, ScoreError> {
        if self.has_player(id) {
            return Err(ScoreError::DuplicatePlayerId(id.to_string()));
        }

        let mut players = self.players.clone();
        players.push(Player::new(id, name, self.default_score));

        Ok(Outcome::Changed(Self {
            players,
            ..self.clone()
        }))
    }

    /// Drop a player. History referencing it is kept.
    pub fn remove_player(&self, id: &str) -> Outcome {
        if !self.has_player(id) {
            return Outcome::Unchanged;
        }

        Outcome::Changed(Self {
            players: self.players.iter().filter(|p| p.id != id).cloned().collect(),
            ..self.clone()
        })
    }

    pub fn increment_score(&self, id: &str, amount: u32, now: DateTime<Utc>) -> Outcome {
        self.adjust_score(id, Direction::Increment, amount, now)
    }

    pub fn decrement_score(&self, id: &str, amount: u32, now: DateTime<Utc>) -> Outcome {
        self.adjust_score(id, Direction::Decrement, amount, now)
    }

    /// Shared path for increment and decrement.
    ///
    /// Unknown ids, zero amounts and adjustments that would overflow the
    /// score leave both players and history alone.
    fn adjust_score(
        &self,
        id: &str,
        direction: Direction,
        amount: u32,
        now: DateTime<Utc>,
    ) -> Outcome {
        if amount == 0 {
            return Outcome::Unchanged;
        }
        let Some(current) = self.get_player(id).map(|p| p.score) else {
            return Outcome::Unchanged;
        };
        let Some(score) = current.checked_add(direction.sign() * i64::from(amount)) else {
            return Outcome::Unchanged;
        };

        let players = self
            .players
            .iter()
            .map(|p| if p.id == id { p.with_score(score) } else { p.clone() })
            .collect();

        let mut history = self.history.clone();
        history.push(ScoreChange::new(id, direction, amount, now));

        Outcome::Changed(Self {
            players,
            default_score: self.default_score,
            history,
        })
    }

    /// Change the default score and reset everyone to it.
    ///
    /// Same value as the current default is a no-op.
    pub fn set_default_score_for_all(&self, score: i64) -> Outcome {
        if score == self.default_score {
            return Outcome::Unchanged;
        }
        Outcome::Changed(self.reset_to(score))
    }

    /// Reset every score to the current default and clear history.
    pub fn reset_all(&self) -> Outcome {
        let already_reset = self.history.is_empty()
            && self.players.iter().all(|p| p.score == self.default_score);
        if already_reset {
            return Outcome::Unchanged;
        }
        Outcome::Changed(self.reset_to(self.default_score))
    }

    fn reset_to(&self, score: i64) -> Self {
        Self {
            players: self.players.iter().map(|p| p.with_score(score)).collect(),
            default_score: score,
            history: Vec::new(),
        }
    }

    pub fn rename_player(&self, id: &str, name: &str) -> Outcome {
        match self.get_player(id) {
            Some(player) if player.name != name => {}
            _ => return Outcome::Unchanged,
        }

        Outcome::Changed(Self {
            players: self
                .players
                .iter()
                .map(|p| if p.id == id { p.with_name(name) } else { p.clone() })
                .collect(),
            ..self.clone()
        })
    }

    /// Convert to JSON for sending to clients.
    pub fn to_json(&self) -> serde_json::Value {
        let players: Vec<serde_json::Value> = self.players.iter().map(|p| p.to_json()).collect();
        let history: Vec<serde_json::Value> = self.history.iter().map(|h| h.to_json()).collect();

        serde_json::json!({
            "players": players,
            "default_score": self.default_score,
            "history": history
        })
    }
}
