//! Score change history.
//!
//! History is append-only. Entries are never edited or removed one at a
//! time; the whole log is cleared by a bulk reset.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::player::Player;

/// Which way a score moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Increment,
    Decrement,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increment => "increment",
            Self::Decrement => "decrement",
        }
    }

    /// +1 or -1.
    pub fn sign(&self) -> i64 {
        match self {
            Self::Increment => 1,
            Self::Decrement => -1,
        }
    }
}

/// One accepted score adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreChange {
    /// Id of the adjusted player (may no longer exist)
    pub actor: String,

    pub direction: Direction,

    /// Absolute size of the change
    pub magnitude: u32,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl ScoreChange {
    pub fn new(
        actor: impl Into<String>,
        direction: Direction,
        magnitude: u32,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            actor: actor.into(),
            direction,
            magnitude,
            timestamp,
        }
    }

    /// Signed change applied to the score.
    pub fn delta(&self) -> i64 {
        self.direction.sign() * i64::from(self.magnitude)
    }

    /// `+5` / `-5`.
    pub fn delta_label(&self) -> String {
        match self.direction {
            Direction::Increment => format!("+{}", self.magnitude),
            Direction::Decrement => format!("-{}", self.magnitude),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "actor": self.actor,
            "direction": self.direction.as_str(),
            "magnitude": self.magnitude,
            "timestamp": self.timestamp.timestamp_millis()
        })
    }
}

/// A history entry resolved for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryLine {
    pub actor: String,

    /// Current player name, or the raw id when the player was removed
    pub display_name: String,

    pub direction: Direction,

    /// Signed label such as `+5`
    pub delta: String,

    /// Wall-clock time of day (`HH:MM:SS`) in the requested timezone
    pub time: String,

    #[serde(skip)]
    pub timestamp: DateTime<Utc>,
}

/// Resolve history against the current players, newest entry first, with
/// times in the host's local timezone.
pub fn history_view(history: &[ScoreChange], players: &[Player]) -> Vec<HistoryLine> {
    history_view_in(history, players, &Local)
}

/// Same as [`history_view`], with times rendered in `tz`.
pub fn history_view_in<Tz>(
    history: &[ScoreChange],
    players: &[Player],
    tz: &Tz,
) -> Vec<HistoryLine>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let names: HashMap<&str, &str> = players
        .iter()
        .map(|p| (p.id.as_str(), p.name.as_str()))
        .collect();

    history
        .iter()
        .rev()
        .map(|change| HistoryLine {
            actor: change.actor.clone(),
            display_name: names
                .get(change.actor.as_str())
                .map(|name| name.to_string())
                .unwrap_or_else(|| change.actor.clone()),
            direction: change.direction,
            delta: change.delta_label(),
            time: change
                .timestamp
                .with_timezone(tz)
                .format("%H:%M:%S")
                .to_string(),
            timestamp: change.timestamp,
        })
        .collect()
}
