//! Player records.
//!
//! A player is an opaque id, a display name, and a running score. Players
//! live in insertion order inside [`GameState`](super::GameState); that order
//! is what presentation layers render.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Id prefix used for seeded players (`player-1`, `player-2`, ...).
pub const SEED_ID_PREFIX: &str = "player-";

/// A participant with a score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Caller-supplied unique id
    pub id: String,

    /// Display name
    pub name: String,

    /// Current score
    pub score: i64,
}

impl Player {
    pub fn new(id: impl Into<String>, name: impl Into<String>, score: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            score,
        }
    }

    /// Copy of this player with a different score.
    pub fn with_score(&self, score: i64) -> Self {
        Self {
            score,
            ..self.clone()
        }
    }

    /// Copy of this player with a different name.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "score": self.score
        })
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.score)
    }
}

/// Name given to the player occupying `position` (1-based).
pub fn default_player_name(position: usize) -> String {
    format!("Player {}", position)
}

/// Id given to the seeded player at `position` (1-based).
pub fn seed_player_id(position: usize) -> String {
    format!("{}{}", SEED_ID_PREFIX, position)
}
