//! State management module for score keeping.
//!
//! This module provides the core state types and the store:
//!
//! - `player` - Player records
//! - `history` - Score change log and its display form
//! - `game` - Immutable game snapshots and the command reducer
//! - `store` - Single-writer store with snapshot publishing and subscriptions
//! - `config` - Store configuration
//! - `input` - Parsing of user-entered numbers
//! - `batch` - Coalescing of rapid adjustments
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                          ScoreStore                            │
//! │                                                                │
//! │   Command ──▶ GameState::apply(now) ──▶ Arc<GameState>         │
//! │                      │                        │                │
//! │                      ▼                        ▼                │
//! │               Err(ScoreError)          subscribers (in order)  │
//! │   adjust(delta) ──▶ AdjustmentBatcher ──(window elapsed)──▶ ... │
//! │                     (only when batch_window_ms > 0)            │
//! │                                                                │
//! │  ┌──────────────┐   ┌────────────────┐   ┌─────────────────┐   │
//! │  │ players      │   │ default_score  │   │ history         │   │
//! │  │ (insertion   │   │                │   │ (append-only,   │   │
//! │  │  order)      │   │                │   │  bulk-cleared)  │   │
//! │  └──────────────┘   └────────────────┘   └─────────────────┘   │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use scorekeeper_state::state::{ScoreStore, StoreConfig};
//!
//! let mut store = ScoreStore::new(StoreConfig::default().with_seed_players(0));
//! store.add_player("a", "Alice").unwrap();
//! store.increment_by("a", 5).unwrap();
//!
//! let state = store.state();
//! assert_eq!(state.get_player("a").unwrap().score, 55);
//! assert_eq!(state.history().len(), 1);
//! ```

pub mod batch;
pub mod config;
pub mod game;
pub mod history;
pub mod input;
pub mod player;
pub mod store;

// Re-export commonly used types
pub use batch::{AdjustmentBatcher, PendingAdjustment};
pub use config::{ConfigError, StoreConfig, DEFAULT_MIN_PLAYERS, DEFAULT_QUICK_ADJUSTMENTS};
pub use game::{Command, GameState, Outcome, ScoreError, DEFAULT_AMOUNT, DEFAULT_SCORE};
pub use history::{history_view, history_view_in, Direction, HistoryLine, ScoreChange};
pub use input::{parse_amount_input, parse_score_input, InputError};
pub use player::{default_player_name, Player};
pub use store::{Clock, ManualClock, ScoreStore, StoreEvent, SubscriptionId, SystemClock};
