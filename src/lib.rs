//! Score Keeper State Library
//!
//! This crate provides the state core of a multi-player score keeper for
//! tabletop and party games.
//!
//! # Overview
//!
//! The state module provides:
//!
//! - **Game Snapshots** - Players in insertion order, a shared default score,
//!   and a chronological log of score changes. Snapshots are immutable.
//!
//! - **Command Reducer** - Add, remove, rename, adjust, set default, reset.
//!   Each command turns one snapshot into the next.
//!
//! - **Score Store** - The single writer. Publishes snapshots and notifies
//!   subscribers after every accepted command.
//!
//! - **Adjustment Batching** - Optional coalescing of rapid button presses.
//!
//! # Design Principles
//!
//! 1. **Pure transitions** - A command never mutates the snapshot it was
//!    applied to. Unknown player ids are quiet no-ops.
//!
//! 2. **One writer** - Only the store replaces the current snapshot; readers
//!    hold `Arc<GameState>` freely.
//!
//! 3. **No rendering** - This crate is pure state, no UI.
//!
//! 4. **Serialization-ready** - All types can be converted to JSON for clients.
//!
//! # Example
//!
//! ```rust
//! use scorekeeper_state::state::{ScoreStore, StoreConfig};
//!
//! let config = StoreConfig::default().with_seed_players(0);
//! let mut store = ScoreStore::new(config);
//!
//! store.add_player("a", "Alice").unwrap();
//! store.add_player("b", "Bob").unwrap();
//! store.subscribe(|event| println!("{} -> {} players", event.command, event.state.player_count()));
//!
//! store.increment_by("a", 5).unwrap();
//! store.set_default_score_for_all(100).unwrap();
//!
//! let state = store.state();
//! assert!(state.players().iter().all(|p| p.score == 100));
//! assert!(state.history().is_empty());
//! ```

pub mod state;

// Re-export everything from state module at crate root
pub use state::*;
