//! The score store.
//!
//! `ScoreStore` is the single writer. It owns the current snapshot, applies
//! commands one at a time, publishes each new snapshot by replacing an
//! `Arc`, and then notifies subscribers in the order they subscribed.
//!
//! Readers call [`ScoreStore::state`] and keep the returned `Arc` for as long
//! as they like; it never changes underneath them.

use chrono::{DateTime, TimeZone, Utc};
use log::{debug, warn};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use super::batch::AdjustmentBatcher;
use super::config::StoreConfig;
use super::game::{Command, GameState, Outcome, ScoreError, DEFAULT_AMOUNT};
use super::player::{default_player_name, seed_player_id};

/// Time source for history timestamps.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock, truncated to milliseconds.
///
/// Never returns a reading earlier than one it already handed out, even if
/// the system clock steps backwards.
#[derive(Debug, Default)]
pub struct SystemClock {
    last_ms: AtomicI64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now().timestamp_millis();
        let previous = self.last_ms.fetch_max(wall, Ordering::SeqCst);
        let ms = wall.max(previous);
        Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now)
    }
}

/// Hand-driven clock for tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    ms: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            ms: AtomicI64::new(start_ms),
        }
    }

    pub fn advance_ms(&self, ms: i64) {
        self.ms.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set_ms(&self, ms: i64) {
        self.ms.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.ms.load(Ordering::SeqCst))
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Handle returned by [`ScoreStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Delivered to subscribers after every accepted command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent {
    pub command: Command,
    /// False when the command was accepted as a no-op
    pub changed: bool,
    /// Snapshot published by this command
    pub state: Arc<GameState>,
}

type Subscriber = Box<dyn FnMut(&StoreEvent)>;

/// Single source of truth for a scoreboard.
pub struct ScoreStore {
    state: Arc<GameState>,
    config: StoreConfig,
    clock: Box<dyn Clock>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
    /// Present when the config asks for a coalescing window
    batcher: Option<AdjustmentBatcher>,
}

impl fmt::Debug for ScoreStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoreStore")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("subscribers", &self.subscribers.len())
            .field("batcher", &self.batcher)
            .finish()
    }
}

impl Default for ScoreStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl ScoreStore {
    /// Create a store on the system clock, seeded per `config`.
    pub fn new(config: StoreConfig) -> Self {
        Self::with_clock(config, Box::new(SystemClock::new()))
    }

    pub fn with_clock(config: StoreConfig, clock: Box<dyn Clock>) -> Self {
        let state = seeded_state(&config);
        Self::from_state(state, config, clock)
    }

    /// Resume from an existing snapshot. No seeding happens.
    pub fn from_state(state: GameState, config: StoreConfig, clock: Box<dyn Clock>) -> Self {
        let batcher = AdjustmentBatcher::from_config(&config);
        Self {
            state: Arc::new(state),
            config,
            clock,
            subscribers: Vec::new(),
            next_subscription: 0,
            batcher,
        }
    }

    /// Current snapshot.
    pub fn state(&self) -> Arc<GameState> {
        Arc::clone(&self.state)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Register a callback fired after every accepted command.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&StoreEvent) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Apply one command, publish the result, then notify.
    ///
    /// Adjustments still waiting in a coalescing window are applied first,
    /// so history keeps the order in which commands were issued.
    pub fn dispatch(&mut self, command: Command) -> Result<StoreEvent, ScoreError> {
        self.flush_adjustments()?;
        self.apply_command(command)
    }

    fn apply_command(&mut self, command: Command) -> Result<StoreEvent, ScoreError> {
        debug!("Dispatching {}", command);

        let outcome = match self.state.apply(&command, self.clock.now()) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Rejected {}: {}", command, e);
                return Err(e);
            }
        };

        let changed = outcome.is_changed();
        if let Outcome::Changed(next) = outcome {
            self.state = Arc::new(next);
        } else {
            debug!("{} left state unchanged", command.name());
        }

        let event = StoreEvent {
            command,
            changed,
            state: Arc::clone(&self.state),
        };
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(&event);
        }
        Ok(event)
    }

    pub fn add_player(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<StoreEvent, ScoreError> {
        self.dispatch(Command::AddPlayer {
            id: id.into(),
            name: name.into(),
        })
    }

    /// Add a player named after its position (`Player 3`, ...).
    pub fn add_next_player(&mut self, id: impl Into<String>) -> Result<StoreEvent, ScoreError> {
        let name = self.state.next_player_name();
        self.add_player(id, name)
    }

    pub fn remove_player(&mut self, id: impl Into<String>) -> Result<StoreEvent, ScoreError> {
        self.dispatch(Command::RemovePlayer { id: id.into() })
    }

    /// Remove the most recently added player.
    ///
    /// Returns `None` when only `min_players` (or fewer) remain.
    pub fn remove_last_player(&mut self) -> Option<StoreEvent> {
        if self.state.player_count() <= self.config.min_players {
            debug!(
                "Not removing: {} players at minimum {}",
                self.state.player_count(),
                self.config.min_players
            );
            return None;
        }
        let id = self.state.players().last()?.id.clone();
        self.remove_player(id).ok()
    }

    /// Increment by [`DEFAULT_AMOUNT`].
    pub fn increment(&mut self, id: impl Into<String>) -> Result<StoreEvent, ScoreError> {
        self.increment_by(id, DEFAULT_AMOUNT)
    }

    pub fn increment_by(
        &mut self,
        id: impl Into<String>,
        amount: u32,
    ) -> Result<StoreEvent, ScoreError> {
        self.dispatch(Command::Increment {
            id: id.into(),
            amount,
        })
    }

    /// Decrement by [`DEFAULT_AMOUNT`].
    pub fn decrement(&mut self, id: impl Into<String>) -> Result<StoreEvent, ScoreError> {
        self.decrement_by(id, DEFAULT_AMOUNT)
    }

    pub fn decrement_by(
        &mut self,
        id: impl Into<String>,
        amount: u32,
    ) -> Result<StoreEvent, ScoreError> {
        self.dispatch(Command::Decrement {
            id: id.into(),
            amount,
        })
    }

    /// Signed adjustment as issued by a quick-adjust button.
    ///
    /// Without a coalescing window the adjustment is dispatched at once.
    /// With one, it is added to the open batch and `Ok(None)` is returned;
    /// the batch is applied by [`poll_adjustments`](Self::poll_adjustments),
    /// [`flush_adjustments`](Self::flush_adjustments) or the next dispatch.
    /// Zero dispatches nothing. A delta too large for a single adjustment is
    /// rejected without touching state.
    pub fn adjust(
        &mut self,
        id: impl Into<String>,
        delta: i64,
    ) -> Result<Option<StoreEvent>, ScoreError> {
        let id = id.into();
        self.poll_adjustments()?;

        let now = self.clock.now();
        let result = match self.batcher.as_mut() {
            Some(batcher) => batcher.push(&id, delta, now).map(|()| None),
            None => Command::adjust(id, delta),
        };

        match result {
            Ok(Some(command)) => self.dispatch(command).map(Some),
            Ok(None) => Ok(None),
            Err(e) => {
                warn!("Rejected adjustment: {}", e);
                Err(e)
            }
        }
    }

    /// Net delta waiting in the coalescing window for a player.
    pub fn pending_adjustment(&self, id: &str) -> i64 {
        self.batcher
            .as_ref()
            .map(|b| b.pending_delta(id))
            .unwrap_or(0)
    }

    /// Apply every pending coalesced adjustment now. Returns the number of
    /// commands applied.
    pub fn flush_adjustments(&mut self) -> Result<usize, ScoreError> {
        let commands = match self.batcher.as_mut() {
            Some(batcher) => batcher.drain(),
            None => return Ok(0),
        };

        let count = commands.len();
        for command in commands {
            self.apply_command(command)?;
        }
        if count > 0 {
            debug!("Flushed {} coalesced adjustments", count);
        }
        Ok(count)
    }

    /// Flush pending adjustments if the coalescing window has elapsed.
    pub fn poll_adjustments(&mut self) -> Result<usize, ScoreError> {
        let now = self.clock.now();
        let due = self.batcher.as_ref().is_some_and(|b| b.is_due(now));
        if due {
            self.flush_adjustments()
        } else {
            Ok(0)
        }
    }

    pub fn set_default_score_for_all(&mut self, score: i64) -> Result<StoreEvent, ScoreError> {
        self.dispatch(Command::SetDefaultScore { score })
    }

    pub fn rename_player(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<StoreEvent, ScoreError> {
        self.dispatch(Command::RenamePlayer {
            id: id.into(),
            name: name.into(),
        })
    }

    pub fn reset_all(&mut self) -> Result<StoreEvent, ScoreError> {
        self.dispatch(Command::ResetAll)
    }
}

fn seeded_state(config: &StoreConfig) -> GameState {
    let mut state = GameState::new(config.default_score);
    for position in 1..=config.seed_players {
        // Seed ids are generated sequentially and cannot collide.
        if let Ok(Outcome::Changed(next)) =
            state.add_player(&seed_player_id(position), &default_player_name(position))
        {
            state = next;
        }
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn store() -> ScoreStore {
        let config = StoreConfig::default().with_seed_players(0);
        ScoreStore::with_clock(config, Box::new(ManualClock::new(1_000)))
    }

    #[test]
    fn test_seeded_store() {
        let store = ScoreStore::new(StoreConfig::default());
        let state = store.state();

        let names: Vec<&str> = state.players().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Player 1", "Player 2"]);
        let ids: Vec<&str> = state.player_ids().collect();
        assert_eq!(ids, vec!["player-1", "player-2"]);
        assert!(state.players().iter().all(|p| p.score == 50));
    }

    #[test]
    fn test_dispatch_publishes_new_snapshot() {
        let mut store = store();
        store.add_player("a", "Alice").unwrap();

        let before = store.state();
        store.increment_by("a", 5).unwrap();
        let after = store.state();

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(before.get_player("a").unwrap().score, 50);
        assert_eq!(after.get_player("a").unwrap().score, 55);
    }

    #[test]
    fn test_noop_keeps_snapshot_identity() {
        let mut store = store();
        store.add_player("a", "Alice").unwrap();

        let before = store.state();
        let event = store.set_default_score_for_all(50).unwrap();
        assert!(!event.changed);
        assert!(Arc::ptr_eq(&before, &store.state()));
    }

    #[test]
    fn test_default_amount() {
        let mut store = store();
        store.add_player("a", "Alice").unwrap();
        store.increment("a").unwrap();
        store.increment("a").unwrap();
        store.decrement("a").unwrap();

        let state = store.state();
        assert_eq!(state.get_player("a").unwrap().score, 51);
        assert_eq!(state.history().len(), 3);
        assert!(state.history().iter().all(|h| h.magnitude == 1));
    }

    #[test]
    fn test_timestamps_from_clock() {
        let clock = Arc::new(ManualClock::new(5_000));
        let config = StoreConfig::default().with_seed_players(0);
        let mut store = ScoreStore::with_clock(config, Box::new(Arc::clone(&clock)));

        store.add_player("a", "Alice").unwrap();
        store.increment("a").unwrap();
        clock.advance_ms(250);
        store.decrement("a").unwrap();

        let state = store.state();
        assert_eq!(state.history()[0].timestamp.timestamp_millis(), 5_000);
        assert_eq!(state.history()[1].timestamp.timestamp_millis(), 5_250);
    }

    #[test]
    fn test_subscribers_notified_in_order() {
        let mut store = store();
        let log = Rc::new(RefCell::new(Vec::new()));

        let first = Rc::clone(&log);
        store.subscribe(move |e| first.borrow_mut().push(format!("1:{}", e.command.name())));
        let second = Rc::clone(&log);
        store.subscribe(move |e| second.borrow_mut().push(format!("2:{}", e.command.name())));

        store.add_player("a", "Alice").unwrap();

        assert_eq!(
            *log.borrow(),
            vec!["1:add_player".to_string(), "2:add_player".to_string()]
        );
    }

    #[test]
    fn test_subscriber_sees_published_state() {
        let mut store = store();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(move |e| sink.borrow_mut().push(e.state.player_count()));

        store.add_player("a", "Alice").unwrap();
        store.add_player("b", "Bob").unwrap();
        store.remove_player("zzz").unwrap();

        // Accepted no-ops still notify
        assert_eq!(*seen.borrow(), vec![1, 2, 2]);
    }

    #[test]
    fn test_rejected_command_does_not_notify() {
        let mut store = store();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        store.subscribe(move |_| *sink.borrow_mut() += 1);

        store.add_player("a", "Alice").unwrap();
        let result = store.add_player("a", "Again");

        assert_eq!(result, Err(ScoreError::DuplicatePlayerId("a".to_string())));
        assert_eq!(*count.borrow(), 1);
        assert_eq!(store.state().player_count(), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let mut store = store();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let id = store.subscribe(move |_| *sink.borrow_mut() += 1);

        store.add_player("a", "Alice").unwrap();
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.add_player("b", "Bob").unwrap();

        assert_eq!(*count.borrow(), 1);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn test_add_next_and_remove_last() {
        let mut store = ScoreStore::with_clock(StoreConfig::default(), Box::new(ManualClock::new(0)));

        store.add_next_player("p3").unwrap();
        assert_eq!(store.state().get_player("p3").unwrap().name, "Player 3");

        assert!(store.remove_last_player().is_some());
        assert!(!store.state().has_player("p3"));

        // Two seeded players is the floor
        assert!(store.remove_last_player().is_none());
        assert_eq!(store.state().player_count(), 2);
    }

    #[test]
    fn test_adjust_by_sign() {
        let mut store = store();
        store.add_player("a", "Alice").unwrap();

        store.adjust("a", -10).unwrap();
        store.adjust("a", 2).unwrap();
        assert!(store.adjust("a", 0).unwrap().is_none());

        let state = store.state();
        assert_eq!(state.get_player("a").unwrap().score, 42);
        assert_eq!(state.history().len(), 2);
    }

    #[test]
    fn test_adjust_rejects_oversized_delta() {
        let mut store = store();
        store.add_player("a", "Alice").unwrap();
        let before = store.state();

        let result = store.adjust("a", 5_000_000_000);

        assert_eq!(result, Err(ScoreError::AdjustmentOutOfRange(5_000_000_000)));
        assert!(Arc::ptr_eq(&before, &store.state()));
        assert!(store.state().history().is_empty());
    }

    fn batched_store(window_ms: u64) -> (ScoreStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let config = StoreConfig {
            batch_window_ms: window_ms,
            ..StoreConfig::default()
        };
        let store = ScoreStore::with_clock(config, Box::new(Arc::clone(&clock)));
        (store, clock)
    }

    #[test]
    fn test_configured_window_coalesces() {
        let (mut store, clock) = batched_store(300);

        for _ in 0..4 {
            assert!(store.adjust("player-1", 1).unwrap().is_none());
        }
        store.adjust("player-2", -5).unwrap();
        assert_eq!(store.pending_adjustment("player-1"), 4);
        assert!(store.state().history().is_empty());

        clock.advance_ms(299);
        assert_eq!(store.poll_adjustments().unwrap(), 0);

        clock.advance_ms(1);
        assert_eq!(store.poll_adjustments().unwrap(), 2);

        let state = store.state();
        assert_eq!(state.get_player("player-1").unwrap().score, 54);
        assert_eq!(state.get_player("player-2").unwrap().score, 45);
        let magnitudes: Vec<u32> = state.history().iter().map(|h| h.magnitude).collect();
        assert_eq!(magnitudes, vec![4, 5]);
        assert_eq!(store.pending_adjustment("player-1"), 0);
    }

    #[test]
    fn test_zero_window_applies_immediately() {
        let (mut store, _) = batched_store(0);

        let event = store.adjust("player-1", 3).unwrap();
        assert!(event.is_some());
        assert_eq!(store.state().get_player("player-1").unwrap().score, 53);
        assert_eq!(store.flush_adjustments().unwrap(), 0);
    }

    #[test]
    fn test_dispatch_flushes_pending_first() {
        let (mut store, _) = batched_store(1_000);

        store.adjust("player-1", 2).unwrap();
        store.reset_all().unwrap();

        // The earlier adjustment landed before the reset cleared it
        let state = store.state();
        assert_eq!(state.get_player("player-1").unwrap().score, 50);
        assert!(state.history().is_empty());
        assert_eq!(store.pending_adjustment("player-1"), 0);
    }

    #[test]
    fn test_elapsed_window_flushes_on_next_adjust() {
        let (mut store, clock) = batched_store(100);

        store.adjust("player-1", 1).unwrap();
        clock.advance_ms(150);
        store.adjust("player-1", 1).unwrap();

        assert_eq!(store.state().history().len(), 1);
        assert_eq!(store.pending_adjustment("player-1"), 1);
    }

    #[test]
    fn test_batched_adjust_rejects_oversized_delta() {
        let (mut store, _) = batched_store(100);

        let result = store.adjust("player-1", 5_000_000_000);
        assert_eq!(result, Err(ScoreError::AdjustmentOutOfRange(5_000_000_000)));
        assert_eq!(store.pending_adjustment("player-1"), 0);
    }

    #[test]
    fn test_system_clock_millis_and_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
        assert_eq!(a.timestamp_subsec_nanos() % 1_000_000, 0);
    }
}
