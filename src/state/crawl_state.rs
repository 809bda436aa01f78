//! Mutable state of a single crawl run
//!
//! A run owns exactly one `CrawlState`. The serial engine hands it to the explorer by
//! mutable reference; the worker pool wraps it in `SharedCrawlState` so every worker
//! sees the same visited set, ledger and deadline clock.

use crate::state::{Address, Record};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Operations the explorer needs from the run state
///
/// Implemented by the owned `CrawlState` (serial runs) and by `SharedCrawlState`
/// (worker pool). Each call is atomic with respect to other workers.
pub trait StateAccess: Send {
    /// Adds an address to the visited set, returning false if it was already there
    fn mark_visited(&mut self, address: &Address) -> bool;

    /// Appends a record unless its address already produced one
    ///
    /// A newly saved record resets the deadline clock. Returns whether it was saved.
    fn save_record(&mut self, record: Record) -> bool;

    /// Number of records in the ledger
    fn record_count(&self) -> usize;

    /// Time elapsed since the last newly saved record (or since the run started)
    fn idle_for(&self) -> Duration;

    /// Flags the whole run as aborted by the global deadline
    fn abort(&mut self);

    /// Returns true once any explorer has fired the global deadline
    fn is_aborted(&self) -> bool;
}

/// Visited set, unique-result set, ledger and deadline clock of one run
#[derive(Debug, Clone)]
pub struct CrawlState {
    /// Addresses scheduled for exploration; only ever grows
    visited: HashSet<Address>,

    /// Canonical addresses that already produced a saved record
    unique: HashSet<Address>,

    /// Saved records in discovery order
    ledger: Vec<Record>,

    /// Last time a record was newly saved
    last_progress: Instant,

    /// Set when the global deadline fired
    aborted: bool,
}

impl CrawlState {
    /// Creates an empty state with the deadline clock starting now
    pub fn new() -> Self {
        Self {
            visited: HashSet::new(),
            unique: HashSet::new(),
            ledger: Vec::new(),
            last_progress: Instant::now(),
            aborted: false,
        }
    }

    pub fn is_visited(&self, address: &Address) -> bool {
        self.visited.contains(address)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn records(&self) -> &[Record] {
        &self.ledger
    }
}

impl Default for CrawlState {
    fn default() -> Self {
        Self::new()
    }
}

impl StateAccess for CrawlState {
    fn mark_visited(&mut self, address: &Address) -> bool {
        if self.visited.contains(address) {
            return false;
        }
        self.visited.insert(address.clone())
    }

    fn save_record(&mut self, record: Record) -> bool {
        if self.unique.contains(&record.address) {
            return false;
        }
        self.unique.insert(record.address.clone());
        self.ledger.push(record);
        self.last_progress = Instant::now();
        true
    }

    fn record_count(&self) -> usize {
        self.ledger.len()
    }

    fn idle_for(&self) -> Duration {
        self.last_progress.elapsed()
    }

    fn abort(&mut self) {
        self.aborted = true;
    }

    fn is_aborted(&self) -> bool {
        self.aborted
    }
}

/// Mutex-guarded crawl state shared by pool workers
///
/// The lock is never held across an await point: each `StateAccess` call locks,
/// mutates and releases.
#[derive(Debug, Clone)]
pub struct SharedCrawlState {
    inner: Arc<Mutex<CrawlState>>,
}

impl SharedCrawlState {
    pub fn new(state: CrawlState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// Locks the state, recovering the data if a worker panicked while holding it
    pub fn lock(&self) -> MutexGuard<'_, CrawlState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the final state once all workers are done
    ///
    /// Falls back to a copy if another handle is still alive.
    pub fn into_inner(self) -> CrawlState {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(PoisonError::into_inner),
            Err(shared) => shared
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }
}

impl StateAccess for SharedCrawlState {
    fn mark_visited(&mut self, address: &Address) -> bool {
        self.lock().mark_visited(address)
    }

    fn save_record(&mut self, record: Record) -> bool {
        self.lock().save_record(record)
    }

    fn record_count(&self) -> usize {
        self.lock().record_count()
    }

    fn idle_for(&self) -> Duration {
        self.lock().idle_for()
    }

    fn abort(&mut self) {
        self.lock().abort();
    }

    fn is_aborted(&self) -> bool {
        self.lock().is_aborted()
    }
}
