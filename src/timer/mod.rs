//! Focus timers shared between every observer of the database
//!
//! Running timers live in a single JSON map stored in the `activeTimers`
//! slot, keyed by owner id. A record exists only while its timer runs:
//! starting writes it, pausing removes it. Elapsed time is always derived
//! from the wall clock, so nothing needs to tick for the numbers to be right.
//!
//! Observers in this process get a [`TimerChange`] over a broadcast
//! channel. Observers in other processes notice the slot's revision moving
//! when they call [`TimerAccumulator::poll_external`].

pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::TimerMode;
use crate::storage::{SharedSlotStore, StorageError};

/// Slot holding the map of running timers
pub const ACTIVE_TIMERS_SLOT: &str = "activeTimers";

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// One running timer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerRecord {
    /// Milliseconds since the epoch when this run started
    pub start_time: i64,
    pub mode: TimerMode,
    /// Countdown length in seconds (timer mode)
    pub initial_duration: f64,
    /// Seconds banked before this run started
    pub accumulated: f64,
}

impl TimerRecord {
    /// Seconds since this run started
    pub fn elapsed_at(&self, now_millis: i64) -> f64 {
        ((now_millis - self.start_time) as f64 / 1000.0).max(0.0)
    }

    /// What a display should show: remaining seconds for a countdown,
    /// total seconds for a stopwatch
    pub fn display_seconds(&self, now_millis: i64) -> f64 {
        let total = self.accumulated + self.elapsed_at(now_millis);
        match self.mode {
            TimerMode::Timer => (self.initial_duration - total).max(0.0),
            TimerMode::Stopwatch => total,
        }
    }

    /// A countdown that has reached zero
    pub fn is_expired(&self, now_millis: i64) -> bool {
        self.mode == TimerMode::Timer && self.display_seconds(now_millis) <= 0.0
    }
}

pub type ActiveTimers = BTreeMap<String, TimerRecord>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerChangeKind {
    Started,
    Paused,
    /// Another process rewrote the slot
    External,
}

/// Notification sent whenever the timer slot changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerChange {
    /// `None` for external changes, where the owner is unknown
    pub owner: Option<String>,
    pub kind: TimerChangeKind,
    pub revision: u64,
}

/// Start/pause bookkeeping over a shared slot
pub struct TimerAccumulator<S: SharedSlotStore> {
    store: S,
    clock: Arc<dyn Clock>,
    changes: broadcast::Sender<TimerChange>,
    seen_revision: AtomicU64,
}

impl<S: SharedSlotStore> TimerAccumulator<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let seen = store.slot_revision(ACTIVE_TIMERS_SLOT).unwrap_or(0);
        Self {
            store,
            clock,
            changes,
            seen_revision: AtomicU64::new(seen),
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Receive every start and pause from now on
    pub fn subscribe(&self) -> broadcast::Receiver<TimerChange> {
        self.changes.subscribe()
    }

    /// Start (or restart) the timer for `owner`, replacing any running record
    pub fn start(
        &self,
        owner: &str,
        mode: TimerMode,
        initial_duration: f64,
        accumulated: f64,
    ) -> Result<TimerRecord, StorageError> {
        let record = TimerRecord {
            start_time: self.clock.now_millis(),
            mode,
            initial_duration,
            accumulated,
        };

        let mut timers = self.load();
        timers.insert(owner.to_string(), record.clone());
        self.save(&timers, owner, TimerChangeKind::Started)?;

        debug!("Started {} for {} ({}s banked)", mode.as_str(), owner, accumulated);
        Ok(record)
    }

    /// Stop the timer for `owner` and return the seconds of this run
    ///
    /// Returns 0 when nothing is running. The caller decides what to do
    /// with the chunk; it is not added to `accumulated`.
    pub fn pause(&self, owner: &str) -> Result<f64, StorageError> {
        Ok(self.remove_record(owner)?.unwrap_or(0.0))
    }

    /// Remove the record for `owner`, returning its elapsed seconds only
    /// when there was one to remove
    fn remove_record(&self, owner: &str) -> Result<Option<f64>, StorageError> {
        let mut timers = self.load();
        let Some(record) = timers.remove(owner) else {
            return Ok(None);
        };

        let elapsed = record.elapsed_at(self.clock.now_millis());
        self.save(&timers, owner, TimerChangeKind::Paused)?;

        debug!("Paused timer for {} after {:.1}s", owner, elapsed);
        Ok(Some(elapsed))
    }

    /// The running record for `owner`, if any
    pub fn state(&self, owner: &str) -> Result<Option<TimerRecord>, StorageError> {
        Ok(self.load().remove(owner))
    }

    /// Display seconds for a running timer
    pub fn display_seconds(&self, owner: &str) -> Result<Option<f64>, StorageError> {
        let now = self.clock.now_millis();
        Ok(self.state(owner)?.map(|record| record.display_seconds(now)))
    }

    pub fn running(&self) -> Result<ActiveTimers, StorageError> {
        Ok(self.load())
    }

    /// Pause every countdown that has reached zero
    ///
    /// Returns the owner and the final chunk of each. A second call finds
    /// nothing, since the first one removed the records. A record someone
    /// else removed in the meantime is skipped.
    pub fn finalize_expired(&self) -> Result<Vec<(String, f64)>, StorageError> {
        let now = self.clock.now_millis();
        let expired: Vec<String> = self
            .load()
            .into_iter()
            .filter(|(_, record)| record.is_expired(now))
            .map(|(owner, _)| owner)
            .collect();

        let mut finished = Vec::with_capacity(expired.len());
        for owner in expired {
            if let Some(elapsed) = self.remove_record(&owner)? {
                finished.push((owner, elapsed));
            }
        }
        Ok(finished)
    }

    /// Check whether someone else rewrote the slot since we last looked
    ///
    /// Subscribers receive an `External` change when they did.
    pub fn poll_external(&self) -> Result<Option<u64>, StorageError> {
        let revision = self.store.slot_revision(ACTIVE_TIMERS_SLOT)?;
        let seen = self.seen_revision.swap(revision, Ordering::SeqCst);
        if revision == seen {
            return Ok(None);
        }

        debug!("Timer slot changed externally (revision {} -> {})", seen, revision);
        let _ = self.changes.send(TimerChange {
            owner: None,
            kind: TimerChangeKind::External,
            revision,
        });
        Ok(Some(revision))
    }

    /// Current map of running timers; unreadable state reads as empty
    fn load(&self) -> ActiveTimers {
        let raw = match self.store.read_slot(ACTIVE_TIMERS_SLOT) {
            Ok(Some(raw)) => raw,
            Ok(None) => return ActiveTimers::new(),
            Err(e) => {
                warn!("Could not read active timers, treating as empty: {}", e);
                return ActiveTimers::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(timers) => timers,
            Err(e) => {
                warn!("Could not parse active timers, treating as empty: {}", e);
                ActiveTimers::new()
            }
        }
    }

    fn save(&self, timers: &ActiveTimers, owner: &str, kind: TimerChangeKind) -> Result<(), StorageError> {
        let raw = serde_json::to_string(timers)?;
        let revision = self.store.write_slot(ACTIVE_TIMERS_SLOT, &raw)?;
        self.seen_revision.store(revision, Ordering::SeqCst);

        // No subscribers is fine
        let _ = self.changes.send(TimerChange {
            owner: Some(owner.to_string()),
            kind,
            revision,
        });
        Ok(())
    }
}
