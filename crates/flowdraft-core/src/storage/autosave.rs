//! Debounced auto-save scheduling.
//!
//! The saver never touches storage itself: the session asks it whether a
//! save is due, performs the write and reports back with the ticket.

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// Default quiet period before an auto-save.
pub const DEFAULT_QUIET_PERIOD_MS: u64 = 2000;

/// Proof that a save was started for a given model generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct SaveTicket {
    generation: u64,
}

impl SaveTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Tracks unsaved changes and decides when to write them.
#[derive(Debug, Clone)]
pub struct AutoSaver {
    quiet_period: Duration,
    last_change: Option<Instant>,
    /// Latest model generation observed.
    generation: u64,
    /// Generation covered by the last successful save.
    saved_generation: u64,
    /// No save has succeeded since the document was created.
    unsaved: bool,
    in_flight: Option<u64>,
    failures: u32,
}

impl Default for AutoSaver {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_QUIET_PERIOD_MS))
    }
}

impl AutoSaver {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            last_change: None,
            generation: 0,
            saved_generation: 0,
            unsaved: false,
            in_flight: None,
            failures: 0,
        }
    }

    /// Treat `generation` as already persisted (freshly loaded document).
    pub fn reset(&mut self, generation: u64) {
        self.generation = generation;
        self.saved_generation = generation;
        self.unsaved = false;
        self.last_change = None;
        self.in_flight = None;
        self.failures = 0;
    }

    /// Flag a document that has never been written. It stays dirty until
    /// the first successful save, and that save is due at once.
    pub fn mark_unsaved(&mut self) {
        self.unsaved = true;
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Record the model generation; a new value restarts the quiet period.
    pub fn observe(&mut self, generation: u64) {
        self.observe_at(generation, Instant::now());
    }

    pub fn observe_at(&mut self, generation: u64, now: Instant) {
        if generation != self.generation {
            self.generation = generation;
            self.last_change = Some(now);
        }
    }

    /// Whether there are changes no successful save has covered.
    pub fn is_dirty(&self) -> bool {
        self.unsaved || self.generation != self.saved_generation
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Consecutive failed saves.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Dirty, idle, and quiet for the full period.
    pub fn should_save(&self) -> bool {
        self.should_save_at(Instant::now())
    }

    pub fn should_save_at(&self, now: Instant) -> bool {
        if !self.is_dirty() || self.is_saving() {
            return false;
        }
        match self.last_change {
            Some(last) => now.saturating_duration_since(last) >= self.quiet_period,
            None => true,
        }
    }

    /// Start a save of the current generation.
    pub fn begin(&mut self) -> SaveTicket {
        self.in_flight = Some(self.generation);
        SaveTicket {
            generation: self.generation,
        }
    }

    /// Report the outcome of a save started with `ticket`.
    ///
    /// Changes made while the save was running keep the saver dirty. A
    /// failure waits for another quiet period before retrying.
    pub fn finish(&mut self, ticket: SaveTicket, success: bool) {
        self.finish_at(ticket, success, Instant::now());
    }

    pub fn finish_at(&mut self, ticket: SaveTicket, success: bool, now: Instant) {
        if self.in_flight == Some(ticket.generation) {
            self.in_flight = None;
        }
        if success {
            self.saved_generation = self.saved_generation.max(ticket.generation);
            self.unsaved = false;
            self.failures = 0;
        } else {
            self.failures += 1;
            self.last_change = Some(now);
            log::warn!("Auto-save failed ({} in a row), will retry", self.failures);
        }
    }
}
