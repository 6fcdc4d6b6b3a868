//! Named counters, scoped timers, and measurement sessions.
//!
//! A [`Tracker`] is shared by one candidate's fabric, routers, and metrics
//! (all on one thread — `Rc` + `Cell`, no locking).  Components obtain a
//! counter or timer by name once and increment it directly; the
//! [`MeasurementReader`] snapshots all counters per scrape and exposes
//! absolute values plus deltas against the previous scrape.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Instant;

/// Counter names used across the simulator.
///
/// The set is closed on purpose: metrics look counters up by these names and
/// an unknown name reads as zero, which would silently corrupt a scrape.
pub mod names {
    /// Successful link-level deliveries (bumped by the fabric drain loop).
    pub const TRANSMISSION_COUNT: &str = "transmission_count";
    /// Number of `insert` calls across all route stores.
    pub const ROUTE_INSERTION_COUNT: &str = "route_insertion_count";
    /// Seconds spent in the structural part of `insert`.
    pub const ROUTE_UPDATE_SECONDS_SUM: &str = "route_update_seconds_sum";
    /// Seconds spent rebuilding store distances.
    pub const DISTANCE_UPDATE_SECONDS_SUM: &str = "distance_update_seconds_sum";
    /// Total length of routes received by `insert`.
    pub const RECEIVED_ROUTE_LENGTH: &str = "received_route_length";
}

// ── Counter & Timer ───────────────────────────────────────────────────────────

/// A monotonically increasing named quantity.
#[derive(Default)]
pub struct Counter {
    value: Cell<f64>,
}

impl Counter {
    pub fn add(&self, amount: f64) {
        self.value.set(self.value.get() + amount);
    }

    pub fn value(&self) -> f64 {
        self.value.get()
    }
}

/// A counter accumulating wall-clock seconds through scoped guards.
#[derive(Clone)]
pub struct Timer {
    counter: Rc<Counter>,
}

impl Timer {
    /// Start timing; elapsed seconds are added when the guard drops, on every
    /// exit path.
    pub fn start(&self) -> TimerGuard {
        TimerGuard {
            started: Instant::now(),
            counter: Rc::clone(&self.counter),
        }
    }
}

pub struct TimerGuard {
    started: Instant,
    counter: Rc<Counter>,
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.counter.add(self.started.elapsed().as_secs_f64());
    }
}

// ── Tracker ───────────────────────────────────────────────────────────────────

/// Registry of named counters, shared within one candidate.
#[derive(Default)]
pub struct Tracker {
    counters: RefCell<BTreeMap<String, Rc<Counter>>>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch (or create) the counter registered under `name`.
    pub fn counter(&self, name: &str) -> Rc<Counter> {
        Rc::clone(
            self.counters
                .borrow_mut()
                .entry(name.to_owned())
                .or_default(),
        )
    }

    /// Fetch (or create) a timer accumulating into the counter `name`.
    pub fn timer(&self, name: &str) -> Timer {
        Timer {
            counter: self.counter(name),
        }
    }

    /// Current value of every registered counter.
    pub fn snapshot(&self) -> BTreeMap<String, f64> {
        self.counters
            .borrow()
            .iter()
            .map(|(name, counter)| (name.clone(), counter.value()))
            .collect()
    }
}

// ── MeasurementReader & MeasurementSession ────────────────────────────────────

/// Scrape-side view of a [`Tracker`].
///
/// Each call to [`session`](Self::session) snapshots all counters and diffs
/// them against the previous session, so `rate` metrics are averages over the
/// interval between scrapes rather than over the whole run.
pub struct MeasurementReader {
    tracker: Rc<Tracker>,
    previous: RefCell<BTreeMap<String, f64>>,
}

impl MeasurementReader {
    pub fn new(tracker: Rc<Tracker>) -> Self {
        Self {
            tracker,
            previous: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn session(&self) -> MeasurementSession {
        let absolute = self.tracker.snapshot();
        let mut previous = self.previous.borrow_mut();
        let delta = absolute
            .iter()
            .map(|(name, value)| {
                (
                    name.clone(),
                    value - previous.get(name).copied().unwrap_or(0.0),
                )
            })
            .collect();
        *previous = absolute.clone();
        MeasurementSession { absolute, delta }
    }
}

/// Immutable snapshot of counter values at one scrape; later counter
/// mutations do not affect it.
pub struct MeasurementSession {
    absolute: BTreeMap<String, f64>,
    delta: BTreeMap<String, f64>,
}

impl MeasurementSession {
    /// Absolute counter value at snapshot time (0 if never registered).
    pub fn get(&self, name: &str) -> f64 {
        self.absolute.get(name).copied().unwrap_or(0.0)
    }

    /// Δ`sum` / Δ`count` since the previous session; 0 when nothing was
    /// counted in the interval.
    pub fn rate(&self, sum_name: &str, count_name: &str) -> f64 {
        let count = self.delta.get(count_name).copied().unwrap_or(0.0);
        if count == 0.0 {
            return 0.0;
        }
        self.delta.get(sum_name).copied().unwrap_or(0.0) / count
    }
}
