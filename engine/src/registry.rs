use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info, instrument};

use market::{Bar, Interval, WindowUpdate};

use crate::job::Job;
use crate::rule::IndicatorRule;

/// Stable copy of what the fan-out needs, taken while the lock is held.
#[derive(Debug, Clone)]
pub struct WindowSnapshot {
    pub generation: u64,
    pub symbol: String,
    pub interval: Interval,
    pub rules: Arc<[IndicatorRule]>,
    pub closes: Vec<f64>,
}

#[derive(Debug)]
pub enum BarOutcome {
    /// Nobody registered interest in this key.
    NoJob,
    /// The job exists but this instrument was never seeded.
    NoWindow,
    /// Stale or replayed bar; window untouched.
    Unchanged(WindowUpdate),
    Updated(WindowSnapshot),
}

/// Control-plane store of active jobs keyed by `SYMBOL:interval`.
///
/// One exclusive lock covers lookup, replacement and the window mutation of a
/// data event. Critical sections never await and never run indicators.
#[derive(Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<String, Job>>,
    generations: AtomicU64,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the generation for a job about to be installed.
    pub fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Atomically installs `job` under `key`, returning the job it replaced.
    #[instrument(skip(self, job), target = "registry", fields(generation = job.generation))]
    pub fn upsert(&self, key: &str, job: Job) -> Option<Job> {
        let replaced = self.jobs.lock().insert(key.to_string(), job);

        match &replaced {
            Some(old) => info!(old_generation = old.generation, "job replaced"),
            None => debug!("job installed"),
        }
        replaced
    }

    pub fn lookup(&self, key: &str) -> Option<Job> {
        self.jobs.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.jobs.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }

    /// Applies a live bar to the job's window for `symbol` and snapshots the
    /// closing prices, all under one lock acquisition.
    pub fn apply_bar(&self, key: &str, symbol: &str, bar: Bar) -> BarOutcome {
        let mut jobs = self.jobs.lock();

        let Some(job) = jobs.get_mut(key) else {
            return BarOutcome::NoJob;
        };
        let Some(window) = job.windows.get_mut(symbol) else {
            return BarOutcome::NoWindow;
        };

        let update = window.apply(bar);
        if !update.changed() {
            return BarOutcome::Unchanged(update);
        }

        BarOutcome::Updated(WindowSnapshot {
            generation: job.generation,
            symbol: symbol.to_string(),
            interval: job.interval,
            rules: Arc::clone(&job.rules),
            closes: window.closes(),
        })
    }
}
