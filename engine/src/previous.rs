use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

/// Identifies the crossing state of one rule of one installed job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviousKey {
    pub generation: u64,
    pub symbol: String,
    /// Position of the rule in its job.
    pub slot: usize,
}

#[derive(Default)]
struct Inner {
    values: HashMap<PreviousKey, f64>,
    /// Generations of replaced jobs. A fan-out still running for one of
    /// them must not write its value back.
    retired: HashSet<u64>,
}

/// Last computed value per rule, read before and overwritten after every evaluation.
#[derive(Default)]
pub struct PreviousValueStore {
    inner: Mutex<Inner>,
}

impl PreviousValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults to zero for a rule that has never been evaluated.
    pub fn get(&self, key: &PreviousKey) -> f64 {
        self.inner.lock().values.get(key).copied().unwrap_or(0.0)
    }

    /// Ignored when the key's generation has been retired.
    pub fn set(&self, key: PreviousKey, value: f64) {
        let mut inner = self.inner.lock();
        if !inner.retired.contains(&key.generation) {
            inner.values.insert(key, value);
        }
    }

    /// Returns the stored value and writes `value` in one step. For a retired
    /// generation nothing is written and zero is returned.
    pub fn swap(&self, key: PreviousKey, value: f64) -> f64 {
        let mut inner = self.inner.lock();
        if inner.retired.contains(&key.generation) {
            return 0.0;
        }
        inner.values.insert(key, value).unwrap_or(0.0)
    }

    /// Retires a replaced job's generation and drops its values; returns how many went.
    pub fn forget_generation(&self, generation: u64) -> usize {
        let mut inner = self.inner.lock();
        inner.retired.insert(generation);

        let before = inner.values.len();
        inner.values.retain(|k, _| k.generation != generation);
        before - inner.values.len()
    }

    pub fn is_retired(&self, generation: u64) -> bool {
        self.inner.lock().retired.contains(&generation)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(generation: u64, slot: usize) -> PreviousKey {
        PreviousKey {
            generation,
            symbol: "BTCUSDT".into(),
            slot,
        }
    }

    #[test]
    fn absent_value_reads_zero() {
        let store = PreviousValueStore::new();
        assert_eq!(store.get(&key(1, 0)), 0.0);
    }

    #[test]
    fn writes_overwrite_instead_of_accumulating() {
        let store = PreviousValueStore::new();

        store.set(key(1, 0), 42.0);
        store.set(key(1, 0), 42.0);

        assert_eq!(store.get(&key(1, 0)), 42.0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn swap_returns_prior_value() {
        let store = PreviousValueStore::new();

        assert_eq!(store.swap(key(1, 0), 10.0), 0.0);
        assert_eq!(store.swap(key(1, 0), 12.0), 10.0);
        assert_eq!(store.get(&key(1, 0)), 12.0);
    }

    #[test]
    fn forget_generation_only_touches_that_generation() {
        let store = PreviousValueStore::new();
        store.set(key(1, 0), 1.0);
        store.set(key(1, 1), 2.0);
        store.set(key(2, 0), 3.0);

        assert_eq!(store.forget_generation(1), 2);

        assert_eq!(store.get(&key(1, 0)), 0.0);
        assert_eq!(store.get(&key(2, 0)), 3.0);
    }

    #[test]
    fn retired_generation_rejects_late_writes() {
        let store = PreviousValueStore::new();
        store.set(key(1, 0), 5.0);

        store.forget_generation(1);
        assert!(store.is_retired(1));

        // A fan-out that started before the replacement finishes afterwards.
        assert_eq!(store.swap(key(1, 0), 7.0), 0.0);
        store.set(key(1, 1), 8.0);
        assert!(store.is_empty());

        assert_eq!(store.swap(key(2, 0), 9.0), 0.0);
        assert_eq!(store.len(), 1);
    }
}
