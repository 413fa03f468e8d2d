//! Monotonic identifier generators for simulation entities.
//!
//! Generators are injected rather than process-global so that parallel runs
//! (parameter sweeps, concurrent test batches) can each own an independent,
//! deterministic sequence. `next` is atomic; batches running against a shared
//! generator never observe torn or duplicate ids.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonic counter. `next()` returns the current value then increments.
#[derive(Debug, Default)]
pub struct IdGenerator {
    counter: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }

    pub fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Reset the counter to 0. Used for deterministic test runs.
    pub fn reset(&self) {
        self.counter.store(0, Ordering::Relaxed);
    }
}

/// One generator per entity kind.
#[derive(Debug, Default)]
pub struct EntityIds {
    pub deal: IdGenerator,
    pub order: IdGenerator,
    pub position: IdGenerator,
}

impl EntityIds {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reset(&self) {
        self.deal.reset();
        self.order.reset();
        self.position.reset();
    }
}
