//! In-memory tick source, used by tests and programmatic runs.

use crate::domain::tick::Tick;
use crate::ports::tick_port::TickSource;

pub struct MemoryTickSource {
    ticks: Vec<Tick>,
}

impl MemoryTickSource {
    /// Ticks are sorted by timestamp so callers may pass them in any order.
    pub fn new(mut ticks: Vec<Tick>) -> Self {
        ticks.sort_by_key(|t| t.timestamp);
        MemoryTickSource { ticks }
    }
}

impl TickSource for MemoryTickSource {
    fn tick(&self, index: usize) -> Option<Tick> {
        self.ticks.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.ticks.len()
    }
}
