//! Tick data access port.

use crate::domain::tick::Tick;

/// Random-access source of ticks in ascending timestamp order.
pub trait TickSource {
    /// The tick at `index`, or `None` past the end of the series.
    fn tick(&self, index: usize) -> Option<Tick>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
