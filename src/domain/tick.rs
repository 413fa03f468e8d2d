//! Price tick representation.

use chrono::NaiveDateTime;

/// One bid/ask quote of an instrument at a point in time.
///
/// `digit` is the instrument's decimal point count (4 for most forex pairs);
/// it scales point-unit arithmetic. `spread` is quoted in points.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub ask: f64,
    pub bid: f64,
    pub mid: f64,
    pub volume: i64,
    pub digit: u32,
    pub spread: i64,
}

impl Tick {
    /// Point scale factor, `10^digit`.
    pub fn point_factor(&self) -> f64 {
        10f64.powi(self.digit as i32)
    }

    /// Deposit-currency value of one point of a one-lot position,
    /// `unit_size / 10^digit`.
    pub fn point_value(&self, unit_size: u32) -> f64 {
        f64::from(unit_size) / self.point_factor()
    }
}
