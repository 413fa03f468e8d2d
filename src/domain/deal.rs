//! Deal: one atomic fill of an order.

use chrono::NaiveDateTime;

use crate::domain::ids::IdGenerator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealSide {
    Buy,
    Sell,
}

impl DealSide {
    pub fn as_str(self) -> &'static str {
        match self {
            DealSide::Buy => "BUY",
            DealSide::Sell => "SELL",
        }
    }
}

/// Immutable execution record. Created only by order fill logic.
#[derive(Debug, Clone, PartialEq)]
pub struct Deal {
    id: u64,
    symbol: String,
    timestamp: NaiveDateTime,
    side: DealSide,
    volume: f64,
    price: f64,
}

impl Deal {
    pub(crate) fn new(
        ids: &IdGenerator,
        symbol: &str,
        timestamp: NaiveDateTime,
        side: DealSide,
        volume: f64,
        price: f64,
    ) -> Self {
        Deal {
            id: ids.next(),
            symbol: symbol.to_string(),
            timestamp,
            side,
            volume,
            price,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn side(&self) -> DealSide {
        self.side
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn price(&self) -> f64 {
        self.price
    }
}
