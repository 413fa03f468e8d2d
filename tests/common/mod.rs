#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use fxsim::adapters::memory_adapter::MemoryTickSource;
use fxsim::domain::config::{AccountConfig, SimulationConfig};
use fxsim::domain::simulation::Simulator;
use fxsim::domain::tick::Tick;

pub fn ts(minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 15)
        .unwrap()
        .and_hms_opt(9 + minute / 60, minute % 60, 0)
        .unwrap()
}

pub fn tick(minute: u32, bid: f64, ask: f64) -> Tick {
    Tick {
        symbol: "EUR_USD".into(),
        timestamp: ts(minute),
        ask,
        bid,
        mid: (ask + bid) / 2.0,
        volume: 10,
        digit: 4,
        spread: ((ask - bid) * 10_000.0).round() as i64,
    }
}

/// Tick with a fixed 2-point spread around a mid price.
pub fn tick_at(minute: u32, mid: f64) -> Tick {
    tick(minute, mid - 0.0001, mid + 0.0001)
}

pub fn config(balance: f64) -> SimulationConfig {
    SimulationConfig {
        account: AccountConfig {
            initial_balance: balance,
            ..AccountConfig::default()
        },
        ..SimulationConfig::default()
    }
}

pub fn simulator(balance: f64, ticks: Vec<Tick>) -> Simulator {
    Simulator::new(config(balance), Box::new(MemoryTickSource::new(ticks))).unwrap()
}
