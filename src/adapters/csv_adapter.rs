//! CSV tick file adapter.
//!
//! Expects a header of `timestamp,ask,bid,volume`; the symbol and digit come
//! from the caller, and mid and spread are derived per row. Rows are sorted
//! by timestamp after loading.

use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;

use crate::domain::error::FxsimError;
use crate::domain::tick::Tick;
use crate::ports::tick_port::TickSource;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

#[derive(Debug)]
pub struct CsvTickSource {
    ticks: Vec<Tick>,
}

impl CsvTickSource {
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        symbol: &str,
        digit: u32,
    ) -> Result<Self, FxsimError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| FxsimError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::from_reader(content.as_bytes(), symbol, digit)
    }

    pub fn from_reader<R: std::io::Read>(
        reader: R,
        symbol: &str,
        digit: u32,
    ) -> Result<Self, FxsimError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut ticks = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| FxsimError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let timestamp_str = record.get(0).ok_or_else(|| FxsimError::Data {
                reason: "missing timestamp column".into(),
            })?;
            let timestamp = NaiveDateTime::parse_from_str(timestamp_str, TIMESTAMP_FORMAT)
                .map_err(|e| FxsimError::Data {
                    reason: format!("invalid timestamp '{}': {}", timestamp_str, e),
                })?;

            let ask: f64 = parse_column(&record, 1, "ask")?;
            let bid: f64 = parse_column(&record, 2, "bid")?;
            let volume: i64 = parse_column(&record, 3, "volume")?;

            if !(ask > 0.0) || !(bid > 0.0) {
                return Err(FxsimError::Data {
                    reason: format!("non-positive price at {}", timestamp_str),
                });
            }

            let point_factor = 10f64.powi(digit as i32);
            ticks.push(Tick {
                symbol: symbol.to_string(),
                timestamp,
                ask,
                bid,
                mid: (ask + bid) / 2.0,
                volume,
                digit,
                spread: ((ask - bid) * point_factor).round() as i64,
            });
        }

        ticks.sort_by_key(|t| t.timestamp);
        Ok(CsvTickSource { ticks })
    }
}

fn parse_column<T: std::str::FromStr>(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
) -> Result<T, FxsimError>
where
    T::Err: std::fmt::Display,
{
    record
        .get(index)
        .ok_or_else(|| FxsimError::Data {
            reason: format!("missing {} column", name),
        })?
        .trim()
        .parse()
        .map_err(|e| FxsimError::Data {
            reason: format!("invalid {} value: {}", name, e),
        })
}

impl TickSource for CsvTickSource {
    fn tick(&self, index: usize) -> Option<Tick> {
        self.ticks.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.ticks.len()
    }
}
