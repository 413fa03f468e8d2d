//! Tick-by-tick backtesting driver.
//!
//! The simulator walks a tick series, hands each tick to a strategy, records
//! an equity snapshot, and liquidates on stop out or at the end of data.
//! Money flows only through the [`Account`]; position lifecycle only through
//! [`Trade`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::rngs::StdRng;
use rand::SeedableRng;

use chrono::NaiveDateTime;

use crate::domain::account::{Account, LedgerRecord};
use crate::domain::config::SimulationConfig;
use crate::domain::deal::Deal;
use crate::domain::error::FxsimError;
use crate::domain::ids::EntityIds;
use crate::domain::order::Order;
use crate::domain::position::{Position, PositionSide};
use crate::domain::report::{BacktestingReport, DrawdownReport};
use crate::domain::strategy::Strategy;
use crate::domain::tick::Tick;
use crate::domain::trade::Trade;
use crate::ports::tick_port::TickSource;

/// Margin state relative to the configured margin call and stop out levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarginHealth {
    Ok,
    /// New positions are refused; existing positions stay open.
    MarginCall,
    /// All positions are liquidated and the run ends.
    StopOut,
}

impl MarginHealth {
    pub fn as_str(self) -> &'static str {
        match self {
            MarginHealth::Ok => "OK",
            MarginHealth::MarginCall => "MARGIN_CALL",
            MarginHealth::StopOut => "STOP_OUT",
        }
    }
}

/// Snapshot of the account taken once per processed tick.
#[derive(Debug, Clone, PartialEq)]
pub struct EquityRecord {
    pub timestamp: NaiveDateTime,
    pub balance: f64,
    pub realized_profit: f64,
    pub equity: f64,
    pub floating_profit: f64,
    pub margin_used: f64,
    pub free_margin: f64,
    /// Equity over used margin as a percentage; 0 with no margin in use.
    pub margin_level: f64,
    pub margin_health: MarginHealth,
}

pub struct Simulator {
    config: SimulationConfig,
    ticks: Box<dyn TickSource>,
    trade: Trade,
    account: Account,
    rng: StdRng,
    equity_records: Vec<EquityRecord>,
    report: Option<BacktestingReport>,
    tick_count: u64,
    min_margin_level: Option<f64>,
    cancel: Arc<AtomicBool>,
}

impl Simulator {
    /// Validate the config and set up an account funded at the first tick's
    /// timestamp (or the epoch for an empty series).
    pub fn new(config: SimulationConfig, ticks: Box<dyn TickSource>) -> Result<Self, FxsimError> {
        config.validate()?;
        let initial_time = ticks
            .tick(0)
            .map(|t| t.timestamp)
            .unwrap_or_default();
        let account = Account::new(initial_time, config.account.initial_balance);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let trade = Trade::new(EntityIds::new(), config.fill.clone());
        Ok(Simulator {
            config,
            ticks,
            trade,
            account,
            rng,
            equity_records: Vec::new(),
            report: None,
            tick_count: 0,
            min_margin_level: None,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Spendable balance plus locked margin.
    pub fn balance(&self) -> f64 {
        self.account.balance() + self.account.margin()
    }

    /// Balance plus the floating profit of open positions.
    pub fn equity(&self, tick: &Tick) -> f64 {
        self.balance() + self.trade.floating_profit(tick)
    }

    pub fn margin_used(&self) -> f64 {
        self.trade.margin_used()
    }

    pub fn free_margin(&self, tick: &Tick) -> f64 {
        self.equity(tick) - self.margin_used()
    }

    /// Classify the margin state against the configured thresholds and track
    /// the lowest margin level seen.
    pub fn margin_health(&mut self, tick: &Tick) -> MarginHealth {
        let margin_used = self.margin_used();
        if margin_used <= 0.0 {
            return MarginHealth::Ok;
        }
        let level = self.equity(tick) / margin_used * 100.0;
        self.min_margin_level = Some(match self.min_margin_level {
            Some(current) => current.min(level),
            None => level,
        });
        if level <= self.config.account.stop_out_level {
            MarginHealth::StopOut
        } else if level <= self.config.account.margin_call_level {
            MarginHealth::MarginCall
        } else {
            MarginHealth::Ok
        }
    }

    pub fn open_long(
        &mut self,
        tick: &Tick,
        volume: f64,
        comment: &str,
    ) -> Result<Option<u64>, FxsimError> {
        self.open_position(tick, PositionSide::Long, volume, comment)
    }

    pub fn open_short(
        &mut self,
        tick: &Tick,
        volume: f64,
        comment: &str,
    ) -> Result<Option<u64>, FxsimError> {
        self.open_position(tick, PositionSide::Short, volume, comment)
    }

    /// Open a position if margin allows. Returns `Ok(None)` when the account
    /// is at or past margin call, or when the required margin exceeds the
    /// free margin.
    fn open_position(
        &mut self,
        tick: &Tick,
        side: PositionSide,
        volume: f64,
        comment: &str,
    ) -> Result<Option<u64>, FxsimError> {
        if self.margin_health(tick) != MarginHealth::Ok {
            return Ok(None);
        }

        let price = match side {
            PositionSide::Long => tick.ask,
            PositionSide::Short => tick.bid,
        };
        let unit_size = f64::from(self.config.account.unit_size);
        let margin = price * volume * unit_size / f64::from(self.config.account.leverage);
        if margin > self.free_margin(tick) {
            return Ok(None);
        }

        let point_value = tick.point_value(self.config.account.unit_size);
        let id = self.trade.open_position(
            &tick.symbol,
            tick.timestamp,
            side,
            volume,
            price,
            margin,
            point_value,
            comment,
            &mut self.rng,
        )?;
        self.account
            .margin_lock(tick.timestamp, margin, &format!("open #{id}"));
        Ok(Some(id))
    }

    /// Close one open position and settle it into the account. Returns false
    /// when no open position has that id.
    pub fn close_position(&mut self, id: u64, tick: &Tick) -> Result<bool, FxsimError> {
        match self.trade.close_position(id, tick, &mut self.rng)? {
            Some((margin, profit)) => {
                self.account
                    .close_trade(tick.timestamp, margin, profit, &format!("close #{id}"));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn close_all_positions(&mut self, tick: &Tick) -> Result<(), FxsimError> {
        let closed = self.trade.close_all_positions(tick, &mut self.rng)?;
        for (id, margin, profit) in closed {
            self.account
                .close_trade(tick.timestamp, margin, profit, &format!("close #{id}"));
        }
        Ok(())
    }

    /// Append an equity snapshot for this tick and return its margin state.
    pub fn record_equity(&mut self, tick: &Tick) -> MarginHealth {
        let margin_health = self.margin_health(tick);
        let balance = self.balance();
        let floating_profit = self.trade.floating_profit(tick);
        let equity = balance + floating_profit;
        let margin_used = self.margin_used();
        let margin_level = if margin_used > 0.0 {
            equity / margin_used * 100.0
        } else {
            0.0
        };
        self.equity_records.push(EquityRecord {
            timestamp: tick.timestamp,
            balance,
            realized_profit: self.trade.realized_net_profit(),
            equity,
            floating_profit,
            margin_used,
            free_margin: equity - margin_used,
            margin_level,
            margin_health,
        });
        margin_health
    }

    /// Drive the strategy over the whole series.
    ///
    /// Each tick except the last is offered to the strategy, then snapshotted;
    /// a stop out liquidates everything and ends the run early. Otherwise all
    /// remaining positions are closed at the final tick. A cancelled run stops
    /// before the next tick without liquidating. The report is populated in
    /// every case, with `ticks` counting only the iterations actually
    /// processed plus the closing step when the run reaches it.
    pub fn run(&mut self, strategy: &mut dyn Strategy) -> Result<(), FxsimError> {
        let len = self.ticks.len();
        self.tick_count = 0;
        if len == 0 {
            self.populate_report();
            return Ok(());
        }

        let mut stopped_out = false;
        let mut cancelled = false;
        for index in 0..len - 1 {
            if self.cancel.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }
            let Some(tick) = self.ticks.tick(index) else {
                break;
            };
            self.tick_count += 1;
            strategy.on_tick(index, &tick, self)?;
            if self.record_equity(&tick) == MarginHealth::StopOut {
                self.close_all_positions(&tick)?;
                self.record_equity(&tick);
                stopped_out = true;
                break;
            }
        }

        if !cancelled {
            self.tick_count += 1;
            if !stopped_out {
                if let Some(tick) = self.ticks.tick(len - 1) {
                    self.close_all_positions(&tick)?;
                    self.record_equity(&tick);
                }
            }
        }
        self.populate_report();
        Ok(())
    }

    /// Request a clean stop before the next tick. Safe to call from another
    /// thread through [`Simulator::cancel_handle`].
    pub fn stop(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn populate_report(&mut self) {
        let trade = self.trade.report(true).clone();
        let initial_balance = self.account.initial_balance();
        let final_balance = self.balance();

        let balances: Vec<f64> = self.equity_records.iter().map(|r| r.balance).collect();
        let equities: Vec<f64> = self.equity_records.iter().map(|r| r.equity).collect();
        let balance_drawdown = drawdown(initial_balance, &balances);
        let equity_drawdown = drawdown(initial_balance, &equities);

        let profit_factor = if trade.gross_loss != 0.0 {
            trade.gross_profit / trade.gross_loss.abs()
        } else {
            0.0
        };
        let recovery_factor = if equity_drawdown.maximum != 0.0 {
            trade.net_profit / equity_drawdown.maximum
        } else {
            0.0
        };
        let expected_payoff = if trade.all_positions.total > 0 {
            trade.net_profit / f64::from(trade.all_positions.total)
        } else {
            0.0
        };

        let mut report = BacktestingReport::default();
        report.summary.ticks = self.tick_count;
        report.summary.initial_balance = initial_balance;
        report.summary.final_balance = final_balance;
        report.summary.net_profit = trade.net_profit;
        report.summary.gross_profit = trade.gross_profit;
        report.summary.gross_loss = trade.gross_loss;
        report.balance_drawdown = balance_drawdown;
        report.equity_drawdown = equity_drawdown;
        report.measurement.profit_factor = profit_factor;
        report.measurement.recovery_factor = recovery_factor;
        report.measurement.expected_payoff = expected_payoff;
        report.measurement.min_margin_level = self.min_margin_level.unwrap_or(0.0);
        report.trade = trade;
        self.report = Some(report);
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn ticks(&self) -> &dyn TickSource {
        self.ticks.as_ref()
    }

    pub fn trade(&self) -> &Trade {
        &self.trade
    }

    pub fn equity_records(&self) -> &[EquityRecord] {
        &self.equity_records
    }

    pub fn positions(&self) -> &[Position] {
        self.trade.positions()
    }

    /// Every order of the run, ordered by id.
    pub fn orders(&self) -> Vec<&Order> {
        let mut orders: Vec<&Order> = self
            .positions()
            .iter()
            .flat_map(|p| p.orders().iter())
            .collect();
        orders.sort_by_key(|o| o.id());
        orders
    }

    /// Every deal of the run, ordered by id.
    pub fn deals(&self) -> Vec<&Deal> {
        let mut deals: Vec<&Deal> = self
            .orders()
            .into_iter()
            .flat_map(|o| o.deals().iter())
            .collect();
        deals.sort_by_key(|d| d.id());
        deals
    }

    pub fn account_ledger(&self) -> &[LedgerRecord] {
        self.account.ledger()
    }

    /// The run report; `None` until [`Simulator::run`] has completed.
    pub fn report(&self) -> Option<&BacktestingReport> {
        self.report.as_ref()
    }
}

/// Single-pass peak-to-trough scan of a value series.
fn drawdown(initial: f64, values: &[f64]) -> DrawdownReport {
    let mut report = DrawdownReport::default();
    let mut highest = initial;
    let mut lowest = initial;
    for &value in values {
        if value > highest {
            highest = value;
        }
        if value < lowest {
            lowest = value;
        }
        let decline = highest - value;
        if decline > report.maximum {
            report.maximum = decline;
        }
        report.relative = if highest > 0.0 {
            report.maximum / highest * 100.0
        } else {
            0.0
        };
    }
    report.absolute = initial - lowest;
    report
}
