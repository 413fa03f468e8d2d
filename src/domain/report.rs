//! Report value types.
//!
//! All aggregates here are rebuilt wholesale from Trade/Account/equity state,
//! never patched incrementally.

use std::fmt;

/// Won/lost counts for a position subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PositionStats {
    pub total: u32,
    pub won: u32,
    pub lost: u32,
}

/// A run of consecutive wins or losses: how many, and their summed profit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Streak {
    pub count: u32,
    pub profit: f64,
}

/// Aggregate over all positions of a run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TradeReport {
    pub net_profit: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub all_positions: PositionStats,
    pub long_positions: PositionStats,
    pub short_positions: PositionStats,
    pub total_orders: u32,
    pub total_deals: u32,
    pub largest_profit: f64,
    pub largest_loss: f64,
    pub average_profit: f64,
    pub average_loss: f64,
    pub max_consecutive_wins: Streak,
    pub max_consecutive_losses: Streak,
    pub avg_consecutive_wins: f64,
    pub avg_consecutive_losses: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SummaryReport {
    pub ticks: u64,
    pub initial_balance: f64,
    pub final_balance: f64,
    pub net_profit: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
}

/// Peak-to-trough decline over the run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DrawdownReport {
    /// Initial value minus the lowest value seen.
    pub absolute: f64,
    /// Largest peak-to-value decline.
    pub maximum: f64,
    /// `maximum` as a percentage of the running peak.
    pub relative: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeasurementReport {
    pub profit_factor: f64,
    pub recovery_factor: f64,
    pub expected_payoff: f64,
    /// Lowest margin level observed during the run; 0 when margin was never used.
    pub min_margin_level: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BacktestingReport {
    pub summary: SummaryReport,
    pub balance_drawdown: DrawdownReport,
    pub equity_drawdown: DrawdownReport,
    pub measurement: MeasurementReport,
    pub trade: TradeReport,
}

impl fmt::Display for BacktestingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BACKTESTING REPORT")?;
        writeln!(f, "1. Summary")?;
        writeln!(f, "    ticks: {}", self.summary.ticks)?;
        writeln!(f, "    initial balance: {:.2}", self.summary.initial_balance)?;
        writeln!(f, "    final balance: {:.2}", self.summary.final_balance)?;
        writeln!(f, "    net profit: {:.2}", self.summary.net_profit)?;
        writeln!(f, "    gross profit: {:.2}", self.summary.gross_profit)?;
        writeln!(f, "    gross loss: {:.2}", self.summary.gross_loss)?;
        writeln!(f, "2. Drawdown")?;
        writeln!(
            f,
            "    balance: abs {:.2}, max {:.2}, rel {:.2}%",
            self.balance_drawdown.absolute,
            self.balance_drawdown.maximum,
            self.balance_drawdown.relative
        )?;
        writeln!(
            f,
            "    equity:  abs {:.2}, max {:.2}, rel {:.2}%",
            self.equity_drawdown.absolute,
            self.equity_drawdown.maximum,
            self.equity_drawdown.relative
        )?;
        writeln!(f, "3. Measurement")?;
        writeln!(f, "    profit factor: {:.2}", self.measurement.profit_factor)?;
        writeln!(
            f,
            "    recovery factor: {:.2}",
            self.measurement.recovery_factor
        )?;
        writeln!(
            f,
            "    expected payoff: {:.2}",
            self.measurement.expected_payoff
        )?;
        writeln!(
            f,
            "    min margin level: {:.2}%",
            self.measurement.min_margin_level
        )?;
        writeln!(f, "4. Trade")?;
        for (label, stats) in [
            ("all", self.trade.all_positions),
            ("long", self.trade.long_positions),
            ("short", self.trade.short_positions),
        ] {
            writeln!(
                f,
                "    {} positions: total {}, won {}, lost {}",
                label, stats.total, stats.won, stats.lost
            )?;
        }
        writeln!(f, "    total orders: {}", self.trade.total_orders)?;
        writeln!(f, "    total deals: {}", self.trade.total_deals)?;
        writeln!(f, "    largest profit: {:.2}", self.trade.largest_profit)?;
        writeln!(f, "    largest loss: {:.2}", self.trade.largest_loss)?;
        writeln!(f, "    average profit: {:.2}", self.trade.average_profit)?;
        writeln!(f, "    average loss: {:.2}", self.trade.average_loss)?;
        writeln!(
            f,
            "    max consecutive wins: {} ({:.2}), avg run {:.2}",
            self.trade.max_consecutive_wins.count,
            self.trade.max_consecutive_wins.profit,
            self.trade.avg_consecutive_wins
        )?;
        write!(
            f,
            "    max consecutive losses: {} ({:.2}), avg run {:.2}",
            self.trade.max_consecutive_losses.count,
            self.trade.max_consecutive_losses.profit,
            self.trade.avg_consecutive_losses
        )
    }
}
