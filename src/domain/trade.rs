//! Trade: the collection of positions for a run, plus its aggregate report.

use std::sync::Arc;

use chrono::NaiveDateTime;
use rand::rngs::StdRng;

use crate::domain::config::FillConfig;
use crate::domain::error::FxsimError;
use crate::domain::ids::EntityIds;
use crate::domain::position::{Position, PositionSide};
use crate::domain::report::{Streak, TradeReport};
use crate::domain::tick::Tick;

/// Owns every position opened during a run, newest first. The aggregate
/// report is memoized and rebuilt wholesale on demand; any mutation drops
/// the cached copy.
#[derive(Debug)]
pub struct Trade {
    ids: Arc<EntityIds>,
    fill: FillConfig,
    positions: Vec<Position>,
    report: Option<TradeReport>,
}

impl Trade {
    pub fn new(ids: Arc<EntityIds>, fill: FillConfig) -> Self {
        Trade {
            ids,
            fill,
            positions: Vec::new(),
            report: None,
        }
    }

    /// Open a position and return its id.
    #[allow(clippy::too_many_arguments)]
    pub fn open_position(
        &mut self,
        symbol: &str,
        open_time: NaiveDateTime,
        side: PositionSide,
        volume: f64,
        price: f64,
        margin: f64,
        point_value: f64,
        comment: &str,
        rng: &mut StdRng,
    ) -> Result<u64, FxsimError> {
        let position = Position::open(
            &self.ids,
            symbol,
            open_time,
            side,
            volume,
            price,
            margin,
            point_value,
            comment,
            &self.fill,
            rng,
        )?;
        let id = position.id();
        self.positions.insert(0, position);
        self.report = None;
        Ok(id)
    }

    /// Close the open position with the given id against a tick. Returns the
    /// locked margin and the realized profit, or `None` when no open position
    /// has that id.
    pub fn close_position(
        &mut self,
        id: u64,
        tick: &Tick,
        rng: &mut StdRng,
    ) -> Result<Option<(f64, f64)>, FxsimError> {
        let Some(position) = self.positions.iter_mut().find(|p| p.is_open() && p.id() == id)
        else {
            return Ok(None);
        };
        let profit = position.close(tick, &self.ids, &self.fill, rng)?;
        let margin = position.margin();
        self.report = None;
        Ok(Some((margin, profit)))
    }

    /// Close every open position. Returns the closed ids with their locked
    /// margin and realized profit, in closing order.
    pub fn close_all_positions(
        &mut self,
        tick: &Tick,
        rng: &mut StdRng,
    ) -> Result<Vec<(u64, f64, f64)>, FxsimError> {
        let open: Vec<u64> = self.open_positions().map(Position::id).collect();
        let mut closed = Vec::with_capacity(open.len());
        for id in open {
            if let Some((margin, profit)) = self.close_position(id, tick, rng)? {
                closed.push((id, margin, profit));
            }
        }
        Ok(closed)
    }

    pub fn position(&self, id: u64) -> Option<&Position> {
        self.positions.iter().find(|p| p.id() == id)
    }

    /// All positions, newest first.
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter().filter(|p| p.is_open())
    }

    /// The most recently opened position that is still open.
    pub fn last_open_position(&self) -> Option<&Position> {
        self.open_positions().next()
    }

    /// Unrealized profit of all open positions against a tick.
    pub fn floating_profit(&self, tick: &Tick) -> f64 {
        self.open_positions().map(|p| p.profit_at(tick)).sum()
    }

    /// Realized profit of all closed positions.
    pub fn realized_net_profit(&self) -> f64 {
        self.positions
            .iter()
            .filter(|p| !p.is_open())
            .map(Position::realized_profit)
            .sum()
    }

    /// Margin locked by open positions.
    pub fn margin_used(&self) -> f64 {
        self.open_positions().map(Position::margin).sum()
    }

    /// The aggregate report, computed over every position in opening order.
    /// Open positions count toward the totals; only closed ones carry profit.
    /// Memoized; pass `rerun` to force a rebuild.
    pub fn report(&mut self, rerun: bool) -> &TradeReport {
        if rerun || self.report.is_none() {
            self.report = Some(self.compute_report());
        }
        self.report.as_ref().unwrap()
    }

    fn compute_report(&self) -> TradeReport {
        let mut report = TradeReport::default();
        let mut win_run = Streak::default();
        let mut loss_run = Streak::default();
        let mut win_history: Vec<u32> = Vec::new();
        let mut loss_history: Vec<u32> = Vec::new();

        // Oldest first, so streaks follow the order positions were opened.
        for position in self.positions.iter().rev() {
            report.total_orders += position.orders().len() as u32;
            report.total_deals += position
                .orders()
                .iter()
                .map(|o| o.deals().len() as u32)
                .sum::<u32>();
            let stats = match position.side() {
                PositionSide::Long => &mut report.long_positions,
                PositionSide::Short => &mut report.short_positions,
            };
            stats.total += 1;
            report.all_positions.total += 1;
            // Still-open positions count toward the totals with no realized
            // profit; they are neither wins nor losses.
            if position.is_open() {
                continue;
            }

            let profit = position.realized_profit();
            report.net_profit += profit;

            if profit > 0.0 {
                stats.won += 1;
                report.all_positions.won += 1;
                report.gross_profit += profit;
                report.largest_profit = report.largest_profit.max(profit);

                win_run.count += 1;
                win_run.profit += profit;
                if win_run.count > report.max_consecutive_wins.count {
                    report.max_consecutive_wins = win_run;
                }
                if loss_run.count > 0 {
                    loss_history.push(loss_run.count);
                    loss_run = Streak::default();
                }
            } else if profit < 0.0 {
                stats.lost += 1;
                report.all_positions.lost += 1;
                report.gross_loss += profit;
                report.largest_loss = report.largest_loss.min(profit);

                loss_run.count += 1;
                loss_run.profit += profit;
                if loss_run.count > report.max_consecutive_losses.count {
                    report.max_consecutive_losses = loss_run;
                }
                if win_run.count > 0 {
                    win_history.push(win_run.count);
                    win_run = Streak::default();
                }
            }
            // Zero-profit positions neither extend nor break a streak.
        }

        if win_run.count > 0 {
            win_history.push(win_run.count);
        }
        if loss_run.count > 0 {
            loss_history.push(loss_run.count);
        }

        report.average_profit = if report.all_positions.won > 0 {
            report.gross_profit / f64::from(report.all_positions.won)
        } else {
            0.0
        };
        report.average_loss = if report.all_positions.lost > 0 {
            report.gross_loss / f64::from(report.all_positions.lost)
        } else {
            0.0
        };
        report.avg_consecutive_wins = mean(&win_history);
        report.avg_consecutive_losses = mean(&loss_history);
        report
    }
}

fn mean(runs: &[u32]) -> f64 {
    if runs.is_empty() {
        return 0.0;
    }
    runs.iter().map(|&c| f64::from(c)).sum::<f64>() / runs.len() as f64
}
