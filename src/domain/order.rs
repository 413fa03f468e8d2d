//! Order: a request to fill a volume at or near a price, composed of Deals.

use chrono::NaiveDateTime;
use rand::Rng;
use rand::rngs::StdRng;

use crate::domain::config::FillConfig;
use crate::domain::deal::{Deal, DealSide};
use crate::domain::error::FxsimError;
use crate::domain::ids::EntityIds;
use crate::domain::tick::Tick;

/// Divisor converting slippage points to a price offset.
pub const POINT_DIVISOR: f64 = 100_000.0;

/// Upper bound on fill iterations before the order is declared exhausted.
/// A valid config (volume percentage >= 1) fills within ~100 deals.
const MAX_FILL_ATTEMPTS: usize = 256;

/// Residual volume below this fraction counts as filled.
pub const FILL_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    MarketBuy,
    MarketSell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    /// Opens a position.
    In,
    /// Closes a position.
    Out,
}

/// A filled market order. Constructed and executed only by [`Position`];
/// strategies never build orders directly.
///
/// [`Position`]: crate::domain::position::Position
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    id: u64,
    symbol: String,
    timestamp: NaiveDateTime,
    kind: OrderKind,
    direction: OrderDirection,
    volume: f64,
    price: f64,
    deals: Vec<Deal>,
}

impl Order {
    /// Validate, construct and fill an order.
    ///
    /// In deterministic mode the order fills with a single deal at the hint
    /// price. In randomized mode deals are synthesized with slippage drawn
    /// from the configured point range and per-deal volume drawn as a
    /// percentage of the requested volume, clamped so the cumulative fill
    /// never exceeds the request. Exceeding the attempt bound fails the call.
    pub(crate) fn execute(
        ids: &EntityIds,
        symbol: &str,
        timestamp: NaiveDateTime,
        kind: OrderKind,
        direction: OrderDirection,
        volume: f64,
        price: f64,
        fill: &FillConfig,
        rng: &mut StdRng,
    ) -> Result<Self, FxsimError> {
        if !(volume > 0.0) {
            return Err(FxsimError::Validation {
                field: "volume",
                value: volume,
            });
        }
        if !(price > 0.0) {
            return Err(FxsimError::Validation {
                field: "price",
                value: price,
            });
        }

        let mut order = Order {
            id: ids.order.next(),
            symbol: symbol.to_string(),
            timestamp,
            kind,
            direction,
            volume,
            price,
            deals: Vec::new(),
        };
        order.fill(ids, fill, rng)?;
        Ok(order)
    }

    fn fill(&mut self, ids: &EntityIds, fill: &FillConfig, rng: &mut StdRng) -> Result<(), FxsimError> {
        let side = match self.kind {
            OrderKind::MarketBuy => DealSide::Buy,
            OrderKind::MarketSell => DealSide::Sell,
        };

        if !fill.randomize {
            self.deals.push(Deal::new(
                &ids.deal,
                &self.symbol,
                self.timestamp,
                side,
                self.volume,
                self.price,
            ));
            return Ok(());
        }

        let mut attempts = 0;
        while self.volume - self.filled_volume() > FILL_TOLERANCE * self.volume {
            attempts += 1;
            if attempts > MAX_FILL_ATTEMPTS {
                return Err(FxsimError::FillExhausted {
                    order_id: self.id,
                    attempts: MAX_FILL_ATTEMPTS,
                    filled: self.filled_volume(),
                    requested: self.volume,
                });
            }

            let slippage =
                rng.gen_range(fill.slippage_points_min..=fill.slippage_points_max) as f64
                    / POINT_DIVISOR;
            let percent =
                rng.gen_range(fill.volume_percent_min..=fill.volume_percent_max) as f64 / 100.0;

            let remaining = self.volume - self.filled_volume();
            let volume = (percent * self.volume).min(remaining);
            if volume <= 0.0 {
                continue;
            }

            self.deals.push(Deal::new(
                &ids.deal,
                &self.symbol,
                self.timestamp,
                side,
                volume,
                self.price + slippage,
            ));
        }
        Ok(())
    }

    /// Profit against a tick, in the instrument's point unit.
    ///
    /// Buy deals gain as the bid rises above the fill price, sell deals as
    /// the ask falls below it; the sum is scaled by `10^digit`.
    pub fn profit_points(&self, tick: &Tick) -> f64 {
        let point: f64 = self
            .deals
            .iter()
            .map(|deal| match deal.side() {
                DealSide::Buy => (tick.bid - deal.price()) * deal.volume(),
                DealSide::Sell => (deal.price() - tick.ask) * deal.volume(),
            })
            .sum();
        point * tick.point_factor()
    }

    /// Volume-weighted average fill price over executed deals.
    pub fn avg_fill_price(&self) -> Result<f64, FxsimError> {
        let volume = self.filled_volume();
        if self.deals.is_empty() || volume <= 0.0 {
            return Err(FxsimError::ZeroFilledVolume { order_id: self.id });
        }
        let volume_price: f64 = self.deals.iter().map(|d| d.volume() * d.price()).sum();
        Ok(volume_price / volume)
    }

    /// Total volume of executed deals.
    pub fn filled_volume(&self) -> f64 {
        self.deals.iter().map(Deal::volume).sum()
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

    pub fn kind(&self) -> OrderKind {
        self.kind
    }

    pub fn direction(&self) -> OrderDirection {
        self.direction
    }

    /// Requested volume.
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Price hint the order was placed at.
    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn deals(&self) -> &[Deal] {
        &self.deals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::SeedableRng;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn tick(bid: f64, ask: f64) -> Tick {
        Tick {
            symbol: "EUR_USD".into(),
            timestamp: ts(),
            ask,
            bid,
            mid: (ask + bid) / 2.0,
            volume: 0,
            digit: 4,
            spread: ((ask - bid) * 10_000.0).round() as i64,
        }
    }

    fn execute(fill: &FillConfig, volume: f64, price: f64) -> Result<Order, FxsimError> {
        let ids = EntityIds::new();
        Order::execute(
            &ids,
            "EUR_USD",
            ts(),
            OrderKind::MarketBuy,
            OrderDirection::In,
            volume,
            price,
            fill,
            &mut rng(),
        )
    }

    #[test]
    fn deterministic_fill_is_a_single_exact_deal() {
        let order = execute(&FillConfig::default(), 1.5, 1.1000).unwrap();
        assert_eq!(order.deals().len(), 1);
        assert!((order.deals()[0].volume() - 1.5).abs() < f64::EPSILON);
        assert!((order.deals()[0].price() - 1.1000).abs() < f64::EPSILON);
        assert!((order.filled_volume() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_non_positive_volume() {
        let err = execute(&FillConfig::default(), 0.0, 1.1).unwrap_err();
        assert!(matches!(
            err,
            FxsimError::Validation {
                field: "volume",
                ..
            }
        ));
    }

    #[test]
    fn rejects_non_positive_price() {
        let err = execute(&FillConfig::default(), 1.0, -1.1).unwrap_err();
        assert!(matches!(
            err,
            FxsimError::Validation { field: "price", .. }
        ));
    }

    #[test]
    fn randomized_fill_completes_exactly() {
        let fill = FillConfig {
            randomize: true,
            slippage_points_min: -5,
            slippage_points_max: 5,
            volume_percent_min: 10,
            volume_percent_max: 40,
            ..FillConfig::default()
        };
        let order = execute(&fill, 2.0, 1.1000).unwrap();
        assert!(order.deals().len() > 1);
        assert!(
            (order.filled_volume() - 2.0).abs() < 1e-9,
            "filled {} of 2.0",
            order.filled_volume(),
        );
        // Every deal within the slippage band and no cumulative overshoot.
        for deal in order.deals() {
            assert!(deal.price() >= 1.1000 - 5.0 / POINT_DIVISOR);
            assert!(deal.price() <= 1.1000 + 5.0 / POINT_DIVISOR);
            assert!(deal.volume() > 0.0);
        }
    }

    #[test]
    fn randomized_fill_respects_full_percent_draw() {
        let fill = FillConfig {
            randomize: true,
            slippage_points_min: 0,
            slippage_points_max: 0,
            volume_percent_min: 100,
            volume_percent_max: 100,
            ..FillConfig::default()
        };
        let order = execute(&fill, 1.0, 1.2345).unwrap();
        assert_eq!(order.deals().len(), 1);
        assert!((order.deals()[0].price() - 1.2345).abs() < f64::EPSILON);
    }

    #[test]
    fn exhaustion_when_fill_cannot_progress() {
        // A zero volume percentage never passes config validation; feeding it
        // straight to execute exercises the attempt bound.
        let fill = FillConfig {
            randomize: true,
            slippage_points_min: 0,
            slippage_points_max: 0,
            volume_percent_min: 0,
            volume_percent_max: 0,
            ..FillConfig::default()
        };
        let err = execute(&fill, 1.0, 1.1).unwrap_err();
        assert!(matches!(err, FxsimError::FillExhausted { .. }));
    }

    #[test]
    fn buy_profit_points() {
        let order = execute(&FillConfig::default(), 1.0, 1.1000).unwrap();
        // (1.1050 - 1.1000) * 1.0 * 10^4 = 50 points
        let profit = order.profit_points(&tick(1.1050, 1.1052));
        assert!((profit - 50.0).abs() < 1e-6, "profit {profit}");
    }

    #[test]
    fn sell_profit_points() {
        let ids = EntityIds::new();
        let order = Order::execute(
            &ids,
            "EUR_USD",
            ts(),
            OrderKind::MarketSell,
            OrderDirection::In,
            1.0,
            1.1000,
            &FillConfig::default(),
            &mut rng(),
        )
        .unwrap();
        // (1.1000 - 1.0952) * 1.0 * 10^4 = 48 points
        let profit = order.profit_points(&tick(1.0950, 1.0952));
        assert!((profit - 48.0).abs() < 1e-6, "profit {profit}");
    }

    #[test]
    fn losing_buy_profit_is_negative() {
        let order = execute(&FillConfig::default(), 1.0, 1.1000).unwrap();
        let profit = order.profit_points(&tick(1.0950, 1.0952));
        assert!(profit < 0.0);
    }

    #[test]
    fn avg_fill_price_is_volume_weighted() {
        let fill = FillConfig {
            randomize: true,
            slippage_points_min: -10,
            slippage_points_max: 10,
            volume_percent_min: 20,
            volume_percent_max: 50,
            ..FillConfig::default()
        };
        let order = execute(&fill, 1.0, 1.1000).unwrap();
        let expected: f64 = order
            .deals()
            .iter()
            .map(|d| d.volume() * d.price())
            .sum::<f64>()
            / order.filled_volume();
        assert!((order.avg_fill_price().unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn avg_fill_price_without_deals_is_a_domain_error() {
        let order = Order {
            id: 9,
            symbol: "EUR_USD".into(),
            timestamp: ts(),
            kind: OrderKind::MarketBuy,
            direction: OrderDirection::In,
            volume: 1.0,
            price: 1.1,
            deals: Vec::new(),
        };
        assert!(matches!(
            order.avg_fill_price(),
            Err(FxsimError::ZeroFilledVolume { order_id: 9 })
        ));
    }
}
