//! Position: an open/close pair of orders representing a directional trade.

use chrono::NaiveDateTime;
use rand::rngs::StdRng;

use crate::domain::config::FillConfig;
use crate::domain::error::FxsimError;
use crate::domain::ids::EntityIds;
use crate::domain::order::{Order, OrderDirection, OrderKind};
use crate::domain::tick::Tick;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSide {
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionStatus {
    Open,
    Closed,
}

/// A directional trade. Opens with exactly one In order; closing appends
/// exactly one Out order and freezes the realized profit.
///
/// Volume, margin and point value are caller-supplied: the driver computes
/// the margin requirement and the per-point currency value, not the position.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    id: u64,
    symbol: String,
    open_time: NaiveDateTime,
    close_time: Option<NaiveDateTime>,
    side: PositionSide,
    volume: f64,
    margin: f64,
    /// Deposit-currency value of one point of one lot (unit_size / 10^digit
    /// at the opening tick).
    point_value: f64,
    comment: String,
    status: PositionStatus,
    orders: Vec<Order>,
    /// Realized profit in deposit currency, cached at close. 0 while open.
    profit: f64,
}

impl Position {
    /// Open a position by executing its In order at the given price.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn open(
        ids: &EntityIds,
        symbol: &str,
        open_time: NaiveDateTime,
        side: PositionSide,
        volume: f64,
        price: f64,
        margin: f64,
        point_value: f64,
        comment: &str,
        fill: &FillConfig,
        rng: &mut StdRng,
    ) -> Result<Self, FxsimError> {
        let mut position = Position {
            id: ids.position.next(),
            symbol: symbol.to_string(),
            open_time,
            close_time: None,
            side,
            volume,
            margin,
            point_value,
            comment: comment.to_string(),
            status: PositionStatus::Open,
            orders: Vec::new(),
            profit: 0.0,
        };
        let order = position.execute_order(ids, open_time, OrderDirection::In, price, fill, rng)?;
        position.orders.push(order);
        Ok(position)
    }

    fn execute_order(
        &self,
        ids: &EntityIds,
        timestamp: NaiveDateTime,
        direction: OrderDirection,
        price: f64,
        fill: &FillConfig,
        rng: &mut StdRng,
    ) -> Result<Order, FxsimError> {
        let kind = match (direction, self.side) {
            (OrderDirection::In, PositionSide::Long) => OrderKind::MarketBuy,
            (OrderDirection::In, PositionSide::Short) => OrderKind::MarketSell,
            (OrderDirection::Out, PositionSide::Long) => OrderKind::MarketSell,
            (OrderDirection::Out, PositionSide::Short) => OrderKind::MarketBuy,
        };
        Order::execute(
            ids,
            &self.symbol,
            timestamp,
            kind,
            direction,
            self.volume,
            price,
            fill,
            rng,
        )
    }

    /// Profit in deposit currency against a tick: the cached realized profit
    /// once closed, otherwise the floating profit of the In orders.
    pub fn profit_at(&self, tick: &Tick) -> f64 {
        if self.status == PositionStatus::Closed {
            return self.profit;
        }
        self.floating_points(tick) * self.point_value
    }

    fn floating_points(&self, tick: &Tick) -> f64 {
        self.orders
            .iter()
            .filter(|o| o.direction() == OrderDirection::In)
            .map(|o| o.profit_points(tick))
            .sum()
    }

    /// Realized profit in deposit currency; 0 while the position is open.
    pub fn realized_profit(&self) -> f64 {
        self.profit
    }

    /// Close the position at the tick's exit price (bid for long, ask for
    /// short). Idempotent: once closed, returns the cached profit and
    /// performs no further fills.
    pub(crate) fn close(
        &mut self,
        tick: &Tick,
        ids: &EntityIds,
        fill: &FillConfig,
        rng: &mut StdRng,
    ) -> Result<f64, FxsimError> {
        if self.status == PositionStatus::Closed {
            return Ok(self.profit);
        }

        let price = match self.side {
            PositionSide::Long => tick.bid,
            PositionSide::Short => tick.ask,
        };
        let order =
            self.execute_order(ids, tick.timestamp, OrderDirection::Out, price, fill, rng)?;
        self.orders.push(order);

        self.profit = self.floating_points(tick) * self.point_value;
        self.close_time = Some(tick.timestamp);
        self.status = PositionStatus::Closed;
        Ok(self.profit)
    }

    fn price_by_direction(&self, direction: OrderDirection) -> f64 {
        let mut volume_total = 0.0;
        let mut volume_price = 0.0;
        for order in self.orders.iter().filter(|o| o.direction() == direction) {
            let volume = order.filled_volume();
            volume_total += volume;
            volume_price += order.avg_fill_price().unwrap_or(0.0) * volume;
        }
        if volume_total > 0.0 {
            volume_price / volume_total
        } else {
            0.0
        }
    }

    /// Volume-weighted average entry price; 0 before any In order exists.
    pub fn open_price(&self) -> f64 {
        self.price_by_direction(OrderDirection::In)
    }

    /// Volume-weighted average exit price; 0 while the position is open.
    pub fn close_price(&self) -> f64 {
        self.price_by_direction(OrderDirection::Out)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn open_time(&self) -> NaiveDateTime {
        self.open_time
    }

    pub fn close_time(&self) -> Option<NaiveDateTime> {
        self.close_time
    }

    pub fn side(&self) -> PositionSide {
        self.side
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    pub fn point_value(&self) -> f64 {
        self.point_value
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn status(&self) -> PositionStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::SeedableRng;

    fn ts(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn tick(hour: u32, bid: f64, ask: f64) -> Tick {
        Tick {
            symbol: "EUR_USD".into(),
            timestamp: ts(hour),
            ask,
            bid,
            mid: (ask + bid) / 2.0,
            volume: 0,
            digit: 4,
            spread: ((ask - bid) * 10_000.0).round() as i64,
        }
    }

    fn open_long(ids: &EntityIds, rng: &mut StdRng) -> Position {
        // 1 lot at 1.1000 ask, 10 currency units per point.
        Position::open(
            ids,
            "EUR_USD",
            ts(9),
            PositionSide::Long,
            1.0,
            1.1000,
            1_100.0,
            10.0,
            "",
            &FillConfig::default(),
            rng,
        )
        .unwrap()
    }

    #[test]
    fn open_executes_one_in_order() {
        let ids = EntityIds::new();
        let mut rng = StdRng::seed_from_u64(1);
        let pos = open_long(&ids, &mut rng);

        assert_eq!(pos.status(), PositionStatus::Open);
        assert_eq!(pos.orders().len(), 1);
        assert_eq!(pos.orders()[0].direction(), OrderDirection::In);
        assert_eq!(pos.orders()[0].kind(), OrderKind::MarketBuy);
        assert!(pos.close_time().is_none());
        assert!((pos.open_price() - 1.1000).abs() < f64::EPSILON);
        assert!((pos.close_price() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn short_opens_with_market_sell() {
        let ids = EntityIds::new();
        let mut rng = StdRng::seed_from_u64(1);
        let pos = Position::open(
            &ids,
            "EUR_USD",
            ts(9),
            PositionSide::Short,
            1.0,
            1.1000,
            1_100.0,
            10.0,
            "",
            &FillConfig::default(),
            &mut rng,
        )
        .unwrap();
        assert_eq!(pos.orders()[0].kind(), OrderKind::MarketSell);
    }

    #[test]
    fn floating_profit_tracks_tick() {
        let ids = EntityIds::new();
        let mut rng = StdRng::seed_from_u64(1);
        let pos = open_long(&ids, &mut rng);

        // 50 points * 10 per point = 500
        let profit = pos.profit_at(&tick(10, 1.1050, 1.1052));
        assert!((profit - 500.0).abs() < 1e-6, "profit {profit}");
        assert!((pos.realized_profit() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn close_long_exits_at_bid() {
        let ids = EntityIds::new();
        let mut rng = StdRng::seed_from_u64(1);
        let mut pos = open_long(&ids, &mut rng);

        let exit = tick(12, 1.1050, 1.1052);
        let profit = pos
            .close(&exit, &ids, &FillConfig::default(), &mut rng)
            .unwrap();

        assert!((profit - 500.0).abs() < 1e-6);
        assert_eq!(pos.status(), PositionStatus::Closed);
        assert_eq!(pos.close_time(), Some(ts(12)));
        assert_eq!(pos.orders().len(), 2);
        assert_eq!(pos.orders()[1].direction(), OrderDirection::Out);
        assert_eq!(pos.orders()[1].kind(), OrderKind::MarketSell);
        assert!((pos.close_price() - 1.1050).abs() < f64::EPSILON);
        assert!((pos.realized_profit() - 500.0).abs() < 1e-6);
    }

    #[test]
    fn close_short_exits_at_ask() {
        let ids = EntityIds::new();
        let mut rng = StdRng::seed_from_u64(1);
        let mut pos = Position::open(
            &ids,
            "EUR_USD",
            ts(9),
            PositionSide::Short,
            1.0,
            1.1000,
            1_100.0,
            10.0,
            "",
            &FillConfig::default(),
            &mut rng,
        )
        .unwrap();

        let exit = tick(12, 1.0948, 1.0950);
        let profit = pos
            .close(&exit, &ids, &FillConfig::default(), &mut rng)
            .unwrap();

        // Short entered at 1.1000, covered at ask 1.0950: 50 points * 10.
        assert!((profit - 500.0).abs() < 1e-6, "profit {profit}");
        assert_eq!(pos.orders()[1].kind(), OrderKind::MarketBuy);
        assert!((pos.close_price() - 1.0950).abs() < f64::EPSILON);
    }

    #[test]
    fn close_is_idempotent() {
        let ids = EntityIds::new();
        let mut rng = StdRng::seed_from_u64(1);
        let mut pos = open_long(&ids, &mut rng);

        let exit = tick(12, 1.1050, 1.1052);
        let first = pos
            .close(&exit, &ids, &FillConfig::default(), &mut rng)
            .unwrap();
        let orders_after_first = pos.orders().len();

        // A later, different tick must not change the cached result.
        let later = tick(13, 1.2000, 1.2002);
        let second = pos
            .close(&later, &ids, &FillConfig::default(), &mut rng)
            .unwrap();

        assert!((first - second).abs() < f64::EPSILON);
        assert_eq!(pos.orders().len(), orders_after_first);
        assert_eq!(pos.close_time(), Some(ts(12)));
        // profit_at ignores the tick once closed
        assert!((pos.profit_at(&later) - first).abs() < f64::EPSILON);
    }

    #[test]
    fn open_with_invalid_volume_fails_before_mutation() {
        let ids = EntityIds::new();
        let mut rng = StdRng::seed_from_u64(1);
        let result = Position::open(
            &ids,
            "EUR_USD",
            ts(9),
            PositionSide::Long,
            -1.0,
            1.1,
            0.0,
            10.0,
            "",
            &FillConfig::default(),
            &mut rng,
        );
        assert!(matches!(
            result,
            Err(FxsimError::Validation {
                field: "volume",
                ..
            })
        ));
    }

    #[test]
    fn randomized_close_realizes_same_volume() {
        let fill = FillConfig {
            randomize: true,
            slippage_points_min: -2,
            slippage_points_max: 2,
            volume_percent_min: 25,
            volume_percent_max: 75,
            ..FillConfig::default()
        };
        let ids = EntityIds::new();
        let mut rng = StdRng::seed_from_u64(7);
        let mut pos = Position::open(
            &ids,
            "EUR_USD",
            ts(9),
            PositionSide::Long,
            2.0,
            1.1000,
            2_200.0,
            10.0,
            "",
            &fill,
            &mut rng,
        )
        .unwrap();

        pos.close(&tick(12, 1.1050, 1.1052), &ids, &fill, &mut rng)
            .unwrap();
        let out = &pos.orders()[1];
        assert!((out.filled_volume() - 2.0).abs() < 1e-9);
    }
}
