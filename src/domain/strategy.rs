//! Strategy seam between the driver and trading logic.

use crate::domain::error::FxsimError;
use crate::domain::position::PositionSide;
use crate::domain::simulation::Simulator;
use crate::domain::tick::Tick;
use crate::ports::tick_port::TickSource;

/// Called once per tick, before the equity snapshot for that tick is taken.
/// Strategies act on the simulator through its margin-checked open and close
/// operations.
pub trait Strategy {
    fn on_tick(
        &mut self,
        index: usize,
        tick: &Tick,
        sim: &mut Simulator,
    ) -> Result<(), FxsimError>;
}

/// Closures with the right shape are strategies.
impl<F> Strategy for F
where
    F: FnMut(usize, &Tick, &mut Simulator) -> Result<(), FxsimError>,
{
    fn on_tick(
        &mut self,
        index: usize,
        tick: &Tick,
        sim: &mut Simulator,
    ) -> Result<(), FxsimError> {
        self(index, tick, sim)
    }
}

/// Opens one long on the first tick and holds it until the run closes it.
#[derive(Debug, Clone)]
pub struct BuyAndHold {
    volume: f64,
}

impl BuyAndHold {
    pub fn new(volume: f64) -> Self {
        BuyAndHold { volume }
    }
}

impl Strategy for BuyAndHold {
    fn on_tick(
        &mut self,
        index: usize,
        tick: &Tick,
        sim: &mut Simulator,
    ) -> Result<(), FxsimError> {
        if index == 0 {
            sim.open_long(tick, self.volume, "buy and hold")?;
        }
        Ok(())
    }
}

/// Trades against the recent drift: a negative rolling mean of log mid
/// returns wants a long, a positive one wants a short. An opposing open
/// position is only closed; the new side is entered on a later tick once
/// flat. Signals are precomputed over the whole series; warm-up ticks are
/// no-ops.
#[derive(Debug, Clone)]
pub struct Contrarian {
    volume: f64,
    signals: Vec<f64>,
}

impl Contrarian {
    pub fn new(ticks: &dyn TickSource, window: usize, volume: f64) -> Self {
        Contrarian {
            volume,
            signals: rolling_mean_log_returns(ticks, window),
        }
    }

    fn desired_side(&self, index: usize) -> Option<PositionSide> {
        let signal = *self.signals.get(index)?;
        if signal.is_nan() {
            None
        } else if signal < 0.0 {
            Some(PositionSide::Long)
        } else if signal > 0.0 {
            Some(PositionSide::Short)
        } else {
            None
        }
    }
}

impl Strategy for Contrarian {
    fn on_tick(
        &mut self,
        index: usize,
        tick: &Tick,
        sim: &mut Simulator,
    ) -> Result<(), FxsimError> {
        let Some(side) = self.desired_side(index) else {
            return Ok(());
        };

        let last_open = sim
            .trade()
            .last_open_position()
            .map(|p| (p.id(), p.side()));
        match last_open {
            None => {
                match side {
                    PositionSide::Long => sim.open_long(tick, self.volume, "contrarian")?,
                    PositionSide::Short => sim.open_short(tick, self.volume, "contrarian")?,
                };
            }
            Some((id, open_side)) if open_side != side => {
                sim.close_position(id, tick)?;
            }
            Some(_) => {}
        }
        Ok(())
    }
}

/// Rolling mean of one-tick log mid returns; NaN until `window` returns exist.
fn rolling_mean_log_returns(ticks: &dyn TickSource, window: usize) -> Vec<f64> {
    let len = ticks.len();
    let mut signals = vec![f64::NAN; len];
    if window == 0 || len < 2 {
        return signals;
    }

    let mids: Vec<f64> = (0..len)
        .filter_map(|i| ticks.tick(i))
        .map(|t| t.mid)
        .collect();
    let returns: Vec<f64> = mids.windows(2).map(|w| (w[1] / w[0]).ln()).collect();

    for index in window..len {
        // Returns ending at this tick: returns[index - window .. index].
        let slice = &returns[index - window..index];
        signals[index] = slice.iter().sum::<f64>() / window as f64;
    }
    signals
}
