//! Simulation configuration, immutable for a run's duration.

use crate::domain::error::FxsimError;

/// Account-level constants.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountConfig {
    pub deposit_currency: String,
    pub initial_balance: f64,
    pub leverage: u32,
    pub unit_size: u32,
    /// Margin level percentage at or below which new positions are refused.
    pub margin_call_level: f64,
    /// Margin level percentage at or below which all positions are liquidated.
    pub stop_out_level: f64,
}

impl Default for AccountConfig {
    fn default() -> Self {
        AccountConfig {
            deposit_currency: "USD".into(),
            initial_balance: 10_000.0,
            leverage: 100,
            unit_size: 100_000,
            margin_call_level: 100.0,
            stop_out_level: 50.0,
        }
    }
}

/// Order fill model parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct FillConfig {
    /// When false, every order fills with a single deal at the hint price.
    pub randomize: bool,
    /// Slippage drawn uniformly from this closed range, in points.
    pub slippage_points_min: i64,
    pub slippage_points_max: i64,
    /// Per-deal volume drawn uniformly from this closed range, as a
    /// percentage of the order's requested volume.
    pub volume_percent_min: u32,
    pub volume_percent_max: u32,
}

impl Default for FillConfig {
    fn default() -> Self {
        FillConfig {
            randomize: false,
            slippage_points_min: -3,
            slippage_points_max: 3,
            volume_percent_min: 10,
            volume_percent_max: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimulationConfig {
    pub account: AccountConfig,
    pub fill: FillConfig,
    /// RNG seed for the randomized fill model; None seeds from entropy.
    pub seed: Option<u64>,
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), FxsimError> {
        let acc = &self.account;
        if acc.initial_balance <= 0.0 {
            return Err(FxsimError::Validation {
                field: "initial_balance",
                value: acc.initial_balance,
            });
        }
        if acc.leverage == 0 {
            return Err(FxsimError::Validation {
                field: "leverage",
                value: 0.0,
            });
        }
        if acc.unit_size == 0 {
            return Err(FxsimError::Validation {
                field: "unit_size",
                value: 0.0,
            });
        }
        if acc.margin_call_level <= acc.stop_out_level {
            return Err(FxsimError::ConfigInvalid {
                section: "account".into(),
                key: "margin_call_level".into(),
                reason: format!(
                    "margin_call_level ({}) must exceed stop_out_level ({})",
                    acc.margin_call_level, acc.stop_out_level
                ),
            });
        }
        if acc.stop_out_level < 0.0 {
            return Err(FxsimError::ConfigInvalid {
                section: "account".into(),
                key: "stop_out_level".into(),
                reason: "must not be negative".into(),
            });
        }

        let fill = &self.fill;
        if fill.slippage_points_min > fill.slippage_points_max {
            return Err(FxsimError::ConfigInvalid {
                section: "deal".into(),
                key: "slippage_points".into(),
                reason: format!(
                    "min ({}) exceeds max ({})",
                    fill.slippage_points_min, fill.slippage_points_max
                ),
            });
        }
        if fill.volume_percent_min == 0 {
            return Err(FxsimError::ConfigInvalid {
                section: "deal".into(),
                key: "volume_percent_min".into(),
                reason: "must be at least 1 or the fill loop cannot terminate".into(),
            });
        }
        if fill.volume_percent_min > fill.volume_percent_max {
            return Err(FxsimError::ConfigInvalid {
                section: "deal".into(),
                key: "volume_percent".into(),
                reason: format!(
                    "min ({}) exceeds max ({})",
                    fill.volume_percent_min, fill.volume_percent_max
                ),
            });
        }
        if fill.volume_percent_max > 100 {
            return Err(FxsimError::ConfigInvalid {
                section: "deal".into(),
                key: "volume_percent_max".into(),
                reason: "must not exceed 100".into(),
            });
        }
        Ok(())
    }
}
