//! INI file configuration adapter.
//!
//! Sections: `[account]` for balance and margin thresholds, `[fill]` for the
//! randomized fill model, `[simulation]` for the RNG seed. Missing keys fall
//! back to the defaults in [`SimulationConfig`].

use std::path::Path;

use configparser::ini::Ini;

use crate::domain::config::SimulationConfig;
use crate::domain::error::FxsimError;
use crate::ports::config_port::ConfigPort;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, FxsimError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|e| FxsimError::ConfigParse {
            file: path.display().to_string(),
            reason: e,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, FxsimError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|e| FxsimError::ConfigParse {
                file: "<string>".into(),
                reason: e,
            })?;
        Ok(Self { config })
    }

    /// Build and validate a [`SimulationConfig`] from the loaded file.
    pub fn simulation_config(&self) -> Result<SimulationConfig, FxsimError> {
        let mut config = SimulationConfig::default();

        if let Some(currency) = self.get_string("account", "deposit_currency") {
            config.account.deposit_currency = currency;
        }
        config.account.initial_balance =
            self.get_double("account", "initial_balance", config.account.initial_balance);
        config.account.leverage = read_u32(
            self,
            "account",
            "leverage",
            config.account.leverage,
        )?;
        config.account.unit_size = read_u32(
            self,
            "account",
            "unit_size",
            config.account.unit_size,
        )?;
        config.account.margin_call_level = self.get_double(
            "account",
            "margin_call_level",
            config.account.margin_call_level,
        );
        config.account.stop_out_level =
            self.get_double("account", "stop_out_level", config.account.stop_out_level);

        config.fill.randomize = self.get_bool("fill", "randomize", config.fill.randomize);
        config.fill.slippage_points_min = self.get_int(
            "fill",
            "slippage_points_min",
            config.fill.slippage_points_min,
        );
        config.fill.slippage_points_max = self.get_int(
            "fill",
            "slippage_points_max",
            config.fill.slippage_points_max,
        );
        config.fill.volume_percent_min = read_u32(
            self,
            "fill",
            "volume_percent_min",
            config.fill.volume_percent_min,
        )?;
        config.fill.volume_percent_max = read_u32(
            self,
            "fill",
            "volume_percent_max",
            config.fill.volume_percent_max,
        )?;

        config.seed = self
            .get_string("simulation", "seed")
            .map(|raw| {
                raw.parse::<u64>().map_err(|e| FxsimError::ConfigInvalid {
                    section: "simulation".into(),
                    key: "seed".into(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        config.validate()?;
        Ok(config)
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

fn read_u32(
    adapter: &FileConfigAdapter,
    section: &str,
    key: &str,
    default: u32,
) -> Result<u32, FxsimError> {
    let raw = adapter.get_int(section, key, i64::from(default));
    u32::try_from(raw).map_err(|_| FxsimError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason: format!("{} is out of range", raw),
    })
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}
