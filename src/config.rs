//! TOML-based quoting configuration and preset definitions.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::finance::FinanceParams;
use crate::quote::QuoteEngine;
use crate::sizing::SizingParams;
use crate::tariff::{ElectricityTariff, TariffBlock};

/// Top-level configuration parsed from TOML.
///
/// All sections have defaults matching the illustrative preset. Load from
/// TOML with [`QuoteConfig::from_toml_file`] or pick a preset with
/// [`QuoteConfig::from_preset`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuoteConfig {
    /// Block tariff table.
    #[serde(default)]
    pub tariff: TariffConfig,
    /// Panel, inverter and battery sizing constants.
    #[serde(default)]
    pub sizing: SizingConfig,
    /// Market constants for the financial projection.
    #[serde(default)]
    pub finance: FinanceConfig,
}

/// Block tariff table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TariffConfig {
    /// Blocks in ascending order; every block but the last has an upper bound.
    pub blocks: Vec<TariffBlockConfig>,
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            blocks: vec![
                TariffBlockConfig::bounded(100.0, 6.0),
                TariffBlockConfig::bounded(300.0, 9.0),
                TariffBlockConfig::open(14.0),
            ],
        }
    }
}

/// One `[[tariff.blocks]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TariffBlockConfig {
    /// Upper bound of the block (kWh/month). Omitted on the last block.
    pub upper_kwh: Option<f64>,
    /// Price per kWh inside the block.
    pub price_per_kwh: f64,
}

impl TariffBlockConfig {
    fn bounded(upper_kwh: f64, price_per_kwh: f64) -> Self {
        Self {
            upper_kwh: Some(upper_kwh),
            price_per_kwh,
        }
    }

    fn open(price_per_kwh: f64) -> Self {
        Self {
            upper_kwh: None,
            price_per_kwh,
        }
    }
}

/// Panel, inverter and battery sizing constants.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SizingConfig {
    /// Rated panel power (W).
    pub panel_wattage_w: u32,
    /// Oversize factor on consumption (1.0-2.0).
    pub oversize_margin: f64,
    /// Average peak-sun-hours per day.
    pub sun_hours_per_day: f64,
    /// Battery autonomy as a fraction of daily consumption.
    pub autonomy_fraction: f64,
    /// Commercial inverter ratings (kW), strictly increasing.
    pub inverter_sizes_kw: Vec<f64>,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            panel_wattage_w: 550,
            oversize_margin: 1.10,
            sun_hours_per_day: 5.0,
            autonomy_fraction: 0.5,
            inverter_sizes_kw: vec![
                1.5, 2.0, 3.0, 3.6, 4.0, 5.0, 6.0, 8.0, 10.0, 12.0, 15.0, 20.0,
            ],
        }
    }
}

/// Market constants for the financial projection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FinanceConfig {
    /// Installed cost per watt-peak.
    pub cost_per_wp: f64,
    /// Capitalization rate for the property uplift estimate.
    pub cap_rate: f64,
    /// Minimum monthly bill after installation.
    pub minimum_residual_bill: f64,
    /// Share of consumption still drawn from the grid (0.0-1.0).
    pub grid_draw_fraction: f64,
}

impl Default for FinanceConfig {
    fn default() -> Self {
        Self {
            cost_per_wp: 1.6,
            cap_rate: 0.08,
            minimum_residual_bill: 100.0,
            grid_draw_fraction: 0.0,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"sizing.sun_hours_per_day"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl QuoteConfig {
    /// Returns the illustrative configuration: a three-tier tariff
    /// (6.0 / 9.0 / 14.0 per kWh, tiers at 100 and 300 kWh), 550 W panels,
    /// 5 sun hours, 1.6 per Wp and a 0.08 cap rate.
    pub fn illustrative() -> Self {
        Self {
            tariff: TariffConfig::default(),
            sizing: SizingConfig::default(),
            finance: FinanceConfig::default(),
        }
    }

    /// Returns an approximation of the Dominican BTS-1 residential tariff in
    /// RD$ with local installation prices.
    pub fn bts1() -> Self {
        Self {
            tariff: TariffConfig {
                blocks: vec![
                    TariffBlockConfig::bounded(200.0, 4.44),
                    TariffBlockConfig::bounded(300.0, 6.97),
                    TariffBlockConfig::bounded(700.0, 10.86),
                    TariffBlockConfig::open(11.10),
                ],
            },
            sizing: SizingConfig {
                sun_hours_per_day: 5.5,
                oversize_margin: 1.15,
                ..SizingConfig::default()
            },
            finance: FinanceConfig {
                cost_per_wp: 60.0,
                cap_rate: 0.08,
                minimum_residual_bill: 137.25,
                grid_draw_fraction: 0.1,
            },
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["illustrative", "bts1"];

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "illustrative" => Ok(Self::illustrative()),
            "bts1" => Ok(Self::bts1()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("config", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Tariff blocks with the open-ended last block mapped to an infinite threshold.
    pub fn tariff_blocks(&self) -> Vec<TariffBlock> {
        self.tariff
            .blocks
            .iter()
            .map(|b| TariffBlock::new(b.upper_kwh.unwrap_or(f64::INFINITY), b.price_per_kwh))
            .collect()
    }

    pub fn sizing_params(&self) -> SizingParams {
        SizingParams {
            panel_wattage_w: self.sizing.panel_wattage_w,
            oversize_margin: self.sizing.oversize_margin,
            sun_hours_per_day: self.sizing.sun_hours_per_day,
            autonomy_fraction: self.sizing.autonomy_fraction,
            inverter_sizes_kw: self.sizing.inverter_sizes_kw.clone(),
        }
    }

    pub fn finance_params(&self) -> FinanceParams {
        FinanceParams {
            cost_per_wp: self.finance.cost_per_wp,
            cap_rate: self.finance.cap_rate,
            minimum_residual_bill: self.finance.minimum_residual_bill,
            grid_draw_fraction: self.finance.grid_draw_fraction,
        }
    }

    /// Validates and builds the engine.
    ///
    /// # Errors
    ///
    /// Returns every validation error found; see [`QuoteConfig::validate`].
    pub fn build_engine(&self) -> Result<QuoteEngine, Vec<ConfigError>> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(errors);
        }
        let tariff = ElectricityTariff::new(self.tariff_blocks())
            .map_err(|e| vec![tariff_error(&e)])?;
        Ok(QuoteEngine::new(
            tariff,
            self.sizing_params(),
            self.finance_params(),
        ))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let blocks = &self.tariff.blocks;
        if blocks.is_empty() {
            errors.push(ConfigError::new(
                "tariff.blocks",
                "must contain at least one block",
            ));
        }
        for (i, block) in blocks.iter().enumerate() {
            let is_last = i + 1 == blocks.len();
            match (is_last, block.upper_kwh) {
                (false, None) => errors.push(ConfigError::new(
                    format!("tariff.blocks[{i}].upper_kwh"),
                    "required on every block but the last",
                )),
                (true, Some(_)) => errors.push(ConfigError::new(
                    format!("tariff.blocks[{i}].upper_kwh"),
                    "must be omitted on the last block, which is unbounded",
                )),
                _ => {}
            }
        }
        if errors.is_empty() {
            if let Err(e) = ElectricityTariff::new(self.tariff_blocks()) {
                errors.push(tariff_error(&e));
            }
        }

        let s = &self.sizing;
        if s.panel_wattage_w == 0 {
            errors.push(ConfigError::new("sizing.panel_wattage_w", "must be > 0"));
        }
        if !(1.0..=2.0).contains(&s.oversize_margin) {
            errors.push(ConfigError::new(
                "sizing.oversize_margin",
                "must be in [1.0, 2.0]",
            ));
        }
        if !(s.sun_hours_per_day > 0.0 && s.sun_hours_per_day <= 24.0) {
            errors.push(ConfigError::new(
                "sizing.sun_hours_per_day",
                "must be in (0, 24]",
            ));
        }
        if !(s.autonomy_fraction >= 0.0 && s.autonomy_fraction.is_finite()) {
            errors.push(ConfigError::new(
                "sizing.autonomy_fraction",
                "must be a finite number >= 0",
            ));
        }
        if s.inverter_sizes_kw.is_empty() {
            errors.push(ConfigError::new(
                "sizing.inverter_sizes_kw",
                "must list at least one size",
            ));
        } else if s.inverter_sizes_kw.iter().any(|kw| !(*kw > 0.0 && kw.is_finite()))
            || s.inverter_sizes_kw.windows(2).any(|w| w[0] >= w[1])
        {
            errors.push(ConfigError::new(
                "sizing.inverter_sizes_kw",
                "must be positive and strictly increasing",
            ));
        }

        let f = &self.finance;
        if !(f.cost_per_wp > 0.0 && f.cost_per_wp.is_finite()) {
            errors.push(ConfigError::new("finance.cost_per_wp", "must be > 0"));
        }
        if !(f.cap_rate > 0.0 && f.cap_rate.is_finite()) {
            errors.push(ConfigError::new("finance.cap_rate", "must be > 0"));
        }
        if !(f.minimum_residual_bill >= 0.0 && f.minimum_residual_bill.is_finite()) {
            errors.push(ConfigError::new(
                "finance.minimum_residual_bill",
                "must be >= 0",
            ));
        }
        if !(0.0..=1.0).contains(&f.grid_draw_fraction) {
            errors.push(ConfigError::new(
                "finance.grid_draw_fraction",
                "must be in [0.0, 1.0]",
            ));
        }

        errors
    }
}

fn tariff_error(e: &crate::error::TariffError) -> ConfigError {
    let field = match e.block_index() {
        Some(i) => format!("tariff.blocks[{i}]"),
        None => "tariff.blocks".to_string(),
    };
    ConfigError::new(field, e.to_string())
}
