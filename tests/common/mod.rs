//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use solar_quote::QuoteEngine;
use solar_quote::config::QuoteConfig;
use solar_quote::tariff::{ElectricityTariff, TariffBlock};

/// Three-tier illustrative tariff (100 kWh @ 6, 300 kWh @ 9, open @ 14).
pub fn three_tier_tariff() -> ElectricityTariff {
    ElectricityTariff::new(vec![
        TariffBlock::new(100.0, 6.0),
        TariffBlock::new(300.0, 9.0),
        TariffBlock::unbounded(14.0),
    ])
    .unwrap()
}

/// Engine built from the illustrative preset.
pub fn illustrative_engine() -> QuoteEngine {
    QuoteConfig::illustrative().build_engine().unwrap()
}

/// Engine built from a named preset.
pub fn preset_engine(name: &str) -> QuoteEngine {
    QuoteConfig::from_preset(name)
        .unwrap()
        .build_engine()
        .unwrap()
}
