//! Residential solar quoting for block-tariff electricity markets.
//!
//! A monthly bill is inverted through the tariff into consumption, the
//! consumption is sized into panels, inverter and battery, and the sizing is
//! projected into investment and savings figures.

#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod error;
pub mod finance;
pub mod io;
pub mod quote;
pub mod sizing;
pub mod tariff;

pub use error::{QuoteError, TariffError};
pub use quote::{CalculationResult, QuoteEngine};

/// Billing month length used to convert between daily and monthly figures.
pub const DAYS_PER_MONTH: f64 = 30.0;
