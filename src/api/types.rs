//! API request and response types.
//!
//! Quote payloads use the camelCase field names expected by the front end.

use serde::{Deserialize, Serialize};

use crate::quote::QuoteEngine;

/// Body of `POST /api/calculate`.
///
/// `gastoMensual` is optional at the type level so a missing or `null` value
/// is reported as a validation error rather than a decoding failure.
#[derive(Debug, Deserialize)]
pub struct CalculateRequest {
    /// Current monthly electricity bill.
    #[serde(rename = "gastoMensual")]
    pub gasto_mensual: Option<f64>,
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

/// One tariff block as exposed by `GET /api/tariff`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TariffBlockRecord {
    /// Lower bound of the block (kWh/month).
    pub from_kwh: f64,
    /// Upper bound of the block, absent for the open-ended last block.
    pub upper_kwh: Option<f64>,
    /// Price per kWh.
    pub price_per_kwh: f64,
}

/// Tariff table and constants the engine was started with.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TariffResponse {
    pub blocks: Vec<TariffBlockRecord>,
    pub panel_wattage_w: u32,
    pub oversize_margin: f64,
    pub sun_hours_per_day: f64,
    pub autonomy_fraction: f64,
    pub inverter_sizes_kw: Vec<f64>,
    pub cost_per_wp: f64,
    pub cap_rate: f64,
    pub minimum_residual_bill: f64,
    pub grid_draw_fraction: f64,
}

impl From<&QuoteEngine> for TariffResponse {
    fn from(engine: &QuoteEngine) -> Self {
        let tariff = engine.tariff();
        let blocks = tariff
            .blocks()
            .iter()
            .enumerate()
            .map(|(i, b)| TariffBlockRecord {
                from_kwh: tariff.lower_bound_kwh(i),
                upper_kwh: b.threshold_kwh.is_finite().then_some(b.threshold_kwh),
                price_per_kwh: b.price_per_kwh,
            })
            .collect();
        let sizing = engine.sizing();
        let finance = engine.finance();

        Self {
            blocks,
            panel_wattage_w: sizing.panel_wattage_w,
            oversize_margin: sizing.oversize_margin,
            sun_hours_per_day: sizing.sun_hours_per_day,
            autonomy_fraction: sizing.autonomy_fraction,
            inverter_sizes_kw: sizing.inverter_sizes_kw.clone(),
            cost_per_wp: finance.cost_per_wp,
            cap_rate: finance.cap_rate,
            minimum_residual_bill: finance.minimum_residual_bill,
            grid_draw_fraction: finance.grid_draw_fraction,
        }
    }
}
