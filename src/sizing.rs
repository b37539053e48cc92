//! Physical system sizing from an estimated monthly consumption.

use crate::DAYS_PER_MONTH;
use crate::error::QuoteError;
use crate::tariff::ConsumptionEstimate;

/// Constants that drive the sizing decision.
#[derive(Debug, Clone, PartialEq)]
pub struct SizingParams {
    /// Rated power of one panel (W).
    pub panel_wattage_w: u32,
    /// Oversize factor covering generation losses and seasonal variance.
    pub oversize_margin: f64,
    /// Average peak-sun-hours per day at the installation site.
    pub sun_hours_per_day: f64,
    /// Fraction of a day's consumption the battery bank must cover.
    pub autonomy_fraction: f64,
    /// Commercially available inverter ratings (kW), ascending.
    pub inverter_sizes_kw: Vec<f64>,
}

/// Concrete installation proposed for a customer.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemSpec {
    /// Number of panels, at least 1.
    pub panel_count: u32,
    /// Rated power of each panel (W).
    pub panel_wattage_w: u32,
    /// Array peak power, always `panel_count * panel_wattage_w / 1000`.
    pub system_kwp: f64,
    /// Inverter rating (kW), never below `system_kwp`.
    pub inverter_kw: f64,
    /// Recommended battery capacity (kWh).
    pub battery_kwh: f64,
}

/// Sizes panels, inverter and battery for `consumption`.
///
/// The panel count is always rounded up and the reported peak power is
/// recomputed from it, so `system_kwp` matches the panels actually installed.
///
/// # Errors
///
/// Returns [`QuoteError::InvalidInput`] when the required panel count does
/// not fit in a `u32`; the array is never silently under-sized.
pub fn size(
    consumption: &ConsumptionEstimate,
    params: &SizingParams,
) -> Result<SystemSpec, QuoteError> {
    let required_daily_kwh = consumption.kwh_per_month * params.oversize_margin / DAYS_PER_MONTH;
    let required_kwp = required_daily_kwh / params.sun_hours_per_day;
    let raw_panels = (required_kwp * 1000.0 / f64::from(params.panel_wattage_w)).ceil();
    if !(raw_panels <= f64::from(u32::MAX)) {
        return Err(QuoteError::InvalidInput(format!(
            "bill exceeds the quotable range ({:.0} kWh/month needs {raw_panels:e} panels)",
            consumption.kwh_per_month
        )));
    }
    let panel_count = raw_panels.max(1.0) as u32;
    let system_kwp = array_kwp(panel_count, params.panel_wattage_w);

    Ok(SystemSpec {
        panel_count,
        panel_wattage_w: params.panel_wattage_w,
        system_kwp,
        inverter_kw: commercial_inverter_kw(system_kwp, &params.inverter_sizes_kw),
        battery_kwh: consumption.kwh_per_month / DAYS_PER_MONTH * params.autonomy_fraction,
    })
}

/// Peak power of `panel_count` panels of `panel_wattage_w` each (kWp).
pub fn array_kwp(panel_count: u32, panel_wattage_w: u32) -> f64 {
    f64::from(panel_count) * f64::from(panel_wattage_w) / 1000.0
}

/// Snaps `system_kwp` up to the smallest listed inverter that covers it.
///
/// Arrays larger than the biggest listed inverter get parallel units of the
/// biggest size. An empty list falls back to the array rating itself.
pub fn commercial_inverter_kw(system_kwp: f64, sizes_kw: &[f64]) -> f64 {
    if let Some(&size) = sizes_kw.iter().find(|&&size| size >= system_kwp) {
        return size;
    }
    match sizes_kw.last() {
        Some(&largest) => (system_kwp / largest).ceil() * largest,
        None => system_kwp,
    }
}

/// Nameplate monthly production of `spec` (kWh), before losses.
pub fn monthly_generation_kwh(spec: &SystemSpec, params: &SizingParams) -> f64 {
    spec.system_kwp * params.sun_hours_per_day * DAYS_PER_MONTH
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SizingParams {
        SizingParams {
            panel_wattage_w: 550,
            oversize_margin: 1.10,
            sun_hours_per_day: 5.0,
            autonomy_fraction: 0.5,
            inverter_sizes_kw: vec![1.5, 2.0, 3.0, 3.6, 4.0, 5.0, 6.0, 8.0, 10.0],
        }
    }

    fn consumption(kwh: f64) -> ConsumptionEstimate {
        ConsumptionEstimate {
            kwh_per_month: kwh,
            cost_by_block: Vec::new(),
        }
    }

    #[test]
    fn sizes_worked_example() {
        let spec = size(&consumption(300.0 + 2600.0 / 14.0), &params()).unwrap();
        assert_eq!(spec.panel_count, 7);
        assert_eq!(spec.system_kwp, 7.0 * 550.0 / 1000.0);
        assert_eq!(spec.inverter_kw, 4.0);
        assert!((spec.battery_kwh - 8.0952).abs() < 1e-3);
    }

    #[test]
    fn tiny_consumption_still_gets_one_panel() {
        let spec = size(&consumption(1.0), &params()).unwrap();
        assert_eq!(spec.panel_count, 1);
        assert_eq!(spec.system_kwp, 0.55);
        assert_eq!(spec.inverter_kw, 1.5);
    }

    #[test]
    fn panel_count_rounds_up() {
        let p = SizingParams {
            oversize_margin: 1.0,
            ..params()
        };
        // 825 kWh / 30 / 5 = 5.5 kWp = exactly 10 panels
        let exact = size(&consumption(825.0), &p).unwrap();
        assert_eq!(exact.panel_count, 10);
        let over = size(&consumption(826.0), &p).unwrap();
        assert_eq!(over.panel_count, 11);
    }

    #[test]
    fn kwp_always_matches_panel_count() {
        for kwh in [12.5, 99.0, 485.7, 1234.5, 7300.0] {
            let spec = size(&consumption(kwh), &params()).unwrap();
            assert_eq!(spec.system_kwp, array_kwp(spec.panel_count, 550));
            assert!(spec.inverter_kw >= spec.system_kwp);
        }
    }

    #[test]
    fn inverter_snaps_up() {
        let sizes = [3.0, 5.0, 10.0];
        assert_eq!(commercial_inverter_kw(0.55, &sizes), 3.0);
        assert_eq!(commercial_inverter_kw(3.0, &sizes), 3.0);
        assert_eq!(commercial_inverter_kw(3.01, &sizes), 5.0);
        assert_eq!(commercial_inverter_kw(10.0, &sizes), 10.0);
    }

    #[test]
    fn oversized_array_uses_parallel_inverters() {
        assert_eq!(commercial_inverter_kw(23.1, &[5.0, 10.0]), 30.0);
        assert_eq!(commercial_inverter_kw(4.2, &[]), 4.2);
    }

    #[test]
    fn generation_covers_margin_adjusted_demand() {
        let p = params();
        let spec = size(&consumption(485.7), &p).unwrap();
        let generation = monthly_generation_kwh(&spec, &p);
        assert!(generation / p.oversize_margin >= 485.7);
    }

    #[test]
    fn panel_count_beyond_u32_is_rejected() {
        let err = size(&consumption(1e14), &params()).unwrap_err();
        assert!(matches!(err, QuoteError::InvalidInput(ref m) if m.contains("quotable range")));
    }

    #[test]
    fn largest_representable_array_is_not_truncated() {
        let p = params();
        // Just under u32::MAX panels of 550 W
        let kwh = 4.0e9 * 0.55 * p.sun_hours_per_day * DAYS_PER_MONTH / p.oversize_margin;
        let spec = size(&consumption(kwh), &p).unwrap();
        let required_kwp = kwh * p.oversize_margin / DAYS_PER_MONTH / p.sun_hours_per_day;
        assert!(spec.system_kwp >= required_kwp * (1.0 - 1e-12));
    }
}
