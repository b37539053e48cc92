//! Investment and savings projection for a sized system.

use crate::DAYS_PER_MONTH;
use crate::error::QuoteError;
use crate::sizing::{self, SizingParams, SystemSpec};
use crate::tariff::{ConsumptionEstimate, ElectricityTariff};

/// Months per year used to annualize savings.
const MONTHS_PER_YEAR: f64 = 12.0;

/// Market constants for the financial projection.
#[derive(Debug, Clone, PartialEq)]
pub struct FinanceParams {
    /// Installed cost per watt-peak (currency/Wp).
    pub cost_per_wp: f64,
    /// Capitalization rate used to value the extra income as property uplift.
    pub cap_rate: f64,
    /// Smallest monthly bill the utility still charges (standby/fixed charges).
    pub minimum_residual_bill: f64,
    /// Fraction of consumption still drawn from the grid outside solar hours.
    pub grid_draw_fraction: f64,
}

/// Avoided grid cost inside one tariff block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockSavings {
    /// Zero-based index of the block in the tariff.
    pub block_index: usize,
    /// Grid energy no longer bought in this block (kWh/month).
    pub kwh: f64,
    /// Price of the block (currency/kWh).
    pub price_per_kwh: f64,
    /// Avoided cost in this block (currency/month).
    pub avoided_cost: f64,
    /// Fraction of the gross avoided cost contributed by this block.
    pub share: f64,
}

/// Financial outcome of installing a system, at full precision.
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialProjection {
    /// Up-front cost of the installation.
    pub investment: f64,
    /// Bill reduction per month.
    pub monthly_savings: f64,
    /// `monthly_savings / 30`.
    pub daily_savings: f64,
    /// Years until accumulated savings repay the investment.
    pub payback_years: f64,
    /// Part of the current bill paid in the most expensive block(s) reached.
    pub punitive_block_savings: f64,
    /// `monthly_savings * 12`.
    pub annual_extra_income: f64,
    /// Income-capitalization estimate of the property value increase.
    pub property_value_uplift: f64,
    /// Grid energy still bought after installation (kWh/month).
    pub residual_kwh: f64,
    /// Bill still paid after installation, including the minimum charge.
    pub residual_bill: f64,
    /// Eliminated consumption per block, most expensive block first.
    pub savings_by_block: Vec<BlockSavings>,
}

/// Projects savings against one tariff and set of constants.
#[derive(Debug, Clone, Copy)]
pub struct Projector<'a> {
    tariff: &'a ElectricityTariff,
    sizing: &'a SizingParams,
    finance: &'a FinanceParams,
}

impl<'a> Projector<'a> {
    pub fn new(
        tariff: &'a ElectricityTariff,
        sizing: &'a SizingParams,
        finance: &'a FinanceParams,
    ) -> Self {
        Self {
            tariff,
            sizing,
            finance,
        }
    }

    /// Derives investment and savings for `spec` installed by a customer
    /// consuming `consumption` and paying `bill`.
    ///
    /// Self-generation displaces the last, most expensive kWh first: the
    /// residual grid consumption is billed from the bottom of the tariff.
    ///
    /// # Errors
    ///
    /// Returns [`QuoteError::DegenerateProjection`] when the annual savings are
    /// not positive, since payback would be infinite or negative.
    pub fn project(
        &self,
        consumption: &ConsumptionEstimate,
        spec: &SystemSpec,
        bill: f64,
    ) -> Result<FinancialProjection, QuoteError> {
        let kwh = consumption.kwh_per_month;
        let usable_generation =
            sizing::monthly_generation_kwh(spec, self.sizing) / self.sizing.oversize_margin;
        let residual_kwh = (kwh - usable_generation).max(kwh * self.finance.grid_draw_fraction);
        let residual_bill = self
            .tariff
            .cost_of(residual_kwh)
            .max(self.finance.minimum_residual_bill);

        let monthly_savings = bill - residual_bill;
        let annual_extra_income = monthly_savings * MONTHS_PER_YEAR;
        if !annual_extra_income.is_finite() || annual_extra_income <= 0.0 {
            return Err(QuoteError::DegenerateProjection(format!(
                "annual savings of {annual_extra_income:.2} for a bill of {bill:.2} \
                 (residual bill {residual_bill:.2})"
            )));
        }

        let investment = spec.system_kwp * self.finance.cost_per_wp * 1000.0;

        Ok(FinancialProjection {
            investment,
            monthly_savings,
            daily_savings: monthly_savings / DAYS_PER_MONTH,
            payback_years: investment / annual_extra_income,
            punitive_block_savings: self.tariff.punitive_block_savings(consumption),
            annual_extra_income,
            property_value_uplift: annual_extra_income / self.finance.cap_rate,
            residual_kwh,
            residual_bill,
            savings_by_block: self.allocate_savings(residual_kwh, kwh),
        })
    }

    /// Splits the eliminated consumption `(residual_kwh, kwh]` over the tariff
    /// blocks, most expensive first.
    fn allocate_savings(&self, residual_kwh: f64, kwh: f64) -> Vec<BlockSavings> {
        let usage = self.tariff.usage_between(residual_kwh, kwh);
        let gross: f64 = usage.iter().map(|u| u.cost).sum();
        usage
            .iter()
            .rev()
            .map(|u| BlockSavings {
                block_index: u.block_index,
                kwh: u.kwh,
                price_per_kwh: self.tariff.blocks()[u.block_index].price_per_kwh,
                avoided_cost: u.cost,
                share: if gross > 0.0 { u.cost / gross } else { 0.0 },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sizing::size;
    use crate::tariff::TariffBlock;

    fn tariff() -> ElectricityTariff {
        ElectricityTariff::new(vec![
            TariffBlock::new(100.0, 6.0),
            TariffBlock::new(300.0, 9.0),
            TariffBlock::unbounded(14.0),
        ])
        .unwrap()
    }

    fn sizing_params() -> SizingParams {
        SizingParams {
            panel_wattage_w: 550,
            oversize_margin: 1.10,
            sun_hours_per_day: 5.0,
            autonomy_fraction: 0.5,
            inverter_sizes_kw: vec![2.0, 4.0, 6.0, 8.0, 10.0],
        }
    }

    fn finance_params() -> FinanceParams {
        FinanceParams {
            cost_per_wp: 1.6,
            cap_rate: 0.08,
            minimum_residual_bill: 100.0,
            grid_draw_fraction: 0.0,
        }
    }

    fn run(bill: f64, finance: &FinanceParams) -> Result<FinancialProjection, QuoteError> {
        let tariff = tariff();
        let sizing = sizing_params();
        let consumption = tariff.estimate_consumption(bill).unwrap();
        let spec = size(&consumption, &sizing).unwrap();
        Projector::new(&tariff, &sizing, finance).project(&consumption, &spec, bill)
    }

    #[test]
    fn worked_example_projection() {
        let p = run(5000.0, &finance_params()).unwrap();
        assert!((p.investment - 6160.0).abs() < 1e-6);
        // Full coverage: only the minimum charge remains.
        assert_eq!(p.residual_bill, 100.0);
        assert!((p.monthly_savings - 4900.0).abs() < 1e-9);
        assert!((p.annual_extra_income - 58_800.0).abs() < 1e-6);
        assert!((p.payback_years - p.investment / (p.monthly_savings * 12.0)).abs() < 1e-12);
        assert!((p.daily_savings - 4900.0 / 30.0).abs() < 1e-9);
        assert!((p.property_value_uplift - 58_800.0 / 0.08).abs() < 1e-6);
        assert!((p.punitive_block_savings - 2600.0).abs() < 1e-9);
    }

    #[test]
    fn savings_allocated_most_expensive_first() {
        let p = run(5000.0, &finance_params()).unwrap();
        let indices: Vec<usize> = p.savings_by_block.iter().map(|s| s.block_index).collect();
        assert_eq!(indices, vec![2, 1, 0]);
        let shares: f64 = p.savings_by_block.iter().map(|s| s.share).sum();
        assert!((shares - 1.0).abs() < 1e-12);
        assert!((p.savings_by_block[0].avoided_cost - 2600.0).abs() < 1e-9);
    }

    #[test]
    fn grid_draw_keeps_cheapest_kwh_on_the_bill() {
        let finance = FinanceParams {
            grid_draw_fraction: 0.2,
            ..finance_params()
        };
        let p = run(5000.0, &finance).unwrap();
        let kwh = 300.0 + 2600.0 / 14.0;
        assert!((p.residual_kwh - kwh * 0.2).abs() < 1e-9);
        // The residual sits entirely in the first block.
        assert!((p.residual_bill - kwh * 0.2 * 6.0).abs() < 1e-9);
        assert!((p.monthly_savings - (5000.0 - kwh * 0.2 * 6.0)).abs() < 1e-9);
        assert_eq!(p.savings_by_block.last().map(|s| s.block_index), Some(0));
    }

    #[test]
    fn bill_below_minimum_charge_is_degenerate() {
        let finance = FinanceParams {
            minimum_residual_bill: 1000.0,
            ..finance_params()
        };
        let err = run(800.0, &finance).unwrap_err();
        assert!(matches!(err, QuoteError::DegenerateProjection(_)));
        // A bill equal to the minimum saves nothing either.
        assert!(run(1000.0, &finance).is_err());
    }

    #[test]
    fn savings_grow_with_the_bill() {
        let finance = FinanceParams {
            grid_draw_fraction: 0.15,
            ..finance_params()
        };
        let mut previous: Option<FinancialProjection> = None;
        for bill in (1..=40).map(|i| f64::from(i) * 250.0) {
            let p = run(bill, &finance).unwrap();
            if let Some(prev) = &previous {
                assert!(p.monthly_savings >= prev.monthly_savings, "bill {bill}");
                assert!(p.investment >= prev.investment, "bill {bill}");
            }
            previous = Some(p);
        }
    }
}
