//! Quote assembly: runs the pipeline and shapes the public result.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::error::QuoteError;
use crate::finance::{BlockSavings, FinanceParams, FinancialProjection, Projector};
use crate::sizing::{self, SizingParams, SystemSpec};
use crate::tariff::{ConsumptionEstimate, ElectricityTariff};

/// Public quote payload.
///
/// Field names are part of the external JSON contract consumed by the
/// front end. All values are rounded for display; see [`assemble`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    /// Number of panels.
    pub numero_paneles: u32,
    /// Installed cost.
    pub inversion_estimada: f64,
    /// Monthly bill reduction.
    pub ahorro_mensual: f64,
    /// Payback period in years.
    pub retorno_inversion_anos: f64,
    /// Part of the current bill paid in the most expensive block(s).
    pub costo_bloque_castigo: f64,
    /// Annual savings.
    pub ingreso_anual_extra: f64,
    /// Property value increase.
    pub aumento_plusvalia: f64,
    /// Daily savings.
    pub ahorro_diario: f64,
    /// Array peak power (kWp).
    pub potencia_sistema_kwp: f64,
    /// Inverter rating (kW).
    pub capacidad_inversor_kw: f64,
    /// Recommended battery capacity (kWh).
    pub baterias_recomendadas_kwh: f64,
    /// Human-readable savings breakdown.
    pub desglose_ahorro: String,
}

impl fmt::Display for CalculationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Solar Quote ---")?;
        writeln!(f, "Panels:              {}", self.numero_paneles)?;
        writeln!(f, "System power:        {} kWp", self.potencia_sistema_kwp)?;
        writeln!(f, "Inverter:            {:.1} kW", self.capacidad_inversor_kw)?;
        writeln!(f, "Battery bank:        {:.1} kWh", self.baterias_recomendadas_kwh)?;
        writeln!(f, "Investment:          {:.2}", self.inversion_estimada)?;
        writeln!(
            f,
            "Savings:             {:.2}/month ({:.2}/day)",
            self.ahorro_mensual, self.ahorro_diario
        )?;
        writeln!(f, "Annual extra income: {:.2}", self.ingreso_anual_extra)?;
        writeln!(f, "Payback:             {:.1} years", self.retorno_inversion_anos)?;
        writeln!(f, "Punitive block cost: {:.2}", self.costo_bloque_castigo)?;
        writeln!(f, "Property uplift:     {:.2}", self.aumento_plusvalia)?;
        write!(f, "{}", self.desglose_ahorro)
    }
}

/// Immutable quoting engine: one tariff plus the sizing and market constants.
///
/// Holds no mutable state, so a single instance can serve concurrent requests
/// behind an `Arc`.
#[derive(Debug, Clone)]
pub struct QuoteEngine {
    tariff: ElectricityTariff,
    sizing: SizingParams,
    finance: FinanceParams,
}

impl QuoteEngine {
    pub fn new(tariff: ElectricityTariff, sizing: SizingParams, finance: FinanceParams) -> Self {
        Self {
            tariff,
            sizing,
            finance,
        }
    }

    pub fn tariff(&self) -> &ElectricityTariff {
        &self.tariff
    }

    pub fn sizing(&self) -> &SizingParams {
        &self.sizing
    }

    pub fn finance(&self) -> &FinanceParams {
        &self.finance
    }

    /// Quotes an installation for a customer paying `bill` per month.
    ///
    /// # Errors
    ///
    /// [`QuoteError::InvalidInput`] for a missing, zero, negative or oversized bill and
    /// [`QuoteError::DegenerateProjection`] when no positive savings exist.
    pub fn quote(&self, bill: f64) -> Result<CalculationResult, QuoteError> {
        let evaluation = self.evaluate(bill)?;
        Ok(assemble(&evaluation.spec, &evaluation.projection))
    }

    /// Runs the pipeline and returns the unrounded intermediate results.
    ///
    /// # Errors
    ///
    /// Same as [`QuoteEngine::quote`].
    pub fn evaluate(&self, bill: f64) -> Result<Evaluation, QuoteError> {
        let consumption = self.tariff.estimate_consumption(bill)?;
        let spec = sizing::size(&consumption, &self.sizing)?;
        let projection = self.projector().project(&consumption, &spec, bill)?;

        debug!(
            bill,
            kwh_per_month = consumption.kwh_per_month,
            panels = spec.panel_count,
            system_kwp = spec.system_kwp,
            monthly_savings = projection.monthly_savings,
            "quoted"
        );
        Ok(Evaluation {
            consumption,
            spec,
            projection,
        })
    }

    /// Savings projector bound to this engine's tariff and constants.
    pub fn projector(&self) -> Projector<'_> {
        Projector::new(&self.tariff, &self.sizing, &self.finance)
    }
}

/// Full-precision pipeline output for one bill.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub consumption: ConsumptionEstimate,
    pub spec: SystemSpec,
    pub projection: FinancialProjection,
}

/// Merges sizing and projection into the public payload.
///
/// This is the only place values are rounded: panel count is an integer,
/// currency has two decimals, array power three decimals (exact for any
/// whole-watt panel rating), and inverter, battery and payback one decimal.
pub fn assemble(spec: &SystemSpec, projection: &FinancialProjection) -> CalculationResult {
    CalculationResult {
        numero_paneles: spec.panel_count,
        inversion_estimada: round_to(projection.investment, 2),
        ahorro_mensual: round_to(projection.monthly_savings, 2),
        retorno_inversion_anos: round_to(projection.payback_years, 1),
        costo_bloque_castigo: round_to(projection.punitive_block_savings, 2),
        ingreso_anual_extra: round_to(projection.annual_extra_income, 2),
        aumento_plusvalia: round_to(projection.property_value_uplift, 2),
        ahorro_diario: round_to(projection.daily_savings, 2),
        potencia_sistema_kwp: round_to(spec.system_kwp, 3),
        capacidad_inversor_kw: round_to(spec.inverter_kw, 1),
        baterias_recomendadas_kwh: round_to(spec.battery_kwh, 1),
        desglose_ahorro: describe_savings(&projection.savings_by_block, projection.residual_bill),
    }
}

/// Rounds `value` half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

/// Spanish sentence listing the eliminated blocks, most expensive first.
fn describe_savings(blocks: &[BlockSavings], residual_bill: f64) -> String {
    let parts: Vec<String> = blocks
        .iter()
        .map(|b| {
            format!(
                "{:.1} kWh del bloque {} a {:.2}/kWh ({:.1}% del costo evitado)",
                b.kwh,
                b.block_index + 1,
                b.price_per_kwh,
                b.share * 100.0
            )
        })
        .collect();

    let listed = match parts.split_last() {
        None => "ningún consumo de la red".to_string(),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} y {last}", rest.join(", ")),
    };

    format!(
        "La energía solar elimina {listed}. Factura residual estimada: {residual_bill:.2} al mes."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tariff::TariffBlock;

    fn engine() -> QuoteEngine {
        QuoteEngine::new(
            ElectricityTariff::new(vec![
                TariffBlock::new(100.0, 6.0),
                TariffBlock::new(300.0, 9.0),
                TariffBlock::unbounded(14.0),
            ])
            .unwrap(),
            SizingParams {
                panel_wattage_w: 550,
                oversize_margin: 1.10,
                sun_hours_per_day: 5.0,
                autonomy_fraction: 0.5,
                inverter_sizes_kw: vec![1.5, 2.0, 3.0, 4.0, 5.0, 6.0, 8.0, 10.0],
            },
            FinanceParams {
                cost_per_wp: 1.6,
                cap_rate: 0.08,
                minimum_residual_bill: 100.0,
                grid_draw_fraction: 0.0,
            },
        )
    }

    #[test]
    fn worked_example_payload() {
        let result = engine().quote(5000.0).unwrap();
        assert_eq!(result.numero_paneles, 7);
        assert_eq!(result.potencia_sistema_kwp, 3.85);
        assert_eq!(result.inversion_estimada, 6160.0);
        assert_eq!(result.ahorro_mensual, 4900.0);
        assert_eq!(result.ingreso_anual_extra, 58_800.0);
        assert_eq!(result.ahorro_diario, 163.33);
        assert_eq!(result.retorno_inversion_anos, 0.1);
        assert_eq!(result.costo_bloque_castigo, 2600.0);
        assert_eq!(result.aumento_plusvalia, 735_000.0);
        assert_eq!(result.capacidad_inversor_kw, 4.0);
        assert_eq!(result.baterias_recomendadas_kwh, 8.1);
    }

    #[test]
    fn breakdown_lists_blocks_most_expensive_first() {
        let result = engine().quote(5000.0).unwrap();
        assert_eq!(
            result.desglose_ahorro,
            "La energía solar elimina 185.7 kWh del bloque 3 a 14.00/kWh (52.0% del costo evitado), \
             200.0 kWh del bloque 2 a 9.00/kWh (36.0% del costo evitado) y \
             100.0 kWh del bloque 1 a 6.00/kWh (12.0% del costo evitado). \
             Factura residual estimada: 100.00 al mes."
        );
    }

    #[test]
    fn breakdown_shares_are_of_avoided_cost_not_savings() {
        // The minimum charge keeps savings (4900) below the avoided cost (5000).
        let evaluation = engine().evaluate(5000.0).unwrap();
        let p = &evaluation.projection;
        let avoided: f64 = p.savings_by_block.iter().map(|b| b.avoided_cost).sum();
        let shares: f64 = p.savings_by_block.iter().map(|b| b.share).sum();
        assert!((avoided - 5000.0).abs() < 1e-6);
        assert!((p.monthly_savings - 4900.0).abs() < 1e-6);
        assert!((shares - 1.0).abs() < 1e-12);

        let text = assemble(&evaluation.spec, p).desglose_ahorro;
        assert_eq!(text.matches("del costo evitado").count(), 3);
        assert!(!text.contains("del ahorro"));
    }

    #[test]
    fn single_block_breakdown() {
        let result = engine().quote(450.0).unwrap();
        assert!(
            result
                .desglose_ahorro
                .starts_with("La energía solar elimina 75.0 kWh del bloque 1 a 6.00/kWh (100.0% del costo evitado).")
        );
    }

    #[test]
    fn invalid_bill_never_produces_a_result() {
        for bill in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                engine().quote(bill),
                Err(QuoteError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn repeated_quotes_are_identical() {
        let engine = engine();
        let a = engine.quote(3210.55).unwrap();
        let b = engine.quote(3210.55).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn reported_power_is_exact_for_odd_wattages() {
        let mut engine = engine();
        engine.sizing.panel_wattage_w = 545;
        let result = engine.quote(5000.0).unwrap();
        assert_eq!(result.numero_paneles, 7);
        assert_eq!(result.potencia_sistema_kwp, 3.815);

        for wattage in [333, 401, 487, 599] {
            engine.sizing.panel_wattage_w = wattage;
            let result = engine.quote(5000.0).unwrap();
            let exact = f64::from(result.numero_paneles) * f64::from(wattage) / 1000.0;
            assert!(
                (result.potencia_sistema_kwp - exact).abs() < 1e-12,
                "{wattage} W: {} kWp vs {exact}",
                result.potencia_sistema_kwp
            );
        }
    }

    #[test]
    fn oversized_bill_is_invalid_input() {
        assert!(matches!(
            engine().quote(1e15),
            Err(QuoteError::InvalidInput(ref m)) if m.contains("quotable range")
        ));
    }

    #[test]
    fn rounding_helper() {
        assert_eq!(round_to(6160.000000000001, 2), 6160.0);
        assert_eq!(round_to(8.0952, 1), 8.1);
        assert_eq!(round_to(163.333_333, 2), 163.33);
        assert_eq!(round_to(-2.25, 1), -2.3);
    }
}
