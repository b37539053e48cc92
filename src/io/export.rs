//! CSV export of quote sheets over a range of monthly bills.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;

use crate::error::QuoteError;
use crate::quote::{QuoteEngine, round_to};
use crate::sizing;

/// Column header for the quote sheet.
const HEADER: &str = "bill,kwh_per_month,panels,system_kwp,inverter_kw,battery_kwh,\
                      investment,monthly_savings,payback_years,status";

/// Most rows a single sweep may produce.
pub const MAX_SWEEP_ROWS: usize = 100_000;

/// Evenly spaced bill amounts, `from` to `to` inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BillSweep {
    from: f64,
    to: f64,
    step: f64,
}

impl BillSweep {
    /// Creates a sweep.
    ///
    /// # Errors
    ///
    /// Returns a message if `from` is not positive, `to < from`, `step` is not
    /// positive, or the sweep would exceed [`MAX_SWEEP_ROWS`] rows.
    pub fn new(from: f64, to: f64, step: f64) -> Result<Self, String> {
        if !(from > 0.0 && from.is_finite()) {
            return Err(format!("sweep start must be > 0, got {from}"));
        }
        if !(to >= from && to.is_finite()) {
            return Err(format!("sweep end must be >= start ({from}), got {to}"));
        }
        if !(step > 0.0 && step.is_finite()) {
            return Err(format!("sweep step must be > 0, got {step}"));
        }
        let steps = Self::step_count(from, to, step);
        if !(steps < MAX_SWEEP_ROWS as f64) {
            return Err(format!(
                "sweep {from}:{to}:{step} would produce more than {MAX_SWEEP_ROWS} rows"
            ));
        }
        Ok(Self { from, to, step })
    }

    fn step_count(from: f64, to: f64, step: f64) -> f64 {
        ((to - from) / step + 1e-9).floor()
    }

    /// Bill amounts covered by the sweep.
    pub fn bills(&self) -> Vec<f64> {
        let count = Self::step_count(self.from, self.to, self.step) as usize;
        (0..=count)
            .map(|i| self.from + i as f64 * self.step)
            .collect()
    }
}

impl FromStr for BillSweep {
    type Err = String;

    /// Parses `from:to:step`, e.g. `1000:20000:500`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let [from, to, step] = parts.as_slice() else {
            return Err(format!("expected <from>:<to>:<step>, got \"{s}\""));
        };
        let parse = |name: &str, value: &str| {
            value
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("sweep {name} \"{value}\" is not a number"))
        };
        Self::new(parse("start", *from)?, parse("end", *to)?, parse("step", *step)?)
    }
}

/// Exports a quote sheet for `bills` to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails, or if a bill is
/// not a positive amount.
pub fn export_quote_sheet(engine: &QuoteEngine, bills: &[f64], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_quote_sheet(engine, bills, buf)
}

/// Writes one CSV row per bill to any writer.
///
/// Bills whose projection is degenerate keep their consumption and sizing
/// columns, leave the financial columns empty and are marked `degenerate`.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails or a bill is not a positive amount.
pub fn write_quote_sheet(engine: &QuoteEngine, bills: &[f64], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for &bill in bills {
        let consumption = engine
            .tariff()
            .estimate_consumption(bill)
            .map_err(invalid_input)?;
        let spec = sizing::size(&consumption, engine.sizing()).map_err(invalid_input)?;

        let (financials, status) = match engine.projector().project(&consumption, &spec, bill) {
            Ok(p) => (
                [
                    format!("{:.2}", p.investment),
                    format!("{:.2}", p.monthly_savings),
                    format!("{:.1}", p.payback_years),
                ],
                "ok",
            ),
            Err(QuoteError::DegenerateProjection(_)) => (Default::default(), "degenerate"),
            Err(e) => return Err(invalid_input(e)),
        };

        let [investment, savings, payback] = financials;
        wtr.write_record(&[
            format!("{bill:.2}"),
            format!("{:.1}", consumption.kwh_per_month),
            spec.panel_count.to_string(),
            round_to(spec.system_kwp, 3).to_string(),
            format!("{:.1}", spec.inverter_kw),
            format!("{:.1}", spec.battery_kwh),
            investment,
            savings,
            payback,
            status.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

fn invalid_input(e: QuoteError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
}
