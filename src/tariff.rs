//! Progressive block tariff: bill-to-consumption inversion and its forward cost function.

use crate::error::{QuoteError, TariffError};

/// One consumption tier of a block tariff.
///
/// `threshold_kwh` is the upper bound of the tier; the tier starts at the
/// previous block's threshold (or 0 for the first block). The last block of an
/// [`ElectricityTariff`] is always unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TariffBlock {
    /// Upper bound of the tier (kWh/month), `f64::INFINITY` for the last block.
    pub threshold_kwh: f64,
    /// Energy price inside the tier (currency per kWh).
    pub price_per_kwh: f64,
}

impl TariffBlock {
    /// Creates a tier ending at `threshold_kwh`.
    pub fn new(threshold_kwh: f64, price_per_kwh: f64) -> Self {
        Self {
            threshold_kwh,
            price_per_kwh,
        }
    }

    /// Creates an open-ended tier.
    pub fn unbounded(price_per_kwh: f64) -> Self {
        Self::new(f64::INFINITY, price_per_kwh)
    }
}

/// kWh and cost attributed to a single tariff block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockUsage {
    /// Zero-based index of the block in the tariff.
    pub block_index: usize,
    /// Energy billed inside the block (kWh).
    pub kwh: f64,
    /// Cost of that energy (currency).
    pub cost: f64,
}

/// Monthly consumption recovered from a bill amount.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionEstimate {
    /// Estimated monthly consumption (kWh).
    pub kwh_per_month: f64,
    /// Per-block split of the consumption, ascending by block. Blocks the
    /// customer does not reach are omitted.
    pub cost_by_block: Vec<BlockUsage>,
}

impl ConsumptionEstimate {
    /// Sum of the per-block costs, equal to the inverted bill.
    pub fn total_cost(&self) -> f64 {
        self.cost_by_block.iter().map(|u| u.cost).sum()
    }

    /// Index of the most expensive block reached, if any consumption exists.
    pub fn highest_block(&self) -> Option<usize> {
        self.cost_by_block.last().map(|u| u.block_index)
    }
}

/// Validated, immutable block tariff.
///
/// Thresholds are strictly increasing and prices are positive and
/// non-decreasing, which makes cost a continuous, strictly increasing,
/// piecewise-linear function of consumption.
///
/// # Examples
///
/// ```
/// use solar_quote::tariff::{ElectricityTariff, TariffBlock};
///
/// let tariff = ElectricityTariff::new(vec![
///     TariffBlock::new(100.0, 6.0),
///     TariffBlock::new(300.0, 9.0),
///     TariffBlock::unbounded(14.0),
/// ])
/// .unwrap();
/// assert_eq!(tariff.cost_of(300.0), 2400.0);
/// let estimate = tariff.estimate_consumption(2400.0).unwrap();
/// assert_eq!(estimate.kwh_per_month, 300.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ElectricityTariff {
    blocks: Vec<TariffBlock>,
}

impl ElectricityTariff {
    /// Validates and builds a tariff.
    ///
    /// The threshold of the last block is ignored and stored as unbounded.
    ///
    /// # Errors
    ///
    /// Returns a [`TariffError`] describing the first structural problem found.
    pub fn new(mut blocks: Vec<TariffBlock>) -> Result<Self, TariffError> {
        let Some(last) = blocks.last_mut() else {
            return Err(TariffError::Empty);
        };
        last.threshold_kwh = f64::INFINITY;

        let last_index = blocks.len() - 1;
        let mut previous_threshold = 0.0;
        let mut previous_price = 0.0;
        for (index, block) in blocks.iter().enumerate() {
            if index < last_index {
                if !block.threshold_kwh.is_finite() {
                    return Err(TariffError::MissingThreshold { index });
                }
                if block.threshold_kwh <= previous_threshold {
                    return Err(TariffError::NonIncreasingThreshold {
                        index,
                        threshold_kwh: block.threshold_kwh,
                        previous_kwh: previous_threshold,
                    });
                }
                previous_threshold = block.threshold_kwh;
            }

            if !block.price_per_kwh.is_finite() || block.price_per_kwh <= 0.0 {
                return Err(TariffError::NonPositivePrice {
                    index,
                    price: block.price_per_kwh,
                });
            }
            if block.price_per_kwh < previous_price {
                return Err(TariffError::DecreasingPrice {
                    index,
                    price: block.price_per_kwh,
                    previous: previous_price,
                });
            }
            previous_price = block.price_per_kwh;
        }

        Ok(Self { blocks })
    }

    /// Tariff blocks in ascending order.
    pub fn blocks(&self) -> &[TariffBlock] {
        &self.blocks
    }

    /// Lower bound of block `index` (kWh/month).
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn lower_bound_kwh(&self, index: usize) -> f64 {
        assert!(index < self.blocks.len(), "block index out of range");
        if index == 0 {
            0.0
        } else {
            self.blocks[index - 1].threshold_kwh
        }
    }

    /// Inverts the tariff: the monthly consumption that produces `bill`.
    ///
    /// Walks the blocks once with a remaining-bill accumulator. A block whose
    /// whole span is paid for is consumed entirely; the block where the bill
    /// runs out absorbs `remaining / price` kWh. A bill that lands exactly on
    /// a threshold stops there and attributes nothing to the next block.
    ///
    /// # Errors
    ///
    /// Returns [`QuoteError::InvalidInput`] if `bill` is not a finite amount > 0.
    pub fn estimate_consumption(&self, bill: f64) -> Result<ConsumptionEstimate, QuoteError> {
        if !bill.is_finite() || bill <= 0.0 {
            return Err(QuoteError::InvalidInput(format!(
                "monthly bill must be a positive amount, got {bill}"
            )));
        }

        let mut remaining = bill;
        let mut kwh_per_month = 0.0;
        let mut cost_by_block = Vec::with_capacity(self.blocks.len());

        for (block_index, block) in self.blocks.iter().enumerate() {
            let lower = self.lower_bound_kwh(block_index);
            let span_kwh = block.threshold_kwh - lower;
            let span_cost = span_kwh * block.price_per_kwh;

            if remaining >= span_cost {
                // Only finite spans get here: the last block costs infinity.
                kwh_per_month = block.threshold_kwh;
                remaining -= span_cost;
                cost_by_block.push(BlockUsage {
                    block_index,
                    kwh: span_kwh,
                    cost: span_cost,
                });
                if remaining <= 0.0 {
                    break;
                }
            } else {
                let kwh = remaining / block.price_per_kwh;
                kwh_per_month = lower + kwh;
                cost_by_block.push(BlockUsage {
                    block_index,
                    kwh,
                    cost: remaining,
                });
                break;
            }
        }

        Ok(ConsumptionEstimate {
            kwh_per_month,
            cost_by_block,
        })
    }

    /// Monthly cost of consuming `kwh`. Negative consumption costs nothing.
    pub fn cost_of(&self, kwh: f64) -> f64 {
        self.usage_between(0.0, kwh).iter().map(|u| u.cost).sum()
    }

    /// Per-block kWh and cost of the consumption interval `[from_kwh, to_kwh]`.
    ///
    /// Returns an empty vector when the interval is empty.
    pub fn usage_between(&self, from_kwh: f64, to_kwh: f64) -> Vec<BlockUsage> {
        let from_kwh = from_kwh.max(0.0);
        let mut usage = Vec::new();
        if !(to_kwh > from_kwh) {
            return usage;
        }
        for (block_index, block) in self.blocks.iter().enumerate() {
            let lower = self.lower_bound_kwh(block_index);
            if lower >= to_kwh {
                break;
            }
            let kwh = block.threshold_kwh.min(to_kwh) - lower.max(from_kwh);
            if kwh > 0.0 {
                usage.push(BlockUsage {
                    block_index,
                    kwh,
                    cost: kwh * block.price_per_kwh,
                });
            }
        }
        usage
    }

    /// Share of the bill paid in the most expensive block(s) the customer reaches.
    ///
    /// Equals `bill - cost_of(lower bound of the top-priced reached block)`.
    /// Adjacent reached blocks with the same top price count together, and a
    /// customer who only reaches the first block pays a fully punitive bill.
    pub fn punitive_block_savings(&self, estimate: &ConsumptionEstimate) -> f64 {
        let Some(top) = estimate.highest_block() else {
            return 0.0;
        };
        let top_price = self.blocks[top].price_per_kwh;
        let first_top = self.blocks[..=top].partition_point(|b| b.price_per_kwh < top_price);

        estimate
            .cost_by_block
            .iter()
            .filter(|u| u.block_index >= first_top)
            .map(|u| u.cost)
            .sum()
    }
}
