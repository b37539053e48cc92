//! Error types raised by the quoting engine.

use thiserror::Error;

/// Per-request failures of the quoting pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuoteError {
    /// The monthly bill is missing, not finite, zero, negative or too large
    /// to size.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The configured tariff and constants yield no positive savings, so
    /// payback cannot be computed.
    #[error("degenerate projection: {0}")]
    DegenerateProjection(String),
}

/// Structural problems in a tariff table, detected when it is built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TariffError {
    #[error("tariff must contain at least one block")]
    Empty,
    #[error("block {index} is not the last block and needs an upper threshold")]
    MissingThreshold { index: usize },
    #[error("block {index} threshold {threshold_kwh} kWh must exceed the previous threshold {previous_kwh} kWh")]
    NonIncreasingThreshold {
        index: usize,
        threshold_kwh: f64,
        previous_kwh: f64,
    },
    #[error("block {index} price {price} must be a positive finite number")]
    NonPositivePrice { index: usize, price: f64 },
    #[error("block {index} price {price} is cheaper than the previous block ({previous})")]
    DecreasingPrice {
        index: usize,
        price: f64,
        previous: f64,
    },
}

impl TariffError {
    /// Index of the offending block, if the error concerns a single block.
    pub fn block_index(&self) -> Option<usize> {
        match self {
            Self::Empty => None,
            Self::MissingThreshold { index }
            | Self::NonIncreasingThreshold { index, .. }
            | Self::NonPositivePrice { index, .. }
            | Self::DecreasingPrice { index, .. } => Some(*index),
        }
    }
}
