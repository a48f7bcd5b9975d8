use thiserror::Error;

/// Token amount parsing and conversion errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmountError {
    /// Input is not a plain decimal literal
    #[error("invalid amount format {input:?}: {reason}")]
    InvalidFormat { input: String, reason: &'static str },

    /// Token amounts are never negative
    #[error("negative amount {0:?}")]
    Negative(String),

    /// Value does not fit a 256-bit base-unit integer
    #[error("amount {amount} overflows 256-bit base units at {decimals} decimals")]
    Overflow { amount: String, decimals: u8 },

    /// Precision outside the supported range
    #[error("unsupported decimal precision {0}")]
    UnsupportedPrecision(u8),

    /// Converting would drop fractional digits
    #[error("amount {amount} has more than {decimals} fractional digits")]
    PrecisionLoss { amount: String, decimals: u8 },
}
