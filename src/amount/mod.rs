//! # Token Amounts
//!
//! Exact conversion between human decimal amounts and on-chain base units.
//!
//! The token is deployed with a different precision on different networks (two
//! fractional digits on most chains, none on Polygon and BSC), so an amount is always
//! paired with the precision of the base unit it will be converted to. All arithmetic is
//! done on 256-bit integers; no floating point value is ever involved.
//!
//! ```rust
//! use idrx_multichain::amount::TokenAmount;
//!
//! let amount = TokenAmount::parse("1000.50", 2).unwrap();
//! assert_eq!(amount.to_base_units().unwrap(), 100_050u64.into());
//!
//! let back = TokenAmount::from_base_units(100_050u64.into(), 2).unwrap();
//! assert_eq!(back.to_string(), "1000.50");
//! ```

mod decimal;
mod error;

pub use decimal::{from_base_units, to_base_units, DecimalAmount};
pub use error::AmountError;

use ethers::types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::registry::MAX_DECIMALS;

/// Exact decimal amount paired with the precision of its base unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenAmount {
    amount: DecimalAmount,
    decimals: u8,
}

impl TokenAmount {
    pub fn new(amount: DecimalAmount, decimals: u8) -> Result<Self, AmountError> {
        if decimals > MAX_DECIMALS {
            return Err(AmountError::UnsupportedPrecision(decimals));
        }
        Ok(Self { amount, decimals })
    }

    /// Parse a plain decimal literal such as `"1000.50"`
    pub fn parse(input: &str, decimals: u8) -> Result<Self, AmountError> {
        Self::new(input.parse()?, decimals)
    }

    pub fn from_base_units(units: U256, decimals: u8) -> Result<Self, AmountError> {
        Self::new(from_base_units(units, decimals)?, decimals)
    }

    pub fn amount(&self) -> &DecimalAmount {
        &self.amount
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Whether conversion to base units drops no digits
    pub fn is_exact(&self) -> bool {
        self.amount.fits_precision(self.decimals)
    }

    /// Base units, truncating digits beyond the precision
    pub fn to_base_units(&self) -> Result<U256, AmountError> {
        to_base_units(&self.amount, self.decimals)
    }

    /// Base units, refusing to truncate
    pub fn to_exact_base_units(&self) -> Result<U256, AmountError> {
        if !self.is_exact() {
            return Err(AmountError::PrecisionLoss {
                amount: self.amount.to_string(),
                decimals: self.decimals,
            });
        }
        self.to_base_units()
    }

    /// Same decimal value paired with another precision
    pub fn with_decimals(&self, decimals: u8) -> Result<Self, AmountError> {
        Self::new(self.amount, decimals)
    }

    /// Render with exactly `decimals` fractional digits
    pub fn format(&self) -> String {
        self.amount.format_fixed(self.decimals)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}
