use ethers::types::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use super::AmountError;
use crate::registry::MAX_DECIMALS;

/// Exact non-negative decimal number: `mantissa × 10^-scale`
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalAmount {
    mantissa: U256,
    scale: u8,
}

impl DecimalAmount {
    pub const ZERO: DecimalAmount = DecimalAmount {
        mantissa: U256([0; 4]),
        scale: 0,
    };

    /// Build from raw parts. `scale` is the number of fractional digits.
    pub fn from_parts(mantissa: U256, scale: u8) -> Result<Self, AmountError> {
        if scale > MAX_DECIMALS {
            return Err(AmountError::UnsupportedPrecision(scale));
        }
        Ok(Self { mantissa, scale })
    }

    pub fn mantissa(&self) -> U256 {
        self.mantissa
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    /// Same value with trailing fractional zeros removed
    pub fn normalized(&self) -> Self {
        let ten = U256::from(10u8);
        let mut mantissa = self.mantissa;
        let mut scale = self.scale;
        while scale > 0 && !mantissa.is_zero() && (mantissa % ten).is_zero() {
            mantissa = mantissa / ten;
            scale -= 1;
        }
        if mantissa.is_zero() {
            scale = 0;
        }
        Self { mantissa, scale }
    }

    /// Fractional digits actually needed to represent the value
    pub fn significant_scale(&self) -> u8 {
        self.normalized().scale
    }

    /// Whether the value is exactly representable with `decimals` fractional digits
    pub fn fits_precision(&self, decimals: u8) -> bool {
        self.significant_scale() <= decimals
    }

    /// Render with exactly `decimals` fractional digits, truncating extra digits
    pub fn format_fixed(&self, decimals: u8) -> String {
        let digits = self.mantissa.to_string();
        let scale = self.scale as usize;

        let (int_part, frac_part) = if digits.len() > scale {
            let (int_part, frac_part) = digits.split_at(digits.len() - scale);
            (int_part.to_string(), frac_part.to_string())
        } else {
            ("0".to_string(), format!("{digits:0>scale$}"))
        };

        let decimals = decimals as usize;
        if decimals == 0 {
            return int_part;
        }

        let mut frac = frac_part;
        frac.truncate(decimals);
        format!("{int_part}.{frac:0<decimals$}")
    }
}

impl PartialEq for DecimalAmount {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (self.normalized(), other.normalized());
        a.mantissa == b.mantissa && a.scale == b.scale
    }
}

impl Eq for DecimalAmount {}

impl Hash for DecimalAmount {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let normalized = self.normalized();
        normalized.mantissa.hash(state);
        normalized.scale.hash(state);
    }
}

impl FromStr for DecimalAmount {
    type Err = AmountError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| AmountError::InvalidFormat {
            input: input.to_string(),
            reason,
        };

        if input.is_empty() {
            return Err(invalid("empty string"));
        }
        if let Some(rest) = input.strip_prefix('-') {
            if rest.parse::<DecimalAmount>().is_ok() {
                return Err(AmountError::Negative(input.to_string()));
            }
            return Err(invalid("not a decimal literal"));
        }

        let (int_part, frac_part) = match input.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (input, ""),
        };

        if int_part.is_empty() {
            return Err(invalid("missing integer digits"));
        }
        if input.contains('.') && frac_part.is_empty() {
            return Err(invalid("missing fractional digits"));
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid("not a decimal literal"));
        }

        if frac_part.len() > MAX_DECIMALS as usize {
            return Err(AmountError::Overflow {
                amount: input.to_string(),
                decimals: MAX_DECIMALS,
            });
        }

        let digits = format!("{int_part}{frac_part}");
        let mantissa = U256::from_dec_str(&digits).map_err(|_| AmountError::Overflow {
            amount: input.to_string(),
            decimals: frac_part.len() as u8,
        })?;

        Ok(Self {
            mantissa,
            scale: frac_part.len() as u8,
        })
    }
}

impl fmt::Display for DecimalAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let normalized = self.normalized();
        f.write_str(&normalized.format_fixed(normalized.scale))
    }
}

impl Serialize for DecimalAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DecimalAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Scale `amount` to an integer of base units, truncating digits beyond `decimals`
pub fn to_base_units(amount: &DecimalAmount, decimals: u8) -> Result<U256, AmountError> {
    if decimals > MAX_DECIMALS {
        return Err(AmountError::UnsupportedPrecision(decimals));
    }

    if amount.scale <= decimals {
        let factor = U256::exp10((decimals - amount.scale) as usize);
        amount
            .mantissa
            .checked_mul(factor)
            .ok_or_else(|| AmountError::Overflow {
                amount: amount.to_string(),
                decimals,
            })
    } else {
        let divisor = U256::exp10((amount.scale - decimals) as usize);
        Ok(amount.mantissa / divisor)
    }
}

/// Exact inverse of [`to_base_units`]
pub fn from_base_units(units: U256, decimals: u8) -> Result<DecimalAmount, AmountError> {
    DecimalAmount::from_parts(units, decimals)
}
