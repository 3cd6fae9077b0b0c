//! Chain base units ↔ ledger currency units.
//!
//! The loan program moves USDC, which carries 6 decimals on chain. The ledger
//! records decimal currency amounts, so every raw `u64` amount crossing into
//! the ledger goes through [`from_base_units`].

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Raw base units per whole currency unit.
pub const BASE_UNIT_SCALE: u64 = 1_000_000;

/// Number of decimal places implied by [`BASE_UNIT_SCALE`].
const BASE_UNIT_DECIMALS: u32 = 6;

/// Currencies the ledger accepts. Only USDC for now.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    #[serde(rename = "USDC")]
    Usdc,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usdc => "USDC",
        }
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

/// Convert a raw chain amount into currency units (exact, no rounding).
pub fn from_base_units(raw: u64) -> Decimal {
    Decimal::from_i128_with_scale(raw as i128, BASE_UNIT_DECIMALS).normalize()
}

/// Convert a currency amount back into raw chain units.
///
/// Fails if the amount is negative, has more precision than the chain
/// supports, or does not fit in `u64`.
pub fn to_base_units(amount: Decimal) -> DomainResult<u64> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(DomainError::out_of_range(format!("negative amount {amount}")));
    }
    let scaled = amount * Decimal::from(BASE_UNIT_SCALE);
    if scaled.fract() != Decimal::ZERO {
        return Err(DomainError::out_of_range(format!(
            "{amount} has more than {BASE_UNIT_DECIMALS} decimal places"
        )));
    }
    scaled
        .to_u64()
        .ok_or_else(|| DomainError::out_of_range(format!("{amount} exceeds u64 base units")))
}
