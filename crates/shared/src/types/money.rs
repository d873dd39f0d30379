//! Currencies and amount encodings.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Amounts are `rust_decimal::Decimal` everywhere.
//!
//! The helpers in this module are the only place where amounts are rounded
//! or turned into text. Both compliance exports depend on them producing the
//! same bytes for the same value.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of decimal places carried by every monetary amount.
pub const AMOUNT_SCALE: u32 = 2;

/// ISO 4217 currency codes supported by the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Euro
    #[default]
    Eur,
    /// US Dollar
    Usd,
    /// Pound Sterling
    Gbp,
    /// Swiss Franc
    Chf,
}

impl Currency {
    /// Returns the ISO 4217 code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Eur => "EUR",
            Self::Usd => "USD",
            Self::Gbp => "GBP",
            Self::Chf => "CHF",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "EUR" => Ok(Self::Eur),
            "USD" => Ok(Self::Usd),
            "GBP" => Ok(Self::Gbp),
            "CHF" => Ok(Self::Chf),
            _ => Err(format!("Unknown currency: {s}")),
        }
    }
}

/// Rounds an amount to cents, half away from zero.
#[must_use]
pub fn round_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Formats an amount with exactly two decimals and a dot separator (`250.00`).
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    format_fixed(amount, AMOUNT_SCALE)
}

/// Formats an amount with exactly two decimals and a comma separator (`250,00`).
#[must_use]
pub fn format_amount_comma(amount: Decimal) -> String {
    format_amount(amount).replacen('.', ",", 1)
}

/// Formats a value with a fixed number of decimals, half away from zero.
#[must_use]
pub fn format_fixed(value: Decimal, scale: u32) -> String {
    let mut fixed = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    if fixed.is_zero() {
        fixed = Decimal::ZERO;
    }
    fixed.rescale(scale);
    fixed.to_string()
}
