use std::{fmt, str::FromStr};

use thiserror::Error;

/// Number of stroops in one whole unit of an asset.
pub const STROOPS_PER_UNIT: i64 = 10_000_000;
const DECIMALS: usize = 7;

/// Positive asset amount stored as an integer number of stroops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount(i64);

impl Amount {
    /// Largest representable amount, used as the default trustline limit.
    pub const MAX: Amount = Amount(i64::MAX);

    pub fn from_stroops(stroops: i64) -> Result<Self, AmountError> {
        if stroops <= 0 {
            return Err(AmountError::NotPositive);
        }
        Ok(Self(stroops))
    }

    pub fn stroops(self) -> i64 {
        self.0
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse_stroops(value).and_then(Self::from_stroops)
    }
}

/// Parses a ledger balance string (zero allowed) into stroops.
pub fn parse_balance(value: &str) -> Result<i64, AmountError> {
    parse_stroops(value)
}

/// Renders a stroop count with the ledger's seven decimal places.
pub fn format_stroops(stroops: i64) -> String {
    let sign = if stroops < 0 { "-" } else { "" };
    let magnitude = stroops.unsigned_abs();
    let unit = STROOPS_PER_UNIT as u64;
    format!("{sign}{}.{:07}", magnitude / unit, magnitude % unit)
}

fn parse_stroops(value: &str) -> Result<i64, AmountError> {
    let value = value.trim();
    let (whole, fraction) = match value.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (value, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(AmountError::Invalid(value.to_string()));
    }
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !all_digits(fraction) {
        return Err(AmountError::Invalid(value.to_string()));
    }
    if fraction.len() > DECIMALS {
        return Err(AmountError::Precision(value.to_string()));
    }

    let whole: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| AmountError::Overflow)?
    };
    let fraction: i64 = if fraction.is_empty() {
        0
    } else {
        format!("{fraction:0<width$}", width = DECIMALS)
            .parse()
            .map_err(|_| AmountError::Invalid(value.to_string()))?
    };

    let stroops = whole
        .checked_mul(STROOPS_PER_UNIT)
        .and_then(|scaled| scaled.checked_add(fraction))
        .ok_or(AmountError::Overflow)?;
    Ok(stroops)
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_stroops(self.0))
    }
}

/// Errors produced while parsing amounts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount '{0}' is not a decimal number")]
    Invalid(String),
    #[error("amount '{0}' has more than 7 decimal places")]
    Precision(String),
    #[error("amount must be greater than zero")]
    NotPositive,
    #[error("amount exceeds the maximum of 922337203685.4775807")]
    Overflow,
}
