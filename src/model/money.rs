//! Fixed-point currency amounts.
//!
//! [`Money`] wraps a [`Decimal`] that is never negative, stays below
//! [`MONEY_LIMIT`] and always carries exactly two fractional digits. All cost arithmetic goes through it so no
//! binary floating point ever touches a stored or reported amount.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::CostError;

/// Number of fractional digits kept for every amount.
pub const MONEY_SCALE: u32 = 2;

/// Exclusive upper bound, 10^16: sixteen integer digits plus two fractional
/// digits fill a NUMERIC(18,2) column.
pub const MONEY_LIMIT: Decimal = Decimal::from_parts(1_874_919_424, 2_328_306, 0, false, 0);

/// A non-negative currency amount with two fractional digits.
///
/// Serialized as a decimal string (`"102000.00"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::from_parts(0, 0, 0, false, MONEY_SCALE));

    /// Validates and normalizes a raw decimal. Negative values and values at
    /// or above [`MONEY_LIMIT`] are rejected; extra fractional digits are
    /// rounded half away from zero.
    pub fn new(value: Decimal) -> Result<Self, CostError> {
        if value < Decimal::ZERO {
            return Err(CostError::validation(format!(
                "amount must be >= 0, got {value}"
            )));
        }
        let mut normalized =
            value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
        if normalized >= MONEY_LIMIT {
            return Err(CostError::validation(format!(
                "amount must be below {MONEY_LIMIT}, got {value}"
            )));
        }
        normalized.rescale(MONEY_SCALE);
        Ok(Money(normalized))
    }

    /// Like [`Money::new`] but names the offending field in the error.
    pub fn field(name: &str, value: Decimal) -> Result<Self, CostError> {
        Self::new(value).map_err(|e| match e {
            CostError::Validation(msg) => CostError::Validation(format!("{name}: {msg}")),
            other => other,
        })
    }

    /// Adds two amounts. A total at or above [`MONEY_LIMIT`] is a validation
    /// error rather than an overflow.
    pub fn checked_add(self, rhs: Money) -> Result<Money, CostError> {
        let total = self.0.checked_add(rhs.0).ok_or_else(|| {
            CostError::validation(format!("amount total {} + {} overflows", self.0, rhs.0))
        })?;
        Money::new(total).map_err(|_| {
            CostError::validation(format!(
                "amount total {total} exceeds the limit of {MONEY_LIMIT}"
            ))
        })
    }

    /// Sums amounts with [`Money::checked_add`], stopping at the first overflow.
    pub fn try_sum<I>(amounts: I) -> Result<Money, CostError>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |total, amount| total.checked_add(amount))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::ZERO
    }
}

impl TryFrom<Decimal> for Money {
    type Error = CostError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Money::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Money {
    type Err = CostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: Decimal = s
            .trim()
            .parse()
            .map_err(|e| CostError::validation(format!("invalid amount '{s}': {e}")))?;
        Money::new(value)
    }
}
