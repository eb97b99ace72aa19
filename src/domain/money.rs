use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of decimal digits carried by every [`Amount`].
pub const SCALE: u32 = 2;

const MINOR_PER_UNIT: i64 = 100;

/// A monetary value stored as a signed count of minor units (hundredths).
///
/// All arithmetic inside the ledger happens on this integer representation.
/// Conversion from and to `Decimal` is exact and only happens at the edges.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Scales a decimal value to minor units. Values with more than two
    /// fractional digits are rejected instead of rounded.
    pub fn from_decimal(value: Decimal) -> Result<Self> {
        let scaled = value
            .checked_mul(Decimal::from(MINOR_PER_UNIT))
            .ok_or_else(|| LedgerError::InvalidRequest(format!("amount {value} is out of range")))?;

        if scaled.fract() != Decimal::ZERO {
            return Err(LedgerError::InvalidRequest(format!(
                "amount {value} has more than {SCALE} decimal places"
            )));
        }

        let minor = i64::try_from(scaled.trunc())
            .map_err(|_| LedgerError::InvalidRequest(format!("amount {value} is out of range")))?;
        Ok(Self(minor))
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, SCALE)
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or_else(|| LedgerError::InvalidRequest("amount overflow".to_string()))
    }

    pub fn checked_sub(self, rhs: Self) -> Result<Self> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or_else(|| LedgerError::InvalidRequest("amount overflow".to_string()))
    }
}

impl std::ops::Neg for Amount {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = LedgerError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::from_decimal(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.to_decimal()
    }
}
