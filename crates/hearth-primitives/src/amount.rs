//! amounts, pool shares and basis points
//!
//! all arithmetic is overflow-checked; a wrapped value is never produced

use core::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ErrorKind, BPS_DENOMINATOR};

/// arithmetic failure, always an integrity error
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("arithmetic overflow")]
    Overflow,

    #[error("arithmetic underflow")]
    Underflow,

    #[error("division by zero")]
    DivisionByZero,
}

impl ArithmeticError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Integrity
    }
}

/// `a * b / d` with floor rounding
pub fn mul_div(a: u128, b: u128, d: u128) -> Result<u128, ArithmeticError> {
    if d == 0 {
        return Err(ArithmeticError::DivisionByZero);
    }
    a.checked_mul(b)
        .map(|product| product / d)
        .ok_or(ArithmeticError::Overflow)
}

/// fungible value amount
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(pub u128);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub fn new(amount: u128) -> Self {
        Self(amount)
    }

    pub fn try_add(self, other: Self) -> Result<Self, ArithmeticError> {
        self.0.checked_add(other.0).map(Self).ok_or(ArithmeticError::Overflow)
    }

    pub fn try_sub(self, other: Self) -> Result<Self, ArithmeticError> {
        self.0.checked_sub(other.0).map(Self).ok_or(ArithmeticError::Underflow)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// `self * bps / 10000`, floored
    pub fn apply_bps(self, bps: Bps) -> Result<Self, ArithmeticError> {
        mul_div(self.0, bps.0 as u128, BPS_DENOMINATOR).map(Self)
    }

    /// `self * numerator / denominator`, floored
    pub fn mul_div(self, numerator: u128, denominator: u128) -> Result<Self, ArithmeticError> {
        mul_div(self.0, numerator, denominator).map(Self)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<u128> for Amount {
    fn from(v: u128) -> Self {
        Self(v)
    }
}

impl From<u64> for Amount {
    fn from(v: u64) -> Self {
        Self(v as u128)
    }
}

impl From<Amount> for u128 {
    fn from(v: Amount) -> Self {
        v.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// proportional claim on pooled capital
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shares(pub u128);

impl Shares {
    pub const ZERO: Self = Self(0);

    pub fn try_add(self, other: Self) -> Result<Self, ArithmeticError> {
        self.0.checked_add(other.0).map(Self).ok_or(ArithmeticError::Overflow)
    }

    pub fn try_sub(self, other: Self) -> Result<Self, ArithmeticError> {
        self.0.checked_sub(other.0).map(Self).ok_or(ArithmeticError::Underflow)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for Shares {
    fn from(v: u64) -> Self {
        Self(v as u128)
    }
}

impl fmt::Display for Shares {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// basis points, 1/10000
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bps(pub u32);

impl Bps {
    pub const ZERO: Self = Self(0);

    /// whole percent, truncated
    pub fn percent(self) -> u32 {
        self.0 / 100
    }
}

impl fmt::Display for Bps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}bps", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mul_div_floors() {
        assert_eq!(mul_div(7, 10, 3), Ok(23));
        assert_eq!(mul_div(80, 41, 10_000), Ok(0));
    }

    #[test]
    fn test_mul_div_rejects_zero_denominator() {
        assert_eq!(mul_div(1, 1, 0), Err(ArithmeticError::DivisionByZero));
    }

    #[test]
    fn test_mul_div_overflow() {
        assert_eq!(mul_div(u128::MAX, 2, 1), Err(ArithmeticError::Overflow));
    }

    #[test]
    fn test_amount_checked_ops() {
        let a = Amount::new(5);
        assert_eq!(a.try_sub(Amount::new(6)), Err(ArithmeticError::Underflow));
        assert_eq!(Amount::new(u128::MAX).try_add(a), Err(ArithmeticError::Overflow));
        assert_eq!(a.saturating_sub(Amount::new(9)), Amount::ZERO);
    }

    #[test]
    fn test_apply_bps() {
        // 2% insurance cut of 100
        assert_eq!(Amount::new(100).apply_bps(Bps(200)), Ok(Amount::new(2)));
        assert_eq!(Amount::new(7).apply_bps(Bps(500)), Ok(Amount::ZERO));
    }

    proptest! {
        #[test]
        fn mul_div_never_exceeds_exact_quotient(
            a in 0u128..1u128 << 60,
            b in 0u128..1u128 << 60,
            d in 1u128..1u128 << 60,
        ) {
            let floored = mul_div(a, b, d).unwrap();
            prop_assert!(floored * d <= a * b);
            prop_assert!(a * b - floored * d < d);
        }
    }
}
