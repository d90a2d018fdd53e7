//! Fixed-point money in integer minor units.

use core::iter::Sum;
use serde::{Deserialize, Serialize};

use crate::value_object::ValueObject;

/// An amount of money in minor units (e.g. cents).
///
/// Signed so that negative inputs can be represented and rejected at the
/// boundary; an account balance never holds a negative value.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Whole major units (e.g. dollars); saturates on overflow.
    pub const fn from_major(major: i64) -> Self {
        Self(major.saturating_mul(100))
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }
}

impl From<i64> for Money {
    fn from(minor: i64) -> Self {
        Self(minor)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write_minor(f, self.0 as i128)
    }
}

/// Sum of many [`Money`] values, in `i128` minor units.
///
/// Wide enough that adding up any number of `i64` balances a process can hold
/// never overflows, so totals are exact instead of clamped.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoneyTotal(i128);

impl ValueObject for MoneyTotal {}

impl MoneyTotal {
    pub const ZERO: MoneyTotal = MoneyTotal(0);

    pub const fn from_minor(minor: i128) -> Self {
        Self(minor)
    }

    pub const fn minor(self) -> i128 {
        self.0
    }

    pub fn checked_add(self, rhs: Money) -> Option<MoneyTotal> {
        self.0.checked_add(rhs.0 as i128).map(MoneyTotal)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<MoneyTotal> {
        self.0.checked_sub(rhs.0 as i128).map(MoneyTotal)
    }
}

impl From<Money> for MoneyTotal {
    fn from(value: Money) -> Self {
        Self(value.0 as i128)
    }
}

impl PartialEq<Money> for MoneyTotal {
    fn eq(&self, other: &Money) -> bool {
        self.0 == other.0 as i128
    }
}

impl Sum<Money> for MoneyTotal {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        MoneyTotal(iter.map(|m| m.0 as i128).sum())
    }
}

impl core::fmt::Display for MoneyTotal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write_minor(f, self.0)
    }
}

fn write_minor(f: &mut core::fmt::Formatter<'_>, minor: i128) -> core::fmt::Result {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
}
