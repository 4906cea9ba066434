//! Fixed-precision quantities for cash amounts and unit counts.
//!
//! Both types keep the full `Decimal` result of every operation and only round
//! when compared, hashed, displayed or serialized. Summing several operands and
//! rounding once is therefore not the same as rounding each operand first.
//! Arithmetic that can leave the `Decimal` range is checked and returns
//! `ValueError::Overflow`.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Neg;

use rust_decimal::prelude::*;
use serde::{Serialize, Serializer};
use thiserror::Error;

pub const MONEY_DECIMAL_PLACES: u32 = 2;
pub const SHARES_DECIMAL_PLACES: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("{kind} value must be finite, received: {value}")]
    InvalidValue { kind: &'static str, value: String },

    #[error("{kind} value is outside the representable range, received: {value}")]
    OutOfRange { kind: &'static str, value: String },

    #[error("cannot divide {kind} by zero")]
    DivisionByZero { kind: &'static str },

    #[error("{kind} {operation} overflowed")]
    Overflow {
        kind: &'static str,
        operation: &'static str,
    },
}

fn round_to(value: Decimal, places: u32) -> Decimal {
    value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
}

macro_rules! fixed_precision_value {
    ($(#[$meta:meta])* $name:ident, $places:expr, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name(Decimal);

        impl $name {
            pub const ZERO: Self = Self(Decimal::ZERO);
            pub const DECIMAL_PLACES: u32 = $places;

            pub const fn new(value: Decimal) -> Self {
                Self(value)
            }

            pub fn from_f64(value: f64) -> Result<Self, ValueError> {
                if !value.is_finite() {
                    return Err(ValueError::InvalidValue {
                        kind: $kind,
                        value: value.to_string(),
                    });
                }
                Decimal::from_f64(value)
                    .map(Self)
                    .ok_or_else(|| ValueError::OutOfRange {
                        kind: $kind,
                        value: value.to_string(),
                    })
            }

            /// Unrounded value.
            pub fn value(&self) -> Decimal {
                self.0
            }

            pub fn rounded(&self) -> Decimal {
                round_to(self.0, $places)
            }

            pub fn abs(&self) -> Self {
                Self(self.0.abs())
            }

            pub fn is_zero(&self) -> bool {
                self.rounded().is_zero()
            }

            pub fn is_positive(&self) -> bool {
                *self > Self::ZERO
            }

            pub fn is_negative(&self) -> bool {
                *self < Self::ZERO
            }

            fn overflow(operation: &'static str) -> ValueError {
                ValueError::Overflow {
                    kind: $kind,
                    operation,
                }
            }

            pub fn checked_add(self, rhs: Self) -> Result<Self, ValueError> {
                self.0
                    .checked_add(rhs.0)
                    .map(Self)
                    .ok_or_else(|| Self::overflow("addition"))
            }

            pub fn checked_sub(self, rhs: Self) -> Result<Self, ValueError> {
                self.0
                    .checked_sub(rhs.0)
                    .map(Self)
                    .ok_or_else(|| Self::overflow("subtraction"))
            }

            pub fn checked_mul(self, factor: Decimal) -> Result<Self, ValueError> {
                self.0
                    .checked_mul(factor)
                    .map(Self)
                    .ok_or_else(|| Self::overflow("multiplication"))
            }

            pub fn checked_sum<I: IntoIterator<Item = Self>>(values: I) -> Result<Self, ValueError> {
                values
                    .into_iter()
                    .try_fold(Self::ZERO, |acc, value| acc.checked_add(value))
            }

            /// Scales by a plain number. Fails only on an exactly-zero divisor.
            pub fn divide(&self, divisor: Decimal) -> Result<Self, ValueError> {
                if divisor.is_zero() {
                    return Err(ValueError::DivisionByZero { kind: $kind });
                }
                self.0
                    .checked_div(divisor)
                    .map(Self)
                    .ok_or_else(|| Self::overflow("division"))
            }

            /// Dimensionless ratio of two quantities of the same kind. A divisor
            /// that rounds to zero is rejected.
            pub fn ratio(&self, divisor: Self) -> Result<Decimal, ValueError> {
                if divisor.is_zero() {
                    return Err(ValueError::DivisionByZero { kind: $kind });
                }
                self.0
                    .checked_div(divisor.0)
                    .ok_or_else(|| Self::overflow("division"))
            }
        }

        impl From<Decimal> for $name {
            fn from(value: Decimal) -> Self {
                Self(value)
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.rounded() == other.rounded()
            }
        }

        impl Eq for $name {}

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> Ordering {
                self.rounded().cmp(&other.rounded())
            }
        }

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.rounded().normalize().hash(state);
            }
        }

        impl Neg for $name {
            type Output = Self;

            fn neg(self) -> Self {
                Self(-self.0)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                Serialize::serialize(&self.rounded(), serializer)
            }
        }
    };
}

fixed_precision_value!(
    /// A cash amount, compared to the cent.
    Money,
    MONEY_DECIMAL_PLACES,
    "money"
);

fixed_precision_value!(
    /// A unit count, compared to ten decimal places so fractional units
    /// (DRIPs, staking rewards) survive long histories.
    Shares,
    SHARES_DECIMAL_PLACES,
    "shares"
);

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.rounded())
    }
}

impl fmt::Display for Shares {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rounded().normalize())
    }
}
