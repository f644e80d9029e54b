// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Arbitrary-precision rational scalar

use crate::error::ArithmeticError;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use super::Sign;

/// Exact rational number.
///
/// Every coordinate and every predicate input in the kernel is a `Scalar`.
/// Arithmetic never rounds, so the result of a chain of operations does not
/// depend on evaluation order.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Scalar(BigRational);

impl Scalar {
    pub fn zero() -> Self {
        Self(BigRational::zero())
    }

    pub fn one() -> Self {
        Self(BigRational::one())
    }

    pub fn from_int(value: i64) -> Self {
        Self(BigRational::from_integer(BigInt::from(value)))
    }

    /// Build `numer / denom`, failing on a zero denominator.
    pub fn from_ratio(numer: i64, denom: i64) -> Result<Self, ArithmeticError> {
        if denom == 0 {
            return Err(ArithmeticError::DivisionByZero);
        }
        Ok(Self(BigRational::new(BigInt::from(numer), BigInt::from(denom))))
    }

    /// Exact value of a binary floating point number.
    ///
    /// `0.1` becomes `3602879701896397/36028797018963968`, not `1/10`: the
    /// conversion preserves what the front end actually computed.
    pub fn from_f64(value: f64) -> Result<Self, ArithmeticError> {
        BigRational::from_float(value)
            .map(Self)
            .ok_or_else(|| ArithmeticError::NonFinite(value.to_string()))
    }

    /// Nearest `f64`. Only used for output; never feeds back into geometry.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_else(|| {
            let numer = self.0.numer().to_f64().unwrap_or(f64::NAN);
            let denom = self.0.denom().to_f64().unwrap_or(f64::NAN);
            numer / denom
        })
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn sign(&self) -> Sign {
        if self.0.is_zero() {
            Sign::Zero
        } else if self.0.is_positive() {
            Sign::Positive
        } else {
            Sign::Negative
        }
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Division that reports a zero divisor instead of panicking.
    pub fn checked_div(&self, rhs: &Scalar) -> Result<Scalar, ArithmeticError> {
        if rhs.is_zero() {
            return Err(ArithmeticError::DivisionByZero);
        }
        Ok(Scalar(&self.0 / &rhs.0))
    }

    pub fn recip(&self) -> Result<Scalar, ArithmeticError> {
        Scalar::one().checked_div(self)
    }

    pub fn min_of<'a>(&'a self, other: &'a Scalar) -> &'a Scalar {
        if self <= other {
            self
        } else {
            other
        }
    }

    pub fn max_of<'a>(&'a self, other: &'a Scalar) -> &'a Scalar {
        if self >= other {
            self
        } else {
            other
        }
    }
}

impl Default for Scalar {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::from_int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Self::from_int(i64::from(value))
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Scalar {
    type Err = ArithmeticError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigRational::from_str(s.trim())
            .map(Scalar)
            .map_err(|_| ArithmeticError::Parse(s.to_string()))
    }
}

// Scalars travel through dumps as "p/q" strings so nothing is lost.
impl Serialize for Scalar {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

macro_rules! forward_binop {
    ($imp:ident, $method:ident) => {
        impl $imp<&Scalar> for &Scalar {
            type Output = Scalar;

            fn $method(self, rhs: &Scalar) -> Scalar {
                Scalar((&self.0).$method(&rhs.0))
            }
        }

        impl $imp<Scalar> for Scalar {
            type Output = Scalar;

            fn $method(self, rhs: Scalar) -> Scalar {
                Scalar(self.0.$method(rhs.0))
            }
        }

        impl $imp<&Scalar> for Scalar {
            type Output = Scalar;

            fn $method(self, rhs: &Scalar) -> Scalar {
                Scalar(self.0.$method(&rhs.0))
            }
        }

        impl $imp<Scalar> for &Scalar {
            type Output = Scalar;

            fn $method(self, rhs: Scalar) -> Scalar {
                Scalar((&self.0).$method(rhs.0))
            }
        }
    };
}

forward_binop!(Add, add);
forward_binop!(Sub, sub);
forward_binop!(Mul, mul);

/// Panics on a zero divisor, like integer division. Callers holding an
/// untrusted divisor use [`Scalar::checked_div`].
impl Div<&Scalar> for &Scalar {
    type Output = Scalar;

    fn div(self, rhs: &Scalar) -> Scalar {
        Scalar(&self.0 / &rhs.0)
    }
}

impl Div<Scalar> for Scalar {
    type Output = Scalar;

    fn div(self, rhs: Scalar) -> Scalar {
        Scalar(self.0 / rhs.0)
    }
}

impl Neg for Scalar {
    type Output = Scalar;

    fn neg(self) -> Scalar {
        Scalar(-self.0)
    }
}

impl Neg for &Scalar {
    type Output = Scalar;

    fn neg(self) -> Scalar {
        Scalar(-&self.0)
    }
}

impl AddAssign<&Scalar> for Scalar {
    fn add_assign(&mut self, rhs: &Scalar) {
        self.0 = &self.0 + &rhs.0;
    }
}

impl SubAssign<&Scalar> for Scalar {
    fn sub_assign(&mut self, rhs: &Scalar) {
        self.0 = &self.0 - &rhs.0;
    }
}

impl MulAssign<&Scalar> for Scalar {
    fn mul_assign(&mut self, rhs: &Scalar) {
        self.0 = &self.0 * &rhs.0;
    }
}

impl std::iter::Sum for Scalar {
    fn sum<I: Iterator<Item = Scalar>>(iter: I) -> Scalar {
        iter.fold(Scalar::zero(), |acc, x| acc + x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_arithmetic_does_not_drift() {
        let tenth = Scalar::from_ratio(1, 10).unwrap();
        let mut sum = Scalar::zero();
        for _ in 0..10 {
            sum += &tenth;
        }
        assert_eq!(sum, Scalar::one());
    }

    #[test]
    fn test_division_by_zero_is_an_error() {
        let a = Scalar::from_int(3);
        assert_eq!(
            a.checked_div(&Scalar::zero()),
            Err(ArithmeticError::DivisionByZero)
        );
        assert!(Scalar::from_ratio(1, 0).is_err());
        assert!(Scalar::zero().recip().is_err());
    }

    #[test]
    fn test_from_f64_is_exact() {
        let half = Scalar::from_f64(0.5).unwrap();
        assert_eq!(half, Scalar::from_ratio(1, 2).unwrap());
        // 0.1 is not 1/10 in binary
        assert_ne!(Scalar::from_f64(0.1).unwrap(), Scalar::from_ratio(1, 10).unwrap());
        assert!(Scalar::from_f64(f64::NAN).is_err());
        assert!(Scalar::from_f64(f64::INFINITY).is_err());
    }

    #[test]
    fn test_parse_and_display() {
        let s: Scalar = "-7/21".parse().unwrap();
        assert_eq!(s, Scalar::from_ratio(-1, 3).unwrap());
        assert_eq!(s.to_string(), "-1/3");
        assert!("1/0".parse::<Scalar>().is_err());
        assert!("abc".parse::<Scalar>().is_err());
    }

    #[test]
    fn test_sign_and_order() {
        assert_eq!(Scalar::from_int(-2).sign(), Sign::Negative);
        assert_eq!(Scalar::zero().sign(), Sign::Zero);
        assert!(Scalar::from_ratio(1, 3).unwrap() < Scalar::from_ratio(1, 2).unwrap());
    }

    #[test]
    fn test_serde_round_trip_keeps_value() {
        let s = Scalar::from_ratio(22, 7).unwrap();
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "\"22/7\"");
        let back: Scalar = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
