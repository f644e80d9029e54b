// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Exact points and vectors

use super::Scalar;
use crate::error::ArithmeticError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// Point in the plane with exact coordinates
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point2 {
    pub x: Scalar,
    pub y: Scalar,
}

/// Displacement in the plane
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: Scalar,
    pub y: Scalar,
}

/// Point in space with exact coordinates
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point3 {
    pub x: Scalar,
    pub y: Scalar,
    pub z: Scalar,
}

/// Displacement in space
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: Scalar,
    pub y: Scalar,
    pub z: Scalar,
}

impl Point2 {
    pub fn new(x: Scalar, y: Scalar) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self::new(Scalar::zero(), Scalar::zero())
    }

    pub fn from_ints(x: i64, y: i64) -> Self {
        Self::new(Scalar::from_int(x), Scalar::from_int(y))
    }

    pub fn from_f64(x: f64, y: f64) -> Result<Self, ArithmeticError> {
        Ok(Self::new(Scalar::from_f64(x)?, Scalar::from_f64(y)?))
    }

    pub fn to_f64(&self) -> [f64; 2] {
        [self.x.to_f64(), self.y.to_f64()]
    }

    pub fn coords(&self) -> Vector2 {
        Vector2::new(self.x.clone(), self.y.clone())
    }

    /// Point halfway to `other`.
    pub fn midpoint(&self, other: &Point2) -> Point2 {
        let half = Scalar::from_int(2);
        Point2::new(&(&self.x + &other.x) / &half, &(&self.y + &other.y) / &half)
    }
}

impl Vector2 {
    pub fn new(x: Scalar, y: Scalar) -> Self {
        Self { x, y }
    }

    pub fn dot(&self, other: &Vector2) -> Scalar {
        &self.x * &other.x + &self.y * &other.y
    }

    /// z-component of the 3D cross product.
    pub fn cross(&self, other: &Vector2) -> Scalar {
        &self.x * &other.y - &self.y * &other.x
    }

    pub fn scale(&self, factor: &Scalar) -> Vector2 {
        Vector2::new(&self.x * factor, &self.y * factor)
    }

    pub fn is_zero(&self) -> bool {
        self.x.is_zero() && self.y.is_zero()
    }

    /// Left-hand perpendicular, i.e. rotated a quarter turn counterclockwise.
    pub fn perp(&self) -> Vector2 {
        Vector2::new(-&self.y, self.x.clone())
    }
}

impl Point3 {
    pub fn new(x: Scalar, y: Scalar, z: Scalar) -> Self {
        Self { x, y, z }
    }

    pub fn origin() -> Self {
        Self::new(Scalar::zero(), Scalar::zero(), Scalar::zero())
    }

    pub fn from_ints(x: i64, y: i64, z: i64) -> Self {
        Self::new(Scalar::from_int(x), Scalar::from_int(y), Scalar::from_int(z))
    }

    pub fn from_f64(x: f64, y: f64, z: f64) -> Result<Self, ArithmeticError> {
        Ok(Self::new(
            Scalar::from_f64(x)?,
            Scalar::from_f64(y)?,
            Scalar::from_f64(z)?,
        ))
    }

    pub fn to_f64(&self) -> [f64; 3] {
        [self.x.to_f64(), self.y.to_f64(), self.z.to_f64()]
    }

    pub fn coords(&self) -> Vector3 {
        Vector3::new(self.x.clone(), self.y.clone(), self.z.clone())
    }

    /// Coordinate by axis index (0 = x, 1 = y, 2 = z).
    pub fn axis(&self, axis: usize) -> &Scalar {
        match axis {
            0 => &self.x,
            1 => &self.y,
            _ => &self.z,
        }
    }

    pub fn from_axes(values: [Scalar; 3]) -> Self {
        let [x, y, z] = values;
        Self::new(x, y, z)
    }
}

impl Vector3 {
    pub fn new(x: Scalar, y: Scalar, z: Scalar) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(Scalar::zero(), Scalar::zero(), Scalar::zero())
    }

    pub fn dot(&self, other: &Vector3) -> Scalar {
        &self.x * &other.x + &self.y * &other.y + &self.z * &other.z
    }

    pub fn cross(&self, other: &Vector3) -> Vector3 {
        Vector3::new(
            &self.y * &other.z - &self.z * &other.y,
            &self.z * &other.x - &self.x * &other.z,
            &self.x * &other.y - &self.y * &other.x,
        )
    }

    pub fn scale(&self, factor: &Scalar) -> Vector3 {
        Vector3::new(&self.x * factor, &self.y * factor, &self.z * factor)
    }

    pub fn is_zero(&self) -> bool {
        self.x.is_zero() && self.y.is_zero() && self.z.is_zero()
    }

    pub fn axis(&self, axis: usize) -> &Scalar {
        match axis {
            0 => &self.x,
            1 => &self.y,
            _ => &self.z,
        }
    }

    /// Index of the component with the largest magnitude.
    pub fn dominant_axis(&self) -> usize {
        let (ax, ay, az) = (self.x.abs(), self.y.abs(), self.z.abs());
        if ax >= ay && ax >= az {
            0
        } else if ay >= az {
            1
        } else {
            2
        }
    }
}

impl Sub<&Point2> for &Point2 {
    type Output = Vector2;

    fn sub(self, rhs: &Point2) -> Vector2 {
        Vector2::new(&self.x - &rhs.x, &self.y - &rhs.y)
    }
}

impl Add<&Vector2> for &Point2 {
    type Output = Point2;

    fn add(self, rhs: &Vector2) -> Point2 {
        Point2::new(&self.x + &rhs.x, &self.y + &rhs.y)
    }
}

impl Add<&Vector2> for &Vector2 {
    type Output = Vector2;

    fn add(self, rhs: &Vector2) -> Vector2 {
        Vector2::new(&self.x + &rhs.x, &self.y + &rhs.y)
    }
}

impl Neg for &Vector2 {
    type Output = Vector2;

    fn neg(self) -> Vector2 {
        Vector2::new(-&self.x, -&self.y)
    }
}

impl Sub<&Point3> for &Point3 {
    type Output = Vector3;

    fn sub(self, rhs: &Point3) -> Vector3 {
        Vector3::new(&self.x - &rhs.x, &self.y - &rhs.y, &self.z - &rhs.z)
    }
}

impl Add<&Vector3> for &Point3 {
    type Output = Point3;

    fn add(self, rhs: &Vector3) -> Point3 {
        Point3::new(&self.x + &rhs.x, &self.y + &rhs.y, &self.z + &rhs.z)
    }
}

impl Add<&Vector3> for &Vector3 {
    type Output = Vector3;

    fn add(self, rhs: &Vector3) -> Vector3 {
        Vector3::new(&self.x + &rhs.x, &self.y + &rhs.y, &self.z + &rhs.z)
    }
}

impl Neg for &Vector3 {
    type Output = Vector3;

    fn neg(self) -> Vector3 {
        Vector3::new(-&self.x, -&self.y, -&self.z)
    }
}

impl fmt::Debug for Point2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl fmt::Debug for Vector2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}, {}>", self.x, self.y)
    }
}

impl fmt::Debug for Point3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl fmt::Debug for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}, {}, {}>", self.x, self.y, self.z)
    }
}

impl fmt::Display for Point3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_and_dot() {
        let x = Vector3::new(Scalar::one(), Scalar::zero(), Scalar::zero());
        let y = Vector3::new(Scalar::zero(), Scalar::one(), Scalar::zero());
        let z = x.cross(&y);
        assert_eq!(z, Vector3::new(Scalar::zero(), Scalar::zero(), Scalar::one()));
        assert!(x.dot(&y).is_zero());
    }

    #[test]
    fn test_point_arithmetic() {
        let a = Point3::from_ints(1, 2, 3);
        let b = Point3::from_ints(4, 6, 8);
        let d = &b - &a;
        assert_eq!(&a + &d, b);
        assert_eq!(d.dominant_axis(), 2);
    }

    #[test]
    fn test_midpoint_is_exact() {
        let a = Point2::from_ints(0, 0);
        let b = Point2::from_ints(1, 3);
        let m = a.midpoint(&b);
        assert_eq!(m.x, Scalar::from_ratio(1, 2).unwrap());
        assert_eq!(m.y, Scalar::from_ratio(3, 2).unwrap());
    }
}
