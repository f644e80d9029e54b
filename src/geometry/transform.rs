// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Exact affine maps built from floating point transform matrices

use crate::error::ArithmeticError;
use crate::number::{Point2, Point3, Scalar, Sign, Vector2, Vector3};
use nalgebra::{Matrix3, Matrix4};

/// Sine of an angle in degrees, exact at multiples of 90°.
pub fn sin_deg(degrees: f64) -> f64 {
    let turns = degrees / 90.0;
    if turns == turns.round() {
        return match (turns.round() as i64).rem_euclid(4) {
            0 | 2 => 0.0,
            1 => 1.0,
            _ => -1.0,
        };
    }
    degrees.to_radians().sin()
}

/// Cosine of an angle in degrees, exact at multiples of 90°.
pub fn cos_deg(degrees: f64) -> f64 {
    sin_deg(degrees + 90.0)
}

/// Exact 3D affine map `x -> M x + t`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Affine3 {
    linear: [[Scalar; 3]; 3],
    translation: [Scalar; 3],
}

impl Affine3 {
    pub fn identity() -> Self {
        let z = Scalar::zero;
        let o = Scalar::one;
        Self {
            linear: [[o(), z(), z()], [z(), o(), z()], [z(), z(), o()]],
            translation: [z(), z(), z()],
        }
    }

    pub fn translation(offset: &Vector3) -> Self {
        Self {
            translation: [offset.x.clone(), offset.y.clone(), offset.z.clone()],
            ..Self::identity()
        }
    }

    pub fn scaling(factors: [Scalar; 3]) -> Self {
        let mut map = Self::identity();
        for (i, factor) in factors.into_iter().enumerate() {
            map.linear[i][i] = factor;
        }
        map
    }

    /// Exact value of a homogeneous matrix. The bottom row must be
    /// `0 0 0 1`; every entry must be finite.
    pub fn from_matrix(matrix: &Matrix4<f64>) -> Result<Self, ArithmeticError> {
        for col in 0..3 {
            if matrix[(3, col)] != 0.0 {
                return Err(ArithmeticError::NonFinite(format!(
                    "projective row entry {}",
                    matrix[(3, col)]
                )));
            }
        }
        let mut map = Self::identity();
        for row in 0..3 {
            for col in 0..3 {
                map.linear[row][col] = Scalar::from_f64(matrix[(row, col)])?;
            }
            map.translation[row] = Scalar::from_f64(matrix[(row, 3)])?;
        }
        let w = Scalar::from_f64(matrix[(3, 3)])?;
        if w != Scalar::one() {
            let inv = w.recip()?;
            for row in 0..3 {
                for col in 0..3 {
                    map.linear[row][col] *= &inv;
                }
                map.translation[row] *= &inv;
            }
        }
        Ok(map)
    }

    pub fn apply(&self, point: &Point3) -> Point3 {
        let v = [&point.x, &point.y, &point.z];
        let row = |r: usize| {
            &(&(&self.linear[r][0] * v[0]) + &(&self.linear[r][1] * v[1]))
                + &(&(&self.linear[r][2] * v[2]) + &self.translation[r])
        };
        Point3::new(row(0), row(1), row(2))
    }

    pub fn apply_vector(&self, vector: &Vector3) -> Vector3 {
        let v = [&vector.x, &vector.y, &vector.z];
        let row = |r: usize| {
            &(&self.linear[r][0] * v[0])
                + &(&(&self.linear[r][1] * v[1]) + &(&self.linear[r][2] * v[2]))
        };
        Vector3::new(row(0), row(1), row(2))
    }

    pub fn determinant(&self) -> Scalar {
        let m = &self.linear;
        let minor = |a: usize, b: usize, c: usize, d: usize| {
            &(&m[1][a] * &m[2][b]) - &(&m[1][c] * &m[2][d])
        };
        &(&(&m[0][0] * &minor(1, 2, 2, 1)) - &(&m[0][1] * &minor(0, 2, 2, 0)))
            + &(&m[0][2] * &minor(0, 1, 1, 0))
    }

    /// `self ∘ other`: apply `other` first.
    pub fn compose(&self, other: &Affine3) -> Affine3 {
        let mut out = Affine3::identity();
        for r in 0..3 {
            for c in 0..3 {
                out.linear[r][c] = (0..3)
                    .map(|k| &self.linear[r][k] * &other.linear[k][c])
                    .sum();
            }
            out.translation[r] = (0..3)
                .map(|k| &self.linear[r][k] * &other.translation[k])
                .sum::<Scalar>()
                + &self.translation[r];
        }
        out
    }

    /// Orientation behaviour of the linear part.
    pub fn orientation(&self) -> Sign {
        self.determinant().sign()
    }

    pub fn is_identity(&self) -> bool {
        *self == Affine3::identity()
    }

    /// Pure translation part, if the linear part is the identity.
    pub fn as_translation(&self) -> Option<Vector3> {
        let ident = Affine3::identity();
        (self.linear == ident.linear).then(|| {
            Vector3::new(
                self.translation[0].clone(),
                self.translation[1].clone(),
                self.translation[2].clone(),
            )
        })
    }

    /// The map restricted to the xy-plane.
    pub fn to_planar(&self) -> Affine2 {
        Affine2 {
            linear: [
                [self.linear[0][0].clone(), self.linear[0][1].clone()],
                [self.linear[1][0].clone(), self.linear[1][1].clone()],
            ],
            translation: [self.translation[0].clone(), self.translation[1].clone()],
        }
    }
}

/// Exact 2D affine map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Affine2 {
    linear: [[Scalar; 2]; 2],
    translation: [Scalar; 2],
}

impl Affine2 {
    pub fn identity() -> Self {
        Self {
            linear: [
                [Scalar::one(), Scalar::zero()],
                [Scalar::zero(), Scalar::one()],
            ],
            translation: [Scalar::zero(), Scalar::zero()],
        }
    }

    pub fn translation(offset: &Vector2) -> Self {
        Self {
            translation: [offset.x.clone(), offset.y.clone()],
            ..Self::identity()
        }
    }

    pub fn from_matrix(matrix: &Matrix3<f64>) -> Result<Self, ArithmeticError> {
        let mut map = Self::identity();
        for row in 0..2 {
            for col in 0..2 {
                map.linear[row][col] = Scalar::from_f64(matrix[(row, col)])?;
            }
            map.translation[row] = Scalar::from_f64(matrix[(row, 2)])?;
        }
        Ok(map)
    }

    pub fn apply(&self, point: &Point2) -> Point2 {
        let row = |r: usize| {
            &(&(&self.linear[r][0] * &point.x) + &(&self.linear[r][1] * &point.y))
                + &self.translation[r]
        };
        Point2::new(row(0), row(1))
    }

    pub fn determinant(&self) -> Scalar {
        &(&self.linear[0][0] * &self.linear[1][1]) - &(&self.linear[0][1] * &self.linear[1][0])
    }

    pub fn orientation(&self) -> Sign {
        self.determinant().sign()
    }

    pub fn as_translation(&self) -> Option<Vector2> {
        (self.linear == Affine2::identity().linear).then(|| {
            Vector2::new(self.translation[0].clone(), self.translation[1].clone())
        })
    }
}
