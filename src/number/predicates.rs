// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Exact geometric predicates and the oriented lines/planes built on them

use super::{Point2, Point3, Scalar, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Sign of an exact quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sign {
    Negative,
    Zero,
    Positive,
}

impl Sign {
    pub fn flip(self) -> Sign {
        match self {
            Sign::Negative => Sign::Positive,
            Sign::Zero => Sign::Zero,
            Sign::Positive => Sign::Negative,
        }
    }

    /// True when the two signs are both non-zero and differ.
    pub fn opposes(self, other: Sign) -> bool {
        matches!(
            (self, other),
            (Sign::Negative, Sign::Positive) | (Sign::Positive, Sign::Negative)
        )
    }
}

/// Orientation of the triangle `a, b, c`: positive when counterclockwise.
pub fn orient2d(a: &Point2, b: &Point2, c: &Point2) -> Sign {
    (b - a).cross(&(c - a)).sign()
}

/// Orientation of `d` against the plane through `a, b, c`: positive when `d`
/// lies on the side the right-hand normal of `a, b, c` points to.
pub fn orient3d(a: &Point3, b: &Point3, c: &Point3, d: &Point3) -> Sign {
    (b - a).cross(&(c - a)).dot(&(d - a)).sign()
}

/// Oriented plane `normal · x = offset`.
///
/// The normal points to the outside: `side` is negative for points in the
/// closed half-space the plane bounds. Constructors scale the plane so the
/// first non-zero normal component is 1 or -1, so two planes compare equal
/// exactly when they bound the same half-space.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Plane3 {
    pub normal: Vector3,
    pub offset: Scalar,
}

impl Plane3 {
    pub fn new(normal: Vector3, offset: Scalar) -> Self {
        let lead = [&normal.x, &normal.y, &normal.z]
            .into_iter()
            .find(|c| !c.is_zero())
            .map(Scalar::abs);
        match lead {
            Some(lead) if lead != Scalar::one() => Self {
                normal: Vector3::new(&normal.x / &lead, &normal.y / &lead, &normal.z / &lead),
                offset: &offset / &lead,
            },
            _ => Self { normal, offset },
        }
    }

    /// Plane through three points, oriented by the right-hand rule.
    pub fn from_points(a: &Point3, b: &Point3, c: &Point3) -> Option<Self> {
        let normal = (b - a).cross(&(c - a));
        if normal.is_zero() {
            return None;
        }
        let offset = normal.dot(&a.coords());
        Some(Self::new(normal, offset))
    }

    /// Supporting plane of a planar loop, using the exact Newell normal so
    /// collinear leading vertices and non-convex loops are handled.
    pub fn from_loop(points: &[Point3]) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }
        let origin = &points[0];
        let mut normal = Vector3::zero();
        for i in 1..points.len() - 1 {
            let a = &points[i] - origin;
            let b = &points[i + 1] - origin;
            normal = &normal + &a.cross(&b);
        }
        if normal.is_zero() {
            return None;
        }
        let offset = normal.dot(&origin.coords());
        Some(Self::new(normal, offset))
    }

    /// Sign of `normal · p - offset`.
    pub fn side(&self, point: &Point3) -> Sign {
        (self.normal.dot(&point.coords()) - &self.offset).sign()
    }

    pub fn opposite(&self) -> Plane3 {
        Plane3::new(-&self.normal, -&self.offset)
    }

    /// Same point set with the normal pointing the other way.
    pub fn is_opposite(&self, other: &Plane3) -> bool {
        let dot = self.normal.dot(&other.normal);
        dot.sign() == Sign::Negative
            && self.normal.cross(&other.normal).is_zero()
            && &self.offset * &other.normal.dot(&other.normal) == &other.offset * &dot
    }

    /// Same plane scaled so that the first non-zero normal component is 1.
    ///
    /// Returns the scaled plane and whether `self` faces the same way as it.
    /// Two planes describe the same point set iff their canonical forms match.
    pub fn canonical(&self) -> (Plane3, bool) {
        let lead = [&self.normal.x, &self.normal.y, &self.normal.z]
            .into_iter()
            .find(|c| !c.is_zero())
            .cloned()
            .unwrap_or_else(Scalar::one);
        let same = lead.sign() == Sign::Positive;
        let plane = Plane3::new(
            Vector3::new(
                &self.normal.x / &lead,
                &self.normal.y / &lead,
                &self.normal.z / &lead,
            ),
            &self.offset / &lead,
        );
        (plane, same)
    }

    /// Point where segment `a`–`b` meets the plane. The endpoints must lie
    /// strictly on opposite sides.
    pub fn intersect_segment(&self, a: &Point3, b: &Point3) -> Point3 {
        let ab = b - a;
        let t = &(&self.offset - &self.normal.dot(&a.coords())) / &self.normal.dot(&ab);
        a + &ab.scale(&t)
    }

    /// The same plane moved by `shift`.
    pub fn translated(&self, shift: &Vector3) -> Plane3 {
        Plane3::new(self.normal.clone(), &self.offset + &self.normal.dot(shift))
    }

    pub fn projection(&self) -> PlaneProjection {
        let axis = self.normal.dominant_axis();
        PlaneProjection {
            axis,
            swap: self.normal.axis(axis).sign() == Sign::Negative,
        }
    }
}

impl std::fmt::Debug for Plane3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}·x = {}", self.normal, self.offset)
    }
}

/// Axis-dropping projection of a plane onto a coordinate plane.
///
/// Loops that are counterclockwise about the plane normal stay
/// counterclockwise after projection. Projection is a bijection on the plane,
/// so [`PlaneProjection::lift`] recovers the exact 3D point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneProjection {
    axis: usize,
    swap: bool,
}

impl PlaneProjection {
    fn axes(&self) -> (usize, usize) {
        let i = (self.axis + 1) % 3;
        let j = (self.axis + 2) % 3;
        if self.swap {
            (j, i)
        } else {
            (i, j)
        }
    }

    pub fn project(&self, point: &Point3) -> Point2 {
        let (u, v) = self.axes();
        Point2::new(point.axis(u).clone(), point.axis(v).clone())
    }

    pub fn lift(&self, point: &Point2, plane: &Plane3) -> Point3 {
        let (u, v) = self.axes();
        let rest = &plane.offset
            - &(plane.normal.axis(u) * &point.x)
            - &(plane.normal.axis(v) * &point.y);
        let mut coords = [Scalar::zero(), Scalar::zero(), Scalar::zero()];
        coords[u] = point.x.clone();
        coords[v] = point.y.clone();
        coords[self.axis] = &rest / plane.normal.axis(self.axis);
        Point3::from_axes(coords)
    }
}

/// Oriented line `normal · x = offset` in the plane. The normal points out of
/// the closed half-plane the line bounds and is scaled like [`Plane3`]'s.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Line2 {
    pub normal: Vector2,
    pub offset: Scalar,
}

impl Line2 {
    pub fn new(normal: Vector2, offset: Scalar) -> Self {
        let lead = [&normal.x, &normal.y]
            .into_iter()
            .find(|c| !c.is_zero())
            .map(Scalar::abs);
        match lead {
            Some(lead) if lead != Scalar::one() => Self {
                normal: Vector2::new(&normal.x / &lead, &normal.y / &lead),
                offset: &offset / &lead,
            },
            _ => Self { normal, offset },
        }
    }

    /// Line through `a` towards `b`, bounding the half-plane on its left.
    pub fn through(a: &Point2, b: &Point2) -> Option<Self> {
        let dir = b - a;
        if dir.is_zero() {
            return None;
        }
        let normal = Vector2::new(dir.y.clone(), -&dir.x);
        let offset = normal.dot(&a.coords());
        Some(Self::new(normal, offset))
    }

    pub fn side(&self, point: &Point2) -> Sign {
        (self.normal.dot(&point.coords()) - &self.offset).sign()
    }

    pub fn opposite(&self) -> Line2 {
        Line2::new(-&self.normal, -&self.offset)
    }

    pub fn is_opposite(&self, other: &Line2) -> bool {
        let dot = self.normal.dot(&other.normal);
        dot.sign() == Sign::Negative
            && self.normal.cross(&other.normal).is_zero()
            && &self.offset * &other.normal.dot(&other.normal) == &other.offset * &dot
    }

    pub fn intersect_segment(&self, a: &Point2, b: &Point2) -> Point2 {
        let ab = b - a;
        let t = &(&self.offset - &self.normal.dot(&a.coords())) / &self.normal.dot(&ab);
        a + &ab.scale(&t)
    }

    pub fn translated(&self, shift: &Vector2) -> Line2 {
        Line2::new(self.normal.clone(), &self.offset + &self.normal.dot(shift))
    }
}

impl std::fmt::Debug for Line2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}·x = {}", self.normal, self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orient2d() {
        let a = Point2::from_ints(0, 0);
        let b = Point2::from_ints(1, 0);
        assert_eq!(orient2d(&a, &b, &Point2::from_ints(0, 1)), Sign::Positive);
        assert_eq!(orient2d(&a, &b, &Point2::from_ints(0, -1)), Sign::Negative);
        assert_eq!(orient2d(&a, &b, &Point2::from_ints(5, 0)), Sign::Zero);
    }

    #[test]
    fn test_orient3d_exact_on_near_degenerate_input() {
        // A point displaced by 2^-60 from the plane is still classified.
        let a = Point3::from_ints(0, 0, 0);
        let b = Point3::from_ints(1, 0, 0);
        let c = Point3::from_ints(0, 1, 0);
        let tiny = Scalar::from_f64(2f64.powi(-60)).unwrap();
        let above = Point3::new(Scalar::from_int(7), Scalar::from_int(3), tiny.clone());
        let below = Point3::new(Scalar::from_int(7), Scalar::from_int(3), -&tiny);
        assert_eq!(orient3d(&a, &b, &c, &above), Sign::Positive);
        assert_eq!(orient3d(&a, &b, &c, &below), Sign::Negative);
    }

    #[test]
    fn test_plane_side_and_intersection() {
        let plane = Plane3::new(
            Vector3::new(Scalar::zero(), Scalar::zero(), Scalar::one()),
            Scalar::from_int(1),
        );
        let a = Point3::from_ints(0, 0, 0);
        let b = Point3::from_ints(0, 0, 3);
        assert_eq!(plane.side(&a), Sign::Negative);
        assert_eq!(plane.side(&b), Sign::Positive);
        assert_eq!(plane.intersect_segment(&a, &b), Point3::from_ints(0, 0, 1));
    }

    #[test]
    fn test_canonical_identifies_opposite_planes() {
        let plane = Plane3::from_points(
            &Point3::from_ints(0, 0, 2),
            &Point3::from_ints(2, 0, 2),
            &Point3::from_ints(0, 2, 2),
        )
        .unwrap();
        let (k1, same1) = plane.canonical();
        let (k2, same2) = plane.opposite().canonical();
        assert_eq!(k1, k2);
        assert_ne!(same1, same2);

        let scaled = Plane3::new(plane.normal.scale(&Scalar::from_int(-3)), &plane.offset * &Scalar::from_int(-3));
        assert!(plane.is_opposite(&scaled));
        assert!(!plane.is_opposite(&plane));
    }

    #[test]
    fn test_same_plane_from_any_construction_is_equal() {
        let a = Point3::from_ints(0, 0, 3);
        let b = Point3::from_ints(4, 0, 3);
        let c = Point3::from_ints(4, 5, 3);
        let d = Point3::from_ints(0, 5, 3);
        let from_points = Plane3::from_points(&a, &b, &c).unwrap();
        let from_loop = Plane3::from_loop(&[a, b, c, d]).unwrap();
        let unit = Plane3::new(
            Vector3::new(Scalar::zero(), Scalar::zero(), Scalar::one()),
            Scalar::from_int(3),
        );
        assert_eq!(from_points, unit);
        assert_eq!(from_loop, unit);
        assert_ne!(from_loop.opposite(), unit);

        let line = Line2::through(&Point2::from_ints(0, 0), &Point2::from_ints(3, 0)).unwrap();
        let short = Line2::through(&Point2::from_ints(1, 0), &Point2::from_ints(2, 0)).unwrap();
        assert_eq!(line, short);
    }

    #[test]
    fn test_projection_round_trip() {
        let plane = Plane3::from_points(
            &Point3::from_ints(1, 0, 0),
            &Point3::from_ints(0, 1, 0),
            &Point3::from_ints(0, 0, 1),
        )
        .unwrap();
        let proj = plane.projection();
        let p = Point3::new(
            Scalar::from_ratio(1, 3).unwrap(),
            Scalar::from_ratio(1, 2).unwrap(),
            Scalar::from_ratio(1, 6).unwrap(),
        );
        assert_eq!(proj.lift(&proj.project(&p), &plane), p);
    }

    #[test]
    fn test_line_through_bounds_left_side() {
        let line = Line2::through(&Point2::from_ints(0, 0), &Point2::from_ints(1, 0)).unwrap();
        assert_eq!(line.side(&Point2::from_ints(0, 1)), Sign::Negative);
        assert_eq!(line.side(&Point2::from_ints(0, -1)), Sign::Positive);
    }
}
