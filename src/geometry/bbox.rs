// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Exact axis-aligned bounding volumes

use crate::number::{Point2, Point3, Scalar, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Axis-aligned box over exact coordinates, in any dimension.
pub trait AxisBox: Clone + PartialEq + Debug + Send + Sync {
    /// Smallest box containing both.
    fn union(&self, other: &Self) -> Self;

    /// True when the open interiors do not overlap (touching counts as
    /// disjoint).
    fn interiors_disjoint(&self, other: &Self) -> bool;

    /// True when the closed boxes share at least one point.
    fn touches(&self, other: &Self) -> bool;

    /// This box grown on every side by the extent of `other` plus one.
    fn expanded_for(&self, other: &Self) -> Self;

    /// Points `x` with `x - other ⊆ self`, as a box `[min + other.max, max + other.min]`.
    fn eroded_by(&self, other: &Self) -> Self;
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox3 {
    pub min: Point3,
    pub max: Point3,
}

impl BoundingBox3 {
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Self::new(first.clone(), first.clone());
        for point in iter {
            bbox.expand_to_include(point);
        }
        Some(bbox)
    }

    pub fn expand_to_include(&mut self, point: &Point3) {
        if point.x < self.min.x {
            self.min.x = point.x.clone();
        }
        if point.y < self.min.y {
            self.min.y = point.y.clone();
        }
        if point.z < self.min.z {
            self.min.z = point.z.clone();
        }
        if point.x > self.max.x {
            self.max.x = point.x.clone();
        }
        if point.y > self.max.y {
            self.max.y = point.y.clone();
        }
        if point.z > self.max.z {
            self.max.z = point.z.clone();
        }
    }

    pub fn size(&self) -> Vector3 {
        &self.max - &self.min
    }

    pub fn volume(&self) -> Scalar {
        let size = self.size();
        &(&size.x * &size.y) * &size.z
    }

    pub fn contains_point(&self, point: &Point3) -> bool {
        self.min.x <= point.x
            && point.x <= self.max.x
            && self.min.y <= point.y
            && point.y <= self.max.y
            && self.min.z <= point.z
            && point.z <= self.max.z
    }

    /// Box with `low` added to the min corner and `high` to the max corner.
    pub fn offset(&self, low: &Vector3, high: &Vector3) -> Self {
        Self::new(&self.min + low, &self.max + high)
    }

    pub fn to_f64(&self) -> ([f64; 3], [f64; 3]) {
        (self.min.to_f64(), self.max.to_f64())
    }
}

impl AxisBox for BoundingBox3 {
    fn union(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        merged.expand_to_include(&other.min);
        merged.expand_to_include(&other.max);
        merged
    }

    fn interiors_disjoint(&self, other: &Self) -> bool {
        self.max.x <= other.min.x
            || other.max.x <= self.min.x
            || self.max.y <= other.min.y
            || other.max.y <= self.min.y
            || self.max.z <= other.min.z
            || other.max.z <= self.min.z
    }

    fn touches(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
            && self.min.z <= other.max.z
            && other.min.z <= self.max.z
    }

    fn expanded_for(&self, other: &Self) -> Self {
        let one = Scalar::one();
        let size = other.size();
        let grow = Vector3::new(&size.x + &one, &size.y + &one, &size.z + &one);
        self.offset(&-&grow, &grow)
    }

    fn eroded_by(&self, other: &Self) -> Self {
        Self::new(&self.min + &other.max.coords(), &self.max + &other.min.coords())
    }
}

/// Axis-aligned bounding rectangle
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingRect2 {
    pub min: Point2,
    pub max: Point2,
}

impl BoundingRect2 {
    pub fn new(min: Point2, max: Point2) -> Self {
        Self { min, max }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point2>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut rect = Self::new(first.clone(), first.clone());
        for point in iter {
            rect.expand_to_include(point);
        }
        Some(rect)
    }

    pub fn expand_to_include(&mut self, point: &Point2) {
        if point.x < self.min.x {
            self.min.x = point.x.clone();
        }
        if point.y < self.min.y {
            self.min.y = point.y.clone();
        }
        if point.x > self.max.x {
            self.max.x = point.x.clone();
        }
        if point.y > self.max.y {
            self.max.y = point.y.clone();
        }
    }

    pub fn size(&self) -> Vector2 {
        &self.max - &self.min
    }

    pub fn area(&self) -> Scalar {
        let size = self.size();
        &size.x * &size.y
    }

    pub fn contains_point(&self, point: &Point2) -> bool {
        self.min.x <= point.x
            && point.x <= self.max.x
            && self.min.y <= point.y
            && point.y <= self.max.y
    }

    pub fn offset(&self, low: &Vector2, high: &Vector2) -> Self {
        Self::new(&self.min + low, &self.max + high)
    }
}

impl AxisBox for BoundingRect2 {
    fn union(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        merged.expand_to_include(&other.min);
        merged.expand_to_include(&other.max);
        merged
    }

    fn interiors_disjoint(&self, other: &Self) -> bool {
        self.max.x <= other.min.x
            || other.max.x <= self.min.x
            || self.max.y <= other.min.y
            || other.max.y <= self.min.y
    }

    fn touches(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    fn expanded_for(&self, other: &Self) -> Self {
        let one = Scalar::one();
        let size = other.size();
        let grow = Vector2::new(&size.x + &one, &size.y + &one);
        self.offset(&-&grow, &grow)
    }

    fn eroded_by(&self, other: &Self) -> Self {
        Self::new(&self.min + &other.max.coords(), &self.max + &other.min.coords())
    }
}

/// Bounding volume of a possibly empty or unbounded point set.
///
/// Only ever used to skip work; a conservative answer is always correct.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundingVolume<B> {
    Empty,
    Bounded(B),
    Unbounded,
}

impl<B: AxisBox> BoundingVolume<B> {
    pub fn of_boxes<'a>(boxes: impl IntoIterator<Item = &'a B>) -> Self
    where
        B: 'a,
    {
        boxes
            .into_iter()
            .fold(BoundingVolume::Empty, |acc, b| match acc {
                BoundingVolume::Empty => BoundingVolume::Bounded(b.clone()),
                BoundingVolume::Bounded(a) => BoundingVolume::Bounded(a.union(b)),
                BoundingVolume::Unbounded => BoundingVolume::Unbounded,
            })
    }

    pub fn union(&self, other: &Self) -> Self {
        match (self, other) {
            (BoundingVolume::Unbounded, _) | (_, BoundingVolume::Unbounded) => {
                BoundingVolume::Unbounded
            }
            (BoundingVolume::Empty, x) | (x, BoundingVolume::Empty) => x.clone(),
            (BoundingVolume::Bounded(a), BoundingVolume::Bounded(b)) => {
                BoundingVolume::Bounded(a.union(b))
            }
        }
    }

    /// True when the two sets cannot share interior points.
    pub fn disjoint(&self, other: &Self) -> bool {
        match (self, other) {
            (BoundingVolume::Empty, _) | (_, BoundingVolume::Empty) => true,
            (BoundingVolume::Bounded(a), BoundingVolume::Bounded(b)) => a.interiors_disjoint(b),
            _ => false,
        }
    }

    pub fn is_bounded(&self) -> bool {
        !matches!(self, BoundingVolume::Unbounded)
    }

    pub fn as_box(&self) -> Option<&B> {
        match self {
            BoundingVolume::Bounded(b) => Some(b),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube_box(lo: i64, hi: i64) -> BoundingBox3 {
        BoundingBox3::new(Point3::from_ints(lo, lo, lo), Point3::from_ints(hi, hi, hi))
    }

    #[test]
    fn test_bounding_box() {
        let points = [Point3::from_ints(1, 2, 3), Point3::from_ints(-1, -2, -3)];
        let bbox = BoundingBox3::from_points(&points).unwrap();

        assert_eq!(bbox.min, Point3::from_ints(-1, -2, -3));
        assert_eq!(bbox.max, Point3::from_ints(1, 2, 3));
        assert_eq!(bbox.volume(), Scalar::from_int(48));
        assert!(BoundingBox3::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_touching_boxes_are_disjoint() {
        assert!(cube_box(0, 1).interiors_disjoint(&cube_box(1, 2)));
        assert!(!cube_box(0, 2).interiors_disjoint(&cube_box(1, 3)));
    }

    #[test]
    fn test_bounding_volume_states() {
        let a = BoundingVolume::Bounded(cube_box(0, 1));
        let far = BoundingVolume::Bounded(cube_box(5, 6));
        assert!(a.disjoint(&far));
        assert!(a.disjoint(&BoundingVolume::Empty));
        assert!(!a.disjoint(&BoundingVolume::Unbounded));
        assert_eq!(
            a.union(&far),
            BoundingVolume::Bounded(cube_box(0, 6))
        );
        assert_eq!(a.union(&BoundingVolume::Unbounded), BoundingVolume::Unbounded);
    }

    #[test]
    fn test_expand_and_erode() {
        let k = cube_box(0, 2);
        let q = cube_box(0, 1);
        let grown = k.expanded_for(&q);
        assert_eq!(grown, cube_box(-2, 4));
        // x - q ⊆ grown  <=>  x ∈ [-2 + 1, 4 + 0]
        assert_eq!(grown.eroded_by(&q), cube_box(-1, 4));
        assert!(k.touches(&cube_box(2, 3)));
        assert!(!k.touches(&cube_box(3, 4)));
    }

    #[test]
    fn test_rect_area() {
        let rect = BoundingRect2::from_points(&[Point2::from_ints(0, 0), Point2::from_ints(3, 2)])
            .unwrap();
        assert_eq!(rect.area(), Scalar::from_int(6));
        assert!(rect.contains_point(&Point2::from_ints(3, 1)));
    }
}
