// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Convex polygonal cells

use super::cell::{clip_bounds, ConvexCell};
use crate::geometry::{Affine2, AxisBox, BoundingRect2};
use crate::number::{orient2d, Line2, Point2, Scalar, Sign, Vector2};
use std::collections::BTreeSet;
use std::fmt;

/// Closed convex polygon, vertices counterclockwise. A single vertex is a
/// point cell.
#[derive(Clone, PartialEq, Eq)]
pub struct Cell2 {
    vertices: Vec<Point2>,
    /// `lines[i]` supports the edge from vertex `i` to vertex `i + 1`.
    lines: Vec<Line2>,
    bounds: BoundingRect2,
}

impl Cell2 {
    pub fn from_rect(rect: &BoundingRect2) -> Self {
        let (lo, hi) = (&rect.min, &rect.max);
        Self::from_vertices(vec![
            lo.clone(),
            Point2::new(hi.x.clone(), lo.y.clone()),
            hi.clone(),
            Point2::new(lo.x.clone(), hi.y.clone()),
        ])
    }

    /// Counterclockwise convex vertices, trusted.
    fn from_vertices(mut vertices: Vec<Point2>) -> Self {
        vertices.dedup();
        while vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        let n = vertices.len();
        let lines = if n < 3 {
            Vec::new()
        } else {
            (0..n)
                .filter_map(|i| Line2::through(&vertices[i], &vertices[(i + 1) % n]))
                .collect()
        };
        let bounds = BoundingRect2::from_points(&vertices)
            .unwrap_or_else(|| BoundingRect2::new(Point2::origin(), Point2::origin()));
        Self {
            vertices,
            lines,
            bounds,
        }
    }

    /// Counterclockwise triangle, `None` when degenerate or clockwise.
    pub fn triangle(a: &Point2, b: &Point2, c: &Point2) -> Option<Self> {
        (orient2d(a, b, c) == Sign::Positive)
            .then(|| Self::from_vertices(vec![a.clone(), b.clone(), c.clone()]))
    }

    /// Counterclockwise convex loop that may repeat points or carry
    /// collinear vertices. `None` when nothing with area is left.
    pub fn from_convex(mut vertices: Vec<Point2>) -> Option<Self> {
        vertices.dedup();
        while vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        let n = vertices.len();
        let corners: Vec<Point2> = (0..n)
            .filter(|&i| {
                orient2d(&vertices[(i + n - 1) % n], &vertices[i], &vertices[(i + 1) % n])
                    == Sign::Positive
            })
            .map(|i| vertices[i].clone())
            .collect();
        (corners.len() >= 3).then(|| Self::from_vertices(corners))
    }

    /// Build a cell from a loop, checking that it is strictly convex and
    /// counterclockwise.
    pub fn from_loop(vertices: Vec<Point2>) -> Result<Self, String> {
        let n = vertices.len();
        if n == 1 {
            return Ok(Self::from_vertices(vertices));
        }
        if n < 3 {
            return Err(format!("a polygon cell needs at least 3 vertices, got {n}"));
        }
        for i in 0..n {
            let turn = orient2d(&vertices[i], &vertices[(i + 1) % n], &vertices[(i + 2) % n]);
            if turn != Sign::Positive {
                return Err(format!("loop is not strictly convex at vertex {}", (i + 1) % n));
            }
        }
        let cell = Self::from_vertices(vertices);
        // a star-shaped loop turns left everywhere but winds more than once
        for line in &cell.lines {
            if cell.vertices.iter().any(|p| line.side(p) == Sign::Positive) {
                return Err("loop winds more than once".to_string());
            }
        }
        Ok(cell)
    }

    pub fn lines(&self) -> &[Line2] {
        &self.lines
    }

    pub fn area(&self) -> Scalar {
        let n = self.vertices.len();
        if n < 3 {
            return Scalar::zero();
        }
        let twice: Scalar = (0..n)
            .map(|i| {
                let (a, b) = (&self.vertices[i], &self.vertices[(i + 1) % n]);
                &a.x * &b.y - &a.y * &b.x
            })
            .sum();
        &twice / &Scalar::from_int(2)
    }

    /// Image under an affine map, or `None` when the map flattens the cell.
    pub fn transform(&self, map: &Affine2) -> Option<Self> {
        let mut vertices: Vec<Point2> = self.vertices.iter().map(|p| map.apply(p)).collect();
        if !self.is_solid() {
            return Some(Self::from_vertices(vertices));
        }
        match map.orientation() {
            Sign::Zero => None,
            Sign::Negative => {
                vertices.reverse();
                Some(Self::from_vertices(vertices))
            }
            Sign::Positive => Some(Self::from_vertices(vertices)),
        }
    }
}

impl ConvexCell for Cell2 {
    type Point = Point2;
    type Vector = Vector2;
    type Cut = Line2;
    type Bounds = BoundingRect2;

    const DIMENSION: usize = 2;

    fn from_bounds(bounds: &BoundingRect2) -> Self {
        Cell2::from_rect(bounds)
    }

    fn point(point: Point2) -> Self {
        Self::from_vertices(vec![point])
    }

    fn bounds(&self) -> &BoundingRect2 {
        &self.bounds
    }

    fn cuts(&self) -> Vec<&Line2> {
        self.lines.iter().collect()
    }

    fn vertices(&self) -> &[Point2] {
        &self.vertices
    }

    fn facet_count(&self) -> usize {
        self.lines.len()
    }

    fn split(&self, line: &Line2) -> (Option<Self>, Option<Self>) {
        let sides: Vec<Sign> = self.vertices.iter().map(|v| line.side(v)).collect();
        if !sides.contains(&Sign::Positive) {
            return (Some(self.clone()), None);
        }
        if !sides.contains(&Sign::Negative) {
            return (None, Some(self.clone()));
        }

        let n = self.vertices.len();
        let mut below = Vec::with_capacity(n + 1);
        let mut above = Vec::with_capacity(n + 1);
        for i in 0..n {
            let j = (i + 1) % n;
            let v = &self.vertices[i];
            if sides[i] != Sign::Positive {
                below.push(v.clone());
            }
            if sides[i] != Sign::Negative {
                above.push(v.clone());
            }
            if sides[i].opposes(sides[j]) {
                let crossing = line.intersect_segment(v, &self.vertices[j]);
                below.push(crossing.clone());
                above.push(crossing);
            }
        }
        (
            Some(Self::from_vertices(below)),
            Some(Self::from_vertices(above)),
        )
    }

    fn is_solid(&self) -> bool {
        !self.lines.is_empty()
    }

    fn measure(&self) -> Scalar {
        self.area()
    }

    fn side_of(line: &Line2, point: &Point2) -> Sign {
        line.side(point)
    }

    fn unoriented(line: &Line2) -> Line2 {
        let flipped = line.opposite();
        if flipped < *line {
            flipped
        } else {
            line.clone()
        }
    }

    fn around(point: &Point2) -> Self {
        let one = Vector2::new(Scalar::one(), Scalar::one());
        Cell2::from_rect(&BoundingRect2::new(point + &-&one, point + &one))
    }

    fn translate(&self, offset: &Vector2) -> Self {
        Self {
            vertices: self.vertices.iter().map(|p| p + offset).collect(),
            lines: self.lines.iter().map(|l| l.translated(offset)).collect(),
            bounds: self.bounds.offset(offset, offset),
        }
    }

    fn try_merge(&self, other: &Self) -> Option<Self> {
        if !self.is_solid() || !other.is_solid() {
            return None;
        }
        for (i, la) in self.lines.iter().enumerate() {
            for (j, lb) in other.lines.iter().enumerate() {
                if !la.is_opposite(lb) {
                    continue;
                }
                let rest_a = self.lines.iter().enumerate().filter(|(k, _)| *k != i);
                let rest_b = other.lines.iter().enumerate().filter(|(k, _)| *k != j);
                let a_inside_b = rest_b
                    .clone()
                    .all(|(_, l)| self.vertices.iter().all(|p| l.side(p) != Sign::Positive));
                let b_inside_a = rest_a
                    .clone()
                    .all(|(_, l)| other.vertices.iter().all(|p| l.side(p) != Sign::Positive));
                if !(a_inside_b && b_inside_a) {
                    return None;
                }
                let bounds = self.bounds.union(&other.bounds);
                let lines = rest_a.chain(rest_b).map(|(_, l)| l);
                return clip_bounds::<Cell2>(&bounds, lines);
            }
        }
        None
    }

    fn minkowski_pair(&self, other: &Self) -> Option<Self> {
        match (self.is_solid(), other.is_solid()) {
            (false, false) => {
                return Some(Cell2::point(&self.vertices[0] + &other.vertices[0].coords()))
            }
            (false, true) => return Some(other.translate(&self.vertices[0].coords())),
            (true, false) => return Some(self.translate(&other.vertices[0].coords())),
            (true, true) => {}
        }

        // in the plane the edge normals of both operands are all the sum has
        let normals: BTreeSet<Vector2> = self
            .lines
            .iter()
            .chain(&other.lines)
            .map(|l| direction_key(&l.normal))
            .collect();
        let support = |cell: &Cell2, n: &Vector2| -> Scalar {
            cell.vertices
                .iter()
                .map(|v| n.dot(&v.coords()))
                .max()
                .unwrap_or_else(Scalar::zero)
        };
        let lines: Vec<Line2> = normals
            .into_iter()
            .map(|n| {
                let offset = support(self, &n) + support(other, &n);
                Line2::new(n, offset)
            })
            .collect();
        let bounds = BoundingRect2::new(
            &self.bounds.min + &other.bounds.min.coords(),
            &self.bounds.max + &other.bounds.max.coords(),
        );
        clip_bounds::<Cell2>(&bounds, &lines)
    }
}

fn direction_key(v: &Vector2) -> Vector2 {
    let lead = if v.x.is_zero() { v.y.abs() } else { v.x.abs() };
    Vector2::new(&v.x / &lead, &v.y / &lead)
}

impl fmt::Debug for Cell2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cell2").field(&self.vertices).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(lo: i64, hi: i64) -> Cell2 {
        Cell2::from_rect(&BoundingRect2::new(
            Point2::from_ints(lo, lo),
            Point2::from_ints(hi, hi),
        ))
    }

    #[test]
    fn test_square_area() {
        assert_eq!(square(0, 3).area(), Scalar::from_int(9));
        assert_eq!(square(0, 3).facet_count(), 4);
    }

    #[test]
    fn test_split_through_vertices() {
        let cell = square(0, 2);
        let diagonal = Line2::through(&Point2::from_ints(2, 0), &Point2::from_ints(0, 2)).unwrap();
        let (below, above) = cell.split(&diagonal);
        let (below, above) = (below.unwrap(), above.unwrap());
        assert_eq!(below.area(), Scalar::from_int(2));
        assert_eq!(above.area(), Scalar::from_int(2));
        assert_eq!(below.vertices().len(), 3);
    }

    #[test]
    fn test_clockwise_triangle_rejected() {
        let a = Point2::from_ints(0, 0);
        let b = Point2::from_ints(1, 0);
        let c = Point2::from_ints(0, 1);
        assert!(Cell2::triangle(&a, &b, &c).is_some());
        assert!(Cell2::triangle(&a, &c, &b).is_none());
        assert!(Cell2::triangle(&a, &b, &Point2::from_ints(2, 0)).is_none());
    }

    #[test]
    fn test_merge_and_minkowski() {
        let a = square(0, 1);
        let b = a.translate(&Vector2::new(Scalar::zero(), Scalar::one()));
        let merged = a.try_merge(&b).unwrap();
        assert_eq!(merged.area(), Scalar::from_int(2));
        assert_eq!(merged.vertices().len(), 4);

        let tri = Cell2::triangle(
            &Point2::from_ints(0, 0),
            &Point2::from_ints(1, 0),
            &Point2::from_ints(0, 1),
        )
        .unwrap();
        let sum = a.minkowski_pair(&tri).unwrap();
        // unit square plus unit right triangle: 1 + 1/2 + two unit strips
        assert_eq!(sum.area(), Scalar::from_ratio(7, 2).unwrap());
    }

    #[test]
    fn test_from_loop_validation() {
        let ok = vec![Point2::from_ints(0, 0), Point2::from_ints(1, 0), Point2::from_ints(0, 1)];
        assert!(Cell2::from_loop(ok.clone()).is_ok());
        let mut cw = ok;
        cw.reverse();
        assert!(Cell2::from_loop(cw).is_err());
    }
}
