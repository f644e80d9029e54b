// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Nef values and their Boolean algebra
//!
//! A value is a finite set of interior-disjoint convex cells together with a
//! complement flag. When the flag is set the value denotes the closure of the
//! complement of the cells, so complements of bounded solids are ordinary
//! values. Every operation maps onto cell overlays through De Morgan's laws
//! and regularizes its result.

use super::cell::{
    interior_of_union, intersect_cells, regularize, subtract_cells, union_cells, ConvexCell,
};
use super::context::{total, OpContext};
use super::convex2::Cell2;
use super::convex3::Cell3;
use crate::error::KernelError;
use crate::geometry::{Affine2, Affine3, BoundingVolume};
use crate::number::{Scalar, Sign};
use serde::Serialize;
use std::sync::Arc;

pub type NefPolyhedron = Nef<Cell3>;
pub type NefPolygon = Nef<Cell2>;

/// Size of a value, for detecting runaway growth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Complexity {
    pub cells: usize,
    pub vertices: usize,
    pub facets: usize,
}

impl Complexity {
    /// Worst-case size of an overlay of two values.
    pub fn overlay_bound(&self, other: &Complexity) -> usize {
        self.cells.max(1).saturating_mul(other.cells.max(1))
    }
}

/// Regularized closed point set in 2D or 3D.
#[derive(Debug, Clone, PartialEq)]
pub struct Nef<C: ConvexCell> {
    cells: Arc<Vec<C>>,
    complemented: bool,
}

impl<C: ConvexCell> Default for Nef<C> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<C: ConvexCell> Nef<C> {
    pub fn empty() -> Self {
        Self::from_raw(Vec::new(), false)
    }

    pub fn universe() -> Self {
        Self::from_raw(Vec::new(), true)
    }

    /// Value made of the given interior-disjoint cells.
    pub fn from_cells(cells: Vec<C>) -> Self {
        Self::from_parts(cells, false)
    }

    /// The axis box itself.
    pub fn from_bounds(bounds: &C::Bounds) -> Self {
        Self::from_raw(vec![C::from_bounds(bounds)], false)
    }

    /// A single point. Points only survive as Minkowski operands; Boolean
    /// operations regularize them away.
    pub fn point(point: C::Point) -> Self {
        Self::from_raw(vec![C::point(point)], false)
    }

    pub(crate) fn from_parts(cells: Vec<C>, complemented: bool) -> Self {
        Self::from_raw(regularize(cells), complemented)
    }

    pub(crate) fn from_raw(cells: Vec<C>, complemented: bool) -> Self {
        Self {
            cells: Arc::new(cells),
            complemented,
        }
    }

    pub fn cells(&self) -> &[C] {
        &self.cells
    }

    pub fn is_complemented(&self) -> bool {
        self.complemented
    }

    pub fn is_bounded(&self) -> bool {
        !self.complemented
    }

    pub fn is_empty(&self) -> bool {
        !self.complemented && self.cells.is_empty()
    }

    pub fn is_universe(&self) -> bool {
        self.complemented && self.cells.is_empty()
    }

    /// Whether the value is a single point.
    pub fn as_point(&self) -> Option<&C::Point> {
        match self.cells.as_slice() {
            [cell] if !self.complemented && !cell.is_solid() => cell.vertices().first(),
            _ => None,
        }
    }

    pub fn complement(&self) -> Self {
        Self {
            cells: Arc::new(regularize(self.cells.to_vec())),
            complemented: !self.complemented,
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        total(self.union_checked(other, &OpContext::unlimited()))
    }

    pub fn intersection(&self, other: &Self) -> Self {
        total(self.intersection_checked(other, &OpContext::unlimited()))
    }

    pub fn difference(&self, other: &Self) -> Self {
        total(self.difference_checked(other, &OpContext::unlimited()))
    }

    pub fn symmetric_difference(&self, other: &Self) -> Self {
        total(self.symmetric_difference_checked(other, &OpContext::unlimited()))
    }

    pub fn union_checked(&self, other: &Self, ctx: &OpContext) -> Result<Self, KernelError> {
        let (a, b) = (self.cells(), other.cells());
        let (cells, complemented) = match (self.complemented, other.complemented) {
            (false, false) => (union_cells(a, b, ctx)?, false),
            (false, true) => (subtract_cells(b, a, ctx)?, true),
            (true, false) => (subtract_cells(a, b, ctx)?, true),
            (true, true) => (intersect_cells(a, b, ctx)?, true),
        };
        Ok(self.finish("union", other, cells, complemented))
    }

    pub fn intersection_checked(&self, other: &Self, ctx: &OpContext) -> Result<Self, KernelError> {
        let (a, b) = (self.cells(), other.cells());
        let (cells, complemented) = match (self.complemented, other.complemented) {
            (false, false) => (intersect_cells(a, b, ctx)?, false),
            (false, true) => (subtract_cells(a, b, ctx)?, false),
            (true, false) => (subtract_cells(b, a, ctx)?, false),
            (true, true) => (union_cells(a, b, ctx)?, true),
        };
        Ok(self.finish("intersection", other, cells, complemented))
    }

    pub fn difference_checked(&self, other: &Self, ctx: &OpContext) -> Result<Self, KernelError> {
        self.intersection_checked(&other.complement(), ctx)
    }

    pub fn symmetric_difference_checked(
        &self,
        other: &Self,
        ctx: &OpContext,
    ) -> Result<Self, KernelError> {
        let left = self.difference_checked(other, ctx)?;
        let right = other.difference_checked(self, ctx)?;
        left.union_checked(&right, ctx)
    }

    fn finish(&self, op: &str, other: &Self, cells: Vec<C>, complemented: bool) -> Self {
        let result = Self::from_parts(cells, complemented);
        tracing::trace!(
            op,
            left = self.cells.len(),
            right = other.cells.len(),
            result = result.cells.len(),
            "nef overlay"
        );
        result
    }

    /// Exact point-set equality.
    pub fn equivalent(&self, other: &Self) -> bool {
        self.symmetric_difference(other).is_empty()
    }

    /// Volume (3D) or area (2D); `None` when unbounded.
    pub fn measure(&self) -> Option<Scalar> {
        (!self.complemented).then(|| self.cells.iter().map(C::measure).sum())
    }

    pub fn bounding_volume(&self) -> BoundingVolume<C::Bounds> {
        if self.complemented {
            BoundingVolume::Unbounded
        } else {
            BoundingVolume::of_boxes(self.cells.iter().map(C::bounds))
        }
    }

    pub fn complexity(&self) -> Complexity {
        self.cells.iter().fold(Complexity::default(), |acc, cell| Complexity {
            cells: acc.cells + 1,
            vertices: acc.vertices + cell.vertices().len(),
            facets: acc.facets + cell.facet_count(),
        })
    }

    /// Exact membership test, boundary included.
    pub fn contains_point(&self, point: &C::Point) -> bool {
        if self.complemented {
            !interior_of_union(&self.cells, point)
        } else {
            self.cells.iter().any(|c| c.classify(point) != Sign::Positive)
        }
    }

    pub fn translate(&self, offset: &C::Vector) -> Self {
        Self::from_raw(
            self.cells.iter().map(|c| c.translate(offset)).collect(),
            self.complemented,
        )
    }

    /// Combine two bounded values whose bounding volumes are known to be
    /// disjoint, without running the overlay.
    pub fn append_disjoint(&self, other: &Self) -> Self {
        debug_assert!(self.is_bounded() && other.is_bounded());
        let mut cells = Vec::with_capacity(self.cells.len() + other.cells.len());
        cells.extend(self.cells.iter().cloned());
        cells.extend(other.cells.iter().cloned());
        Self::from_raw(cells, false)
    }

    pub fn dimension(&self) -> usize {
        C::DIMENSION
    }
}

impl Nef<Cell3> {
    pub fn volume(&self) -> Option<Scalar> {
        self.measure()
    }

    /// Image under an exact affine map. Singular maps flatten every solid,
    /// so they produce the empty value.
    pub fn transform(&self, map: &Affine3) -> Self {
        if let Some(offset) = map.as_translation() {
            return self.translate(&offset);
        }
        if map.orientation() == Sign::Zero {
            tracing::debug!("singular transform collapses solid");
            return Self::empty();
        }
        let cells = self.cells.iter().filter_map(|c| c.transform(map)).collect();
        Self::from_parts(cells, self.complemented)
    }
}

impl Nef<Cell2> {
    pub fn area(&self) -> Option<Scalar> {
        self.measure()
    }

    pub fn transform(&self, map: &Affine2) -> Self {
        if let Some(offset) = map.as_translation() {
            return self.translate(&offset);
        }
        if map.orientation() == Sign::Zero {
            tracing::debug!("singular transform collapses region");
            return Self::empty();
        }
        let cells = self.cells.iter().filter_map(|c| c.transform(map)).collect();
        Self::from_parts(cells, self.complemented)
    }
}
