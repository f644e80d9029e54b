// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Minkowski sums over convex decompositions
//!
//! The cells of a Nef value already are a convex decomposition, so the sum
//! is the union of the pairwise convex sums. Pairs are summed in parallel
//! and the union is formed as a parallel tree reduction.

use super::cell::{regularize, union_cells, ConvexCell};
use super::context::{total, OpContext};
use super::convex2::Cell2;
use super::convex3::Cell3;
use super::value::Nef;
use crate::error::KernelError;
use crate::geometry::{AxisBox, BoundingVolume};
use rayon::prelude::*;

pub fn minkowski3(a: &Nef<Cell3>, b: &Nef<Cell3>) -> Nef<Cell3> {
    total(minkowski_checked(a, b, &OpContext::unlimited()))
}

pub fn minkowski2(a: &Nef<Cell2>, b: &Nef<Cell2>) -> Nef<Cell2> {
    total(minkowski_checked(a, b, &OpContext::unlimited()))
}

pub fn minkowski3_checked(
    a: &Nef<Cell3>,
    b: &Nef<Cell3>,
    ctx: &OpContext,
) -> Result<Nef<Cell3>, KernelError> {
    minkowski_checked(a, b, ctx)
}

pub fn minkowski2_checked(
    a: &Nef<Cell2>,
    b: &Nef<Cell2>,
    ctx: &OpContext,
) -> Result<Nef<Cell2>, KernelError> {
    minkowski_checked(a, b, ctx)
}

/// `{x + y : x ∈ a, y ∈ b}` in either dimension.
pub fn minkowski_checked<C: ConvexCell>(
    a: &Nef<C>,
    b: &Nef<C>,
    ctx: &OpContext,
) -> Result<Nef<C>, KernelError> {
    if a.is_empty() || b.is_empty() {
        return Ok(Nef::empty());
    }
    if let Some(result) = translated(a, b).or_else(|| translated(b, a)) {
        return Ok(result);
    }
    match (a.is_complemented(), b.is_complemented()) {
        (false, false) => {
            let cells = pairwise_union(a.cells(), b.cells(), ctx)?;
            Ok(Nef::from_parts(cells, false))
        }
        (true, false) => complemented_sum(a, b, ctx),
        (false, true) => complemented_sum(b, a, ctx),
        (true, true) => Ok(Nef::universe()),
    }
}

/// `value ⊕ {p}` when `point` is a single point.
fn translated<C: ConvexCell>(value: &Nef<C>, point: &Nef<C>) -> Option<Nef<C>> {
    point.as_point()?;
    let offset = &point.cells()[0];
    let cells = value
        .cells()
        .iter()
        .filter_map(|c| c.minkowski_pair(offset))
        .collect();
    Some(Nef::from_raw(cells, value.is_complemented()))
}

fn pairwise_union<C: ConvexCell>(a: &[C], b: &[C], ctx: &OpContext) -> Result<Vec<C>, KernelError> {
    let pairs = a.len().saturating_mul(b.len());
    if pairs > ctx.minkowski_warn_pairs() {
        tracing::warn!(
            pairs,
            left = a.len(),
            right = b.len(),
            "minkowski sum over many cell pairs"
        );
    } else {
        tracing::debug!(pairs, "minkowski sum");
    }

    let hulls: Vec<Vec<C>> = a
        .par_iter()
        .map(|p| {
            ctx.poll()?;
            Ok(b.iter().filter_map(|q| p.minkowski_pair(q)).collect())
        })
        .collect::<Result<_, KernelError>>()?;
    let hulls: Vec<C> = hulls.into_iter().flatten().collect();
    ctx.charge(hulls.len())?;

    hulls
        .into_par_iter()
        .map(|hull| Ok::<_, KernelError>(vec![hull]))
        .try_reduce(Vec::new, |x, y| {
            let merged = union_cells(&x, &y, ctx)?;
            Ok(regularize(merged))
        })
}

/// `C(p) ⊕ q` for bounded `q`.
///
/// With `K` a box well around `p` and `K'` the points whose translates of
/// `q` stay inside `K`, the sum is everything outside `K'` plus
/// `(K - p) ⊕ q`.
fn complemented_sum<C: ConvexCell>(
    p: &Nef<C>,
    q: &Nef<C>,
    ctx: &OpContext,
) -> Result<Nef<C>, KernelError> {
    let (BoundingVolume::Bounded(p_box), BoundingVolume::Bounded(q_box)) = (
        Nef::from_raw(p.cells().to_vec(), false).bounding_volume(),
        q.bounding_volume(),
    ) else {
        // complement of nothing is everything, and so is any sum with it
        return Ok(Nef::universe());
    };

    let outer = p_box.expanded_for(&q_box);
    let inner = outer.eroded_by(&q_box);
    let hollow = Nef::from_bounds(&outer).intersection_checked(p, ctx)?;
    let swept = Nef::from_parts(pairwise_union(hollow.cells(), q.cells(), ctx)?, false);
    let kept = Nef::from_bounds(&inner).difference_checked(&swept, ctx)?;
    Ok(kept.complement())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BoundingBox3, BoundingRect2};
    use crate::number::{Point2, Point3, Scalar};

    fn cube(lo: i64, hi: i64) -> Nef<Cell3> {
        Nef::from_bounds(&BoundingBox3::new(
            Point3::from_ints(lo, lo, lo),
            Point3::from_ints(hi, hi, hi),
        ))
    }

    #[test]
    fn test_cube_sum() {
        let sum = minkowski3(&cube(0, 1), &cube(0, 2));
        assert!(sum.equivalent(&cube(0, 3)));
    }

    #[test]
    fn test_point_translates() {
        let p = Nef::point(Point3::from_ints(2, 0, 0));
        let moved = minkowski3(&cube(0, 1), &p);
        assert!(moved.equivalent(&Nef::from_bounds(&BoundingBox3::new(
            Point3::from_ints(2, 0, 0),
            Point3::from_ints(3, 1, 1),
        ))));
        assert!(minkowski3(&cube(0, 1), &Nef::point(Point3::origin())).equivalent(&cube(0, 1)));
    }

    #[test]
    fn test_empty_absorbs() {
        assert!(minkowski3(&cube(0, 1), &Nef::empty()).is_empty());
        assert!(minkowski3(&Nef::empty(), &cube(0, 1).complement()).is_empty());
    }

    #[test]
    fn test_non_convex_operand() {
        // an L of three unit squares swept by a unit square
        let l = Nef::from_bounds(&BoundingRect2::new(Point2::from_ints(0, 0), Point2::from_ints(2, 1)))
            .union(&Nef::from_bounds(&BoundingRect2::new(
                Point2::from_ints(0, 1),
                Point2::from_ints(1, 2),
            )));
        let square = Nef::from_bounds(&BoundingRect2::new(Point2::from_ints(0, 0), Point2::from_ints(1, 1)));
        let sum = minkowski2(&l, &square);
        assert_eq!(sum.area(), Some(Scalar::from_int(8)));
    }

    #[test]
    fn test_complement_erodes() {
        let sum = minkowski3(&cube(0, 4).complement(), &cube(0, 1));
        assert!(sum.equivalent(&cube(1, 4).complement()));
        assert!(minkowski3(&cube(0, 1).complement(), &cube(0, 1).complement()).is_universe());
    }

    #[test]
    fn test_cancelled_sum() {
        use super::super::context::CancelHandle;
        let handle = CancelHandle::new();
        handle.cancel();
        let ctx = OpContext::new(handle, None);
        let result = minkowski3_checked(&cube(0, 1), &cube(0, 1).union(&cube(2, 3)), &ctx);
        assert_eq!(result, Err(KernelError::Cancelled));
    }
}
