// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Convex cells and the overlay operations on interior-disjoint cell sets

use super::context::{total, OpContext};
use crate::error::KernelError;
use crate::geometry::AxisBox;
use crate::number::{Scalar, Sign};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Cell sets at least this large are processed on the rayon pool.
const PARALLEL_THRESHOLD: usize = 32;

/// Above this many cells, merging of adjacent cells is skipped.
const COALESCE_LIMIT: usize = 4096;

/// A closed, bounded, convex region given by its vertices and the
/// half-spaces (cuts) supporting its facets.
pub trait ConvexCell: Clone + Debug + PartialEq + Send + Sync + Sized {
    type Point: Clone + Ord + Debug + Send + Sync;
    type Vector: Clone + Debug + Send + Sync;
    /// Oriented hyperplane; the cell lies on its non-positive side.
    type Cut: Clone + Debug + Ord + Send + Sync;
    type Bounds: AxisBox;

    const DIMENSION: usize;

    /// The box itself as a cell. The box must have positive extent.
    fn from_bounds(bounds: &Self::Bounds) -> Self;

    /// Zero-dimensional cell.
    fn point(point: Self::Point) -> Self;

    fn bounds(&self) -> &Self::Bounds;

    fn cuts(&self) -> Vec<&Self::Cut>;

    fn vertices(&self) -> &[Self::Point];

    fn facet_count(&self) -> usize;

    /// Split into the parts on the non-positive and non-negative side of
    /// `cut`. A part is `None` when it has no interior; a cell that does not
    /// cross the cut is returned whole on one side.
    fn split(&self, cut: &Self::Cut) -> (Option<Self>, Option<Self>);

    /// Full-dimensional, as opposed to a point.
    fn is_solid(&self) -> bool;

    /// Volume or area.
    fn measure(&self) -> Scalar;

    fn side_of(cut: &Self::Cut, point: &Self::Point) -> Sign;

    /// Key shared by `cut` and its opposite.
    fn unoriented(cut: &Self::Cut) -> Self::Cut;

    /// Negative inside, zero on the boundary, positive outside.
    fn classify(&self, point: &Self::Point) -> Sign {
        if !self.is_solid() {
            return if self.vertices().first() == Some(point) {
                Sign::Zero
            } else {
                Sign::Positive
            };
        }
        let mut result = Sign::Negative;
        for cut in self.cuts() {
            match Self::side_of(cut, point) {
                Sign::Positive => return Sign::Positive,
                Sign::Zero => result = Sign::Zero,
                Sign::Negative => {}
            }
        }
        result
    }

    /// Unit box around `point`, used for local neighbourhood tests.
    fn around(point: &Self::Point) -> Self;

    fn translate(&self, offset: &Self::Vector) -> Self;

    /// The union of two interior-disjoint cells, if it is convex and the
    /// cells share a facet plane.
    fn try_merge(&self, other: &Self) -> Option<Self>;

    /// Convex hull of the pairwise vertex sums.
    fn minkowski_pair(&self, other: &Self) -> Option<Self>;
}

/// `cell ∩ by`, or `None` when the intersection has no interior.
pub fn clip<C: ConvexCell>(cell: &C, by: &C) -> Option<C> {
    if !by.is_solid() || cell.bounds().interiors_disjoint(by.bounds()) {
        return None;
    }
    let mut current = cell.clone();
    for cut in by.cuts() {
        current = current.split(cut).0?;
    }
    current.is_solid().then_some(current)
}

/// Clip `bounds` by every cut in turn.
pub fn clip_bounds<'a, C: ConvexCell + 'a>(
    bounds: &C::Bounds,
    cuts: impl IntoIterator<Item = &'a C::Cut>,
) -> Option<C> {
    let mut current = C::from_bounds(bounds);
    for cut in cuts {
        current = current.split(cut).0?;
    }
    Some(current)
}

/// Push the pieces of `cell - by` onto `out`.
///
/// When the two do not overlap, `cell` is pushed unchanged so untouched
/// cells are never fragmented.
pub fn subtract_into<C: ConvexCell>(cell: &C, by: &C, out: &mut Vec<C>) {
    if !by.is_solid() || cell.bounds().interiors_disjoint(by.bounds()) {
        out.push(cell.clone());
        return;
    }
    let mut pieces = Vec::new();
    let mut current = cell.clone();
    for cut in by.cuts() {
        let (below, above) = current.split(cut);
        if let Some(outside) = above {
            pieces.push(outside);
        }
        match below {
            Some(inside) => current = inside,
            None => {
                out.push(cell.clone());
                return;
            }
        }
    }
    out.extend(pieces);
}

/// Map every input cell to a list of output cells, polling `ctx` once per
/// cell and charging the running output size against its budget.
fn flat_map_cells<C, F>(cells: &[C], ctx: &OpContext, f: F) -> Result<Vec<C>, KernelError>
where
    C: ConvexCell,
    F: Fn(&C) -> Result<Vec<C>, KernelError> + Send + Sync,
{
    let produced = AtomicUsize::new(0);
    let run = |cell: &C| -> Result<Vec<C>, KernelError> {
        ctx.poll()?;
        let out = f(cell)?;
        let so_far = produced.fetch_add(out.len(), Ordering::Relaxed) + out.len();
        ctx.charge(so_far)?;
        Ok(out)
    };

    let parts: Vec<Vec<C>> = if cells.len() >= PARALLEL_THRESHOLD {
        cells.par_iter().map(&run).collect::<Result<_, _>>()?
    } else {
        cells.iter().map(&run).collect::<Result<_, _>>()?
    };
    Ok(parts.into_iter().flatten().collect())
}

/// Pairwise intersection of two interior-disjoint cell sets.
pub fn intersect_cells<C: ConvexCell>(
    a: &[C],
    b: &[C],
    ctx: &OpContext,
) -> Result<Vec<C>, KernelError> {
    flat_map_cells(a, ctx, |p| {
        Ok(b.iter().filter_map(|q| clip(p, q)).collect())
    })
}

/// Every cell of `a` with every cell of `b` carved out of it.
pub fn subtract_cells<C: ConvexCell>(
    a: &[C],
    b: &[C],
    ctx: &OpContext,
) -> Result<Vec<C>, KernelError> {
    flat_map_cells(a, ctx, |p| {
        let mut remaining = vec![p.clone()];
        for q in b {
            if p.bounds().interiors_disjoint(q.bounds()) {
                continue;
            }
            ctx.poll()?;
            let mut next = Vec::with_capacity(remaining.len());
            for r in &remaining {
                subtract_into(r, q, &mut next);
            }
            remaining = next;
            if remaining.is_empty() {
                break;
            }
        }
        Ok(remaining)
    })
}

/// `a` plus the parts of `b` outside it.
pub fn union_cells<C: ConvexCell>(
    a: &[C],
    b: &[C],
    ctx: &OpContext,
) -> Result<Vec<C>, KernelError> {
    let mut out = a.to_vec();
    out.extend(subtract_cells(b, a, ctx)?);
    ctx.charge(out.len())?;
    Ok(out)
}

/// Drop lower-dimensional cells and merge neighbours whose union is convex.
///
/// Two cells can only merge across a facet plane they share, so candidates
/// come from an index of cells by unoriented facet plane. A merged cell is
/// indexed and queued again; cells merged away leave empty slots behind.
pub fn regularize<C: ConvexCell>(cells: Vec<C>) -> Vec<C> {
    let cells: Vec<C> = cells.into_iter().filter(C::is_solid).collect();
    if cells.len() > COALESCE_LIMIT {
        tracing::debug!(cells = cells.len(), "skipping cell coalescing");
        return cells;
    }

    let mut by_facet: BTreeMap<C::Cut, Vec<usize>> = BTreeMap::new();
    let index = |by_facet: &mut BTreeMap<C::Cut, Vec<usize>>, slot: usize, cell: &C| {
        for cut in cell.cuts() {
            by_facet.entry(C::unoriented(cut)).or_default().push(slot);
        }
    };
    for (slot, cell) in cells.iter().enumerate() {
        index(&mut by_facet, slot, cell);
    }
    let mut slots: Vec<Option<C>> = cells.into_iter().map(Some).collect();
    let mut queue: Vec<usize> = (0..slots.len()).rev().collect();

    while let Some(i) = queue.pop() {
        let Some(cell) = &slots[i] else {
            continue;
        };
        let merge = cell.cuts().into_iter().find_map(|cut| {
            by_facet.get(&C::unoriented(cut))?.iter().find_map(|&j| {
                let other = slots[j].as_ref().filter(|_| j != i)?;
                if !cell.bounds().touches(other.bounds()) {
                    return None;
                }
                cell.try_merge(other).map(|merged| (j, merged))
            })
        });
        if let Some((j, merged)) = merge {
            let slot = slots.len();
            index(&mut by_facet, slot, &merged);
            slots[i] = None;
            slots[j] = None;
            slots.push(Some(merged));
            queue.push(slot);
        }
    }
    slots.into_iter().flatten().collect()
}

/// Whether `point` lies in the interior of the union of `cells`.
///
/// Only cells containing the point matter; their cuts through the point
/// span cones, and the point is interior exactly when those cones cover a
/// neighbourhood of it.
pub fn interior_of_union<C: ConvexCell>(cells: &[C], point: &C::Point) -> bool {
    let mut cones = Vec::new();
    for cell in cells.iter().filter(|c| c.is_solid()) {
        match cell.classify(point) {
            Sign::Negative => return true,
            Sign::Zero => {
                let cone = cell
                    .cuts()
                    .into_iter()
                    .filter(|cut| C::side_of(cut, point) == Sign::Zero)
                    .try_fold(C::around(point), |cone, cut| cone.split(cut).0);
                cones.extend(cone);
            }
            Sign::Positive => {}
        }
    }
    if cones.is_empty() {
        return false;
    }
    let neighbourhood = [C::around(point)];
    total(subtract_cells(&neighbourhood, &cones, &OpContext::unlimited())).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingRect2;
    use crate::nef::Cell2;
    use crate::number::Point2;

    fn unit_square(x: i64, y: i64) -> Cell2 {
        Cell2::from_bounds(&BoundingRect2::new(
            Point2::from_ints(x, y),
            Point2::from_ints(x + 1, y + 1),
        ))
    }

    #[test]
    fn test_long_strip_coalesces_to_one_cell() {
        // interleaved order so neighbours are never adjacent in the input
        let mut cells: Vec<Cell2> = (0..400).step_by(2).map(|x| unit_square(x, 0)).collect();
        cells.extend((1..400).step_by(2).map(|x| unit_square(x, 0)));

        let merged = regularize(cells);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].measure(), Scalar::from_int(400));
    }

    #[test]
    fn test_cells_meeting_at_a_corner_stay_apart() {
        let cells = vec![
            unit_square(0, 0),
            unit_square(1, 1),
            unit_square(5, 0),
            Cell2::point(Point2::origin()),
        ];
        let merged = regularize(cells);
        assert_eq!(merged.len(), 3);
        let area: Scalar = merged.iter().map(|c| c.measure()).sum();
        assert_eq!(area, Scalar::from_int(3));
    }
}
