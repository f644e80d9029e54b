// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Planar regions: polygon conversion and boundary loop tracing

use super::cell::ConvexCell;
use super::convex2::Cell2;
use super::triangulate::triangulate;
use super::value::NefPolygon;
use crate::error::{ConversionError, GeometryInputError};
use crate::geometry::{signed_area2, Polygon2};
use crate::number::{orient2d, Point2, Sign, Vector2};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

/// Build a planar Nef value from paths combined with the even-odd rule.
pub fn polygon_to_nef(polygon: &Polygon2) -> Result<NefPolygon, GeometryInputError> {
    polygon.validate()?;
    let mut result = NefPolygon::empty();
    for path in 0..polygon.paths.len() {
        let mut points = polygon.path_points(path);
        if signed_area2(&points).sign() == Sign::Negative {
            points.reverse();
        }
        let outer: Vec<usize> = (0..points.len()).collect();
        let triangles = triangulate(&points, &outer, &[])
            .ok_or(GeometryInputError::SelfIntersecting { path })?;
        let cells = triangles
            .into_iter()
            .filter_map(|[a, b, c]| Cell2::triangle(&points[a], &points[b], &points[c]))
            .collect();
        result = result.symmetric_difference(&NefPolygon::from_cells(cells));
    }
    tracing::debug!(
        paths = polygon.paths.len(),
        cells = result.cells().len(),
        "polygon converted to nef"
    );
    Ok(result)
}

/// Outline of a bounded planar value: counterclockwise outer paths and
/// clockwise holes.
pub fn nef_to_polygon(nef: &NefPolygon) -> Result<Polygon2, ConversionError> {
    if nef.is_complemented() {
        return Err(ConversionError::Unbounded);
    }
    if nef.cells().iter().any(|c| !c.is_solid()) {
        return Err(ConversionError::LowerDimensional);
    }

    let mut index: BTreeMap<Point2, usize> = BTreeMap::new();
    let mut polygon = Polygon2::default();
    for loop_ in boundary_loops(nef.cells()) {
        let loop_ = drop_collinear(loop_);
        if loop_.len() < 3 {
            continue;
        }
        let path = loop_
            .into_iter()
            .map(|p| {
                *index.entry(p.clone()).or_insert_with(|| {
                    polygon.points.push(p);
                    polygon.points.len() - 1
                })
            })
            .collect();
        polygon.paths.push(path);
    }
    Ok(polygon)
}

/// Remove vertices lying on the straight line between their neighbours.
fn drop_collinear(mut loop_: Vec<Point2>) -> Vec<Point2> {
    loop {
        let n = loop_.len();
        if n < 3 {
            return loop_;
        }
        let keep: Vec<bool> = (0..n)
            .map(|i| orient2d(&loop_[(i + n - 1) % n], &loop_[i], &loop_[(i + 1) % n]) != Sign::Zero)
            .collect();
        if keep.iter().all(|&k| k) {
            return loop_;
        }
        loop_ = loop_
            .into_iter()
            .zip(keep)
            .filter_map(|(p, k)| k.then_some(p))
            .collect();
    }
}

/// Split segment `a`–`b` at every point of `vertices` strictly inside it.
pub(crate) fn subdivide<P: Ord + Clone>(
    a: &P,
    b: &P,
    vertices: &BTreeSet<P>,
    on_segment: impl Fn(&P) -> bool,
) -> Vec<P> {
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    // along a segment the lexicographic order of points is monotone
    let mut inner: Vec<P> = vertices
        .range((Bound::Excluded(lo), Bound::Excluded(hi)))
        .filter(|p| on_segment(p))
        .cloned()
        .collect();
    if a > b {
        inner.reverse();
    }
    let mut out = Vec::with_capacity(inner.len() + 2);
    out.push(a.clone());
    out.extend(inner);
    out.push(b.clone());
    out
}

/// Position of `e` in the clockwise sweep starting just after `d`.
fn clockwise_before(d: &Vector2, e1: &Vector2, e2: &Vector2) -> bool {
    let half = |e: &Vector2| -> u8 {
        match d.cross(e).sign() {
            Sign::Negative => 0,
            Sign::Zero if d.dot(e).sign() == Sign::Negative => 0,
            _ => 1,
        }
    };
    let (h1, h2) = (half(e1), half(e2));
    if h1 != h2 {
        return h1 < h2;
    }
    e1.cross(e2).sign() == Sign::Negative
}

/// Trace the boundary of the union of interior-disjoint cells into closed
/// loops with the region on their left.
///
/// Edges shared by two cells cancel. Where the region pinches at a vertex,
/// each arrival leaves by the first edge clockwise from the way it came, so
/// every loop stays simple.
pub(crate) fn boundary_loops(cells: &[Cell2]) -> Vec<Vec<Point2>> {
    let vertices: BTreeSet<Point2> = cells
        .iter()
        .flat_map(|c| c.vertices().iter().cloned())
        .collect();

    let mut edges: BTreeMap<(Point2, Point2), usize> = BTreeMap::new();
    for cell in cells.iter().filter(|c| c.is_solid()) {
        let corners = cell.vertices();
        let n = corners.len();
        for i in 0..n {
            let (a, b) = (&corners[i], &corners[(i + 1) % n]);
            let run = subdivide(a, b, &vertices, |p| orient2d(a, b, p) == Sign::Zero);
            for w in run.windows(2) {
                let reverse = (w[1].clone(), w[0].clone());
                match edges.get_mut(&reverse) {
                    Some(count) => {
                        *count -= 1;
                        if *count == 0 {
                            edges.remove(&reverse);
                        }
                    }
                    None => *edges.entry((w[0].clone(), w[1].clone())).or_default() += 1,
                }
            }
        }
    }

    let mut outgoing: BTreeMap<Point2, Vec<Point2>> = BTreeMap::new();
    for ((a, b), count) in edges {
        let targets = outgoing.entry(a).or_default();
        for _ in 0..count {
            targets.push(b.clone());
        }
    }

    let mut loops = Vec::new();
    loop {
        let Some((start, first)) = outgoing
            .iter_mut()
            .find_map(|(from, to)| to.pop().map(|t| (from.clone(), t)))
        else {
            break;
        };
        let mut loop_ = vec![start.clone()];
        let mut prev = start.clone();
        let mut current = first;
        while current != start {
            let back = &prev - &current;
            let Some(targets) = outgoing.get_mut(&current) else {
                break;
            };
            let mut best: Option<usize> = None;
            for (i, t) in targets.iter().enumerate() {
                let e = t - &current;
                if best.map_or(true, |b| clockwise_before(&back, &e, &(&targets[b] - &current))) {
                    best = Some(i);
                }
            }
            let Some(best) = best else {
                break;
            };
            let next = targets.swap_remove(best);
            loop_.push(current.clone());
            prev = std::mem::replace(&mut current, next);
        }
        loops.push(loop_);
    }
    outgoing.retain(|_, t| !t.is_empty());
    debug_assert!(outgoing.is_empty(), "boundary edges left untraced");
    loops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingRect2;
    use crate::number::Scalar;

    fn rect(x0: i64, y0: i64, x1: i64, y1: i64) -> Cell2 {
        Cell2::from_rect(&BoundingRect2::new(
            Point2::from_ints(x0, y0),
            Point2::from_ints(x1, y1),
        ))
    }

    #[test]
    fn test_adjacent_cells_share_one_loop() {
        let loops = boundary_loops(&[rect(0, 0, 1, 1), rect(1, 0, 2, 1)]);
        assert_eq!(loops.len(), 1);
        assert_eq!(drop_collinear(loops[0].clone()).len(), 4);
        assert_eq!(signed_area2(&loops[0]), Scalar::from_int(4));
    }

    #[test]
    fn test_t_junction_cancels() {
        // one tall cell beside two stacked ones
        let loops = boundary_loops(&[rect(0, 0, 1, 2), rect(1, 0, 2, 1), rect(1, 1, 2, 2)]);
        assert_eq!(loops.len(), 1);
        assert_eq!(signed_area2(&loops[0]), Scalar::from_int(8));
    }

    #[test]
    fn test_frame_has_hole() {
        let cells = [
            rect(0, 0, 3, 1),
            rect(0, 2, 3, 3),
            rect(0, 1, 1, 2),
            rect(2, 1, 3, 2),
        ];
        let loops = boundary_loops(&cells);
        assert_eq!(loops.len(), 2);
        let mut areas: Vec<Scalar> = loops.iter().map(|l| signed_area2(l)).collect();
        areas.sort();
        assert_eq!(areas, vec![Scalar::from_int(-2), Scalar::from_int(18)]);
    }

    #[test]
    fn test_pinched_squares_give_two_loops() {
        let loops = boundary_loops(&[rect(0, 0, 1, 1), rect(1, 1, 2, 2)]);
        assert_eq!(loops.len(), 2);
        assert!(loops.iter().all(|l| l.len() == 4));
    }

    #[test]
    fn test_polygon_with_hole_round_trip() {
        let points = vec![
            Point2::from_ints(0, 0),
            Point2::from_ints(4, 0),
            Point2::from_ints(4, 4),
            Point2::from_ints(0, 4),
            Point2::from_ints(1, 1),
            Point2::from_ints(3, 1),
            Point2::from_ints(3, 3),
            Point2::from_ints(1, 3),
        ];
        let polygon = Polygon2::new(points, vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7]]);
        let nef = polygon_to_nef(&polygon).unwrap();
        assert_eq!(nef.area(), Some(Scalar::from_int(12)));

        let back = nef_to_polygon(&nef).unwrap();
        assert_eq!(back.paths.len(), 2);
        assert_eq!(back.points.len(), 8);
        // outer counterclockwise, hole clockwise
        assert_eq!(back.signed_area(), Scalar::from_int(12));
        assert!(polygon_to_nef(&back).unwrap().equivalent(&nef));
    }

    #[test]
    fn test_unbounded_polygon_rejected() {
        let nef = NefPolygon::from_bounds(&BoundingRect2::new(
            Point2::from_ints(0, 0),
            Point2::from_ints(1, 1),
        ));
        assert_eq!(nef_to_polygon(&nef.complement()), Err(ConversionError::Unbounded));
    }
}
