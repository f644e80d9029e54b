// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Exact detection of faces that cross or touch away from their shared
//! vertices and edges
//!
//! Faces are ear-clipped into triangles and the triangles are swept along x.
//! Two triangles of different faces may meet only in the vertices they share
//! by index; anything else is a self-intersection.

use super::{segments_touch, AxisBox, BoundingBox3, BoundaryMesh};
use crate::error::GeometryInputError;
use crate::nef::triangulate;
use crate::number::{orient2d, orient3d, Plane3, Point2, Point3, Sign};

struct Triangle {
    face: usize,
    corners: [usize; 3],
    bounds: BoundingBox3,
}

/// First pair of faces, in sweep order, that intersect improperly.
pub(super) fn find_face_intersection(
    mesh: &BoundaryMesh,
    planes: &[Plane3],
) -> Result<(), GeometryInputError> {
    let mut triangles = Vec::new();
    for (face_idx, (face, plane)) in mesh.faces.iter().zip(planes).enumerate() {
        let projection = plane.projection();
        let flat: Vec<Point2> = face.iter().map(|&i| projection.project(&mesh.points[i])).collect();
        let outer: Vec<usize> = (0..face.len()).collect();
        let Some(pieces) = triangulate(&flat, &outer, &[]) else {
            return Err(GeometryInputError::NonSimpleFace { face: face_idx });
        };
        for [a, b, c] in pieces {
            let corners = [face[a], face[b], face[c]];
            let points = corners.map(|i| &mesh.points[i]);
            if orient2d(&flat[a], &flat[b], &flat[c]) == Sign::Zero {
                // a sliver is covered by its neighbours' edges
                continue;
            }
            if let Some(bounds) = BoundingBox3::from_points(points) {
                triangles.push(Triangle {
                    face: face_idx,
                    corners,
                    bounds,
                });
            }
        }
    }

    triangles.sort_by(|a, b| a.bounds.min.x.cmp(&b.bounds.min.x));
    for (i, first) in triangles.iter().enumerate() {
        for second in &triangles[i + 1..] {
            if second.bounds.min.x > first.bounds.max.x {
                break;
            }
            if first.face == second.face || !first.bounds.touches(&second.bounds) {
                continue;
            }
            if triangles_clash(&mesh.points, first, second) {
                let (a, b) = (first.face.min(second.face), first.face.max(second.face));
                tracing::debug!(a, b, "faces intersect");
                return Err(GeometryInputError::SelfIntersectingMesh { a, b });
            }
        }
    }
    Ok(())
}

/// Whether two triangles share a point that is not one of their common
/// vertices.
fn triangles_clash(points: &[Point3], s: &Triangle, t: &Triangle) -> bool {
    let shared: Vec<usize> = s
        .corners
        .iter()
        .copied()
        .filter(|v| t.corners.contains(v))
        .collect();
    let corner = |tri: &Triangle, k: usize| &points[tri.corners[k]];
    let spans = |tri: &Triangle| [0, 1, 2].map(|k| &points[tri.corners[k]]);

    match shared.as_slice() {
        [a, b] => {
            // common edge: only a coplanar fold back onto the same side overlaps
            let far = |tri: &Triangle| {
                let k = (0..3).find(|&k| tri.corners[k] != *a && tri.corners[k] != *b).unwrap_or(0);
                corner(tri, k)
            };
            let (a, b) = (&points[*a], &points[*b]);
            let (p, q) = (far(s), far(t));
            if orient3d(a, b, p, q) != Sign::Zero {
                return false;
            }
            let Some(plane) = Plane3::from_points(a, b, p) else {
                return false;
            };
            let proj = plane.projection();
            let (a, b) = (proj.project(a), proj.project(b));
            orient2d(&a, &b, &proj.project(p)) == orient2d(&a, &b, &proj.project(q))
        }
        [v] => {
            // common vertex: the edges facing it must stay clear of the other
            let opposite = |tri: &Triangle| {
                let k = (0..3).find(|&k| tri.corners[k] == *v).unwrap_or(0);
                (corner(tri, (k + 1) % 3), corner(tri, (k + 2) % 3))
            };
            let (p, q) = opposite(s);
            let (m, n) = opposite(t);
            segment_meets_triangle(p, q, spans(t)) || segment_meets_triangle(m, n, spans(s))
        }
        [] => {
            let edges_meet = |from: &Triangle, into: &Triangle| {
                let [a, b, c] = spans(from);
                [(a, b), (b, c), (c, a)]
                    .into_iter()
                    .any(|(p, q)| segment_meets_triangle(p, q, spans(into)))
            };
            edges_meet(s, t) || edges_meet(t, s)
        }
        _ => true,
    }
}

/// Closed segment `pq` and closed triangle `abc` share a point.
fn segment_meets_triangle(p: &Point3, q: &Point3, [a, b, c]: [&Point3; 3]) -> bool {
    let Some(plane) = Plane3::from_points(a, b, c) else {
        return false;
    };
    let (sp, sq) = (plane.side(p), plane.side(q));
    if sp != Sign::Zero && sp == sq {
        return false;
    }
    let proj = plane.projection();
    let corners = [a, b, c].map(|x| proj.project(x));
    if sp == Sign::Zero && sq == Sign::Zero {
        let (p, q) = (proj.project(p), proj.project(q));
        return inside(&corners, &p)
            || inside(&corners, &q)
            || (0..3).any(|k| segments_touch(&p, &q, &corners[k], &corners[(k + 1) % 3]));
    }
    let hit = match (sp, sq) {
        (Sign::Zero, _) => p.clone(),
        (_, Sign::Zero) => q.clone(),
        _ => plane.intersect_segment(p, q),
    };
    inside(&corners, &proj.project(&hit))
}

fn inside([a, b, c]: &[Point2; 3], q: &Point2) -> bool {
    let s = [orient2d(a, b, q), orient2d(b, c, q), orient2d(c, a, q)];
    !(s.contains(&Sign::Positive) && s.contains(&Sign::Negative))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri(a: [i64; 3], b: [i64; 3], c: [i64; 3]) -> (Point3, Point3, Point3) {
        (
            Point3::from_ints(a[0], a[1], a[2]),
            Point3::from_ints(b[0], b[1], b[2]),
            Point3::from_ints(c[0], c[1], c[2]),
        )
    }

    #[test]
    fn test_segment_through_triangle() {
        let (a, b, c) = tri([0, 0, 0], [4, 0, 0], [0, 4, 0]);
        let through = (Point3::from_ints(1, 1, -1), Point3::from_ints(1, 1, 1));
        let beside = (Point3::from_ints(3, 3, -1), Point3::from_ints(3, 3, 1));
        let resting = (Point3::from_ints(4, 0, 0), Point3::from_ints(4, 0, 2));
        assert!(segment_meets_triangle(&through.0, &through.1, [&a, &b, &c]));
        assert!(!segment_meets_triangle(&beside.0, &beside.1, [&a, &b, &c]));
        assert!(segment_meets_triangle(&resting.0, &resting.1, [&a, &b, &c]));
    }

    #[test]
    fn test_coplanar_segment() {
        let (a, b, c) = tri([0, 0, 0], [4, 0, 0], [0, 4, 0]);
        let crossing = (Point3::from_ints(-1, 1, 0), Point3::from_ints(5, 1, 0));
        let outside = (Point3::from_ints(5, 5, 0), Point3::from_ints(6, 5, 0));
        assert!(segment_meets_triangle(&crossing.0, &crossing.1, [&a, &b, &c]));
        assert!(!segment_meets_triangle(&outside.0, &outside.1, [&a, &b, &c]));
    }

    #[test]
    fn test_folded_neighbour_clashes() {
        // two triangles over edge 0-1, the second folded flat onto the first
        let points = vec![
            Point3::from_ints(0, 0, 0),
            Point3::from_ints(4, 0, 0),
            Point3::from_ints(0, 4, 0),
            Point3::from_ints(1, 1, 0),
            Point3::from_ints(1, -1, 0),
        ];
        let triangle = |face, corners: [usize; 3]| Triangle {
            face,
            corners,
            bounds: BoundingBox3::from_points(corners.map(|i| &points[i])).unwrap(),
        };
        let base = triangle(0, [0, 1, 2]);
        assert!(triangles_clash(&points, &base, &triangle(1, [1, 0, 3])));
        assert!(!triangles_clash(&points, &base, &triangle(1, [1, 0, 4])));
    }
}
