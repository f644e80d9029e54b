// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Boundary mesh and planar polygon representations with exact validation

use super::{BoundingBox3, BoundingRect2};
use crate::error::GeometryInputError;
use crate::number::{orient2d, Plane3, Point2, Point3, Scalar, Sign};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Boundary description of a solid: vertices plus oriented faces.
///
/// Faces are vertex-index cycles, counterclockwise when seen from outside.
/// `open` marks a surface that is known not to be closed, such as the
/// result of extracting the boundary of a lower-dimensional value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryMesh {
    pub points: Vec<Point3>,
    pub faces: Vec<Vec<usize>>,
    #[serde(default)]
    pub open: bool,
}

impl BoundaryMesh {
    pub fn new(points: Vec<Point3>, faces: Vec<Vec<usize>>) -> Self {
        Self {
            points,
            faces,
            open: false,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.points.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Add a vertex and return its index
    pub fn add_vertex(&mut self, point: Point3) -> usize {
        self.points.push(point);
        self.points.len() - 1
    }

    pub fn add_face(&mut self, face: Vec<usize>) {
        self.faces.push(face);
    }

    pub fn is_triangulated(&self) -> bool {
        self.faces.iter().all(|f| f.len() == 3)
    }

    pub fn bounding_box(&self) -> Option<BoundingBox3> {
        BoundingBox3::from_points(&self.points)
    }

    /// Exact signed volume; positive when faces point outward.
    ///
    /// Indices are assumed valid.
    pub fn signed_volume(&self) -> Scalar {
        let mut six_volume = Scalar::zero();
        for face in &self.faces {
            if face.len() < 3 {
                continue;
            }
            let p0 = self.points[face[0]].coords();
            for i in 1..face.len() - 1 {
                let pi = self.points[face[i]].coords();
                let pj = self.points[face[i + 1]].coords();
                six_volume += &p0.dot(&pi.cross(&pj));
            }
        }
        &six_volume / &Scalar::from_int(6)
    }

    /// Reverse every face loop.
    pub fn flip(&mut self) {
        for face in &mut self.faces {
            face.reverse();
        }
    }

    /// Check every face, the edge structure of a closed, consistently
    /// oriented 2-manifold, and that faces meet only along their shared
    /// vertices and edges. Returns the supporting plane of each face.
    pub fn validate(&self) -> Result<Vec<Plane3>, GeometryInputError> {
        let planes = self.validate_faces()?;
        self.validate_edges()?;
        super::self_intersection::find_face_intersection(self, &planes)?;
        Ok(planes)
    }

    /// Per-face checks: index range, degeneracy, planarity, simplicity.
    pub fn validate_faces(&self) -> Result<Vec<Plane3>, GeometryInputError> {
        let count = self.points.len();
        let mut planes = Vec::with_capacity(self.faces.len());

        for (face_idx, face) in self.faces.iter().enumerate() {
            for &index in face {
                if index >= count {
                    return Err(GeometryInputError::IndexOutOfRange {
                        face: face_idx,
                        index,
                        count,
                    });
                }
            }

            let degenerate = GeometryInputError::DegenerateFace { face: face_idx };
            if face.len() < 3 {
                return Err(degenerate);
            }
            let loop_points: Vec<Point3> = face.iter().map(|&i| self.points[i].clone()).collect();
            if has_repeated_vertex(&loop_points) {
                return Err(degenerate);
            }

            let plane = Plane3::from_loop(&loop_points).ok_or(degenerate)?;
            if loop_points.iter().any(|p| plane.side(p) != Sign::Zero) {
                return Err(GeometryInputError::NonPlanarFace { face: face_idx });
            }

            if face.len() > 3 {
                let projection = plane.projection();
                let flat: Vec<Point2> = loop_points.iter().map(|p| projection.project(p)).collect();
                if !path_is_simple(&flat) {
                    return Err(GeometryInputError::NonSimpleFace { face: face_idx });
                }
            }

            planes.push(plane);
        }

        Ok(planes)
    }

    /// Edge checks. Over-used edges are reported before orientation
    /// conflicts, and those before open boundary edges, so the most specific
    /// defect is named.
    pub fn validate_edges(&self) -> Result<(), GeometryInputError> {
        // undirected edge -> (face, forward?) uses
        let mut edges: BTreeMap<(usize, usize), Vec<(usize, bool)>> = BTreeMap::new();
        for (face_idx, face) in self.faces.iter().enumerate() {
            for i in 0..face.len() {
                let a = face[i];
                let b = face[(i + 1) % face.len()];
                let key = (a.min(b), a.max(b));
                edges.entry(key).or_default().push((face_idx, a < b));
            }
        }

        for (&(a, b), uses) in &edges {
            if uses.len() > 2 {
                return Err(GeometryInputError::NonManifoldEdge {
                    a,
                    b,
                    count: uses.len(),
                });
            }
        }

        for (&(a, b), uses) in &edges {
            if uses.len() == 2 && uses[0].1 == uses[1].1 {
                return Err(GeometryInputError::InconsistentOrientation {
                    face: uses[1].0,
                    a,
                    b,
                });
            }
        }

        for (&(a, b), uses) in &edges {
            if uses.len() < 2 {
                return Err(GeometryInputError::OpenMesh { a, b });
            }
        }

        Ok(())
    }
}

/// Planar region as a set of closed paths over a shared point list.
///
/// Paths are combined with the even-odd rule, so a path nested inside
/// another cuts a hole regardless of its winding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polygon2 {
    pub points: Vec<Point2>,
    pub paths: Vec<Vec<usize>>,
}

impl Polygon2 {
    pub fn new(points: Vec<Point2>, paths: Vec<Vec<usize>>) -> Self {
        Self { points, paths }
    }

    /// Single path through all points in order.
    pub fn from_outline(points: Vec<Point2>) -> Self {
        let path = (0..points.len()).collect();
        Self::new(points, vec![path])
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn bounding_rect(&self) -> Option<BoundingRect2> {
        BoundingRect2::from_points(&self.points)
    }

    pub fn path_points(&self, path: usize) -> Vec<Point2> {
        self.paths[path].iter().map(|&i| self.points[i].clone()).collect()
    }

    /// Signed area summed over paths with their winding sign.
    pub fn signed_area(&self) -> Scalar {
        let twice: Scalar = (0..self.paths.len())
            .map(|p| signed_area2(&self.path_points(p)))
            .sum();
        twice / Scalar::from_int(2)
    }

    /// Check index range, degeneracy and simplicity of every path.
    pub fn validate(&self) -> Result<(), GeometryInputError> {
        let count = self.points.len();
        for (path_idx, path) in self.paths.iter().enumerate() {
            if let Some(&index) = path.iter().find(|&&i| i >= count) {
                return Err(GeometryInputError::IndexOutOfRange {
                    face: path_idx,
                    index,
                    count,
                });
            }
            let points = self.path_points(path_idx);
            let degenerate = GeometryInputError::DegenerateFace { face: path_idx };
            if points.len() < 3 || all_collinear(&points) {
                return Err(degenerate);
            }
            // a crossing path can enclose zero net area, so name it first
            if has_repeated_vertex(&points) || !path_is_simple(&points) {
                return Err(GeometryInputError::SelfIntersecting { path: path_idx });
            }
            if signed_area2(&points).is_zero() {
                return Err(degenerate);
            }
        }
        Ok(())
    }
}

/// Twice the signed area of a closed path (shoelace formula).
pub fn signed_area2(points: &[Point2]) -> Scalar {
    let mut sum = Scalar::zero();
    for i in 0..points.len() {
        let a = &points[i];
        let b = &points[(i + 1) % points.len()];
        sum += &(a.coords().cross(&b.coords()));
    }
    sum
}

fn all_collinear(points: &[Point2]) -> bool {
    let first = &points[0];
    let Some(second) = points.iter().find(|p| *p != first) else {
        return true;
    };
    points.iter().all(|p| orient2d(first, second, p) == Sign::Zero)
}

fn has_repeated_vertex<P: Ord>(points: &[P]) -> bool {
    let mut sorted: Vec<&P> = points.iter().collect();
    sorted.sort();
    sorted.windows(2).any(|w| w[0] == w[1])
}

/// True when the closed path does not touch itself anywhere except at
/// shared endpoints of consecutive edges.
pub fn path_is_simple(points: &[Point2]) -> bool {
    let n = points.len();
    for i in 0..n {
        let a = &points[i];
        let b = &points[(i + 1) % n];
        for j in (i + 1)..n {
            let c = &points[j];
            let d = &points[(j + 1) % n];
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            if adjacent {
                // consecutive edges may only share their common vertex
                let (shared, far_a, far_c) = if j == i + 1 {
                    (b, a, d)
                } else {
                    (a, b, c)
                };
                if orient2d(far_a, shared, far_c) == Sign::Zero
                    && (far_a - shared).dot(&(far_c - shared)).sign() == Sign::Positive
                {
                    return false;
                }
            } else if segments_touch(a, b, c, d) {
                return false;
            }
        }
    }
    true
}

/// Closed segments `ab` and `cd` share at least one point.
pub fn segments_touch(a: &Point2, b: &Point2, c: &Point2, d: &Point2) -> bool {
    let o1 = orient2d(a, b, c);
    let o2 = orient2d(a, b, d);
    let o3 = orient2d(c, d, a);
    let o4 = orient2d(c, d, b);

    if o1.opposes(o2) && o3.opposes(o4) {
        return true;
    }
    (o1 == Sign::Zero && on_segment(a, b, c))
        || (o2 == Sign::Zero && on_segment(a, b, d))
        || (o3 == Sign::Zero && on_segment(c, d, a))
        || (o4 == Sign::Zero && on_segment(c, d, b))
}

/// `p` is collinear with `ab`; test whether it lies within the segment.
fn on_segment(a: &Point2, b: &Point2, p: &Point2) -> bool {
    a.x.min_of(&b.x) <= &p.x
        && &p.x <= a.x.max_of(&b.x)
        && a.y.min_of(&b.y) <= &p.y
        && &p.y <= a.y.max_of(&b.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn unit_cube_mesh() -> BoundaryMesh {
        let points = vec![
            Point3::from_ints(0, 0, 0),
            Point3::from_ints(1, 0, 0),
            Point3::from_ints(1, 1, 0),
            Point3::from_ints(0, 1, 0),
            Point3::from_ints(0, 0, 1),
            Point3::from_ints(1, 0, 1),
            Point3::from_ints(1, 1, 1),
            Point3::from_ints(0, 1, 1),
        ];
        let faces = vec![
            vec![0, 3, 2, 1],
            vec![4, 5, 6, 7],
            vec![0, 1, 5, 4],
            vec![3, 7, 6, 2],
            vec![0, 4, 7, 3],
            vec![1, 2, 6, 5],
        ];
        BoundaryMesh::new(points, faces)
    }

    #[test]
    fn test_cube_validates_with_unit_volume() {
        let mesh = unit_cube_mesh();
        let planes = mesh.validate().unwrap();
        assert_eq!(planes.len(), 6);
        assert_eq!(mesh.signed_volume(), Scalar::one());
    }

    #[test]
    fn test_flipped_cube_has_negative_volume() {
        let mut mesh = unit_cube_mesh();
        mesh.flip();
        assert_eq!(mesh.signed_volume(), Scalar::from_int(-1));
    }

    #[test]
    fn test_missing_face_is_open() {
        let mut mesh = unit_cube_mesh();
        mesh.faces.pop();
        assert!(matches!(
            mesh.validate(),
            Err(GeometryInputError::OpenMesh { .. })
        ));
    }

    #[test]
    fn test_reversed_face_is_inconsistent() {
        let mut mesh = unit_cube_mesh();
        mesh.faces[1].reverse();
        assert!(matches!(
            mesh.validate(),
            Err(GeometryInputError::InconsistentOrientation { .. })
        ));
    }

    #[test]
    fn test_non_planar_face() {
        let mut mesh = unit_cube_mesh();
        mesh.points[6] = Point3::new(
            Scalar::one(),
            Scalar::one(),
            Scalar::from_ratio(3, 2).unwrap(),
        );
        assert!(matches!(
            mesh.validate(),
            Err(GeometryInputError::NonPlanarFace { .. })
        ));
    }

    #[test]
    fn test_index_out_of_range() {
        let mut mesh = unit_cube_mesh();
        mesh.faces[0][2] = 99;
        assert_eq!(
            mesh.validate(),
            Err(GeometryInputError::IndexOutOfRange {
                face: 0,
                index: 99,
                count: 8
            })
        );
    }

    #[test]
    fn test_bowtie_is_not_simple() {
        let bowtie = [
            Point2::from_ints(0, 0),
            Point2::from_ints(2, 2),
            Point2::from_ints(2, 0),
            Point2::from_ints(0, 2),
        ];
        assert!(!path_is_simple(&bowtie));

        let square = [
            Point2::from_ints(0, 0),
            Point2::from_ints(2, 0),
            Point2::from_ints(2, 2),
            Point2::from_ints(0, 2),
        ];
        assert!(path_is_simple(&square));
        assert_eq!(signed_area2(&square), Scalar::from_int(8));
    }

    #[test]
    fn test_polygon_validation() {
        let poly = Polygon2::new(
            vec![
                Point2::from_ints(0, 0),
                Point2::from_ints(2, 2),
                Point2::from_ints(2, 0),
                Point2::from_ints(0, 2),
            ],
            vec![vec![0, 1, 2, 3]],
        );
        assert_eq!(
            poly.validate(),
            Err(GeometryInputError::SelfIntersecting { path: 0 })
        );

        let line = Polygon2::from_outline(vec![
            Point2::from_ints(0, 0),
            Point2::from_ints(1, 1),
            Point2::from_ints(2, 2),
        ]);
        assert_eq!(
            line.validate(),
            Err(GeometryInputError::DegenerateFace { face: 0 })
        );
    }
}
