// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Convex polyhedral cells

use super::cell::{clip_bounds, ConvexCell};
use crate::geometry::{Affine3, AxisBox, BoundingBox3};
use crate::number::{Plane3, Point3, Scalar, Sign, Vector3};
use ahash::AHashMap;
use std::collections::BTreeSet;
use std::fmt;

/// Planar facet of a cell: a vertex loop, counterclockwise seen from
/// outside, and its outward supporting plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Face3 {
    pub plane: Plane3,
    pub vertices: Vec<usize>,
}

/// Closed convex polyhedron. A cell with a single vertex and no faces is a
/// point.
#[derive(Clone, PartialEq, Eq)]
pub struct Cell3 {
    vertices: Vec<Point3>,
    faces: Vec<Face3>,
    bounds: BoundingBox3,
}

impl Cell3 {
    pub fn from_box(bbox: &BoundingBox3) -> Self {
        let (lo, hi) = (&bbox.min, &bbox.max);
        let mut vertices = Vec::with_capacity(8);
        for z in [&lo.z, &hi.z] {
            for (x, y) in [(&lo.x, &lo.y), (&hi.x, &lo.y), (&hi.x, &hi.y), (&lo.x, &hi.y)] {
                vertices.push(Point3::new(x.clone(), y.clone(), z.clone()));
            }
        }

        let axis = |i: usize, s: i64| {
            let mut c = [Scalar::zero(), Scalar::zero(), Scalar::zero()];
            c[i] = Scalar::from_int(s);
            Vector3::new(c[0].clone(), c[1].clone(), c[2].clone())
        };
        let face = |normal: Vector3, offset: Scalar, loop_: [usize; 4]| Face3 {
            plane: Plane3::new(normal, offset),
            vertices: loop_.to_vec(),
        };
        let faces = vec![
            face(axis(2, -1), -&lo.z, [0, 3, 2, 1]),
            face(axis(2, 1), hi.z.clone(), [4, 5, 6, 7]),
            face(axis(1, -1), -&lo.y, [0, 1, 5, 4]),
            face(axis(1, 1), hi.y.clone(), [3, 7, 6, 2]),
            face(axis(0, -1), -&lo.x, [0, 4, 7, 3]),
            face(axis(0, 1), hi.x.clone(), [1, 2, 6, 5]),
        ];

        Self {
            vertices,
            faces,
            bounds: bbox.clone(),
        }
    }

    fn from_parts(vertices: Vec<Point3>, faces: Vec<Face3>) -> Self {
        let bounds = BoundingBox3::from_points(&vertices)
            .unwrap_or_else(|| BoundingBox3::new(Point3::origin(), Point3::origin()));
        Self {
            vertices,
            faces,
            bounds,
        }
    }

    /// Build a cell from vertex loops, checking that the loops are planar
    /// and that every vertex lies inside every face plane.
    pub fn from_loops(vertices: Vec<Point3>, loops: Vec<Vec<usize>>) -> Result<Self, String> {
        if loops.is_empty() {
            return match vertices.len() {
                1 => Ok(Self::from_parts(vertices, Vec::new())),
                n => Err(format!("a cell without faces must have one vertex, got {n}")),
            };
        }
        let mut faces = Vec::with_capacity(loops.len());
        for (i, face) in loops.into_iter().enumerate() {
            if let Some(&bad) = face.iter().find(|&&v| v >= vertices.len()) {
                return Err(format!("face {i} references missing vertex {bad}"));
            }
            let points: Vec<Point3> = face.iter().map(|&v| vertices[v].clone()).collect();
            let plane = Plane3::from_loop(&points).ok_or_else(|| format!("face {i} is degenerate"))?;
            if points.iter().any(|p| plane.side(p) != Sign::Zero) {
                return Err(format!("face {i} is not planar"));
            }
            if vertices.iter().any(|p| plane.side(p) == Sign::Positive) {
                return Err(format!("cell is not convex at face {i}"));
            }
            faces.push(Face3 {
                plane,
                vertices: face,
            });
        }
        Ok(Self::from_parts(vertices, faces))
    }

    /// Intersection of the half-spaces `planes` inside `bounds`.
    pub fn from_halfspaces<'a>(
        bounds: &BoundingBox3,
        planes: impl IntoIterator<Item = &'a Plane3>,
    ) -> Option<Self> {
        clip_bounds::<Cell3>(bounds, planes)
    }

    pub fn faces(&self) -> &[Face3] {
        &self.faces
    }

    pub fn face_points(&self, face: &Face3) -> Vec<Point3> {
        face.vertices.iter().map(|&i| self.vertices[i].clone()).collect()
    }

    /// Undirected edges as sorted vertex index pairs.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut edges = BTreeSet::new();
        for face in &self.faces {
            let n = face.vertices.len();
            for i in 0..n {
                let (a, b) = (face.vertices[i], face.vertices[(i + 1) % n]);
                edges.insert((a.min(b), a.max(b)));
            }
        }
        edges.into_iter().collect()
    }

    pub fn volume(&self) -> Scalar {
        let mut six_volume = Scalar::zero();
        for face in &self.faces {
            let p0 = self.vertices[face.vertices[0]].coords();
            for w in face.vertices[1..].windows(2) {
                let pi = self.vertices[w[0]].coords();
                let pj = self.vertices[w[1]].coords();
                six_volume += &p0.dot(&pi.cross(&pj));
            }
        }
        &six_volume / &Scalar::from_int(6)
    }

    /// Image under an affine map, or `None` when the map flattens the cell.
    pub fn transform(&self, map: &Affine3) -> Option<Self> {
        let vertices: Vec<Point3> = self.vertices.iter().map(|p| map.apply(p)).collect();
        if !self.is_solid() {
            return Some(Self::from_parts(vertices, Vec::new()));
        }
        let orientation = map.orientation();
        if orientation == Sign::Zero {
            return None;
        }
        let mut faces = Vec::with_capacity(self.faces.len());
        for face in &self.faces {
            let mut loop_ = face.vertices.clone();
            if orientation == Sign::Negative {
                loop_.reverse();
            }
            let points: Vec<Point3> = loop_.iter().map(|&i| vertices[i].clone()).collect();
            faces.push(Face3 {
                plane: Plane3::from_loop(&points)?,
                vertices: loop_,
            });
        }
        Some(Self::from_parts(vertices, faces))
    }

    fn cap_chain(next: &AHashMap<usize, usize>) -> Vec<usize> {
        let Some(&start) = next.keys().min() else {
            return Vec::new();
        };
        let mut chain = vec![start];
        let mut current = next[&start];
        while current != start && chain.len() <= next.len() {
            chain.push(current);
            match next.get(&current) {
                Some(&n) => current = n,
                None => break,
            }
        }
        debug_assert_eq!(chain.len(), next.len(), "cap edges must form one loop");
        chain
    }
}

/// One side of a split under construction.
#[derive(Default)]
struct Piece {
    vertices: Vec<Point3>,
    /// Index of the same point in the other piece, for points on the cut.
    partner: Vec<Option<usize>>,
    faces: Vec<Face3>,
}

impl Piece {
    fn push(&mut self, point: Point3) -> usize {
        self.vertices.push(point);
        self.partner.push(None);
        self.vertices.len() - 1
    }

    /// Drop vertices no face refers to.
    fn finish(self) -> Cell3 {
        let mut remap = vec![usize::MAX; self.vertices.len()];
        let mut vertices = Vec::with_capacity(self.vertices.len());
        let mut faces = self.faces;
        for face in &mut faces {
            for v in &mut face.vertices {
                if remap[*v] == usize::MAX {
                    remap[*v] = vertices.len();
                    vertices.push(self.vertices[*v].clone());
                }
                *v = remap[*v];
            }
        }
        Cell3::from_parts(vertices, faces)
    }
}

impl ConvexCell for Cell3 {
    type Point = Point3;
    type Vector = Vector3;
    type Cut = Plane3;
    type Bounds = BoundingBox3;

    const DIMENSION: usize = 3;

    fn from_bounds(bounds: &BoundingBox3) -> Self {
        Cell3::from_box(bounds)
    }

    fn point(point: Point3) -> Self {
        Self::from_parts(vec![point], Vec::new())
    }

    fn bounds(&self) -> &BoundingBox3 {
        &self.bounds
    }

    fn cuts(&self) -> Vec<&Plane3> {
        self.faces.iter().map(|f| &f.plane).collect()
    }

    fn vertices(&self) -> &[Point3] {
        &self.vertices
    }

    fn facet_count(&self) -> usize {
        self.faces.len()
    }

    fn split(&self, plane: &Plane3) -> (Option<Self>, Option<Self>) {
        let sides: Vec<Sign> = self.vertices.iter().map(|v| plane.side(v)).collect();
        if !sides.contains(&Sign::Positive) {
            return (Some(self.clone()), None);
        }
        if !sides.contains(&Sign::Negative) {
            return (None, Some(self.clone()));
        }

        let mut below = Piece::default();
        let mut above = Piece::default();
        let mut below_of = vec![usize::MAX; self.vertices.len()];
        let mut above_of = vec![usize::MAX; self.vertices.len()];
        for (i, (vertex, side)) in self.vertices.iter().zip(&sides).enumerate() {
            if *side != Sign::Positive {
                below_of[i] = below.push(vertex.clone());
            }
            if *side != Sign::Negative {
                above_of[i] = above.push(vertex.clone());
            }
            if *side == Sign::Zero {
                below.partner[below_of[i]] = Some(above_of[i]);
                above.partner[above_of[i]] = Some(below_of[i]);
            }
        }

        let mut crossings: AHashMap<(usize, usize), (usize, usize)> = AHashMap::new();
        // cap loop of the lower piece as successor links
        let mut cap_next: AHashMap<usize, usize> = AHashMap::new();

        for face in &self.faces {
            let n = face.vertices.len();
            let mut lower = Vec::with_capacity(n + 1);
            let mut upper = Vec::with_capacity(n + 1);
            for i in 0..n {
                let v = face.vertices[i];
                let w = face.vertices[(i + 1) % n];
                if sides[v] != Sign::Positive {
                    lower.push(below_of[v]);
                }
                if sides[v] != Sign::Negative {
                    upper.push(above_of[v]);
                }
                if sides[v].opposes(sides[w]) {
                    let key = (v.min(w), v.max(w));
                    let (bx, ax) = *crossings.entry(key).or_insert_with(|| {
                        let point = plane.intersect_segment(&self.vertices[v], &self.vertices[w]);
                        let bx = below.push(point.clone());
                        let ax = above.push(point);
                        below.partner[bx] = Some(ax);
                        above.partner[ax] = Some(bx);
                        (bx, ax)
                    });
                    lower.push(bx);
                    upper.push(ax);
                }
            }

            if lower.len() >= 3 {
                let m = lower.len();
                for i in 0..m {
                    let (a, b) = (lower[i], lower[(i + 1) % m]);
                    if below.partner[a].is_some() && below.partner[b].is_some() {
                        cap_next.insert(b, a);
                    }
                }
                below.faces.push(Face3 {
                    plane: face.plane.clone(),
                    vertices: lower,
                });
            }
            if upper.len() >= 3 {
                above.faces.push(Face3 {
                    plane: face.plane.clone(),
                    vertices: upper,
                });
            }
        }

        let cap = Cell3::cap_chain(&cap_next);
        if cap.len() >= 3 {
            let upper_cap: Vec<usize> = cap
                .iter()
                .rev()
                .filter_map(|&b| below.partner[b])
                .collect();
            below.faces.push(Face3 {
                plane: plane.clone(),
                vertices: cap,
            });
            above.faces.push(Face3 {
                plane: plane.opposite(),
                vertices: upper_cap,
            });
        }

        (Some(below.finish()), Some(above.finish()))
    }

    fn is_solid(&self) -> bool {
        !self.faces.is_empty()
    }

    fn measure(&self) -> Scalar {
        self.volume()
    }

    fn side_of(plane: &Plane3, point: &Point3) -> Sign {
        plane.side(point)
    }

    fn unoriented(plane: &Plane3) -> Plane3 {
        plane.canonical().0
    }

    fn around(point: &Point3) -> Self {
        let one = Vector3::new(Scalar::one(), Scalar::one(), Scalar::one());
        Cell3::from_box(&BoundingBox3::new(point + &-&one, point + &one))
    }

    fn translate(&self, offset: &Vector3) -> Self {
        Self {
            vertices: self.vertices.iter().map(|p| p + offset).collect(),
            faces: self
                .faces
                .iter()
                .map(|f| Face3 {
                    plane: f.plane.translated(offset),
                    vertices: f.vertices.clone(),
                })
                .collect(),
            bounds: self.bounds.offset(offset, offset),
        }
    }

    fn try_merge(&self, other: &Self) -> Option<Self> {
        if !self.is_solid() || !other.is_solid() {
            return None;
        }
        for (i, fa) in self.faces.iter().enumerate() {
            for (j, fb) in other.faces.iter().enumerate() {
                if !fa.plane.is_opposite(&fb.plane) {
                    continue;
                }
                let rest_a = self.faces.iter().enumerate().filter(|(k, _)| *k != i);
                let rest_b = other.faces.iter().enumerate().filter(|(k, _)| *k != j);
                let a_inside_b = rest_b
                    .clone()
                    .all(|(_, f)| self.vertices.iter().all(|p| f.plane.side(p) != Sign::Positive));
                let b_inside_a = rest_a
                    .clone()
                    .all(|(_, f)| other.vertices.iter().all(|p| f.plane.side(p) != Sign::Positive));
                if !(a_inside_b && b_inside_a) {
                    // only one pair of faces can be coplanar and opposite
                    return None;
                }
                let bounds = self.bounds.union(&other.bounds);
                let planes = rest_a.chain(rest_b).map(|(_, f)| &f.plane);
                return Cell3::from_halfspaces(&bounds, planes);
            }
        }
        None
    }

    fn minkowski_pair(&self, other: &Self) -> Option<Self> {
        match (self.is_solid(), other.is_solid()) {
            (false, false) => {
                return Some(Cell3::point(&self.vertices[0] + &other.vertices[0].coords()))
            }
            (false, true) => return Some(other.translate(&self.vertices[0].coords())),
            (true, false) => return Some(self.translate(&other.vertices[0].coords())),
            (true, true) => {}
        }

        let mut normals: BTreeSet<Vector3> = BTreeSet::new();
        for face in self.faces.iter().chain(&other.faces) {
            normals.insert(direction_key(&face.plane.normal));
        }
        let edge_dirs = |cell: &Cell3| -> Vec<Vector3> {
            cell.edges()
                .into_iter()
                .map(|(a, b)| &cell.vertices[b] - &cell.vertices[a])
                .collect()
        };
        let (da, db) = (edge_dirs(self), edge_dirs(other));
        for ea in &da {
            for eb in &db {
                let n = ea.cross(eb);
                if !n.is_zero() {
                    normals.insert(direction_key(&n));
                    normals.insert(direction_key(&-&n));
                }
            }
        }

        let support = |cell: &Cell3, n: &Vector3| -> Scalar {
            cell.vertices
                .iter()
                .map(|v| n.dot(&v.coords()))
                .max()
                .unwrap_or_else(Scalar::zero)
        };
        let planes: Vec<Plane3> = normals
            .into_iter()
            .map(|n| {
                let offset = support(self, &n) + support(other, &n);
                Plane3::new(n, offset)
            })
            .collect();
        let bounds = BoundingBox3::new(
            &self.bounds.min + &other.bounds.min.coords(),
            &self.bounds.max + &other.bounds.max.coords(),
        );
        Cell3::from_halfspaces(&bounds, &planes)
    }
}

/// Direction scaled so its first non-zero component is ±1, for deduplication.
fn direction_key(v: &Vector3) -> Vector3 {
    let lead = [&v.x, &v.y, &v.z]
        .into_iter()
        .find(|c| !c.is_zero())
        .map(Scalar::abs)
        .unwrap_or_else(Scalar::one);
    Vector3::new(&v.x / &lead, &v.y / &lead, &v.z / &lead)
}

impl fmt::Debug for Cell3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell3")
            .field("vertices", &self.vertices)
            .field(
                "faces",
                &self.faces.iter().map(|f| &f.vertices).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box(lo: i64, hi: i64) -> Cell3 {
        Cell3::from_box(&BoundingBox3::new(
            Point3::from_ints(lo, lo, lo),
            Point3::from_ints(hi, hi, hi),
        ))
    }

    fn plane(nx: i64, ny: i64, nz: i64, d: Scalar) -> Plane3 {
        Plane3::new(
            Vector3::new(Scalar::from_int(nx), Scalar::from_int(ny), Scalar::from_int(nz)),
            d,
        )
    }

    #[test]
    fn test_box_volume_and_planes() {
        let cell = unit_box(0, 2);
        assert_eq!(cell.volume(), Scalar::from_int(8));
        for face in cell.faces() {
            let points = cell.face_points(face);
            let from_loop = Plane3::from_loop(&points).unwrap();
            assert_eq!(from_loop.canonical(), face.plane.canonical());
        }
        assert_eq!(cell.edges().len(), 12);
    }

    #[test]
    fn test_split_by_axis_plane() {
        let cell = unit_box(0, 1);
        let half = Scalar::from_ratio(1, 2).unwrap();
        let (below, above) = cell.split(&plane(1, 0, 0, half.clone()));
        let (below, above) = (below.unwrap(), above.unwrap());
        assert_eq!(below.volume(), half);
        assert_eq!(above.volume(), half);
        assert_eq!(below.facet_count(), 6);
        assert_eq!(above.facet_count(), 6);
        assert_eq!(below.bounds().max.x, half);
    }

    #[test]
    fn test_split_diagonal_gives_prisms() {
        let cell = unit_box(0, 1);
        // x + y = 1 through two vertical edges
        let (below, above) = cell.split(&plane(1, 1, 0, Scalar::one()));
        let (below, above) = (below.unwrap(), above.unwrap());
        assert_eq!(below.volume(), Scalar::from_ratio(1, 2).unwrap());
        assert_eq!(above.volume(), Scalar::from_ratio(1, 2).unwrap());
        assert_eq!(below.facet_count(), 5);
        assert_eq!(below.vertices().len(), 6);
    }

    #[test]
    fn test_split_corner_tetrahedron() {
        let cell = unit_box(0, 1);
        let (below, above) = cell.split(&plane(1, 1, 1, Scalar::one()));
        let tet = below.unwrap();
        assert_eq!(tet.volume(), Scalar::from_ratio(1, 6).unwrap());
        assert_eq!(tet.vertices().len(), 4);
        assert_eq!(above.unwrap().volume(), Scalar::from_ratio(5, 6).unwrap());
    }

    #[test]
    fn test_split_missing_plane() {
        let cell = unit_box(0, 1);
        let (below, above) = cell.split(&plane(0, 0, 1, Scalar::from_int(1)));
        assert!(below.is_some());
        assert!(above.is_none());
        let (below, above) = cell.split(&plane(0, 0, 1, Scalar::from_int(0)));
        assert!(below.is_none());
        assert_eq!(above.unwrap(), cell);
    }

    #[test]
    fn test_merge_adjacent_boxes() {
        let a = unit_box(0, 1);
        let b = a.translate(&Vector3::new(Scalar::one(), Scalar::zero(), Scalar::zero()));
        let merged = a.try_merge(&b).unwrap();
        assert_eq!(merged.volume(), Scalar::from_int(2));
        assert_eq!(merged.facet_count(), 6);

        // shifted in y as well: union is not convex
        let c = a.translate(&Vector3::new(
            Scalar::one(),
            Scalar::from_ratio(1, 2).unwrap(),
            Scalar::zero(),
        ));
        assert!(a.try_merge(&c).is_none());
    }

    #[test]
    fn test_minkowski_of_boxes_and_points() {
        let a = unit_box(0, 1);
        let b = unit_box(0, 2);
        let sum = a.minkowski_pair(&b).unwrap();
        assert_eq!(sum.volume(), Scalar::from_int(27));

        let p = Cell3::point(Point3::from_ints(5, 0, 0));
        let moved = a.minkowski_pair(&p).unwrap();
        assert_eq!(moved.bounds().min, Point3::from_ints(5, 0, 0));
        assert_eq!(moved.volume(), Scalar::one());
    }

    #[test]
    fn test_minkowski_of_tetrahedra() {
        let tet = unit_box(0, 1)
            .split(&plane(1, 1, 1, Scalar::one()))
            .0
            .unwrap();
        let sum = tet.minkowski_pair(&tet).unwrap();
        // scaling a convex body by 2 multiplies its volume by 8
        assert_eq!(sum.volume(), Scalar::from_ratio(8, 6).unwrap());
    }

    #[test]
    fn test_mirror_keeps_outward_faces() {
        let cell = unit_box(0, 1);
        let map = Affine3::scaling([Scalar::from_int(-1), Scalar::one(), Scalar::one()]);
        let mirrored = cell.transform(&map).unwrap();
        assert_eq!(mirrored.volume(), Scalar::one());
        assert_eq!(mirrored.classify(&Point3::new(
            Scalar::from_ratio(-1, 2).unwrap(),
            Scalar::from_ratio(1, 2).unwrap(),
            Scalar::from_ratio(1, 2).unwrap(),
        )), Sign::Negative);
        let flat = Affine3::scaling([Scalar::one(), Scalar::one(), Scalar::zero()]);
        assert!(cell.transform(&flat).is_none());
    }

    #[test]
    fn test_from_loops_rejects_non_convex() {
        let cell = unit_box(0, 1);
        let loops: Vec<Vec<usize>> = cell.faces().iter().map(|f| f.vertices.clone()).collect();
        let rebuilt = Cell3::from_loops(cell.vertices().to_vec(), loops.clone()).unwrap();
        assert_eq!(rebuilt.volume(), Scalar::one());

        let mut dented = cell.vertices().to_vec();
        dented[6] = Point3::new(
            Scalar::from_ratio(1, 2).unwrap(),
            Scalar::from_ratio(1, 2).unwrap(),
            Scalar::from_ratio(1, 2).unwrap(),
        );
        assert!(Cell3::from_loops(dented, loops).is_err());
    }
}
