// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Nef to boundary mesh conversion
//!
//! Cell faces are grouped by supporting plane. Within a plane, faces of cells
//! on opposite sides cancel where they overlap, and what remains on each side
//! is traced into loops. Loops from all planes are then made to agree on
//! their vertices (T-junctions), stripped of redundant collinear vertices,
//! and ear-clipped into outward triangles.

use super::cell::{subtract_cells, ConvexCell};
use super::context::{total, OpContext};
use super::convex2::Cell2;
use super::convex3::Cell3;
use super::planar::{boundary_loops, subdivide};
use super::triangulate::triangulate;
use super::value::NefPolyhedron;
use crate::error::ConversionError;
use crate::geometry::{signed_area2, BoundaryMesh};
use crate::number::{Plane3, PlaneProjection, Point2, Point3, Sign};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Boundary of a Nef value as an outward triangle mesh.
///
/// With `want_2manifold` the result must be a closed 2-manifold, otherwise an
/// error explains why it cannot be. Without it, unbounded values yield their
/// inward-facing boundary and non-manifold results are marked `open`.
pub fn nef_to_mesh(nef: &NefPolyhedron, want_2manifold: bool) -> Result<BoundaryMesh, ConversionError> {
    if nef.is_complemented() && want_2manifold {
        return Err(ConversionError::Unbounded);
    }
    if nef.cells().iter().any(|c| !c.is_solid()) {
        if want_2manifold {
            return Err(ConversionError::LowerDimensional);
        }
        tracing::debug!("dropping point cells from boundary");
    }

    let mut mesh = boundary_of(nef.cells())?;
    if nef.is_complemented() {
        mesh.flip();
    }

    if let Some((a, b, count)) = manifold_defect(&mesh) {
        let edge = format!("{} - {}", mesh.points[a], mesh.points[b]);
        if want_2manifold {
            return Err(ConversionError::NotManifold { edge, count });
        }
        tracing::warn!(%edge, count, "boundary is not a 2-manifold");
        mesh.open = true;
    }

    tracing::debug!(
        cells = nef.cells().len(),
        vertices = mesh.vertex_count(),
        triangles = mesh.face_count(),
        "nef boundary extracted"
    );
    Ok(mesh)
}

/// Faces of all cells lying in one plane, split by which side the cell is on.
struct PlaneGroup {
    plane: Plane3,
    projection: PlaneProjection,
    /// Faces whose outward normal agrees with `plane`.
    front: Vec<Cell2>,
    back: Vec<Cell2>,
}

/// A traced loop, counterclockwise about its plane's canonical normal.
struct BoundaryLoop {
    group: usize,
    /// Region on the back side of the canonical normal.
    reversed: bool,
    points: Vec<Point3>,
}

fn boundary_of(cells: &[Cell3]) -> Result<BoundaryMesh, ConversionError> {
    let mut groups: BTreeMap<Plane3, PlaneGroup> = BTreeMap::new();
    for cell in cells.iter().filter(|c| c.is_solid()) {
        for face in cell.faces() {
            let (plane, same) = face.plane.canonical();
            let group = groups.entry(plane.clone()).or_insert_with(|| PlaneGroup {
                projection: plane.projection(),
                plane,
                front: Vec::new(),
                back: Vec::new(),
            });
            let mut flat: Vec<Point2> = cell
                .face_points(face)
                .iter()
                .map(|p| group.projection.project(p))
                .collect();
            if !same {
                flat.reverse();
            }
            if let Some(face_cell) = Cell2::from_convex(flat) {
                if same {
                    group.front.push(face_cell);
                } else {
                    group.back.push(face_cell);
                }
            }
        }
    }
    let groups: Vec<PlaneGroup> = groups.into_values().collect();

    let ctx = OpContext::unlimited();
    let traced: Vec<Vec<BoundaryLoop>> = groups
        .par_iter()
        .enumerate()
        .map(|(index, group)| {
            let mut loops = Vec::new();
            for (reversed, keep, cancel) in [(false, &group.front, &group.back), (true, &group.back, &group.front)] {
                let region = total(subtract_cells(keep, cancel, &ctx));
                for flat in boundary_loops(&region) {
                    loops.push(BoundaryLoop {
                        group: index,
                        reversed,
                        points: flat.iter().map(|p| group.projection.lift(p, &group.plane)).collect(),
                    });
                }
            }
            loops
        })
        .collect();
    let mut loops: Vec<BoundaryLoop> = traced.into_iter().flatten().collect();

    insert_t_junctions(&mut loops);
    remove_redundant_vertices(&mut loops);

    let mut mesh = BoundaryMesh::empty();
    let mut index: BTreeMap<Point3, usize> = BTreeMap::new();
    let mut vertex = |p: &Point3, mesh: &mut BoundaryMesh| -> usize {
        *index.entry(p.clone()).or_insert_with(|| mesh.add_vertex(p.clone()))
    };

    let mut by_region: BTreeMap<(usize, bool), Vec<Vec<Point3>>> = BTreeMap::new();
    for l in loops {
        if l.points.len() >= 3 {
            by_region.entry((l.group, l.reversed)).or_default().push(l.points);
        }
    }
    for ((group, reversed), region) in by_region {
        let group = &groups[group];
        for [a, b, c] in triangulate_region(group, &region)? {
            let (b, c) = if reversed { (c, b) } else { (b, c) };
            let face = vec![vertex(a, &mut mesh), vertex(b, &mut mesh), vertex(c, &mut mesh)];
            mesh.add_face(face);
        }
    }
    Ok(mesh)
}

fn collinear(a: &Point3, b: &Point3, p: &Point3) -> bool {
    (b - a).cross(&(p - a)).is_zero()
}

/// Split every loop edge at every loop vertex lying strictly inside it, so
/// neighbouring planes agree on shared edges.
fn insert_t_junctions(loops: &mut [BoundaryLoop]) {
    let vertices: BTreeSet<Point3> = loops.iter().flat_map(|l| l.points.iter().cloned()).collect();
    for l in loops.iter_mut() {
        let n = l.points.len();
        let mut refined = Vec::with_capacity(n);
        for i in 0..n {
            let (a, b) = (&l.points[i], &l.points[(i + 1) % n]);
            let mut run = subdivide(a, b, &vertices, |p| collinear(a, b, p));
            run.pop();
            refined.extend(run);
        }
        l.points = refined;
    }
}

/// Drop vertices whose only two neighbours lie on a straight line through
/// them; they carry no shape and only fragment the triangulation.
fn remove_redundant_vertices(loops: &mut [BoundaryLoop]) {
    let mut neighbours: BTreeMap<&Point3, BTreeSet<&Point3>> = BTreeMap::new();
    for l in loops.iter() {
        let n = l.points.len();
        for i in 0..n {
            let (a, b) = (&l.points[i], &l.points[(i + 1) % n]);
            neighbours.entry(a).or_default().insert(b);
            neighbours.entry(b).or_default().insert(a);
        }
    }
    let redundant: BTreeSet<Point3> = neighbours
        .iter()
        .filter_map(|(v, adjacent)| {
            let [a, b] = adjacent.iter().collect::<Vec<_>>()[..] else {
                return None;
            };
            let straight = collinear(a, v, b) && (*a - *v).dot(&(*b - *v)).sign() == Sign::Negative;
            straight.then(|| (*v).clone())
        })
        .collect();
    if redundant.is_empty() {
        return;
    }
    for l in loops.iter_mut() {
        l.points.retain(|p| !redundant.contains(p));
    }
}

/// Even-odd containment of `p` in a closed loop.
fn loop_contains(loop_: &[Point2], p: &Point2) -> bool {
    let n = loop_.len();
    let mut inside = false;
    for i in 0..n {
        let (a, b) = (&loop_[i], &loop_[(i + 1) % n]);
        if (a.y > p.y) != (b.y > p.y) {
            let t = &(&p.y - &a.y) / &(&b.y - &a.y);
            let x = &a.x + &(&t * &(&b.x - &a.x));
            if p.x < x {
                inside = !inside;
            }
        }
    }
    inside
}

/// Triangulate the loops of one side of one plane, returning 3D triangles
/// counterclockwise about the canonical normal.
fn triangulate_region<'a>(
    group: &PlaneGroup,
    region: &'a [Vec<Point3>],
) -> Result<Vec<[&'a Point3; 3]>, ConversionError> {
    let flat: Vec<Vec<Point2>> = region
        .iter()
        .map(|l| l.iter().map(|p| group.projection.project(p)).collect())
        .collect();
    let areas: Vec<_> = flat.iter().map(|l| signed_area2(l)).collect();

    let outers: Vec<usize> = (0..flat.len()).filter(|&i| areas[i].sign() == Sign::Positive).collect();
    let mut holes_of: Vec<Vec<usize>> = vec![Vec::new(); flat.len()];
    for hole in (0..flat.len()).filter(|&i| areas[i].sign() == Sign::Negative) {
        let sample = flat[hole][0].midpoint(&flat[hole][1]);
        let owner = outers
            .iter()
            .copied()
            .filter(|&o| loop_contains(&flat[o], &sample))
            .min_by(|&x, &y| areas[x].cmp(&areas[y]));
        match owner {
            Some(o) => holes_of[o].push(hole),
            None => tracing::warn!(plane = ?group.plane, "boundary hole without enclosing loop"),
        }
    }

    let mut triangles = Vec::new();
    for &outer in &outers {
        let mut points: Vec<Point2> = Vec::new();
        let mut lifted: Vec<&Point3> = Vec::new();
        let mut take = |l: usize| -> Vec<usize> {
            let start = points.len();
            points.extend(flat[l].iter().cloned());
            lifted.extend(region[l].iter());
            (start..points.len()).collect()
        };
        let outer_ring = take(outer);
        let holes: Vec<Vec<usize>> = holes_of[outer].iter().map(|&h| take(h)).collect();
        let tris = triangulate(&points, &outer_ring, &holes).ok_or_else(|| {
            ConversionError::Triangulation {
                plane: format!("{:?}", group.plane),
            }
        })?;
        triangles.extend(tris.into_iter().map(|[a, b, c]| [lifted[a], lifted[b], lifted[c]]));
    }
    Ok(triangles)
}

/// First edge not shared by exactly two oppositely oriented triangles.
fn manifold_defect(mesh: &BoundaryMesh) -> Option<(usize, usize, usize)> {
    let mut uses: BTreeMap<(usize, usize), (usize, usize)> = BTreeMap::new();
    for face in &mesh.faces {
        let n = face.len();
        for i in 0..n {
            let (a, b) = (face[i], face[(i + 1) % n]);
            let entry = uses.entry((a.min(b), a.max(b))).or_default();
            if a < b {
                entry.0 += 1;
            } else {
                entry.1 += 1;
            }
        }
    }
    uses.into_iter()
        .find(|(_, (fwd, back))| *fwd != 1 || *back != 1)
        .map(|((a, b), (fwd, back))| (a, b, fwd + back))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox3;
    use crate::nef::mesh_to_nef;
    use crate::number::Scalar;

    fn cube_at(x: Scalar, y: Scalar) -> NefPolyhedron {
        let lo = Point3::new(x.clone(), y.clone(), Scalar::zero());
        let hi = Point3::new(x + Scalar::one(), y + Scalar::one(), Scalar::one());
        NefPolyhedron::from_bounds(&BoundingBox3::new(lo, hi))
    }

    fn half() -> Scalar {
        Scalar::from_ratio(1, 2).unwrap()
    }

    #[test]
    fn test_cube_boundary() {
        let mesh = nef_to_mesh(&cube_at(Scalar::zero(), Scalar::zero()), true).unwrap();
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.face_count(), 12);
        assert!(mesh.is_triangulated());
        assert_eq!(mesh.signed_volume(), Scalar::one());
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_non_convex_union_round_trip() {
        let a = cube_at(Scalar::zero(), Scalar::zero());
        let b = cube_at(half(), half());
        let union = a.union(&b);
        let mesh = nef_to_mesh(&union, true).unwrap();
        assert!(mesh.validate().is_ok());
        assert_eq!(mesh.signed_volume(), Scalar::from_ratio(7, 4).unwrap());
        assert_eq!(mesh.vertex_count(), 16);
        assert!(mesh_to_nef(&mesh).unwrap().equivalent(&union));
    }

    #[test]
    fn test_through_hole() {
        let block = NefPolyhedron::from_bounds(&BoundingBox3::new(
            Point3::from_ints(0, 0, 0),
            Point3::from_ints(3, 3, 1),
        ));
        let drill = NefPolyhedron::from_bounds(&BoundingBox3::new(
            Point3::from_ints(1, 1, -1),
            Point3::from_ints(2, 2, 2),
        ));
        let ring = block.difference(&drill);
        let mesh = nef_to_mesh(&ring, true).unwrap();
        assert!(mesh.validate().is_ok());
        assert_eq!(mesh.signed_volume(), Scalar::from_int(8));
        assert_eq!(mesh.vertex_count(), 16);
    }

    #[test]
    fn test_complement_boundary_is_inverted() {
        let a = cube_at(Scalar::zero(), Scalar::zero());
        assert_eq!(nef_to_mesh(&a.complement(), true), Err(ConversionError::Unbounded));
        let inverted = nef_to_mesh(&a.complement(), false).unwrap();
        assert_eq!(inverted.signed_volume(), Scalar::from_int(-1));
    }

    #[test]
    fn test_edge_touching_cubes_are_not_manifold() {
        let a = cube_at(Scalar::zero(), Scalar::zero());
        let b = cube_at(Scalar::one(), Scalar::one());
        let both = a.union(&b);
        assert!(matches!(
            nef_to_mesh(&both, true),
            Err(ConversionError::NotManifold { count: 4, .. })
        ));
        let mesh = nef_to_mesh(&both, false).unwrap();
        assert!(mesh.open);
        assert_eq!(mesh.signed_volume(), Scalar::from_int(2));
    }

    #[test]
    fn test_point_is_lower_dimensional() {
        let p = NefPolyhedron::point(Point3::origin());
        assert_eq!(nef_to_mesh(&p, true), Err(ConversionError::LowerDimensional));
        assert!(nef_to_mesh(&p, false).unwrap().is_empty());
    }
}
