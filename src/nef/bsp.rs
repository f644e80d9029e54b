// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Boundary mesh to Nef conversion
//!
//! The validated mesh is carved into convex cells with a solid BSP
//! (Thibault–Naylor): starting from the bounding box, each step splits the
//! current cell by the plane of one boundary polygon and distributes the
//! remaining polygons to the two halves. A half with no polygons left is
//! entirely inside (behind the splitter) or outside (in front of it).

use super::cell::ConvexCell;
use super::convex3::Cell3;
use super::triangulate::triangulate;
use super::value::NefPolyhedron;
use crate::error::GeometryInputError;
use crate::geometry::BoundaryMesh;
use crate::number::{orient2d, Plane3, Point2, Point3, Sign};
use std::borrow::Cow;

/// Convex boundary polygon, counterclockwise about its outward plane.
#[derive(Debug, Clone)]
struct BspPolygon {
    plane: Plane3,
    points: Vec<Point3>,
}

enum Placement {
    Back(BspPolygon),
    Front(BspPolygon),
    Coplanar,
    Spanning(BspPolygon, BspPolygon),
}

impl BspPolygon {
    fn place(self, splitter: &Plane3) -> Placement {
        let sides: Vec<Sign> = self.points.iter().map(|p| splitter.side(p)).collect();
        let back = sides.contains(&Sign::Negative);
        let front = sides.contains(&Sign::Positive);
        match (back, front) {
            (false, false) => Placement::Coplanar,
            (true, false) => Placement::Back(self),
            (false, true) => Placement::Front(self),
            (true, true) => {
                let n = self.points.len();
                let mut below = Vec::with_capacity(n + 1);
                let mut above = Vec::with_capacity(n + 1);
                for i in 0..n {
                    let j = (i + 1) % n;
                    let p = &self.points[i];
                    if sides[i] != Sign::Positive {
                        below.push(p.clone());
                    }
                    if sides[i] != Sign::Negative {
                        above.push(p.clone());
                    }
                    if sides[i].opposes(sides[j]) {
                        let x = splitter.intersect_segment(p, &self.points[j]);
                        below.push(x.clone());
                        above.push(x);
                    }
                }
                Placement::Spanning(
                    BspPolygon {
                        plane: self.plane.clone(),
                        points: below,
                    },
                    BspPolygon {
                        plane: self.plane,
                        points: above,
                    },
                )
            }
        }
    }
}

/// Convert a closed, consistently oriented 2-manifold into a Nef value.
///
/// A mesh whose faces all point inward is flipped first.
pub fn mesh_to_nef(mesh: &BoundaryMesh) -> Result<NefPolyhedron, GeometryInputError> {
    if mesh.is_empty() {
        return Ok(NefPolyhedron::empty());
    }
    let planes = mesh.validate()?;

    let volume = mesh.signed_volume();
    let (mesh, planes) = match volume.sign() {
        Sign::Zero => return Err(GeometryInputError::ZeroVolume),
        Sign::Positive => (Cow::Borrowed(mesh), planes),
        Sign::Negative => {
            tracing::debug!(faces = mesh.face_count(), "mesh is inside out, flipping");
            let mut flipped = mesh.clone();
            flipped.flip();
            let planes = planes.iter().map(Plane3::opposite).collect();
            (Cow::Owned(flipped), planes)
        }
    };

    let mut polygons = Vec::with_capacity(mesh.face_count());
    for (face_idx, (face, plane)) in mesh.faces.iter().zip(planes).enumerate() {
        let points: Vec<Point3> = face.iter().map(|&i| mesh.points[i].clone()).collect();
        convex_pieces(face_idx, points, plane, &mut polygons)?;
    }

    let Some(bounds) = mesh.bounding_box() else {
        return Ok(NefPolyhedron::empty());
    };
    let cells = carve(Cell3::from_box(&bounds), polygons);
    tracing::debug!(
        faces = mesh.face_count(),
        cells = cells.len(),
        "mesh converted to nef"
    );
    Ok(NefPolyhedron::from_cells(cells))
}

/// Push `points` as one polygon when convex, or as its ear-clipped triangles.
fn convex_pieces(
    face: usize,
    points: Vec<Point3>,
    plane: Plane3,
    out: &mut Vec<BspPolygon>,
) -> Result<(), GeometryInputError> {
    let projection = plane.projection();
    let flat: Vec<Point2> = points.iter().map(|p| projection.project(p)).collect();
    let n = flat.len();
    let convex = (0..n).all(|i| orient2d(&flat[i], &flat[(i + 1) % n], &flat[(i + 2) % n]) != Sign::Negative);
    if convex {
        out.push(BspPolygon { plane, points });
        return Ok(());
    }

    let outer: Vec<usize> = (0..n).collect();
    let triangles =
        triangulate(&flat, &outer, &[]).ok_or(GeometryInputError::NonSimpleFace { face })?;
    for [a, b, c] in triangles {
        out.push(BspPolygon {
            plane: plane.clone(),
            points: vec![points[a].clone(), points[b].clone(), points[c].clone()],
        });
    }
    Ok(())
}

fn carve(root: Cell3, polygons: Vec<BspPolygon>) -> Vec<Cell3> {
    let mut inside = Vec::new();
    let mut stack = vec![(root, polygons)];

    while let Some((cell, mut polygons)) = stack.pop() {
        let splitter = polygons.swap_remove(0).plane;
        let mut back = Vec::new();
        let mut front = Vec::new();
        for polygon in polygons {
            match polygon.place(&splitter) {
                Placement::Back(p) => back.push(p),
                Placement::Front(p) => front.push(p),
                Placement::Coplanar => {}
                Placement::Spanning(b, f) => {
                    back.push(b);
                    front.push(f);
                }
            }
        }

        let (below, above) = cell.split(&splitter);
        if let Some(below) = below {
            if back.is_empty() {
                inside.push(below);
            } else {
                stack.push((below, back));
            }
        }
        if let Some(above) = above {
            if !front.is_empty() {
                stack.push((above, front));
            }
        }
    }
    inside
}
