// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Primitive descriptors and their exact boundary tessellation

use super::transform::{cos_deg, sin_deg};
use super::{BoundaryMesh, Polygon2};
use crate::error::GeometryInputError;
use crate::number::{Point2, Point3};
use serde::{Deserialize, Serialize};

/// Geometric primitives as supplied by the front end.
///
/// Parameters are plain floats; tessellation converts each coordinate to
/// its exact rational value, so every generated face is exactly planar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Primitive {
    Cube {
        size: [f64; 3],
        #[serde(default)]
        center: bool,
    },
    Sphere {
        r: f64,
        #[serde(default, alias = "fn")]
        segments: Option<u32>,
    },
    Cylinder {
        h: f64,
        r1: f64,
        r2: f64,
        #[serde(default)]
        center: bool,
        #[serde(default, alias = "fn")]
        segments: Option<u32>,
    },
    Polyhedron {
        points: Vec<[f64; 3]>,
        faces: Vec<Vec<usize>>,
    },
    Square {
        size: [f64; 2],
        #[serde(default)]
        center: bool,
    },
    Circle {
        r: f64,
        #[serde(default, alias = "fn")]
        segments: Option<u32>,
    },
    Polygon {
        points: Vec<[f64; 2]>,
        #[serde(default)]
        paths: Option<Vec<Vec<usize>>>,
    },
}

/// Tessellated primitive boundary
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveShape {
    Solid(BoundaryMesh),
    Planar(Polygon2),
}

impl Primitive {
    pub fn cube(size: [f64; 3], center: bool) -> Self {
        Self::Cube { size, center }
    }

    pub fn sphere(r: f64, segments: u32) -> Self {
        Self::Sphere {
            r,
            segments: Some(segments),
        }
    }

    pub fn cylinder(h: f64, r: f64, segments: u32) -> Self {
        Self::cone(h, r, r, segments)
    }

    pub fn cone(h: f64, r1: f64, r2: f64, segments: u32) -> Self {
        Self::Cylinder {
            h,
            r1,
            r2,
            center: false,
            segments: Some(segments),
        }
    }

    pub fn square(size: [f64; 2], center: bool) -> Self {
        Self::Square { size, center }
    }

    pub fn circle(r: f64, segments: u32) -> Self {
        Self::Circle {
            r,
            segments: Some(segments),
        }
    }

    pub fn is_planar(&self) -> bool {
        matches!(
            self,
            Self::Square { .. } | Self::Circle { .. } | Self::Polygon { .. }
        )
    }

    /// Short name used in evaluation paths and logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cube { .. } => "cube",
            Self::Sphere { .. } => "sphere",
            Self::Cylinder { .. } => "cylinder",
            Self::Polyhedron { .. } => "polyhedron",
            Self::Square { .. } => "square",
            Self::Circle { .. } => "circle",
            Self::Polygon { .. } => "polygon",
        }
    }

    /// Build the boundary description. Curved primitives without their own
    /// segment count use `default_segments`.
    pub fn to_boundary(&self, default_segments: u32) -> Result<PrimitiveShape, GeometryInputError> {
        let segments = |own: &Option<u32>| -> Result<u32, GeometryInputError> {
            let n = own.unwrap_or(default_segments);
            if n < 3 {
                return Err(invalid(format!("{} needs at least 3 segments, got {n}", self.name())));
            }
            Ok(n)
        };

        match self {
            Self::Cube { size, center } => {
                for &s in size {
                    positive("cube size", s)?;
                }
                let lo = if *center {
                    [-size[0] / 2.0, -size[1] / 2.0, -size[2] / 2.0]
                } else {
                    [0.0; 3]
                };
                let hi = [lo[0] + size[0], lo[1] + size[1], lo[2] + size[2]];
                Ok(PrimitiveShape::Solid(box_mesh(lo, hi)?))
            }

            Self::Sphere { r, segments: own } => {
                positive("sphere radius", *r)?;
                Ok(PrimitiveShape::Solid(sphere_mesh(*r, segments(own)?)?))
            }

            Self::Cylinder {
                h,
                r1,
                r2,
                center,
                segments: own,
            } => {
                positive("cylinder height", *h)?;
                non_negative("cylinder r1", *r1)?;
                non_negative("cylinder r2", *r2)?;
                if *r1 == 0.0 && *r2 == 0.0 {
                    return Err(invalid("cylinder needs a non-zero radius".to_string()));
                }
                let z0 = if *center { -h / 2.0 } else { 0.0 };
                Ok(PrimitiveShape::Solid(cylinder_mesh(
                    z0,
                    z0 + h,
                    *r1,
                    *r2,
                    segments(own)?,
                )?))
            }

            Self::Polyhedron { points, faces } => {
                let points = points
                    .iter()
                    .map(|p| Point3::from_f64(p[0], p[1], p[2]))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(PrimitiveShape::Solid(BoundaryMesh::new(points, faces.clone())))
            }

            Self::Square { size, center } => {
                positive("square width", size[0])?;
                positive("square height", size[1])?;
                let (x0, y0) = if *center {
                    (-size[0] / 2.0, -size[1] / 2.0)
                } else {
                    (0.0, 0.0)
                };
                let (x1, y1) = (x0 + size[0], y0 + size[1]);
                Ok(PrimitiveShape::Planar(Polygon2::from_outline(vec![
                    Point2::from_f64(x0, y0)?,
                    Point2::from_f64(x1, y0)?,
                    Point2::from_f64(x1, y1)?,
                    Point2::from_f64(x0, y1)?,
                ])))
            }

            Self::Circle { r, segments: own } => {
                positive("circle radius", *r)?;
                let ring = ring_points(*r, segments(own)?)
                    .into_iter()
                    .map(|(x, y)| Point2::from_f64(x, y))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(PrimitiveShape::Planar(Polygon2::from_outline(ring)))
            }

            Self::Polygon { points, paths } => {
                let points = points
                    .iter()
                    .map(|p| Point2::from_f64(p[0], p[1]))
                    .collect::<Result<Vec<_>, _>>()?;
                let paths = paths
                    .clone()
                    .unwrap_or_else(|| vec![(0..points.len()).collect()]);
                Ok(PrimitiveShape::Planar(Polygon2::new(points, paths)))
            }
        }
    }
}

fn invalid(message: String) -> GeometryInputError {
    GeometryInputError::InvalidParameter(message)
}

fn positive(what: &str, value: f64) -> Result<(), GeometryInputError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{what} must be positive, got {value}")))
    }
}

fn non_negative(what: &str, value: f64) -> Result<(), GeometryInputError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{what} must not be negative, got {value}")))
    }
}

/// Points on a circle of radius `r`, counterclockwise from the +x axis.
fn ring_points(r: f64, segments: u32) -> Vec<(f64, f64)> {
    (0..segments)
        .map(|j| {
            let theta = 360.0 * f64::from(j) / f64::from(segments);
            (r * cos_deg(theta), r * sin_deg(theta))
        })
        .collect()
}

/// Axis-aligned box between two corners with outward faces.
pub fn box_mesh(lo: [f64; 3], hi: [f64; 3]) -> Result<BoundaryMesh, GeometryInputError> {
    let mut points = Vec::with_capacity(8);
    for &z in &[lo[2], hi[2]] {
        for &(x, y) in &[(lo[0], lo[1]), (hi[0], lo[1]), (hi[0], hi[1]), (lo[0], hi[1])] {
            points.push(Point3::from_f64(x, y, z)?);
        }
    }
    let faces = vec![
        vec![0, 3, 2, 1],
        vec![4, 5, 6, 7],
        vec![0, 1, 5, 4],
        vec![3, 7, 6, 2],
        vec![0, 4, 7, 3],
        vec![1, 2, 6, 5],
    ];
    Ok(BoundaryMesh::new(points, faces))
}

fn sphere_mesh(r: f64, segments: u32) -> Result<BoundaryMesh, GeometryInputError> {
    let rings = ((segments + 1) / 2).max(2);
    let n = segments as usize;
    let mut mesh = BoundaryMesh::empty();

    for i in 0..rings {
        let phi = 180.0 * (f64::from(i) + 0.5) / f64::from(rings);
        let z = r * cos_deg(phi);
        let ring_r = r * sin_deg(phi);
        for (x, y) in ring_points(ring_r, segments) {
            mesh.add_vertex(Point3::from_f64(x, y, z)?);
        }
    }

    let at = |ring: u32, j: usize| ring as usize * n + j % n;

    mesh.add_face((0..n).map(|j| at(0, j)).collect());
    mesh.add_face((0..n).rev().map(|j| at(rings - 1, j)).collect());

    for i in 0..rings - 1 {
        for j in 0..n {
            let (u0, u1) = (at(i, j), at(i, j + 1));
            let (l0, l1) = (at(i + 1, j), at(i + 1, j + 1));
            mesh.add_face(vec![u0, l0, l1]);
            mesh.add_face(vec![u0, l1, u1]);
        }
    }

    Ok(mesh)
}

fn cylinder_mesh(
    z0: f64,
    z1: f64,
    r1: f64,
    r2: f64,
    segments: u32,
) -> Result<BoundaryMesh, GeometryInputError> {
    let n = segments as usize;
    let mut mesh = BoundaryMesh::empty();

    let ring = |mesh: &mut BoundaryMesh, r: f64, z: f64| -> Result<Vec<usize>, GeometryInputError> {
        if r == 0.0 {
            return Ok(vec![mesh.add_vertex(Point3::from_f64(0.0, 0.0, z)?)]);
        }
        ring_points(r, segments)
            .into_iter()
            .map(|(x, y)| -> Result<usize, GeometryInputError> {
                Ok(mesh.add_vertex(Point3::from_f64(x, y, z)?))
            })
            .collect()
    };
    let bottom = ring(&mut mesh, r1, z0)?;
    let top = ring(&mut mesh, r2, z1)?;

    if bottom.len() > 1 {
        mesh.add_face(bottom.iter().rev().copied().collect());
    }
    if top.len() > 1 {
        mesh.add_face(top.clone());
    }

    for j in 0..n {
        let k = (j + 1) % n;
        match (bottom.len(), top.len()) {
            (1, _) => mesh.add_face(vec![bottom[0], top[k], top[j]]),
            (_, 1) => mesh.add_face(vec![bottom[j], bottom[k], top[0]]),
            _ if r1 == r2 => mesh.add_face(vec![bottom[j], bottom[k], top[k], top[j]]),
            _ => {
                mesh.add_face(vec![bottom[j], bottom[k], top[k]]);
                mesh.add_face(vec![bottom[j], top[k], top[j]]);
            }
        }
    }

    Ok(mesh)
}
