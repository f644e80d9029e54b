// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Binary STL export

use super::BoundaryMesh;
use crate::number::Point3;
use std::io::{self, Write};
use stl_io::{Normal, Triangle, Vertex};

fn vertex(point: &Point3) -> Vertex {
    let [x, y, z] = point.to_f64();
    Vertex::new([x as f32, y as f32, z as f32])
}

/// Write the mesh as binary STL. Polygonal faces are fanned into
/// triangles; normals come from the exact cross product.
pub fn write_stl<W: Write>(mesh: &BoundaryMesh, writer: &mut W) -> io::Result<()> {
    let mut triangles = Vec::with_capacity(mesh.face_count());
    for face in &mesh.faces {
        for i in 1..face.len().saturating_sub(1) {
            let [a, b, c] = [face[0], face[i], face[i + 1]].map(|v| &mesh.points[v]);
            let n = (b - a).cross(&(c - a));
            let [nx, ny, nz] = [&n.x, &n.y, &n.z].map(|s| s.to_f64());
            let len = (nx * nx + ny * ny + nz * nz).sqrt();
            let normal = if len > 0.0 {
                [(nx / len) as f32, (ny / len) as f32, (nz / len) as f32]
            } else {
                [0.0; 3]
            };
            triangles.push(Triangle {
                normal: Normal::new(normal),
                vertices: [vertex(a), vertex(b), vertex(c)],
            });
        }
    }
    stl_io::write_stl(writer, triangles.iter())
}
