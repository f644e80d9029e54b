// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! nefcore: exact Nef polyhedron kernel for CSG modelling
//!
//! Every coordinate is an arbitrary-precision rational, so Boolean
//! operations, Minkowski sums and boundary conversion never round. A CSG
//! tree handed over by a language front end is evaluated bottom-up into
//! Nef values and finally extracted as an outward-oriented triangle mesh.

pub mod ast;
pub mod config;
pub mod error;
pub mod geometry;
pub mod kernel;
pub mod nef;
pub mod number;

pub use ast::{CsgOp, Evaluator, Geometry, Node, NodeId, NodeKind, TransformOp};
pub use config::KernelConfig;
pub use error::{ArithmeticError, ConversionError, EvalError, GeometryInputError, KernelError};
pub use geometry::{BoundaryMesh, Polygon2, Primitive};
pub use kernel::Kernel;
pub use nef::{mesh_to_nef, nef_to_mesh, nef_to_polygon, polygon_to_nef, NefPolygon, NefPolyhedron};
pub use number::{Point2, Point3, Scalar};

/// Evaluate a JSON-encoded CSG tree to a mesh
pub fn render_json(source: &str) -> anyhow::Result<BoundaryMesh> {
    let tree: Node = serde_json::from_str(source)?;
    let config = KernelConfig::load()?;
    Ok(Evaluator::with_config(config).evaluate_to_mesh(&tree)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_cube() {
        let mesh = render_json(r#"{ "kind": { "primitive": { "type": "cube", "size": [10, 10, 10] } } }"#)
            .unwrap();
        assert_eq!(mesh.face_count(), 12);
    }
}
