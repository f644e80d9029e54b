// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Nef polyhedra and polygons
//!
//! A Nef value is stored as a set of interior-disjoint convex cells plus a
//! complement flag, which keeps every Boolean operation closed over
//! unbounded sets. Conversions to and from boundary meshes and planar
//! polygons live alongside the value type.

mod bsp;
mod cell;
mod context;
mod convex2;
mod convex3;
pub mod dump;
mod extract;
mod minkowski;
mod planar;
mod triangulate;
mod value;

pub use bsp::mesh_to_nef;
pub use cell::ConvexCell;
pub use context::{CancelHandle, OpContext};
pub use convex2::Cell2;
pub use convex3::{Cell3, Face3};
pub use dump::{DumpCell, NefDump};
pub use extract::nef_to_mesh;
pub use minkowski::{minkowski2, minkowski2_checked, minkowski3, minkowski3_checked, minkowski_checked};
pub use planar::{nef_to_polygon, polygon_to_nef};
pub use triangulate::triangulate;
pub use value::{Complexity, Nef, NefPolygon, NefPolyhedron};
