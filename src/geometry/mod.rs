// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - boundary representations, primitives and transforms

mod bbox;
mod mesh;
mod primitives;
mod self_intersection;
mod stl;
pub mod transform;

pub use bbox::{AxisBox, BoundingBox3, BoundingRect2, BoundingVolume};
pub use mesh::{path_is_simple, segments_touch, signed_area2, BoundaryMesh, Polygon2};
pub use primitives::{box_mesh, Primitive, PrimitiveShape};
pub use stl::write_stl;
pub use transform::{Affine2, Affine3};
