// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Exact number kernel
//!
//! Arbitrary-precision rational scalars, points and vectors built on them,
//! and the exact predicates every topological decision in the Nef engine
//! goes through. Nothing in this module rounds.

mod point;
mod predicates;
mod scalar;

pub use point::{Point2, Point3, Vector2, Vector3};
pub use predicates::{orient2d, orient3d, Line2, Plane3, PlaneProjection, Sign};
pub use scalar::Scalar;
