// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CSG tree module
//!
//! Defines the tree handed over by a language front end and the evaluator
//! that turns it into Nef values.

mod dependency_graph;
mod evaluator;
mod geometry;
mod node;

pub use dependency_graph::DependencyGraph;
pub use evaluator::{CacheStats, Evaluator, NodeState};
pub use geometry::{Geometry, GeometryBounds};
pub use node::{CsgOp, Node, NodeId, NodeKind, TransformOp};
