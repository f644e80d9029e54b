// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error types shared across the kernel

use crate::ast::NodeId;
use thiserror::Error;

/// Illegal operation on the exact number kernel
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("non-finite value {0} cannot be represented exactly")]
    NonFinite(String),

    #[error("cannot parse '{0}' as a rational number")]
    Parse(String),
}

/// Malformed input geometry. Variants name the offending face or edge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryInputError {
    #[error("face {face} references vertex {index}, but the mesh has {count} vertices")]
    IndexOutOfRange { face: usize, index: usize, count: usize },

    #[error("face {face} is degenerate (fewer than three distinct vertices or zero area)")]
    DegenerateFace { face: usize },

    #[error("face {face} is not planar")]
    NonPlanarFace { face: usize },

    #[error("edge ({a}, {b}) is shared by {count} faces; a closed manifold needs exactly 2")]
    NonManifoldEdge { a: usize, b: usize, count: usize },

    #[error("face {face} traverses edge ({a}, {b}) in the same direction as its neighbour")]
    InconsistentOrientation { face: usize, a: usize, b: usize },

    #[error("mesh is open: edge ({a}, {b}) has only one adjacent face")]
    OpenMesh { a: usize, b: usize },

    #[error("mesh encloses zero volume")]
    ZeroVolume,

    #[error("face {face} is not a simple polygon")]
    NonSimpleFace { face: usize },

    #[error("polygon path {path} intersects itself")]
    SelfIntersecting { path: usize },

    #[error("faces {a} and {b} intersect away from their shared edges")]
    SelfIntersectingMesh { a: usize, b: usize },

    #[error("invalid primitive parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
}

/// A Nef value that cannot be expressed in the requested boundary form
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("value is unbounded and has no closed boundary")]
    Unbounded,

    #[error("boundary is not a closed 2-manifold: edge {edge} is used {count} times")]
    NotManifold { edge: String, count: usize },

    #[error("value has lower-dimensional parts that a solid boundary cannot carry")]
    LowerDimensional,

    #[error("failed to triangulate a boundary face on plane {plane}")]
    Triangulation { plane: String },

    #[error("expected a {expected} value, got a {actual} value")]
    DimensionMismatch { expected: String, actual: String },
}

/// Any failure a kernel operation can report
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    #[error(transparent)]
    Geometry(#[from] GeometryInputError),

    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("complexity budget exceeded: {actual} cells (limit {limit})")]
    ComplexityExceeded { limit: usize, actual: usize },

    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid tree: {0}")]
    InvalidTree(String),

    #[error("operator '{op}' cannot combine {left} and {right} operands")]
    DimensionMismatch {
        op: String,
        left: String,
        right: String,
    },
}

impl KernelError {
    /// True for aborts requested by the caller rather than bad input.
    pub fn is_abort(&self) -> bool {
        matches!(
            self,
            KernelError::Cancelled | KernelError::ComplexityExceeded { .. }
        )
    }
}

/// Evaluation failure annotated with the path of node labels from the root
/// down to the node where the error originated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {source}", .path.join(" > "))]
pub struct EvalError {
    pub path: Vec<NodeId>,
    #[source]
    pub source: KernelError,
}

impl EvalError {
    pub fn new(label: NodeId, source: KernelError) -> Self {
        Self {
            path: vec![label],
            source,
        }
    }

    /// Prefix the path with an enclosing node.
    pub fn within(mut self, label: NodeId) -> Self {
        self.path.insert(0, label);
        self
    }
}

/// Failures reading or writing a Nef dump
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("dump I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed dump: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported dump format '{format}' version {version}")]
    Format { format: String, version: u32 },

    #[error("dump cell {cell} is invalid: {reason}")]
    Cell { cell: usize, reason: String },
}
