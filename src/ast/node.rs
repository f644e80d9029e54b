// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CSG tree node definitions

use crate::error::ArithmeticError;
use crate::geometry::transform::{cos_deg, sin_deg};
use crate::geometry::{Affine3, Primitive};
use nalgebra::{Matrix4, Vector3};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Unique identifier for CSG nodes
pub type NodeId = String;

/// CSG tree node. Nodes are immutable; subtrees are shared through `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Identity for memoization; one id names one subtree. Nodes without
    /// one are only shared within a single evaluation, through their `Arc`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self { kind, id: None }
    }

    pub fn with_id(kind: NodeKind, id: impl Into<NodeId>) -> Self {
        Self {
            kind,
            id: Some(id.into()),
        }
    }

    pub fn primitive(primitive: Primitive) -> Self {
        Self::new(NodeKind::Primitive(primitive))
    }

    pub fn operation(op: CsgOp, children: Vec<Node>) -> Self {
        Self::new(NodeKind::Operation {
            op,
            children: children.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn transform(op: TransformOp, child: Node) -> Self {
        Self::new(NodeKind::Transform {
            op,
            child: Arc::new(child),
        })
    }

    pub fn named(mut self, id: impl Into<NodeId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Label used in error paths: the id, or the kind name for anonymous
    /// nodes.
    pub fn label(&self) -> NodeId {
        match &self.id {
            Some(id) => id.clone(),
            None => self.kind.name().to_string(),
        }
    }

    /// Copy of the tree with every node carrying `id` replaced by
    /// `replacement`. `None` when no node matched.
    pub fn replace_subtree(self: &Arc<Self>, id: &str, replacement: &Arc<Node>) -> Option<Arc<Node>> {
        if self.id.as_deref() == Some(id) {
            return Some(Arc::clone(replacement));
        }
        let kind = match &self.kind {
            NodeKind::Primitive(_) => return None,
            NodeKind::Operation { op, children } => {
                let replaced: Vec<Option<Arc<Node>>> = children
                    .iter()
                    .map(|c| c.replace_subtree(id, replacement))
                    .collect();
                if replaced.iter().all(Option::is_none) {
                    return None;
                }
                NodeKind::Operation {
                    op: *op,
                    children: replaced
                        .into_iter()
                        .zip(children)
                        .map(|(new, old)| new.unwrap_or_else(|| Arc::clone(old)))
                        .collect(),
                }
            }
            NodeKind::Transform { op, child } => NodeKind::Transform {
                op: op.clone(),
                child: child.replace_subtree(id, replacement)?,
            },
        };
        Some(Arc::new(Node {
            id: self.id.clone(),
            kind,
        }))
    }
}

/// Closed set of node kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Primitive(Primitive),
    Operation {
        op: CsgOp,
        children: Vec<Arc<Node>>,
    },
    Transform {
        op: TransformOp,
        child: Arc<Node>,
    },
}

impl NodeKind {
    /// Get child nodes for dependency tracking
    pub fn get_children(&self) -> Vec<&Arc<Node>> {
        match self {
            NodeKind::Primitive(_) => Vec::new(),
            NodeKind::Operation { children, .. } => children.iter().collect(),
            NodeKind::Transform { child, .. } => vec![child],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Primitive(p) => p.name(),
            NodeKind::Operation { op, .. } => op.name(),
            NodeKind::Transform { op, .. } => op.name(),
        }
    }
}

/// Operators combining an ordered list of children.
///
/// `Difference` subtracts every later child from the first; the others fold
/// left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CsgOp {
    Union,
    Intersection,
    Difference,
    SymmetricDifference,
    Minkowski,
}

impl CsgOp {
    pub fn name(&self) -> &'static str {
        match self {
            CsgOp::Union => "union",
            CsgOp::Intersection => "intersection",
            CsgOp::Difference => "difference",
            CsgOp::SymmetricDifference => "symmetric_difference",
            CsgOp::Minkowski => "minkowski",
        }
    }
}

/// Transformation operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformOp {
    Translate([f64; 3]),
    /// Euler angles in degrees, applied about x, then y, then z.
    Rotate([f64; 3]),
    Scale([f64; 3]),
    /// Reflection through the plane with this normal.
    Mirror([f64; 3]),
    /// Row-major homogeneous matrix.
    Matrix([[f64; 4]; 4]),
}

impl TransformOp {
    pub fn name(&self) -> &'static str {
        match self {
            TransformOp::Translate(_) => "translate",
            TransformOp::Rotate(_) => "rotate",
            TransformOp::Scale(_) => "scale",
            TransformOp::Mirror(_) => "mirror",
            TransformOp::Matrix(_) => "matrix",
        }
    }

    /// Convert transformation to a 4x4 matrix
    pub fn to_matrix(&self) -> Matrix4<f64> {
        match self {
            TransformOp::Translate(v) => Matrix4::new_translation(&Vector3::from(*v)),
            TransformOp::Rotate([x, y, z]) => rotation_z(*z) * rotation_y(*y) * rotation_x(*x),
            TransformOp::Scale(s) => Matrix4::new_nonuniform_scaling(&Vector3::from(*s)),
            TransformOp::Mirror(normal) => {
                let n = Vector3::from(*normal);
                let len2 = n.norm_squared();
                if len2 == 0.0 {
                    return Matrix4::identity();
                }
                let mut m = Matrix4::identity();
                for r in 0..3 {
                    for c in 0..3 {
                        m[(r, c)] -= 2.0 * n[r] * n[c] / len2;
                    }
                }
                m
            }
            TransformOp::Matrix(rows) => Matrix4::from_fn(|r, c| rows[r][c]),
        }
    }

    /// Exact map of the float matrix.
    pub fn to_affine(&self) -> Result<Affine3, ArithmeticError> {
        Affine3::from_matrix(&self.to_matrix())
    }
}

fn rotation_x(degrees: f64) -> Matrix4<f64> {
    let (s, c) = (sin_deg(degrees), cos_deg(degrees));
    Matrix4::new(
        1.0, 0.0, 0.0, 0.0, //
        0.0, c, -s, 0.0, //
        0.0, s, c, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    )
}

fn rotation_y(degrees: f64) -> Matrix4<f64> {
    let (s, c) = (sin_deg(degrees), cos_deg(degrees));
    Matrix4::new(
        c, 0.0, s, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        -s, 0.0, c, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    )
}

fn rotation_z(degrees: f64) -> Matrix4<f64> {
    let (s, c) = (sin_deg(degrees), cos_deg(degrees));
    Matrix4::new(
        c, -s, 0.0, 0.0, //
        s, c, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    )
}
