// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Kernel API for incremental rendering

use crate::ast::{CacheStats, Evaluator, Geometry, Node, NodeId, NodeState};
use crate::config::KernelConfig;
use crate::error::{EvalError, KernelError};
use crate::geometry::BoundaryMesh;
use crate::nef::CancelHandle;
use std::sync::Arc;

/// Main kernel for incremental rendering
pub struct Kernel {
    evaluator: Evaluator,
    root: Option<Arc<Node>>,
}

impl Kernel {
    /// Create a new kernel
    pub fn new() -> Self {
        Self::with_config(KernelConfig::default())
    }

    pub fn with_config(config: KernelConfig) -> Self {
        Self {
            evaluator: Evaluator::with_config(config),
            root: None,
        }
    }

    /// Initialize kernel with a tree
    pub fn with_ast(ast: Node) -> Self {
        let mut kernel = Self::new();
        kernel.set_ast(ast);
        kernel
    }

    /// Evaluate the current tree to its Nef value
    pub fn evaluate(&self) -> Result<Arc<Geometry>, EvalError> {
        match &self.root {
            Some(root) => self.evaluator.evaluate(root),
            None => Ok(Arc::new(Geometry::Empty)),
        }
    }

    /// Full render of the current tree
    pub fn render(&self) -> Result<BoundaryMesh, EvalError> {
        match &self.root {
            Some(root) => self.evaluator.evaluate_to_mesh(root),
            None => Ok(BoundaryMesh::empty()),
        }
    }

    /// Replace every node carrying `node_id` and re-render. Only the
    /// replaced nodes and their ancestors are recomputed.
    pub fn update_subtree(
        &mut self,
        node_id: &NodeId,
        updated_node: Node,
    ) -> Result<BoundaryMesh, EvalError> {
        let replacement = Arc::new(updated_node);
        let root = match &self.root {
            Some(root) => root.replace_subtree(node_id, &replacement).ok_or_else(|| {
                EvalError::new(
                    node_id.clone(),
                    KernelError::InvalidTree(format!("no node with id '{node_id}'")),
                )
            })?,
            None => replacement,
        };

        self.evaluator.invalidate(node_id);
        self.evaluator.set_tree(&root);
        self.root = Some(root);
        self.render()
    }

    /// Invalidate cache for a specific node
    pub fn invalidate(&mut self, node_id: &NodeId) {
        self.evaluator.invalidate(node_id);
    }

    pub fn state(&self, node_id: &str) -> NodeState {
        self.evaluator.state(node_id)
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.evaluator.cache_stats()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.evaluator.cancel_handle()
    }

    /// Set the root tree, discarding every cached result
    pub fn set_ast(&mut self, ast: Node) {
        self.evaluator.clear();
        self.evaluator.set_tree(&ast);
        self.root = Some(Arc::new(ast));
    }

    /// Get a reference to the root tree
    pub fn get_ast(&self) -> Option<&Node> {
        self.root.as_deref()
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::CsgOp;
    use crate::geometry::Primitive;
    use crate::number::Scalar;

    #[test]
    fn test_kernel_basic_render() {
        let ast = Node::primitive(Primitive::cube([10.0, 10.0, 10.0], false)).named("cube1");

        let kernel = Kernel::with_ast(ast);
        let mesh = kernel.render().unwrap();
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.signed_volume(), Scalar::from_int(1000));
    }

    #[test]
    fn test_kernel_update_subtree() {
        let child = Node::primitive(Primitive::cube([10.0, 10.0, 10.0], false)).named("child1");
        let other = Node::primitive(Primitive::cube([1.0, 1.0, 1.0], false)).named("other");
        let root = Node::operation(CsgOp::Union, vec![child, other]).named("root");

        let mut kernel = Kernel::with_ast(root);
        let mesh1 = kernel.render().unwrap();
        assert_eq!(kernel.cache_stats().cached_nodes, 3);

        let updated = Node::primitive(Primitive::cube([20.0, 20.0, 20.0], false)).named("child1");
        let mesh2 = kernel.update_subtree(&"child1".to_string(), updated).unwrap();

        assert_ne!(mesh1.signed_volume(), mesh2.signed_volume());
        assert_eq!(mesh2.signed_volume(), Scalar::from_int(8000));
        // the untouched sibling was served from the cache
        assert!(matches!(kernel.state("other"), NodeState::Evaluated(_)));
        assert!(kernel.cache_stats().hits >= 1);
    }

    #[test]
    fn test_update_unknown_node_fails() {
        let mut kernel = Kernel::with_ast(Node::primitive(Primitive::cube([1.0, 1.0, 1.0], false)));
        let err = kernel
            .update_subtree(&"missing".to_string(), Node::primitive(Primitive::sphere(1.0, 8)))
            .unwrap_err();
        assert!(matches!(err.source, KernelError::InvalidTree(_)));
    }
}
