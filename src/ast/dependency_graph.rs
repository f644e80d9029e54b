// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Dependency graph for incremental evaluation

use super::{Node, NodeId};
use ahash::{AHashMap, AHashSet};

/// Parent-child relationships between named nodes.
///
/// Anonymous nodes are transparent: their named descendants hang off the
/// nearest named ancestor. A node shared by several parents has several
/// parents here.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Maps node ID to its direct children
    children: AHashMap<NodeId, Vec<NodeId>>,
    /// Maps node ID to its direct parents
    parents: AHashMap<NodeId, Vec<NodeId>>,
    nodes: AHashSet<NodeId>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build dependency graph from a tree
    pub fn from_ast(root: &Node) -> Self {
        let mut graph = Self::new();
        graph.build_from_node(root, None);
        graph
    }

    fn build_from_node(&mut self, node: &Node, parent_id: Option<&NodeId>) {
        let Some(node_id) = &node.id else {
            for child in node.kind.get_children() {
                self.build_from_node(child, parent_id);
            }
            return;
        };

        if let Some(pid) = parent_id {
            let siblings = self.children.entry(pid.clone()).or_default();
            if siblings.contains(node_id) {
                // shared subtree already linked under this parent
                return;
            }
            siblings.push(node_id.clone());
            self.parents
                .entry(node_id.clone())
                .or_default()
                .push(pid.clone());
        }

        if self.nodes.insert(node_id.clone()) {
            for child in node.kind.get_children() {
                self.build_from_node(child, Some(node_id));
            }
        }
    }

    /// Get all descendants of a node (depth-first)
    pub fn get_descendants(&self, node_id: &NodeId) -> Vec<NodeId> {
        Self::walk(&self.children, node_id)
    }

    /// Get all ancestors of a node (nodes that depend on this node)
    pub fn get_ancestors(&self, node_id: &NodeId) -> Vec<NodeId> {
        Self::walk(&self.parents, node_id)
    }

    fn walk(edges: &AHashMap<NodeId, Vec<NodeId>>, start: &NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut visited = AHashSet::new();
        let mut stack = vec![start.clone()];
        visited.insert(start.clone());
        while let Some(id) = stack.pop() {
            for next in edges.get(&id).into_iter().flatten() {
                if visited.insert(next.clone()) {
                    found.push(next.clone());
                    stack.push(next.clone());
                }
            }
        }
        found
    }

    /// Get affected nodes when a node changes (node + ancestors)
    pub fn get_affected_nodes(&self, node_id: &NodeId) -> Vec<NodeId> {
        let mut affected = vec![node_id.clone()];
        affected.extend(self.get_ancestors(node_id));
        affected
    }

    /// Check if a node exists in the graph
    pub fn contains(&self, node_id: &str) -> bool {
        self.nodes.contains(node_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get all node IDs
    pub fn all_nodes(&self) -> Vec<NodeId> {
        self.nodes.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::CsgOp;
    use crate::geometry::Primitive;

    #[test]
    fn test_dependency_graph() {
        let child1 = Node::primitive(Primitive::cube([10.0, 10.0, 10.0], false)).named("child1");
        let child2 = Node::primitive(Primitive::sphere(5.0, 32)).named("child2");
        let root = Node::operation(CsgOp::Union, vec![child1, child2]).named("root");

        let graph = DependencyGraph::from_ast(&root);

        assert!(graph.contains("root"));
        assert!(graph.contains("child1"));
        assert!(graph.contains("child2"));

        let descendants = graph.get_descendants(&"root".to_string());
        assert_eq!(descendants.len(), 2);
    }

    #[test]
    fn test_anonymous_nodes_are_transparent() {
        let leaf = Node::primitive(Primitive::cube([1.0, 1.0, 1.0], false)).named("leaf");
        let inner = Node::operation(CsgOp::Union, vec![leaf]);
        let root = Node::operation(CsgOp::Union, vec![inner]).named("root");

        let graph = DependencyGraph::from_ast(&root);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.get_affected_nodes(&"leaf".to_string()), vec!["leaf", "root"]);
    }

    #[test]
    fn test_shared_subtree_has_every_parent() {
        let shared = Node::primitive(Primitive::cube([1.0, 1.0, 1.0], false)).named("shared");
        let a = Node::operation(CsgOp::Union, vec![shared.clone()]).named("a");
        let b = Node::operation(CsgOp::Union, vec![shared]).named("b");
        let root = Node::operation(CsgOp::Difference, vec![a, b]).named("root");

        let graph = DependencyGraph::from_ast(&root);
        let mut ancestors = graph.get_ancestors(&"shared".to_string());
        ancestors.sort();
        assert_eq!(ancestors, vec!["a", "b", "root"]);
    }
}
