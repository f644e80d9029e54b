// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CSG tree evaluator
//!
//! Evaluation is post-order: a node's children are evaluated (in parallel
//! when enabled) before the node's own operation runs. Named nodes are
//! memoized by id across evaluations, and an anonymous subtree reached
//! through several parents is computed once per evaluation. A failing child
//! short-circuits every ancestor without running any geometry operation.
//!
//! An id must name one subtree: a tree that gives the same id to two
//! different subtrees is rejected before anything is computed.

use super::dependency_graph::DependencyGraph;
use super::geometry::{Evaluated, Geometry};
use super::{CsgOp, Node, NodeId, NodeKind};
use crate::config::KernelConfig;
use crate::error::{ConversionError, EvalError, KernelError};
use crate::geometry::{BoundaryMesh, Polygon2, Primitive, PrimitiveShape};
use crate::nef::{
    mesh_to_nef, minkowski_checked, nef_to_mesh, nef_to_polygon, polygon_to_nef, CancelHandle,
    ConvexCell, Nef, OpContext,
};
use ahash::{AHashMap, AHashSet};
use dashmap::DashMap;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// Evaluation state of a named node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeState {
    Unevaluated,
    Evaluating,
    Evaluated(Arc<Geometry>),
    Failed(EvalError),
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub cached_nodes: usize,
    pub failed_nodes: usize,
    pub total_nodes: usize,
    pub hits: usize,
    pub misses: usize,
}

impl CacheStats {
    /// Percentage of memo lookups answered from the cache
    pub fn hit_rate(&self) -> f32 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            (self.hits as f32 / lookups as f32) * 100.0
        }
    }
}

/// Memo entry for one node id, tagged with the node it was computed for.
#[derive(Debug)]
struct Slot {
    node: Node,
    evaluating: AtomicBool,
    result: OnceLock<Result<Evaluated, EvalError>>,
}

impl Slot {
    fn new(node: &Node) -> Self {
        Self {
            node: node.clone(),
            evaluating: AtomicBool::new(false),
            result: OnceLock::new(),
        }
    }
}

type Shared = Arc<OnceLock<Result<Evaluated, EvalError>>>;

/// State of one `evaluate` call.
struct Pass {
    ctx: OpContext,
    /// Addresses of anonymous nodes reachable through more than one parent
    shared: AHashSet<usize>,
    anonymous: DashMap<usize, Shared>,
}

/// Walk of a tree before evaluation: checks that every id names a single
/// subtree and finds the anonymous nodes that are shared.
#[derive(Default)]
struct TreeScan<'a> {
    seen: AHashSet<usize>,
    ids: AHashMap<&'a str, &'a Node>,
    shared: AHashSet<usize>,
}

impl<'a> TreeScan<'a> {
    fn visit(&mut self, node: &'a Node) -> Result<(), EvalError> {
        let addr = node as *const Node as usize;
        if !self.seen.insert(addr) {
            if node.id.is_none() {
                self.shared.insert(addr);
            }
            return Ok(());
        }
        if let Some(id) = node.id.as_deref() {
            match self.ids.get(id) {
                Some(first) if *first != node => {
                    return Err(EvalError::new(
                        id.to_string(),
                        KernelError::InvalidTree(format!("id '{id}' names two different subtrees")),
                    ));
                }
                Some(_) => {}
                None => {
                    self.ids.insert(id, node);
                }
            }
        }
        for child in node.kind.get_children() {
            self.visit(child)?;
        }
        Ok(())
    }
}

/// Memoizing CSG evaluator
pub struct Evaluator {
    config: KernelConfig,
    memo: DashMap<NodeId, Arc<Slot>>,
    graph: DependencyGraph,
    cancel: CancelHandle,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::with_config(KernelConfig::default())
    }

    pub fn with_config(config: KernelConfig) -> Self {
        Self {
            config,
            memo: DashMap::new(),
            graph: DependencyGraph::new(),
            cancel: CancelHandle::new(),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Evaluator with the dependency graph of `root` already built
    pub fn from_ast(root: &Node, config: KernelConfig) -> Self {
        let mut evaluator = Self::with_config(config);
        evaluator.graph = DependencyGraph::from_ast(root);
        evaluator
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Switch to a new tree, keeping cached results of nodes it still
    /// contains.
    pub fn set_tree(&mut self, root: &Node) {
        self.graph = DependencyGraph::from_ast(root);
        let graph = &self.graph;
        self.memo.retain(|id, _| graph.contains(id));
    }

    /// Drop every cached result.
    pub fn clear(&self) {
        self.memo.clear();
    }

    /// Handle that aborts in-flight evaluations. It stays raised until
    /// [`CancelHandle::reset`] is called.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Evaluate a tree to its Nef value
    pub fn evaluate(&self, node: &Node) -> Result<Arc<Geometry>, EvalError> {
        let ctx = OpContext::new(self.cancel.clone(), self.config.max_cells)
            .with_minkowski_warn_pairs(self.config.minkowski_warn_pairs);
        tracing::debug!(root = %node.label(), "evaluating tree");
        let mut scan = TreeScan::default();
        scan.visit(node)?;
        let pass = Pass {
            ctx,
            shared: scan.shared,
            anonymous: DashMap::new(),
        };
        self.evaluate_node(node, &pass)
            .map(|evaluated| evaluated.geometry)
    }

    /// Evaluate a 3D tree to a closed, outward-oriented triangle mesh
    pub fn evaluate_to_mesh(&self, node: &Node) -> Result<BoundaryMesh, EvalError> {
        let geometry = self.evaluate(node)?;
        let fail = |err: ConversionError| EvalError::new(node.label(), err.into());
        match &*geometry {
            Geometry::Empty => Ok(BoundaryMesh::empty()),
            Geometry::Polyhedron(nef) => nef_to_mesh(nef, true).map_err(fail),
            Geometry::Polygon(_) => Err(fail(ConversionError::DimensionMismatch {
                expected: "3d".to_string(),
                actual: "2d".to_string(),
            })),
        }
    }

    /// Evaluate a 2D tree to its outline
    pub fn evaluate_to_polygon(&self, node: &Node) -> Result<Polygon2, EvalError> {
        let geometry = self.evaluate(node)?;
        let fail = |err: ConversionError| EvalError::new(node.label(), err.into());
        match &*geometry {
            Geometry::Empty => Ok(Polygon2::default()),
            Geometry::Polygon(nef) => nef_to_polygon(nef).map_err(fail),
            Geometry::Polyhedron(_) => Err(fail(ConversionError::DimensionMismatch {
                expected: "2d".to_string(),
                actual: "3d".to_string(),
            })),
        }
    }

    pub fn state(&self, id: &str) -> NodeState {
        let Some(slot) = self.memo.get(id).map(|s| Arc::clone(&s)) else {
            return NodeState::Unevaluated;
        };
        match slot.result.get() {
            Some(Ok(evaluated)) => NodeState::Evaluated(Arc::clone(&evaluated.geometry)),
            Some(Err(err)) => NodeState::Failed(err.clone()),
            None if slot.evaluating.load(Ordering::Acquire) => NodeState::Evaluating,
            None => NodeState::Unevaluated,
        }
    }

    /// Invalidate cache for specific node and its ancestors
    pub fn invalidate(&self, node_id: &NodeId) {
        let affected = self.graph.get_affected_nodes(node_id);
        let removed = affected
            .iter()
            .filter(|id| self.memo.remove(*id).is_some())
            .count();
        tracing::debug!(node = %node_id, removed, "invalidated cached results");
    }

    pub fn cache_stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            total_nodes: self.graph.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            ..CacheStats::default()
        };
        for entry in self.memo.iter() {
            match entry.value().result.get() {
                Some(Ok(_)) => stats.cached_nodes += 1,
                Some(Err(_)) => stats.failed_nodes += 1,
                None => {}
            }
        }
        stats
    }

    /// Memo slot for `id`, replacing one left by an older tree whose node
    /// under this id differs.
    fn slot(&self, id: &str, node: &Node) -> Arc<Slot> {
        let mut entry = self
            .memo
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Slot::new(node)));
        if entry.node != *node {
            tracing::debug!(node = id, "dropping result cached for an older tree");
            *entry = Arc::new(Slot::new(node));
        }
        Arc::clone(&entry)
    }

    fn evaluate_node(&self, node: &Node, pass: &Pass) -> Result<Evaluated, EvalError> {
        let Some(id) = node.id.as_deref() else {
            return self.evaluate_anonymous(node, pass);
        };

        let slot = self.slot(id, node);
        if let Some(result) = slot.result.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return result.clone();
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        // Racing workers may both compute; the first stored result wins.
        slot.evaluating.store(true, Ordering::Release);
        let result = self.compute(node, pass);
        slot.evaluating.store(false, Ordering::Release);

        match &result {
            Ok(evaluated) => tracing::debug!(
                node = id,
                cells = evaluated.geometry.complexity().cells,
                "node evaluated"
            ),
            Err(err) if err.source.is_abort() => {
                tracing::debug!(node = id, error = %err, "evaluation aborted");
                self.memo.remove_if(id, |_, current| Arc::ptr_eq(current, &slot));
                return result;
            }
            Err(err) => tracing::debug!(node = id, error = %err, "node failed"),
        }
        slot.result.get_or_init(|| result).clone()
    }

    fn evaluate_anonymous(&self, node: &Node, pass: &Pass) -> Result<Evaluated, EvalError> {
        let addr = node as *const Node as usize;
        if !pass.shared.contains(&addr) {
            return self.compute(node, pass);
        }
        let cell = Arc::clone(&pass.anonymous.entry(addr).or_default());
        if let Some(result) = cell.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return result.clone();
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let result = self.compute(node, pass);
        cell.get_or_init(|| result).clone()
    }

    fn compute(&self, node: &Node, pass: &Pass) -> Result<Evaluated, EvalError> {
        let ctx = &pass.ctx;
        let fail = |err: KernelError| EvalError::new(node.label(), err);
        ctx.poll().map_err(fail)?;

        match &node.kind {
            NodeKind::Primitive(primitive) => {
                self.primitive(primitive).map(Evaluated::new).map_err(fail)
            }

            NodeKind::Operation { op, children } => {
                let operands = self
                    .evaluate_children(children, pass)
                    .map_err(|err| err.within(node.label()))?;
                self.combine(*op, operands, ctx).map_err(fail)
            }

            NodeKind::Transform { op, child } => {
                let operand = self
                    .evaluate_node(child, pass)
                    .map_err(|err| err.within(node.label()))?;
                let map = op.to_affine().map_err(|err| fail(err.into()))?;
                if map.is_identity() {
                    return Ok(operand);
                }
                let geometry = match &*operand.geometry {
                    Geometry::Empty => Geometry::Empty,
                    // planar values take the xy part of the map
                    Geometry::Polygon(nef) => Geometry::Polygon(nef.transform(&map.to_planar())),
                    Geometry::Polyhedron(nef) => Geometry::Polyhedron(nef.transform(&map)),
                };
                Ok(Evaluated::new(geometry))
            }
        }
    }

    fn evaluate_children(
        &self,
        children: &[Arc<Node>],
        pass: &Pass,
    ) -> Result<Vec<Evaluated>, EvalError> {
        if self.config.parallel && children.len() > 1 {
            children
                .par_iter()
                .map(|child| self.evaluate_node(child, pass))
                .collect()
        } else {
            children
                .iter()
                .map(|child| self.evaluate_node(child, pass))
                .collect()
        }
    }

    fn primitive(&self, primitive: &Primitive) -> Result<Geometry, KernelError> {
        Ok(match primitive.to_boundary(self.config.default_resolution)? {
            PrimitiveShape::Solid(mesh) => Geometry::Polyhedron(mesh_to_nef(&mesh)?),
            PrimitiveShape::Planar(polygon) => Geometry::Polygon(polygon_to_nef(&polygon)?),
        })
    }

    fn combine(
        &self,
        op: CsgOp,
        operands: Vec<Evaluated>,
        ctx: &OpContext,
    ) -> Result<Evaluated, KernelError> {
        let mut solid = operands
            .iter()
            .map(|e| &e.geometry)
            .filter(|g| g.dimension().is_some());
        if let Some(first) = solid.next() {
            if let Some(other) = solid.find(|g| g.dimension() != first.dimension()) {
                return Err(mismatch(op, first, other));
            }
        }

        let mut operands = operands.into_iter();
        let Some(mut acc) = operands.next() else {
            return Ok(Evaluated::new(Geometry::Empty));
        };
        for next in operands {
            ctx.poll()?;
            acc = self.binary(op, acc, next, ctx)?;
        }
        Ok(acc)
    }

    fn binary(
        &self,
        op: CsgOp,
        a: Evaluated,
        b: Evaluated,
        ctx: &OpContext,
    ) -> Result<Evaluated, KernelError> {
        if matches!(*a.geometry, Geometry::Empty) || matches!(*b.geometry, Geometry::Empty) {
            return Ok(match op {
                CsgOp::Union | CsgOp::SymmetricDifference if a.geometry.is_empty() => b,
                CsgOp::Union | CsgOp::SymmetricDifference | CsgOp::Difference => a,
                CsgOp::Intersection | CsgOp::Minkowski => Evaluated::new(Geometry::Empty),
            });
        }
        let disjoint = a.bounds.disjoint(&b.bounds);
        let geometry = match (&*a.geometry, &*b.geometry) {
            (Geometry::Polygon(x), Geometry::Polygon(y)) => {
                Geometry::Polygon(self.apply(op, x, y, disjoint, ctx)?)
            }
            (Geometry::Polyhedron(x), Geometry::Polyhedron(y)) => {
                Geometry::Polyhedron(self.apply(op, x, y, disjoint, ctx)?)
            }
            (x, y) => return Err(mismatch(op, x, y)),
        };
        Ok(Evaluated::new(geometry))
    }

    fn apply<C: ConvexCell>(
        &self,
        op: CsgOp,
        a: &Nef<C>,
        b: &Nef<C>,
        disjoint: bool,
        ctx: &OpContext,
    ) -> Result<Nef<C>, KernelError> {
        let fast = disjoint && self.config.bbox_fast_path;
        if fast {
            tracing::trace!(op = op.name(), "disjoint bounds");
        }
        match op {
            CsgOp::Union | CsgOp::SymmetricDifference if fast => Ok(a.append_disjoint(b)),
            CsgOp::Intersection if fast => Ok(Nef::empty()),
            CsgOp::Difference if fast => Ok(a.clone()),
            CsgOp::Union => a.union_checked(b, ctx),
            CsgOp::Intersection => a.intersection_checked(b, ctx),
            CsgOp::Difference => a.difference_checked(b, ctx),
            CsgOp::SymmetricDifference => a.symmetric_difference_checked(b, ctx),
            CsgOp::Minkowski => minkowski_checked(a, b, ctx),
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

fn mismatch(op: CsgOp, left: &Geometry, right: &Geometry) -> KernelError {
    KernelError::DimensionMismatch {
        op: op.name().to_string(),
        left: left.kind_name().to_string(),
        right: right.kind_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TransformOp;
    use crate::error::GeometryInputError;
    use crate::number::Scalar;

    fn cube(size: f64) -> Node {
        Node::primitive(Primitive::cube([size, size, size], false))
    }

    fn moved(node: Node, by: [f64; 3]) -> Node {
        Node::transform(TransformOp::Translate(by), node)
    }

    fn volume(geometry: &Geometry) -> Scalar {
        geometry.measure().unwrap()
    }

    #[test]
    fn test_difference_with_transforms() {
        let evaluator = Evaluator::new();
        let tree = Node::operation(
            CsgOp::Difference,
            vec![cube(2.0), moved(cube(1.0), [1.0, 1.0, 1.0])],
        );
        let result = evaluator.evaluate(&tree).unwrap();
        assert_eq!(volume(&result), Scalar::from_int(7));

        let mesh = evaluator.evaluate_to_mesh(&tree).unwrap();
        assert_eq!(mesh.signed_volume(), Scalar::from_int(7));
    }

    #[test]
    fn test_shared_subtree_evaluated_once() {
        let evaluator = Evaluator::with_config(KernelConfig {
            parallel: false,
            ..KernelConfig::default()
        });
        let shared = Arc::new(cube(1.0).named("shared"));
        let left = Node::new(NodeKind::Operation {
            op: CsgOp::Union,
            children: vec![Arc::clone(&shared)],
        })
        .named("left");
        let right = Node::new(NodeKind::Transform {
            op: TransformOp::Translate([3.0, 0.0, 0.0]),
            child: Arc::clone(&shared),
        })
        .named("right");
        let root = Node::operation(CsgOp::Union, vec![left, right]).named("root");

        let result = evaluator.evaluate(&root).unwrap();
        assert_eq!(volume(&result), Scalar::from_int(2));

        let stats = evaluator.cache_stats();
        // shared, left, right and root each computed once; shared hit once
        assert_eq!(stats.misses, 4);
        assert_eq!(stats.hits, 1);
        assert!(matches!(evaluator.state("shared"), NodeState::Evaluated(_)));
    }

    #[test]
    fn test_failure_carries_node_path() {
        let evaluator = Evaluator::new();
        let bad = Node::primitive(Primitive::cube([1.0, -1.0, 1.0], false)).named("bad");
        let tree = Node::operation(CsgOp::Union, vec![cube(1.0), moved(bad, [1.0, 0.0, 0.0])])
            .named("root");

        let err = evaluator.evaluate(&tree).unwrap_err();
        assert_eq!(err.path, vec!["root", "translate", "bad"]);
        assert!(matches!(
            err.source,
            KernelError::Geometry(GeometryInputError::InvalidParameter(_))
        ));
        assert!(matches!(evaluator.state("root"), NodeState::Failed(_)));
        assert!(matches!(evaluator.state("bad"), NodeState::Failed(_)));
    }

    #[test]
    fn test_dimension_mismatch() {
        let evaluator = Evaluator::new();
        let square = Node::primitive(Primitive::square([1.0, 1.0], false));
        let tree = Node::operation(CsgOp::Union, vec![cube(1.0), square]);
        let err = evaluator.evaluate(&tree).unwrap_err();
        assert_eq!(err.path, vec!["union"]);
        assert!(matches!(err.source, KernelError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_childless_operation_is_neutral() {
        let evaluator = Evaluator::new();
        let empty = Node::operation(CsgOp::Union, Vec::new());
        let tree = Node::operation(CsgOp::Union, vec![empty.clone(), cube(1.0)]);
        assert_eq!(volume(&evaluator.evaluate(&tree).unwrap()), Scalar::one());

        let tree = Node::operation(CsgOp::Intersection, vec![cube(1.0), empty]);
        assert!(evaluator.evaluate(&tree).unwrap().is_empty());
    }

    #[test]
    fn test_invalidate_recomputes_ancestors() {
        let evaluator = Evaluator::from_ast(
            &Node::operation(CsgOp::Union, vec![cube(1.0).named("leaf")]).named("root"),
            KernelConfig::default(),
        );
        let tree = Node::operation(CsgOp::Union, vec![cube(1.0).named("leaf")]).named("root");
        evaluator.evaluate(&tree).unwrap();
        assert_eq!(evaluator.cache_stats().cached_nodes, 2);

        evaluator.invalidate(&"leaf".to_string());
        assert_eq!(evaluator.state("leaf"), NodeState::Unevaluated);
        assert_eq!(evaluator.state("root"), NodeState::Unevaluated);
    }

    #[test]
    fn test_cancelled_evaluation_is_not_cached() {
        let evaluator = Evaluator::new();
        let tree = cube(1.0).named("leaf");
        evaluator.cancel_handle().cancel();
        let err = evaluator.evaluate(&tree).unwrap_err();
        assert_eq!(err.source, KernelError::Cancelled);
        assert_eq!(evaluator.state("leaf"), NodeState::Unevaluated);

        evaluator.cancel_handle().reset();
        assert!(evaluator.evaluate(&tree).is_ok());
    }

    #[test]
    fn test_self_containing_id_rejected() {
        let evaluator = Evaluator::new();
        let inner = cube(1.0).named("x");
        let tree = Node::operation(CsgOp::Union, vec![inner]).named("x");
        let err = evaluator.evaluate(&tree).unwrap_err();
        assert!(matches!(err.source, KernelError::InvalidTree(_)));
    }

    #[test]
    fn test_one_id_on_two_different_subtrees_rejected() {
        let evaluator = Evaluator::new();
        let tree = Node::operation(
            CsgOp::Union,
            vec![cube(1.0).named("a"), moved(cube(2.0).named("a"), [5.0, 0.0, 0.0])],
        );
        let err = evaluator.evaluate(&tree).unwrap_err();
        assert_eq!(err.path, vec!["a"]);
        assert!(matches!(err.source, KernelError::InvalidTree(_)));
        // nothing was computed
        assert_eq!(evaluator.cache_stats().misses, 0);
        assert_eq!(evaluator.state("a"), NodeState::Unevaluated);
    }

    #[test]
    fn test_repeated_id_on_equal_subtrees_is_shared() {
        let evaluator = Evaluator::with_config(KernelConfig {
            parallel: false,
            ..KernelConfig::default()
        });
        let tree = Node::operation(
            CsgOp::Union,
            vec![cube(1.0).named("a"), moved(cube(1.0).named("a"), [5.0, 0.0, 0.0])],
        );
        let result = evaluator.evaluate(&tree).unwrap();
        assert_eq!(volume(&result), Scalar::from_int(2));
        assert_eq!(evaluator.cache_stats().hits, 1);
    }

    #[test]
    fn test_anonymous_shared_subtree_evaluated_once() {
        let evaluator = Evaluator::with_config(KernelConfig {
            parallel: false,
            ..KernelConfig::default()
        });
        let shared = Arc::new(Node::operation(
            CsgOp::Union,
            vec![cube(1.0), moved(cube(1.0), [0.5, 0.0, 0.0])],
        ));
        let tree = Node::new(NodeKind::Operation {
            op: CsgOp::Union,
            children: vec![
                Arc::clone(&shared),
                Arc::new(Node::new(NodeKind::Transform {
                    op: TransformOp::Translate([5.0, 0.0, 0.0]),
                    child: Arc::clone(&shared),
                })),
            ],
        });

        let result = evaluator.evaluate(&tree).unwrap();
        assert_eq!(volume(&result), Scalar::from_int(3));
        let stats = evaluator.cache_stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        // per-evaluation sharing leaves nothing in the id memo
        assert_eq!(stats.cached_nodes, 0);
    }

    #[test]
    fn test_reused_id_in_a_new_tree_is_recomputed() {
        let evaluator = Evaluator::new();
        let small = cube(1.0).named("part");
        let large = cube(2.0).named("part");
        assert_eq!(volume(&evaluator.evaluate(&small).unwrap()), Scalar::one());
        assert_eq!(volume(&evaluator.evaluate(&large).unwrap()), Scalar::from_int(8));
        assert_eq!(evaluator.cache_stats().hits, 0);
    }
}
