// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Tree evaluation through the public API

use nefcore::ast::{NodeState, TransformOp};
use nefcore::{render_json, CsgOp, Evaluator, Kernel, KernelConfig, KernelError, Node, Primitive, Scalar};
use std::sync::Arc;

fn cube(size: f64) -> Node {
    Node::primitive(Primitive::cube([size, size, size], false))
}

fn moved(node: Node, by: [f64; 3]) -> Node {
    Node::transform(TransformOp::Translate(by), node)
}

fn measure(evaluator: &Evaluator, tree: &Node) -> Scalar {
    evaluator.evaluate(tree).unwrap().measure().unwrap()
}

#[test]
fn test_json_tree_with_minkowski() {
    let json = r#"{
        "kind": { "operation": {
            "op": "minkowski",
            "children": [
                { "kind": { "primitive": { "type": "cube", "size": [2, 1, 1] } } },
                { "kind": { "primitive": { "type": "cube", "size": [1, 1, 1], "center": true } } }
            ]
        } }
    }"#;
    let mesh = render_json(json).unwrap();
    assert_eq!(mesh.signed_volume(), Scalar::from_int(12));
    assert!(mesh.is_triangulated());
}

#[test]
fn test_planar_tree() {
    let evaluator = Evaluator::new();
    let tree = Node::operation(
        CsgOp::Difference,
        vec![
            Node::primitive(Primitive::square([4.0, 4.0], false)),
            Node::transform(
                TransformOp::Translate([1.0, 1.0, 0.0]),
                Node::primitive(Primitive::square([2.0, 2.0], false)),
            ),
        ],
    );
    assert_eq!(measure(&evaluator, &tree), Scalar::from_int(12));

    let outline = evaluator.evaluate_to_polygon(&tree).unwrap();
    assert_eq!(outline.paths.len(), 2);
    assert_eq!(outline.signed_area(), Scalar::from_int(12));

    let err = evaluator.evaluate_to_mesh(&tree).unwrap_err();
    assert!(matches!(err.source, KernelError::Conversion(_)));
}

#[test]
fn test_fast_path_matches_full_overlay() {
    let tree = Node::operation(
        CsgOp::Union,
        vec![
            cube(1.0),
            moved(cube(1.0), [5.0, 0.0, 0.0]),
            moved(cube(2.0), [0.0, 5.0, 0.0]),
        ],
    );
    let difference = Node::operation(
        CsgOp::Difference,
        vec![cube(1.0), moved(cube(1.0), [3.0, 3.0, 3.0])],
    );
    let intersection = Node::operation(
        CsgOp::Intersection,
        vec![cube(1.0), moved(cube(1.0), [3.0, 0.0, 0.0])],
    );

    let fast = Evaluator::new();
    let full = Evaluator::with_config(KernelConfig {
        bbox_fast_path: false,
        ..KernelConfig::default()
    });
    for tree in [&tree, &difference, &intersection] {
        let a = fast.evaluate(tree).unwrap();
        let b = full.evaluate(tree).unwrap();
        assert_eq!(a.measure(), b.measure());
        assert_eq!(a.is_empty(), b.is_empty());
        if let (Some(a), Some(b)) = (a.as_polyhedron(), b.as_polyhedron()) {
            assert!(a.equivalent(b));
        }
    }
    assert_eq!(measure(&fast, &tree), Scalar::from_int(10));
}

#[test]
fn test_second_evaluation_is_served_from_cache() {
    let evaluator = Evaluator::new();
    let tree = Node::operation(
        CsgOp::Union,
        vec![cube(1.0).named("a"), moved(cube(1.0), [0.5, 0.0, 0.0]).named("b")],
    )
    .named("root");

    let first = evaluator.evaluate(&tree).unwrap();
    let misses = evaluator.cache_stats().misses;
    let second = evaluator.evaluate(&tree).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    let stats = evaluator.cache_stats();
    assert_eq!(stats.misses, misses);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.cached_nodes, 3);
}

#[test]
fn test_cell_budget_reports_path_and_is_retried() {
    let evaluator = Evaluator::with_config(KernelConfig {
        max_cells: Some(2),
        ..KernelConfig::default()
    });
    let tree = Node::operation(
        CsgOp::Difference,
        vec![
            cube(3.0),
            moved(cube(1.0), [1.0, 1.0, 1.0]).named("hole"),
        ],
    )
    .named("root");

    let err = evaluator.evaluate(&tree).unwrap_err();
    assert_eq!(err.path, vec!["root"]);
    assert!(matches!(err.source, KernelError::ComplexityExceeded { limit: 2, .. }));
    // aborts are not cached; the finished child is
    assert_eq!(evaluator.state("root"), NodeState::Unevaluated);
    assert!(matches!(evaluator.state("hole"), NodeState::Evaluated(_)));
}

#[test]
fn test_cancel_then_reset() {
    let evaluator = Evaluator::new();
    let tree = cube(1.0).named("leaf");

    let handle = evaluator.cancel_handle();
    handle.cancel();
    assert_eq!(evaluator.evaluate(&tree).unwrap_err().source, KernelError::Cancelled);

    handle.reset();
    assert_eq!(measure(&evaluator, &tree), Scalar::one());
}

#[test]
fn test_kernel_update_subtree() {
    let tree = Node::operation(
        CsgOp::Union,
        vec![
            cube(2.0).named("base"),
            moved(cube(1.0), [4.0, 0.0, 0.0]).named("satellite"),
        ],
    )
    .named("root");
    let mut kernel = Kernel::with_ast(tree);
    assert_eq!(kernel.render().unwrap().signed_volume(), Scalar::from_int(9));

    let replacement = moved(cube(2.0), [4.0, 0.0, 0.0]).named("satellite");
    let mesh = kernel.update_subtree(&"satellite".to_string(), replacement).unwrap();
    assert_eq!(mesh.signed_volume(), Scalar::from_int(16));
    // the untouched sibling kept its cached value
    assert!(matches!(kernel.state("base"), NodeState::Evaluated(_)));

    let missing = kernel.update_subtree(&"nowhere".to_string(), cube(1.0));
    assert!(matches!(missing.unwrap_err().source, KernelError::InvalidTree(_)));
}
