// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

use nefcore::ast::TransformOp;
use nefcore::error::DumpError;
use nefcore::nef::{dump, NefPolygon, NefPolyhedron};
use nefcore::{CsgOp, Evaluator, Node, Primitive, Scalar};
use tempfile::TempDir;

#[test]
fn test_evaluated_value_survives_a_file_round_trip() {
    let tree = Node::operation(
        CsgOp::Difference,
        vec![
            Node::primitive(Primitive::cube([3.0, 3.0, 3.0], false)),
            Node::transform(
                TransformOp::Scale([0.5, 0.5, 0.5]),
                Node::primitive(Primitive::cube([2.0, 2.0, 2.0], false)),
            ),
        ],
    );
    let geometry = Evaluator::new().evaluate(&tree).unwrap();
    let value = geometry.as_polyhedron().unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("part.nef.json");
    dump::save(value, &path).unwrap();

    let loaded: NefPolyhedron = dump::load(&path).unwrap();
    assert!(loaded.equivalent(value));
    assert_eq!(loaded.volume(), Some(Scalar::from_int(26)));
}

#[test]
fn test_dimension_is_checked_on_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("solid.json");
    dump::save(&NefPolyhedron::universe(), &path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("nefcore-nef3"));

    let err = dump::load::<nefcore::nef::Cell2>(&path).unwrap_err();
    assert!(matches!(err, DumpError::Format { .. }));
    let back: NefPolyhedron = dump::load(&path).unwrap();
    assert!(back.is_universe());
}

#[test]
fn test_unknown_version_rejected() {
    let text = dump::to_json(&NefPolygon::empty())
        .unwrap()
        .replace("\"version\": 1", "\"version\": 7");
    let err = dump::from_json::<nefcore::nef::Cell2>(&text).unwrap_err();
    assert!(matches!(err, DumpError::Format { version: 7, .. }));
}

#[test]
fn test_missing_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let err = dump::load::<nefcore::nef::Cell3>(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, DumpError::Io(_)));
}
