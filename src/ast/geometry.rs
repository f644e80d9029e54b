// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Node results: a Nef value of either dimension plus its cached bounds

use crate::geometry::{BoundingBox3, BoundingRect2, BoundingVolume};
use crate::nef::{Complexity, NefPolygon, NefPolyhedron};
use crate::number::Scalar;
use std::sync::Arc;

/// Result of evaluating a node
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Result of an operator with no children; neutral in either dimension.
    Empty,
    Polygon(NefPolygon),
    Polyhedron(NefPolyhedron),
}

impl Geometry {
    pub fn dimension(&self) -> Option<usize> {
        match self {
            Geometry::Empty => None,
            Geometry::Polygon(_) => Some(2),
            Geometry::Polyhedron(_) => Some(3),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Geometry::Empty => "empty",
            Geometry::Polygon(_) => "2d",
            Geometry::Polyhedron(_) => "3d",
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Empty => true,
            Geometry::Polygon(n) => n.is_empty(),
            Geometry::Polyhedron(n) => n.is_empty(),
        }
    }

    pub fn complexity(&self) -> Complexity {
        match self {
            Geometry::Empty => Complexity::default(),
            Geometry::Polygon(n) => n.complexity(),
            Geometry::Polyhedron(n) => n.complexity(),
        }
    }

    /// Area or volume; `None` when unbounded.
    pub fn measure(&self) -> Option<Scalar> {
        match self {
            Geometry::Empty => Some(Scalar::zero()),
            Geometry::Polygon(n) => n.area(),
            Geometry::Polyhedron(n) => n.volume(),
        }
    }

    pub fn as_polyhedron(&self) -> Option<&NefPolyhedron> {
        match self {
            Geometry::Polyhedron(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_polygon(&self) -> Option<&NefPolygon> {
        match self {
            Geometry::Polygon(n) => Some(n),
            _ => None,
        }
    }

    pub fn bounds(&self) -> GeometryBounds {
        match self {
            Geometry::Empty => GeometryBounds::Empty,
            Geometry::Polygon(n) => GeometryBounds::Planar(n.bounding_volume()),
            Geometry::Polyhedron(n) => GeometryBounds::Solid(n.bounding_volume()),
        }
    }
}

/// Bounding volume of a [`Geometry`]
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryBounds {
    Empty,
    Planar(BoundingVolume<BoundingRect2>),
    Solid(BoundingVolume<BoundingBox3>),
}

impl GeometryBounds {
    /// True when the two results cannot share interior points.
    pub fn disjoint(&self, other: &Self) -> bool {
        match (self, other) {
            (GeometryBounds::Empty, _) | (_, GeometryBounds::Empty) => true,
            (GeometryBounds::Planar(a), GeometryBounds::Planar(b)) => a.disjoint(b),
            (GeometryBounds::Solid(a), GeometryBounds::Solid(b)) => a.disjoint(b),
            _ => false,
        }
    }
}

/// Memoized node result: the shared geometry and its bounds, computed once.
#[derive(Debug, Clone)]
pub(crate) struct Evaluated {
    pub geometry: Arc<Geometry>,
    pub bounds: GeometryBounds,
}

impl Evaluated {
    pub fn new(geometry: Geometry) -> Self {
        let bounds = geometry.bounds();
        Self {
            geometry: Arc::new(geometry),
            bounds,
        }
    }
}
