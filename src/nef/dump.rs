// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Self-describing JSON dump of a Nef value's cell decomposition
//!
//! Coordinates are written as exact `p/q` strings, so a dump reloads to the
//! identical value.

use super::cell::ConvexCell;
use super::convex2::Cell2;
use super::convex3::Cell3;
use super::value::Nef;
use crate::error::DumpError;
use crate::number::{Point2, Point3, Scalar};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DUMP_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NefDump {
    pub format: String,
    pub version: u32,
    pub dimension: usize,
    pub complemented: bool,
    pub cells: Vec<CellDump>,
}

/// One convex cell: vertex coordinates and, in 3D, face loops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellDump {
    pub vertices: Vec<Vec<Scalar>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub faces: Vec<Vec<usize>>,
}

/// Cells that can be written to and rebuilt from a dump.
pub trait DumpCell: ConvexCell {
    const FORMAT: &'static str;

    fn to_dump(&self) -> CellDump;

    fn from_dump(dump: &CellDump) -> Result<Self, String>;
}

fn coords<const N: usize>(values: &[Scalar], vertex: usize) -> Result<[Scalar; N], String> {
    <[Scalar; N]>::try_from(values.to_vec())
        .map_err(|v| format!("vertex {vertex} has {} coordinates, expected {N}", v.len()))
}

impl DumpCell for Cell3 {
    const FORMAT: &'static str = "nefcore-nef3";

    fn to_dump(&self) -> CellDump {
        CellDump {
            vertices: self
                .vertices()
                .iter()
                .map(|p| vec![p.x.clone(), p.y.clone(), p.z.clone()])
                .collect(),
            faces: self.faces().iter().map(|f| f.vertices.clone()).collect(),
        }
    }

    fn from_dump(dump: &CellDump) -> Result<Self, String> {
        let vertices = dump
            .vertices
            .iter()
            .enumerate()
            .map(|(i, v)| coords::<3>(v, i).map(Point3::from_axes))
            .collect::<Result<Vec<_>, _>>()?;
        Cell3::from_loops(vertices, dump.faces.clone())
    }
}

impl DumpCell for Cell2 {
    const FORMAT: &'static str = "nefcore-nef2";

    fn to_dump(&self) -> CellDump {
        CellDump {
            vertices: self
                .vertices()
                .iter()
                .map(|p| vec![p.x.clone(), p.y.clone()])
                .collect(),
            faces: Vec::new(),
        }
    }

    fn from_dump(dump: &CellDump) -> Result<Self, String> {
        let vertices = dump
            .vertices
            .iter()
            .enumerate()
            .map(|(i, v)| coords::<2>(v, i).map(|[x, y]| Point2::new(x, y)))
            .collect::<Result<Vec<_>, _>>()?;
        Cell2::from_loop(vertices)
    }
}

pub fn to_dump<C: DumpCell>(nef: &Nef<C>) -> NefDump {
    NefDump {
        format: C::FORMAT.to_string(),
        version: DUMP_VERSION,
        dimension: C::DIMENSION,
        complemented: nef.is_complemented(),
        cells: nef.cells().iter().map(C::to_dump).collect(),
    }
}

pub fn from_dump<C: DumpCell>(dump: &NefDump) -> Result<Nef<C>, DumpError> {
    if dump.format != C::FORMAT || dump.version != DUMP_VERSION || dump.dimension != C::DIMENSION {
        return Err(DumpError::Format {
            format: dump.format.clone(),
            version: dump.version,
        });
    }
    let cells = dump
        .cells
        .iter()
        .enumerate()
        .map(|(cell, c)| C::from_dump(c).map_err(|reason| DumpError::Cell { cell, reason }))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Nef::from_raw(cells, dump.complemented))
}

pub fn to_json<C: DumpCell>(nef: &Nef<C>) -> Result<String, DumpError> {
    Ok(serde_json::to_string_pretty(&to_dump(nef))?)
}

pub fn from_json<C: DumpCell>(text: &str) -> Result<Nef<C>, DumpError> {
    let dump: NefDump = serde_json::from_str(text)?;
    from_dump(&dump)
}

pub fn save<C: DumpCell>(nef: &Nef<C>, path: impl AsRef<Path>) -> Result<(), DumpError> {
    fs::write(path, to_json(nef)?)?;
    Ok(())
}

pub fn load<C: DumpCell>(path: impl AsRef<Path>) -> Result<Nef<C>, DumpError> {
    from_json(&fs::read_to_string(path)?)
}
