//! World snapshot save/load.
//!
//! The stable snapshot schema is JSON:
//! `{ "radius", "rules_text", "cells": [{ "q", "r", "state", "direction" }] }`.
//! Unknown keys are ignored on read; writes emit exactly these keys.
//! Loading validates bounds and drops out-of-range cells.
//!
//! Format is determined by file extension:
//! - `.json` - JSON (human readable, the normative schema)
//! - anything else - a tagged bincode stream: one header record, then the
//!   snapshot itself

use crate::hexidirect::{parser, Axial, Direction, HexCell, HexGrid};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// One non-empty cell in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotCell {
    pub q: i32,
    pub r: i32,
    pub state: String,
    pub direction: Option<u8>,
}

/// A whole-world snapshot: the persistence schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub radius: i32,
    pub rules_text: String,
    pub cells: Vec<SnapshotCell>,
}

impl WorldSnapshot {
    /// Capture a grid and its rule text. Cells come out in `(q, r)` order.
    pub fn from_grid(grid: &HexGrid, rules_text: &str) -> Self {
        let cells = grid
            .active_cells()
            .map(|(at, cell)| SnapshotCell {
                q: at.q,
                r: at.r,
                state: cell.state.clone(),
                direction: cell.direction.map(Direction::get),
            })
            .collect();
        Self {
            radius: grid.radius(),
            rules_text: rules_text.to_string(),
            cells,
        }
    }

    /// Rebuild the grid, dropping out-of-range cells, malformed states and
    /// invalid directions.
    pub fn build_grid(&self) -> HexGrid {
        let mut grid = HexGrid::new(self.radius);
        for cell in &self.cells {
            if !parser::is_valid_state(&cell.state) {
                continue;
            }
            let direction = cell.direction.and_then(Direction::new);
            // out-of-bounds cells are dropped, not errors
            let _ = grid.set(
                Axial::new(cell.q, cell.r),
                HexCell::new(cell.state.clone(), direction),
            );
        }
        grid
    }
}

/// Errors that can occur during snapshot I/O.
#[derive(Debug)]
pub enum WorldIoError {
    /// The snapshot file could not be read or written
    File(std::io::Error),
    /// The snapshot payload could not be encoded or decoded
    Encoding(String),
    /// The file's contents are not a snapshot this build understands
    BadSnapshot(String),
}

impl std::fmt::Display for WorldIoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorldIoError::File(e) => write!(f, "snapshot file access failed: {}", e),
            WorldIoError::Encoding(e) => write!(f, "snapshot encoding failed: {}", e),
            WorldIoError::BadSnapshot(why) => write!(f, "not a usable snapshot: {}", why),
        }
    }
}

impl std::error::Error for WorldIoError {}

impl From<std::io::Error> for WorldIoError {
    fn from(e: std::io::Error) -> Self {
        WorldIoError::File(e)
    }
}

impl From<bincode::Error> for WorldIoError {
    fn from(e: bincode::Error) -> Self {
        WorldIoError::Encoding(e.to_string())
    }
}

/// Result type for snapshot I/O.
pub type WorldIoResult<T> = Result<T, WorldIoError>;

/// Save a snapshot; `.json` selects the JSON schema, anything else the
/// tagged binary stream.
pub fn save_snapshot<P: AsRef<Path>>(snapshot: &WorldSnapshot, path: P) -> WorldIoResult<()> {
    let path = path.as_ref();
    if is_json_path(path) {
        save_snapshot_json(snapshot, path)
    } else {
        save_snapshot_binary(snapshot, path)
    }
}

/// Load a snapshot, detecting the format from the extension.
pub fn load_snapshot<P: AsRef<Path>>(path: P) -> WorldIoResult<WorldSnapshot> {
    let path = path.as_ref();
    if is_json_path(path) {
        load_snapshot_json(path)
    } else {
        load_snapshot_binary(path)
    }
}

fn is_json_path(path: &Path) -> bool {
    path.to_string_lossy().to_lowercase().ends_with(".json")
}

pub fn save_snapshot_json<P: AsRef<Path>>(snapshot: &WorldSnapshot, path: P) -> WorldIoResult<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, snapshot)
        .map_err(|e| WorldIoError::Encoding(e.to_string()))?;
    Ok(())
}

pub fn load_snapshot_json<P: AsRef<Path>>(path: P) -> WorldIoResult<WorldSnapshot> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(|e| WorldIoError::Encoding(e.to_string()))
}

/// Leading record of a binary snapshot stream. Serialized with the same
/// bincode config as the payload, so the whole file is one stream.
#[derive(Serialize, Deserialize)]
struct BinaryHeader {
    tag: u64,
    version: u16,
}

const BINARY_TAG: u64 = u64::from_le_bytes(*b"hexsnap\0");
const BINARY_VERSION: u16 = 1;

impl BinaryHeader {
    fn current() -> Self {
        Self {
            tag: BINARY_TAG,
            version: BINARY_VERSION,
        }
    }

    fn check(&self) -> WorldIoResult<()> {
        if self.tag != BINARY_TAG {
            return Err(WorldIoError::BadSnapshot(
                "the binary snapshot tag is missing".to_string(),
            ));
        }
        if self.version > BINARY_VERSION {
            return Err(WorldIoError::BadSnapshot(format!(
                "written by a newer build (stream version {})",
                self.version
            )));
        }
        Ok(())
    }
}

pub fn save_snapshot_binary<P: AsRef<Path>>(
    snapshot: &WorldSnapshot,
    path: P,
) -> WorldIoResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut writer, &BinaryHeader::current())?;
    bincode::serialize_into(&mut writer, snapshot)?;
    writer.flush()?;
    Ok(())
}

pub fn load_snapshot_binary<P: AsRef<Path>>(path: P) -> WorldIoResult<WorldSnapshot> {
    let mut reader = BufReader::new(File::open(path)?);
    let header: BinaryHeader = bincode::deserialize_from(&mut reader)?;
    header.check()?;
    Ok(bincode::deserialize_from(&mut reader)?)
}
