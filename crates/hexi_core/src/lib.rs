//! Core engine for HexiRules.
//!
//! This crate provides:
//! - The HexiDirect rule engine: parser, macro expander, matcher, stepper
//! - Hex geometry and the radius-bounded grid
//! - The world facade with bounded history and sessions
//! - Snapshot persistence (JSON and binary)
//!
//! The engine is single-threaded per world and fully deterministic for a
//! given seed; embeddings serialise access around the facade.

pub mod hexidirect;
pub mod world;
pub mod world_io;

pub use hexidirect::{
    canonical_text, compile_rules, expand_rules, parse_rules, rule_matches, step_grid,
    AbstractRule, Axial, ConcreteRule, Condition, Direction, EngineRng, GridError, HexCell,
    HexGrid, Orient, ParseError, ParsedRule, RuleEvalError, SourceDir, StepOutcome, TargetDir,
    EMPTY_STATE, NEIGHBOR_OFFSETS,
};
pub use world::{
    History, HistoryEntry, Session, SessionError, SessionManager, World, WorldError, WorldSummary,
    DEFAULT_HISTORY_CAPACITY,
};
pub use world_io::{
    load_snapshot, load_snapshot_binary, load_snapshot_json, save_snapshot, save_snapshot_binary,
    save_snapshot_json, SnapshotCell, WorldIoError, WorldIoResult, WorldSnapshot,
};
