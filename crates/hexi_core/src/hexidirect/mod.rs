//! HexiDirect rule engine for hexagonal cellular automata.
//!
//! This module provides:
//! - `Axial` / `Direction`: hex geometry with mod-6, 1-based direction math
//! - `HexCell` / `HexGrid`: symbolic cell states on a radius-bounded grid
//! - `parser`: HexiDirect source text -> abstract rules
//! - `expander`: abstract rules -> concrete directional variants
//! - `matcher` / `stepper`: rule application and the two-phase generation step
//! - `rng`: the seed-pinned RNG every random choice is drawn from
//!
//! ## Example
//!
//! ```ignore
//! use hexi_core::hexidirect::{compile_rules, step_grid, Axial, EngineRng, HexCell, HexGrid};
//!
//! let rules = compile_rules("a => b")?;
//! let mut grid = HexGrid::new(4);
//! grid.set(Axial::new(0, 0), HexCell::new("a", None))?;
//!
//! let mut rng = EngineRng::from_seed(0);
//! let outcome = step_grid(&grid, &rules, &mut rng);
//! assert_eq!(outcome.grid.cell(Axial::new(0, 0)).state, "b");
//! ```

pub mod expander;
pub mod matcher;
pub mod parser;
pub mod rng;
pub mod rule;
pub mod stepper;

pub use expander::{compile_rules, expand_rules};
pub use matcher::rule_matches;
pub use parser::{canonical_text, parse_rules, ParseError, ParsedRule};
pub use rng::EngineRng;
pub use rule::{
    AbstractRule, AltAst, BracketAst, ConcreteRule, Condition, Orient, OrientAst, SourceDir,
    TargetDir, TargetDirAst,
};
pub use stepper::{step_grid, RuleEvalError, StepOutcome};

use std::collections::BTreeMap;
use std::fmt;

/// The empty-cell sentinel state.
pub const EMPTY_STATE: &str = "_";

/// Axial offsets of the six neighbors, indexed by direction 1..6 in
/// clockwise order. Direction 1 is the `(0, -1)` neighbor and direction
/// `d + 3` is always the opposite of direction `d`.
pub const NEIGHBOR_OFFSETS: [(i32, i32); 6] = [(0, -1), (1, -1), (1, 0), (0, 1), (-1, 1), (-1, 0)];

/// A hex direction in `1..=6`, numbered clockwise.
///
/// All direction arithmetic is `((d - 1 + k) mod 6) + 1`, so rotations wrap
/// and the opposite direction is a rotation by 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Direction(u8);

impl Direction {
    /// All six directions in order.
    pub const ALL: [Direction; 6] = [
        Direction(1),
        Direction(2),
        Direction(3),
        Direction(4),
        Direction(5),
        Direction(6),
    ];

    /// Create a direction, rejecting values outside `1..=6`.
    pub fn new(d: u8) -> Option<Self> {
        if (1..=6).contains(&d) {
            Some(Self(d))
        } else {
            None
        }
    }

    /// The numeric direction in `1..=6`.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based index into the offset table.
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// Rotate `k` steps clockwise: `((d - 1 + k) mod 6) + 1`.
    pub fn rotated(self, k: u8) -> Self {
        Self((self.0 - 1 + k % 6) % 6 + 1)
    }

    /// The opposite direction (rotation by 3).
    pub fn opposite(self) -> Self {
        self.rotated(3)
    }

    /// Axial offset of the neighbor in this direction.
    pub fn offset(self) -> (i32, i32) {
        NEIGHBOR_OFFSETS[self.index()]
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An axial coordinate `(q, r)` on the hex plane.
///
/// Ordering is lexicographic by `(q, r)`, which fixes the iteration order of
/// every grid scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Axial {
    pub q: i32,
    pub r: i32,
}

impl Axial {
    pub fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// The neighboring coordinate in the given direction.
    pub fn neighbor(self, dir: Direction) -> Self {
        let (dq, dr) = dir.offset();
        Self::new(self.q + dq, self.r + dr)
    }
}

impl fmt::Display for Axial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.q, self.r)
    }
}

/// A cell value: a symbolic state plus an optional direction.
///
/// The empty state `_` never carries a direction; constructors normalise
/// that invariant away instead of trusting callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexCell {
    pub state: String,
    pub direction: Option<Direction>,
}

impl HexCell {
    /// The empty cell.
    pub fn empty() -> Self {
        Self {
            state: EMPTY_STATE.to_string(),
            direction: None,
        }
    }

    /// Create a cell, dropping the direction when the state is empty.
    pub fn new(state: impl Into<String>, direction: Option<Direction>) -> Self {
        let state = state.into();
        let direction = if state == EMPTY_STATE { None } else { direction };
        Self { state, direction }
    }

    pub fn is_empty(&self) -> bool {
        self.state == EMPTY_STATE
    }
}

impl Default for HexCell {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for HexCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Some(d) => write!(f, "{}{}", self.state, d),
            None => write!(f, "{}", self.state),
        }
    }
}

/// Error type for grid cell access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridError {
    /// Coordinate outside the grid's radius
    OutOfBounds { at: Axial, radius: i32 },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::OutOfBounds { at, radius } => {
                write!(f, "coordinate {} outside radius {}", at, radius)
            }
        }
    }
}

impl std::error::Error for GridError {}

/// A radius-bounded hex grid of symbolic cells.
///
/// A grid of radius `R` contains every axial coordinate with
/// `|q| <= R`, `|r| <= R` and `|q + r| <= R`. Only non-empty cells are
/// stored; writing `_` removes the entry, so the active count is just the
/// map length. Iteration is stable `(q, r)` lexicographic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexGrid {
    radius: i32,
    cells: BTreeMap<Axial, HexCell>,
}

impl HexGrid {
    /// Create an empty grid. The radius is clamped to at least 1.
    pub fn new(radius: i32) -> Self {
        Self {
            radius: radius.max(1),
            cells: BTreeMap::new(),
        }
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    /// Membership test: `|q|, |r|, |q + r| <= R`.
    pub fn in_bounds(&self, at: Axial) -> bool {
        at.q.abs() <= self.radius && at.r.abs() <= self.radius && (at.q + at.r).abs() <= self.radius
    }

    /// Read a cell. Absent and out-of-bounds coordinates both read as the
    /// empty cell, which is exactly what neighbor evaluation needs.
    pub fn cell(&self, at: Axial) -> HexCell {
        self.cells.get(&at).cloned().unwrap_or_default()
    }

    /// Write a cell. Empty cells remove the stored entry.
    pub fn set(&mut self, at: Axial, cell: HexCell) -> Result<(), GridError> {
        if !self.in_bounds(at) {
            return Err(GridError::OutOfBounds {
                at,
                radius: self.radius,
            });
        }
        if cell.is_empty() {
            self.cells.remove(&at);
        } else {
            self.cells.insert(at, cell);
        }
        Ok(())
    }

    /// Remove every cell.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Number of non-empty cells.
    pub fn active_count(&self) -> usize {
        self.cells.len()
    }

    /// Non-empty cells in `(q, r)` order.
    pub fn active_cells(&self) -> impl Iterator<Item = (Axial, &HexCell)> {
        self.cells.iter().map(|(&at, cell)| (at, cell))
    }

    /// Every in-bounds coordinate in `(q, r)` lexicographic order.
    pub fn coords(&self) -> impl Iterator<Item = Axial> {
        let radius = self.radius;
        (-radius..=radius).flat_map(move |q| {
            let lo = (-radius).max(-q - radius);
            let hi = radius.min(-q + radius);
            (lo..=hi).map(move |r| Axial::new(q, r))
        })
    }

    /// Total number of coordinates in bounds: `3R(R+1) + 1`.
    pub fn coord_count(&self) -> usize {
        let r = self.radius as usize;
        3 * r * (r + 1) + 1
    }
}
