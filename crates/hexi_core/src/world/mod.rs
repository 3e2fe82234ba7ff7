//! World facade: the engine surface the embeddings talk to.
//!
//! A `World` owns its grid, the compiled rule set, the source text it came
//! from, a bounded history of generations, the last step log and the
//! seed-pinned RNG. Every operation runs to completion before the next is
//! admitted; embeddings serialise concurrent access around the facade.

pub mod history;
pub mod session;

pub use history::{History, HistoryEntry, DEFAULT_HISTORY_CAPACITY};
pub use session::{Session, SessionError, SessionManager, WorldSummary};

use crate::hexidirect::{
    compile_rules, parser, step_grid, Axial, ConcreteRule, Direction, EngineRng, GridError,
    HexCell, HexGrid, ParseError, EMPTY_STATE,
};
use crate::world_io::WorldSnapshot;
use std::fmt;

/// Error type for cell-level world operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    /// Cell access outside the grid
    OutOfBounds { at: Axial, radius: i32 },
    /// A state token that is not `_` or a lowercase identifier
    InvalidState(String),
}

impl fmt::Display for WorldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldError::OutOfBounds { at, radius } => {
                write!(f, "cell {} is outside the radius-{} grid", at, radius)
            }
            WorldError::InvalidState(state) => write!(f, "invalid state token `{}`", state),
        }
    }
}

impl std::error::Error for WorldError {}

impl From<GridError> for WorldError {
    fn from(e: GridError) -> Self {
        match e {
            GridError::OutOfBounds { at, radius } => WorldError::OutOfBounds { at, radius },
        }
    }
}

/// A named automaton world.
pub struct World {
    name: String,
    radius: i32,
    grid: HexGrid,
    rules_text: String,
    rules: Vec<ConcreteRule>,
    parse_failure: Option<ParseError>,
    history: History,
    last_log: Vec<String>,
    rng: EngineRng,
}

impl World {
    /// Create an empty world. History starts with the initial state as
    /// entry 0.
    pub fn new(name: impl Into<String>, radius: i32, seed: u64) -> Self {
        let grid = HexGrid::new(radius);
        let mut world = Self {
            name: name.into(),
            radius: grid.radius(),
            grid: grid.clone(),
            rules_text: String::new(),
            rules: Vec::new(),
            parse_failure: None,
            history: History::new(DEFAULT_HISTORY_CAPACITY),
            last_log: Vec::new(),
            rng: EngineRng::from_seed(seed),
        };
        world.history.push(grid, vec!["initial state".to_string()]);
        world
    }

    /// Rebuild a world from a snapshot. Rule text that fails to parse is
    /// retained with its failure; out-of-range cells were already dropped
    /// by the snapshot validation.
    pub fn from_snapshot(name: impl Into<String>, snapshot: &WorldSnapshot, seed: u64) -> Self {
        let grid = snapshot.build_grid();
        let mut world = Self {
            name: name.into(),
            radius: grid.radius(),
            grid: grid.clone(),
            rules_text: String::new(),
            rules: Vec::new(),
            parse_failure: None,
            history: History::new(DEFAULT_HISTORY_CAPACITY),
            last_log: Vec::new(),
            rng: EngineRng::from_seed(seed),
        };
        world.history.push(grid, vec!["world loaded".to_string()]);
        // the failure, if any, is recorded on the world
        let _ = world.replace_rules(&snapshot.rules_text);
        world
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Restart the RNG sequence; tests use this to pin behaviour.
    pub fn reseed(&mut self, seed: u64) {
        self.rng.reseed(seed);
    }

    pub fn grid(&self) -> &HexGrid {
        &self.grid
    }

    pub fn rules_text(&self) -> &str {
        &self.rules_text
    }

    /// The compiled rule set (empty after a parse failure).
    pub fn rules(&self) -> &[ConcreteRule] {
        &self.rules
    }

    pub fn parse_failure(&self) -> Option<&ParseError> {
        self.parse_failure.as_ref()
    }

    /// The log of the most recent step.
    pub fn last_log(&self) -> &[String] {
        &self.last_log
    }

    pub fn active_count(&self) -> usize {
        self.grid.active_count()
    }

    /// Read a cell; out-of-bounds access is an error at this level.
    pub fn cell(&self, at: Axial) -> Result<HexCell, WorldError> {
        if !self.grid.in_bounds(at) {
            return Err(WorldError::OutOfBounds {
                at,
                radius: self.radius,
            });
        }
        Ok(self.grid.cell(at))
    }

    /// Write a cell from raw parts, validating the state token.
    pub fn set_cell(
        &mut self,
        at: Axial,
        state: &str,
        direction: Option<Direction>,
    ) -> Result<(), WorldError> {
        if !parser::is_valid_state(state) {
            return Err(WorldError::InvalidState(state.to_string()));
        }
        self.grid.set(at, HexCell::new(state, direction))?;
        Ok(())
    }

    /// Toggle between empty and the default active cell `a1`.
    pub fn toggle_cell(&mut self, at: Axial) -> Result<(), WorldError> {
        let cell = self.cell(at)?;
        if cell.is_empty() {
            self.set_cell(at, "a", Direction::new(1))
        } else {
            self.set_cell(at, EMPTY_STATE, None)
        }
    }

    pub fn clear(&mut self) {
        self.grid.clear();
    }

    /// Write each in-bounds coordinate independently with probability `p`,
    /// choosing uniformly from the given non-empty states, direction 1.
    pub fn randomize<S: AsRef<str>>(&mut self, states: &[S], p: f64) {
        let pool: Vec<&str> = states
            .iter()
            .map(|s| s.as_ref())
            .filter(|s| *s != EMPTY_STATE && parser::is_valid_state(s))
            .collect();
        if pool.is_empty() {
            return;
        }
        for at in self.grid.coords() {
            if self.rng.chance(p) {
                let state = pool[self.rng.index(pool.len())];
                // coordinates come from the bounds scan, so this cannot fail
                let _ = self.grid.set(at, HexCell::new(state, Direction::new(1)));
            }
        }
    }

    /// Reparse and reexpand the rule text. On failure the compiled set
    /// becomes empty and the error is retained, so a later step is a
    /// logged no-op instead of running stale rules.
    pub fn replace_rules(&mut self, text: &str) -> Result<usize, ParseError> {
        self.rules_text = text.to_string();
        match compile_rules(text) {
            Ok(rules) => {
                let count = rules.len();
                self.rules = rules;
                self.parse_failure = None;
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(world = %self.name, error = %e, "rules failed to parse");
                self.rules.clear();
                self.parse_failure = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Advance one generation and return the step log. A world whose rules
    /// failed to parse logs the failure and changes nothing; successful
    /// steps append the new generation to history.
    pub fn step(&mut self) -> Vec<String> {
        if let Some(e) = &self.parse_failure {
            let log = vec![format!("STEP: skipped, rules failed to parse: {}", e)];
            self.last_log = log.clone();
            return log;
        }
        let outcome = step_grid(&self.grid, &self.rules, &mut self.rng);
        self.grid = outcome.grid;
        self.history.push(self.grid.clone(), outcome.log.clone());
        self.last_log = outcome.log.clone();
        outcome.log
    }

    /// History entries as `(index, active_count)` pairs.
    pub fn history_entries(&self) -> Vec<(usize, usize)> {
        self.history
            .entries()
            .map(|e| (e.index, e.active_count()))
            .collect()
    }

    /// Absolute index of the generation under the cursor.
    pub fn history_cursor(&self) -> Option<usize> {
        self.history.cursor_index()
    }

    /// Snapshot of a recorded generation, with the current rule text.
    pub fn history_snapshot(&self, index: usize) -> Option<WorldSnapshot> {
        self.history
            .get(index)
            .map(|e| WorldSnapshot::from_grid(&e.grid, &self.rules_text))
    }

    /// Log of the step that produced a recorded generation.
    pub fn history_log(&self, index: usize) -> Option<&[String]> {
        self.history.get(index).map(|e| e.log.as_slice())
    }

    /// Move the cursor to a generation and restore its grid.
    pub fn go(&mut self, index: usize) -> bool {
        let grid = self.history.go(index).map(|e| e.grid.clone());
        match grid {
            Some(grid) => {
                self.grid = grid;
                true
            }
            None => false,
        }
    }

    /// Step the cursor back one generation.
    pub fn prev(&mut self) -> bool {
        let grid = self.history.prev().map(|e| e.grid.clone());
        match grid {
            Some(grid) => {
                self.grid = grid;
                true
            }
            None => false,
        }
    }

    /// Step the cursor forward one generation.
    pub fn next(&mut self) -> bool {
        let grid = self.history.next().map(|e| e.grid.clone());
        match grid {
            Some(grid) => {
                self.grid = grid;
                true
            }
            None => false,
        }
    }

    /// Snapshot of the current grid and rule text.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::from_grid(&self.grid, &self.rules_text)
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("name", &self.name)
            .field("radius", &self.radius)
            .field("active", &self.grid.active_count())
            .field("rules", &self.rules.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Axial {
        Axial::new(0, 0)
    }

    #[test]
    fn test_new_world_has_initial_history_entry() {
        let world = World::new("w", 3, 0);
        assert_eq!(world.history_entries(), vec![(0, 0)]);
        assert_eq!(world.history_cursor(), Some(0));
    }

    #[test]
    fn test_set_cell_validates() {
        let mut world = World::new("w", 2, 0);
        assert!(world.set_cell(origin(), "a", Direction::new(2)).is_ok());
        assert!(matches!(
            world.set_cell(Axial::new(5, 5), "a", None),
            Err(WorldError::OutOfBounds { .. })
        ));
        assert!(matches!(
            world.set_cell(origin(), "A3", None),
            Err(WorldError::InvalidState(_))
        ));
        assert!(matches!(
            world.cell(Axial::new(5, 5)),
            Err(WorldError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_toggle_cell() {
        let mut world = World::new("w", 2, 0);
        world.toggle_cell(origin()).unwrap();
        let cell = world.cell(origin()).unwrap();
        assert_eq!(cell.state, "a");
        assert_eq!(cell.direction, Direction::new(1));
        world.toggle_cell(origin()).unwrap();
        assert!(world.cell(origin()).unwrap().is_empty());
    }

    #[test]
    fn test_randomize_extremes() {
        let mut world = World::new("w", 2, 0);
        world.randomize(&["a", "b"], 1.0);
        assert_eq!(world.active_count(), world.grid().coord_count());

        let mut world = World::new("w", 2, 0);
        world.randomize(&["a"], 0.0);
        assert_eq!(world.active_count(), 0);

        // the empty sentinel is filtered from the pool
        let mut world = World::new("w", 2, 0);
        world.randomize(&[EMPTY_STATE], 1.0);
        assert_eq!(world.active_count(), 0);
    }

    #[test]
    fn test_replace_rules_failure_empties_rule_set() {
        let mut world = World::new("w", 2, 0);
        assert!(world.replace_rules("a => b").is_ok());
        assert!(!world.rules().is_empty());

        assert!(world.replace_rules("a => b%9").is_err());
        assert!(world.rules().is_empty());
        assert!(world.parse_failure().is_some());
        assert_eq!(world.rules_text(), "a => b%9");
    }

    #[test]
    fn test_step_with_broken_rules_changes_nothing() {
        let mut world = World::new("w", 2, 0);
        world.set_cell(origin(), "a", None).unwrap();
        let _ = world.replace_rules("not a rule");
        let before = world.grid().clone();
        let history_len = world.history_entries().len();

        let log = world.step();
        assert!(log[0].contains("skipped"));
        assert_eq!(world.grid(), &before);
        assert_eq!(world.history_entries().len(), history_len);
    }

    #[test]
    fn test_step_appends_history() {
        let mut world = World::new("w", 2, 0);
        world.set_cell(origin(), "a", None).unwrap();
        world.replace_rules("a => b").unwrap();
        let log = world.step();
        assert!(!log.is_empty());
        assert_eq!(world.history_entries().len(), 2);
        assert_eq!(world.history_cursor(), Some(1));
        assert_eq!(world.history_log(1), Some(world.last_log()));
    }

    #[test]
    fn test_history_navigation_restores_grids() {
        let mut world = World::new("w", 2, 0);
        world.set_cell(origin(), "a", None).unwrap();
        world.replace_rules("a => b\nb => c").unwrap();
        world.step(); // b
        world.step(); // c

        assert!(world.prev());
        assert_eq!(world.grid().cell(origin()).state, "b");
        assert!(world.prev());
        assert_eq!(world.grid().cell(origin()).state, "a");
        assert!(!world.prev());
        assert!(world.next());
        assert_eq!(world.grid().cell(origin()).state, "b");
        assert!(world.go(2));
        assert_eq!(world.grid().cell(origin()).state, "c");
        assert!(!world.go(7));
    }

    #[test]
    fn test_step_after_rewind_truncates_future() {
        let mut world = World::new("w", 2, 0);
        world.set_cell(origin(), "a", None).unwrap();
        world.replace_rules("a => b\nb => c").unwrap();
        world.step();
        world.step();
        world.go(1); // back to the `b` generation
        world.step(); // overwrites the old generation 2
        assert_eq!(world.history_entries().len(), 3);
        assert_eq!(world.grid().cell(origin()).state, "c");
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut world = World::new("w", 3, 7);
        world.set_cell(origin(), "a", Direction::new(2)).unwrap();
        world.set_cell(Axial::new(1, -1), "t", None).unwrap();
        world.replace_rules("a => b").unwrap();

        let snapshot = world.snapshot();
        let restored = World::from_snapshot("w2", &snapshot, 7);
        assert_eq!(restored.radius(), 3);
        assert_eq!(restored.rules_text(), "a => b");
        assert_eq!(restored.grid(), world.grid());
        assert_eq!(restored.snapshot(), snapshot);
    }
}
