//! Two-phase generation stepper.
//!
//! Phase 1 scans every in-bounds coordinate of the previous grid and
//! collects the concrete rules that match there; nothing is mutated.
//! Phase 2 picks one rule per matched cell (group first, then rule within
//! the group, both uniform) and writes the result into a fresh grid, so
//! the step reads only the previous generation.
//!
//! A per-cell application failure is logged with its coordinate and leaves
//! that cell unchanged; the step as a whole still completes.

use super::matcher::rule_matches;
use super::rng::EngineRng;
use super::rule::{ConcreteRule, TargetDir};
use super::{Axial, HexCell, HexGrid};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The result of one generation step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub grid: HexGrid,
    pub log: Vec<String>,
}

/// Error type for a single rule application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleEvalError {
    /// A rotation target fired on a cell without a direction
    SourceDirectionMissing,
    /// A transfer target's pointing neighbor carries no direction
    PointingDirectionMissing(Axial),
}

impl fmt::Display for RuleEvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleEvalError::SourceDirectionMissing => {
                write!(f, "rotation target needs a source direction")
            }
            RuleEvalError::PointingDirectionMissing(at) => {
                write!(f, "pointing neighbor at {} has no direction", at)
            }
        }
    }
}

impl std::error::Error for RuleEvalError {}

/// Advance the grid by exactly one generation.
pub fn step_grid(grid: &HexGrid, rules: &[ConcreteRule], rng: &mut EngineRng) -> StepOutcome {
    let mut log = Vec::new();
    let group_count = rules.iter().map(|r| r.group).collect::<BTreeSet<_>>().len();
    log.push("STEP: starting generation".to_string());
    log.push(format!(
        "rules: {} concrete in {} groups",
        rules.len(),
        group_count
    ));
    log.push(format!("active cells before: {}", grid.active_count()));

    let before: BTreeSet<Axial> = grid.active_cells().map(|(at, _)| at).collect();
    let mut next = grid.clone();

    // Phase 1: collect matches per cell; the grid is read-only here.
    let mut matched: Vec<(Axial, HexCell, Vec<usize>)> = Vec::new();
    for at in grid.coords() {
        let cell = grid.cell(at);
        let hits: Vec<usize> = rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| rule_matches(rule, &cell, at, grid))
            .map(|(i, _)| i)
            .collect();
        if !hits.is_empty() {
            matched.push((at, cell, hits));
        }
    }
    log.push(format!("matched cells: {}", matched.len()));

    // Phase 2: choose one rule per cell and write the next generation.
    for (at, cell, hits) in &matched {
        let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for &i in hits {
            groups.entry(rules[i].group).or_default().push(i);
        }
        let keys: Vec<usize> = groups.keys().copied().collect();
        let group = keys[rng.index(keys.len())];
        let in_group = &groups[&group];
        let rule = &rules[in_group[rng.index(in_group.len())]];

        match apply_rule(rule, cell, *at, grid, rng) {
            Ok(new_cell) => {
                log.push(format!(
                    "{} {}: {} matches in {} groups, chose group {} `{}` => {}",
                    at,
                    cell,
                    hits.len(),
                    groups.len(),
                    group,
                    rule,
                    new_cell
                ));
                if let Err(e) = next.set(*at, new_cell) {
                    // unreachable: `at` came from the bounds scan
                    log.push(format!("{}: write rejected: {}", at, e));
                }
            }
            Err(e) => {
                tracing::warn!(cell = %at, error = %e, "rule evaluation failed");
                log.push(format!("{} {}: rule evaluation failed: {}", at, cell, e));
            }
        }
    }

    let after: BTreeSet<Axial> = next.active_cells().map(|(at, _)| at).collect();
    let births = after.difference(&before).count();
    let deaths = before.difference(&after).count();
    let survivals = before.intersection(&after).count();
    log.push(format!("active cells after: {}", next.active_count()));
    log.push(format!(
        "summary: births={}, survivals={}, deaths={}",
        births, survivals, deaths
    ));
    log.push("STEP: completed".to_string());

    StepOutcome { grid: next, log }
}

/// Resolve a chosen rule against a cell, producing the next cell value.
fn apply_rule(
    rule: &ConcreteRule,
    cell: &HexCell,
    at: Axial,
    grid: &HexGrid,
    rng: &mut EngineRng,
) -> Result<HexCell, RuleEvalError> {
    let direction = match rule.target_dir {
        TargetDir::None => None,
        TargetDir::Fixed(d) => Some(d),
        TargetDir::Rotate(k) => Some(
            cell.direction
                .ok_or(RuleEvalError::SourceDirectionMissing)?
                .rotated(k),
        ),
        TargetDir::RandomAny => Some(rng.direction()),
        TargetDir::FromPointing { slot, rotate } => {
            let neighbor_at = at.neighbor(slot);
            let incoming = grid
                .cell(neighbor_at)
                .direction
                .ok_or(RuleEvalError::PointingDirectionMissing(neighbor_at))?;
            Some(incoming.rotated(rotate))
        }
    };
    // HexCell::new drops the direction when the state is empty
    Ok(HexCell::new(rule.target_state.clone(), direction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hexidirect::expander::compile_rules;
    use crate::hexidirect::Direction;

    fn origin() -> Axial {
        Axial::new(0, 0)
    }

    #[test]
    fn test_unmatched_cells_keep_their_value() {
        let rules = compile_rules("a => b").unwrap();
        let mut grid = HexGrid::new(2);
        grid.set(origin(), HexCell::new("x", Direction::new(2))).unwrap();
        let mut rng = EngineRng::from_seed(0);

        let outcome = step_grid(&grid, &rules, &mut rng);
        assert_eq!(outcome.grid, grid);
    }

    #[test]
    fn test_simple_rewrite() {
        let rules = compile_rules("a => b").unwrap();
        let mut grid = HexGrid::new(2);
        grid.set(origin(), HexCell::new("a", None)).unwrap();
        let mut rng = EngineRng::from_seed(0);

        let outcome = step_grid(&grid, &rules, &mut rng);
        assert_eq!(outcome.grid.cell(origin()).state, "b");
        assert_eq!(outcome.grid.active_count(), 1);
    }

    #[test]
    fn test_effects_are_not_visible_within_a_step() {
        // a -> b and b -> c in one rule set: an `a` must stop at `b`
        let rules = compile_rules("a => b\nb => c").unwrap();
        let mut grid = HexGrid::new(2);
        grid.set(origin(), HexCell::new("a", None)).unwrap();
        let mut rng = EngineRng::from_seed(0);

        let outcome = step_grid(&grid, &rules, &mut rng);
        assert_eq!(outcome.grid.cell(origin()).state, "b");
    }

    #[test]
    fn test_empty_target_clears_cell() {
        let rules = compile_rules("a% => _").unwrap();
        let mut grid = HexGrid::new(2);
        grid.set(origin(), HexCell::new("a", Direction::new(5))).unwrap();
        let mut rng = EngineRng::from_seed(0);

        let outcome = step_grid(&grid, &rules, &mut rng);
        assert!(outcome.grid.cell(origin()).is_empty());
        assert_eq!(outcome.grid.cell(origin()).direction, None);
    }

    #[test]
    fn test_log_structure() {
        let rules = compile_rules("a => b").unwrap();
        let mut grid = HexGrid::new(2);
        grid.set(origin(), HexCell::new("a", None)).unwrap();
        let mut rng = EngineRng::from_seed(0);

        let outcome = step_grid(&grid, &rules, &mut rng);
        assert!(outcome.log.first().unwrap().contains("STEP"));
        assert!(outcome.log.last().unwrap().contains("completed"));
        assert!(outcome.log.iter().any(|l| l.contains("births=1")));
        assert!(outcome.log.iter().any(|l| l.contains("(0,0)")));
    }

    #[test]
    fn test_step_is_deterministic_for_a_seed() {
        let rules = compile_rules("a => b%\na => c%").unwrap();
        let mut grid = HexGrid::new(2);
        grid.set(origin(), HexCell::new("a", None)).unwrap();
        grid.set(Axial::new(1, 0), HexCell::new("a", None)).unwrap();

        let mut rng_a = EngineRng::from_seed(9);
        let mut rng_b = EngineRng::from_seed(9);
        let a = step_grid(&grid, &rules, &mut rng_a);
        let b = step_grid(&grid, &rules, &mut rng_b);
        assert_eq!(a.grid, b.grid);
        assert_eq!(a.log, b.log);
    }

    #[test]
    fn test_random_any_assigns_some_direction() {
        let rules = compile_rules("a => b%").unwrap();
        let mut grid = HexGrid::new(2);
        grid.set(origin(), HexCell::new("a", None)).unwrap();
        let mut rng = EngineRng::from_seed(3);

        let outcome = step_grid(&grid, &rules, &mut rng);
        let cell = outcome.grid.cell(origin());
        assert_eq!(cell.state, "b");
        assert!(cell.direction.is_some());
    }
}
