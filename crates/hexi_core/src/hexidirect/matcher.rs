//! Concrete rule matching against a grid cell.

use super::rule::{ConcreteRule, Condition, Orient};
use super::{Axial, HexCell, HexGrid};

/// True iff the rule applies to `cell` at `at` in `grid`.
///
/// The source state and direction must match exactly (a rule without a
/// source direction only matches cells without one), and every positioned
/// condition must hold for the neighbor at its position. Out-of-bounds
/// neighbors read as `_` with no direction.
pub fn rule_matches(rule: &ConcreteRule, cell: &HexCell, at: Axial, grid: &HexGrid) -> bool {
    if cell.state != rule.src_state || cell.direction != rule.src_dir {
        return false;
    }
    rule.conditions
        .iter()
        .all(|cond| condition_holds(cond, at, grid))
}

fn condition_holds(cond: &Condition, at: Axial, grid: &HexGrid) -> bool {
    let neighbor = grid.cell(at.neighbor(cond.position));
    if cond.negated {
        // orientation is ignored on negated conditions
        return neighbor.state != cond.state;
    }
    if neighbor.state != cond.state {
        return false;
    }
    match cond.orient {
        Orient::Any => true,
        Orient::Dir(d) => neighbor.direction == Some(d),
        Orient::HasDirection => neighbor.direction.is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hexidirect::expander::compile_rules;
    use crate::hexidirect::Direction;

    fn grid_with(cells: &[(i32, i32, &str, Option<u8>)]) -> HexGrid {
        let mut grid = HexGrid::new(3);
        for &(q, r, state, dir) in cells {
            let dir = dir.and_then(Direction::new);
            grid.set(Axial::new(q, r), HexCell::new(state, dir)).unwrap();
        }
        grid
    }

    #[test]
    fn test_source_state_and_direction_must_match() {
        let rules = compile_rules("a3 => b").unwrap();
        let rule = &rules[0];
        let grid = HexGrid::new(3);
        let at = Axial::new(0, 0);

        assert!(rule_matches(rule, &HexCell::new("a", Direction::new(3)), at, &grid));
        assert!(!rule_matches(rule, &HexCell::new("a", Direction::new(2)), at, &grid));
        assert!(!rule_matches(rule, &HexCell::new("a", None), at, &grid));
        assert!(!rule_matches(rule, &HexCell::new("b", Direction::new(3)), at, &grid));
    }

    #[test]
    fn test_undirected_rule_rejects_directed_cell() {
        let rules = compile_rules("t => x").unwrap();
        let grid = HexGrid::new(3);
        let at = Axial::new(0, 0);
        assert!(rule_matches(&rules[0], &HexCell::new("t", None), at, &grid));
        assert!(!rule_matches(&rules[0], &HexCell::new("t", Direction::new(1)), at, &grid));
    }

    #[test]
    fn test_positioned_condition_reads_exact_neighbor() {
        let rules = compile_rules("a[1x] => b").unwrap();
        let rule = &rules[0];
        let at = Axial::new(0, 0);

        // direction 1 neighbor of the origin is (0,-1)
        let grid = grid_with(&[(0, -1, "x", None)]);
        assert!(rule_matches(rule, &HexCell::new("a", None), at, &grid));

        let grid = grid_with(&[(1, 0, "x", None)]);
        assert!(!rule_matches(rule, &HexCell::new("a", None), at, &grid));
    }

    #[test]
    fn test_orientation_markers() {
        let at = Axial::new(0, 0);
        let literal = compile_rules("a[1x4] => b").unwrap();
        let any_dir = compile_rules("a[1x%] => b").unwrap();

        let pointing = grid_with(&[(0, -1, "x", Some(4))]);
        let sideways = grid_with(&[(0, -1, "x", Some(2))]);
        let still = grid_with(&[(0, -1, "x", None)]);

        let a = HexCell::new("a", None);
        assert!(rule_matches(&literal[0], &a, at, &pointing));
        assert!(!rule_matches(&literal[0], &a, at, &sideways));
        assert!(!rule_matches(&literal[0], &a, at, &still));

        assert!(rule_matches(&any_dir[0], &a, at, &pointing));
        assert!(rule_matches(&any_dir[0], &a, at, &sideways));
        assert!(!rule_matches(&any_dir[0], &a, at, &still));
    }

    #[test]
    fn test_negated_condition_ignores_orientation() {
        let rules = compile_rules("a[-1x] => b").unwrap();
        let rule = &rules[0];
        let at = Axial::new(0, 0);
        let a = HexCell::new("a", None);

        assert!(rule_matches(rule, &a, at, &HexGrid::new(3)));
        assert!(rule_matches(rule, &a, at, &grid_with(&[(0, -1, "y", Some(2))])));
        assert!(!rule_matches(rule, &a, at, &grid_with(&[(0, -1, "x", Some(2))])));
        assert!(!rule_matches(rule, &a, at, &grid_with(&[(0, -1, "x", None)])));
    }

    #[test]
    fn test_out_of_bounds_neighbors_read_empty() {
        let rules = compile_rules("a[_]6 => b").unwrap();
        assert_eq!(rules.len(), 1);
        let grid = HexGrid::new(1);
        // a corner cell has out-of-bounds neighbors, which count as `_`
        let at = Axial::new(1, 0);
        assert!(rule_matches(&rules[0], &HexCell::new("a", None), at, &grid));
    }
}
