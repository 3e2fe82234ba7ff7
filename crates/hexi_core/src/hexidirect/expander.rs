//! Macro expander: abstract rules -> concrete directional variants.
//!
//! Expansion is deterministic, pure and total. Every sugared form is
//! rewritten into conditions with explicit positions:
//!
//! - a `%` source direction fans out into six sibling variants
//! - `[G]N` repeats the bracket N times
//! - one alternative is chosen per bracket (Cartesian product)
//! - unpositioned positive conditions are assigned over the free positions
//!   in every injective way; two positive conditions can never share a
//!   position, so `[a]3` demands three distinct `a` neighbors
//! - `state.` resolves to a literal back-direction once a position is fixed
//! - unpositioned negations become a negated condition on all six positions
//!
//! Variants that contradict themselves (a negation against an equal-state
//! positive, a transfer target with no pointing condition) are discarded,
//! and duplicate variants are deduplicated per abstract rule.

use super::parser::{parse_rules, ParseError, ParsedRule};
use super::rule::{
    AbstractRule, AltAst, ConcreteRule, Condition, Orient, OrientAst, SourceDir, TargetDir,
    TargetDirAst,
};
use super::{Direction, EMPTY_STATE};
use std::collections::HashSet;

/// Parse and expand in one call.
pub fn compile_rules(text: &str) -> Result<Vec<ConcreteRule>, ParseError> {
    Ok(expand_rules(&parse_rules(text)?))
}

/// Expand every abstract rule into its concrete variants, preserving group
/// ids and rule order.
pub fn expand_rules(parsed: &[ParsedRule]) -> Vec<ConcreteRule> {
    let mut out = Vec::new();
    for p in parsed {
        expand_one(p.group, &p.rule, &mut out);
    }
    out
}

type VariantKey = (Option<Direction>, Vec<Condition>, TargetDir);

fn expand_one(group: usize, rule: &AbstractRule, out: &mut Vec<ConcreteRule>) {
    let src_dirs: Vec<Option<Direction>> = match rule.source_dir {
        SourceDir::Unspecified => vec![None],
        SourceDir::Literal(d) => vec![Some(d)],
        SourceDir::Any => Direction::ALL.iter().copied().map(Some).collect(),
    };

    // bracket repetition: [G]N becomes N copies of [G]
    let mut groups: Vec<&[AltAst]> = Vec::new();
    for bracket in &rule.brackets {
        for _ in 0..bracket.repeat {
            groups.push(&bracket.alts);
        }
    }

    let mut seen: HashSet<VariantKey> = HashSet::new();

    if groups.is_empty() {
        for &src_dir in &src_dirs {
            expand_selection(group, rule, &[], src_dir, &mut seen, out);
        }
        return;
    }

    // odometer over one alternative per bracket
    let sizes: Vec<usize> = groups.iter().map(|g| g.len()).collect();
    let mut sel = vec![0usize; groups.len()];
    'outer: loop {
        let chosen: Vec<&AltAst> = groups.iter().zip(&sel).map(|(g, &i)| &g[i]).collect();
        for &src_dir in &src_dirs {
            expand_selection(group, rule, &chosen, src_dir, &mut seen, out);
        }
        let mut k = groups.len() - 1;
        loop {
            sel[k] += 1;
            if sel[k] < sizes[k] {
                break;
            }
            sel[k] = 0;
            if k == 0 {
                break 'outer;
            }
            k -= 1;
        }
    }
}

/// Expand one choice of alternatives under one source direction.
fn expand_selection(
    group: usize,
    rule: &AbstractRule,
    chosen: &[&AltAst],
    src_dir: Option<Direction>,
    seen: &mut HashSet<VariantKey>,
    out: &mut Vec<ConcreteRule>,
) {
    // positives with explicit positions claim them up front
    let mut occupied: [bool; 6] = [false; 6];
    let mut fixed: Vec<(usize, Direction)> = Vec::new();
    let mut floating: Vec<usize> = Vec::new();
    for (i, alt) in chosen.iter().enumerate() {
        if alt.negated {
            continue;
        }
        match alt.position {
            Some(p) => {
                if occupied[p.index()] {
                    return; // two positives on one position can never hold
                }
                occupied[p.index()] = true;
                fixed.push((i, p));
            }
            None => floating.push(i),
        }
    }

    let mut assignments: Vec<Vec<(usize, Direction)>> = Vec::new();
    let mut current: Vec<(usize, Direction)> = Vec::new();
    place(&floating, 0, &mut occupied, &mut current, &mut assignments);

    for placement in &assignments {
        if let Some(concrete) = build_variant(group, rule, chosen, &fixed, placement, src_dir) {
            let key = (
                concrete.src_dir,
                concrete.conditions.clone(),
                concrete.target_dir,
            );
            if seen.insert(key) {
                out.push(concrete);
            }
        }
    }
}

/// Enumerate every injective assignment of the floating positives onto the
/// unoccupied positions.
fn place(
    floating: &[usize],
    k: usize,
    occupied: &mut [bool; 6],
    current: &mut Vec<(usize, Direction)>,
    results: &mut Vec<Vec<(usize, Direction)>>,
) {
    if k == floating.len() {
        results.push(current.clone());
        return;
    }
    let i = floating[k];
    for d in Direction::ALL {
        if occupied[d.index()] {
            continue;
        }
        occupied[d.index()] = true;
        current.push((i, d));
        place(floating, k + 1, occupied, current, results);
        current.pop();
        occupied[d.index()] = false;
    }
}

/// Assemble one concrete variant, or None when it is contradictory.
fn build_variant(
    group: usize,
    rule: &AbstractRule,
    chosen: &[&AltAst],
    fixed: &[(usize, Direction)],
    placement: &[(usize, Direction)],
    src_dir: Option<Direction>,
) -> Option<ConcreteRule> {
    let mut assigned: Vec<Option<Direction>> = vec![None; chosen.len()];
    for &(i, p) in fixed {
        assigned[i] = Some(p);
    }
    for &(i, p) in placement {
        assigned[i] = Some(p);
    }

    let mut conditions: Vec<Condition> = Vec::new();
    let mut positive_at: [Option<&str>; 6] = [None; 6];
    let mut pointing_slot: Option<Direction> = None;

    for (i, alt) in chosen.iter().enumerate() {
        if alt.negated {
            continue;
        }
        let p = assigned[i]?;
        let orient = match alt.orient {
            OrientAst::Unspecified => Orient::Any,
            OrientAst::Literal(d) => Orient::Dir(d),
            OrientAst::AnyDirection => Orient::HasDirection,
            OrientAst::PointsAtCenter => {
                if pointing_slot.is_none() {
                    pointing_slot = Some(p);
                }
                Orient::Dir(p.opposite())
            }
        };
        positive_at[p.index()] = Some(alt.state.as_str());
        conditions.push(Condition {
            position: p,
            negated: false,
            state: alt.state.clone(),
            orient,
        });
    }

    for alt in chosen.iter().filter(|alt| alt.negated) {
        let positions: Vec<Direction> = match alt.position {
            Some(p) => vec![p],
            // universal: no neighbor in any direction has this state
            None => Direction::ALL.to_vec(),
        };
        for p in positions {
            match positive_at[p.index()] {
                Some(state) if state == alt.state => return None,
                Some(_) => {} // a different positive state already excludes it
                None => conditions.push(Condition {
                    position: p,
                    negated: true,
                    state: alt.state.clone(),
                    orient: Orient::Any,
                }),
            }
        }
    }

    let target_dir = match rule.target_dir {
        TargetDirAst::Unspecified => TargetDir::None,
        TargetDirAst::Literal(d) => TargetDir::Fixed(d),
        TargetDirAst::Percent(k) => match src_dir {
            Some(_) => TargetDir::Rotate(k),
            None => TargetDir::RandomAny,
        },
        TargetDirAst::Transfer(k) => match pointing_slot {
            Some(slot) => TargetDir::FromPointing { slot, rotate: k },
            None => return None, // this alternative choice has nothing to transfer
        },
    };
    let target_dir = if rule.target_state == EMPTY_STATE {
        TargetDir::None
    } else {
        target_dir
    };

    conditions.sort();
    Some(ConcreteRule {
        group,
        src_state: rule.source_state.clone(),
        src_dir,
        target_state: rule.target_state.clone(),
        target_dir,
        conditions,
    })
}
