//! Rule data model: abstract rules as parsed, concrete rules as expanded.
//!
//! An abstract rule is the parser's view of one authored rule: sugared
//! direction markers, bracket groups with alternatives and repeats, and a
//! target descriptor. The expander rewrites each abstract rule into a set
//! of concrete rules whose conditions all carry explicit positions and
//! whose target direction is a closed tagged variant.

use super::Direction;
use std::fmt;

/// Direction requirement on the source side of an abstract rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceDir {
    /// No marker: matches only cells without a direction
    Unspecified,
    /// A literal direction digit
    Literal(Direction),
    /// The `%` marker: one sibling variant per direction
    Any,
}

/// Orientation marker on a condition alternative, before expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientAst {
    /// No marker: any direction, including none
    Unspecified,
    /// A literal direction digit
    Literal(Direction),
    /// The `.` marker: the neighbor points at the center
    PointsAtCenter,
    /// The `%` marker: the neighbor carries some direction
    AnyDirection,
}

/// One alternative inside a condition bracket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AltAst {
    pub negated: bool,
    pub position: Option<Direction>,
    pub state: String,
    pub orient: OrientAst,
}

/// A condition bracket: alternatives plus a repeat count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketAst {
    pub alts: Vec<AltAst>,
    /// `[G]N` repetition, `1..=6`; plain brackets have repeat 1
    pub repeat: u8,
}

/// Target direction descriptor, before expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetDirAst {
    /// No marker: the result carries no direction
    Unspecified,
    /// A literal direction digit
    Literal(Direction),
    /// `%N` rotation (bare `%` is rotation 0)
    Percent(u8),
    /// `.K`: direction transferred from the pointing neighbor, rotated K
    Transfer(u8),
}

/// An abstract rule as emitted by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbstractRule {
    pub source_state: String,
    pub source_dir: SourceDir,
    pub brackets: Vec<BracketAst>,
    pub target_state: String,
    pub target_dir: TargetDirAst,
}

impl AbstractRule {
    /// Canonical rendering of the source side alone. Used by the canonical
    /// printer, which has to re-join `|`-split siblings onto one line.
    pub fn source_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.source_state);
        match self.source_dir {
            SourceDir::Unspecified => {}
            SourceDir::Literal(d) => out.push_str(&d.to_string()),
            SourceDir::Any => out.push('%'),
        }
        for bracket in &self.brackets {
            out.push('[');
            for (i, alt) in bracket.alts.iter().enumerate() {
                if i > 0 {
                    out.push('|');
                }
                if alt.negated {
                    out.push('-');
                }
                if let Some(p) = alt.position {
                    out.push_str(&p.to_string());
                }
                out.push_str(&alt.state);
                match alt.orient {
                    OrientAst::Unspecified => {}
                    OrientAst::Literal(d) => out.push_str(&d.to_string()),
                    OrientAst::PointsAtCenter => out.push('.'),
                    OrientAst::AnyDirection => out.push('%'),
                }
            }
            out.push(']');
            if bracket.repeat > 1 {
                out.push_str(&bracket.repeat.to_string());
            }
        }
        out
    }

    /// Canonical rendering of the target side alone.
    pub fn target_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.target_state);
        match self.target_dir {
            TargetDirAst::Unspecified => {}
            TargetDirAst::Literal(d) => out.push_str(&d.to_string()),
            TargetDirAst::Percent(0) => out.push('%'),
            TargetDirAst::Percent(k) => {
                out.push('%');
                out.push_str(&k.to_string());
            }
            TargetDirAst::Transfer(k) => {
                out.push('.');
                out.push_str(&k.to_string());
            }
        }
        out
    }
}

impl fmt::Display for AbstractRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.source_text(), self.target_text())
    }
}

/// Orientation requirement of a concrete condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Orient {
    /// Any direction, including none
    Any,
    /// Exactly this direction
    Dir(Direction),
    /// Some direction, whichever it is
    HasDirection,
}

/// A fully specified neighbor constraint. Field order doubles as the sort
/// key that normalises a concrete rule's condition multiset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Condition {
    pub position: Direction,
    pub negated: bool,
    pub state: String,
    pub orient: Orient,
}

/// Target direction descriptor of a concrete rule, resolved at apply time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetDir {
    /// The result carries no direction
    None,
    /// A fixed direction
    Fixed(Direction),
    /// The source direction rotated k clockwise
    Rotate(u8),
    /// A uniformly random direction drawn from the engine RNG
    RandomAny,
    /// The pointing neighbor's direction rotated `rotate` clockwise
    FromPointing { slot: Direction, rotate: u8 },
}

/// A concrete rule: the expander's output.
///
/// Every condition carries an explicit position; at most one positive
/// condition occupies a position. Sibling rules expanded from the same
/// authored rule share a `group` id, and a step applies at most one rule
/// per group per cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcreteRule {
    pub group: usize,
    pub src_state: String,
    pub src_dir: Option<Direction>,
    pub conditions: Vec<Condition>,
    pub target_state: String,
    pub target_dir: TargetDir,
}

impl fmt::Display for ConcreteRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.src_state)?;
        if let Some(d) = self.src_dir {
            write!(f, "{}", d)?;
        }
        for cond in &self.conditions {
            write!(f, "[")?;
            if cond.negated {
                write!(f, "-")?;
            }
            write!(f, "{}{}", cond.position, cond.state)?;
            match cond.orient {
                Orient::Any => {}
                Orient::Dir(d) => write!(f, "{}", d)?,
                Orient::HasDirection => write!(f, "%")?,
            }
            write!(f, "]")?;
        }
        write!(f, " => {}", self.target_state)?;
        match self.target_dir {
            TargetDir::None => Ok(()),
            TargetDir::Fixed(d) => write!(f, "{}", d),
            TargetDir::Rotate(k) => write!(f, "%{}", k),
            TargetDir::RandomAny => write!(f, "%"),
            TargetDir::FromPointing { rotate, .. } => write!(f, ".{}", rotate),
        }
    }
}
