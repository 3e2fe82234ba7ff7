//! HexiDirect source parser.
//!
//! Source text holds one rule per line; `;` also terminates a rule, blank
//! lines and `#` comment lines are skipped. Each authored rule becomes one
//! macro group. A top-level `|` (outside condition brackets) splits a rule
//! into sibling abstract rules that share the group id and the target.
//!
//! The parser is a hand-rolled cursor over the rule bytes. Errors carry the
//! offending rule text, the 1-based line and column, and a byte offset into
//! the full source, and never abort more than the parse itself: the engine
//! falls back to an empty compiled rule set.

use super::rule::{
    AbstractRule, AltAst, BracketAst, OrientAst, SourceDir, TargetDirAst,
};
use super::{Direction, EMPTY_STATE};
use std::fmt;

/// The `b3s23` preset, expanded at parse time. One group per line; the
/// third line's top-level `|` yields two siblings in a single group.
const PRESET_B3S23: [&str; 3] = [
    "_[a]3[_]3 => a",
    "a[a]2[_|a][_]3 => a",
    "a[_|a][_]5 | a[a]4[_|a][_|a] => _",
];

/// Error type for rule parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// 1-based line number in the source text
    pub line: usize,
    /// 1-based column within the offending rule
    pub column: usize,
    /// Byte offset into the full source text
    pub offset: usize,
    /// The offending rule text, trimmed
    pub rule: String,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, column {} (byte {}): {} in `{}`",
            self.line, self.column, self.offset, self.message, self.rule
        )
    }
}

impl std::error::Error for ParseError {}

/// An abstract rule paired with its macro-group id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRule {
    pub group: usize,
    pub rule: AbstractRule,
}

/// True for `_` or a lowercase identifier (underscores allowed after the
/// first letter). This is the exact shape the grammar's `state` derives.
pub fn is_valid_state(s: &str) -> bool {
    if s == EMPTY_STATE {
        return true;
    }
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c == '_')
}

/// Parse a full source text into abstract rules with group ids.
pub fn parse_rules(text: &str) -> Result<Vec<ParsedRule>, ParseError> {
    let mut out = Vec::new();
    let mut group = 0usize;
    let mut line_start = 0usize;
    for (line_idx, line) in text.split('\n').enumerate() {
        let line_no = line_idx + 1;
        let mut seg_start = line_start;
        for seg in line.split(';') {
            let trimmed = seg.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                seg_start += seg.len() + 1;
                continue;
            }
            if trimmed.eq_ignore_ascii_case("b3s23") {
                for preset in PRESET_B3S23 {
                    parse_segment(preset, line_no, seg_start, group, &mut out)?;
                    group += 1;
                }
            } else {
                parse_segment(seg, line_no, seg_start, group, &mut out)?;
                group += 1;
            }
            seg_start += seg.len() + 1;
        }
        line_start += line.len() + 1;
    }
    Ok(out)
}

/// Render parsed rules back to canonical source text. Sibling rules of one
/// group are re-joined with a top-level `|` so that reparsing reproduces
/// the same groups.
pub fn canonical_text(rules: &[ParsedRule]) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut i = 0;
    while i < rules.len() {
        let group = rules[i].group;
        let mut sources = vec![rules[i].rule.source_text()];
        let target = rules[i].rule.target_text();
        let mut j = i + 1;
        while j < rules.len() && rules[j].group == group {
            sources.push(rules[j].rule.source_text());
            j += 1;
        }
        lines.push(format!("{} => {}", sources.join(" | "), target));
        i = j;
    }
    lines.join("\n")
}

/// Parse one rule segment (everything between two terminators) into one or
/// more sibling abstract rules sharing `group`.
fn parse_segment(
    seg: &str,
    line: usize,
    base: usize,
    group: usize,
    out: &mut Vec<ParsedRule>,
) -> Result<(), ParseError> {
    let arrow = seg.find("=>").ok_or_else(|| ParseError {
        line,
        column: 1,
        offset: base,
        rule: seg.trim().to_string(),
        message: "missing `=>`".to_string(),
    })?;
    let src_all = &seg[..arrow];
    let tgt = &seg[arrow + 2..];

    let mut tcur = Cursor::new(tgt, seg, line, arrow + 2, base + arrow + 2);
    let (target_state, target_dir) = parse_target(&mut tcur)?;

    for (part, part_off) in split_top_level(src_all) {
        let mut cur = Cursor::new(part, seg, line, part_off, base + part_off);
        let (source_state, source_dir, brackets) = parse_source(&mut cur)?;
        if matches!(target_dir, TargetDirAst::Transfer(_)) && !has_pointing(&brackets) {
            return Err(cur.error("transfer target requires a pointing condition"));
        }
        out.push(ParsedRule {
            group,
            rule: AbstractRule {
                source_state,
                source_dir,
                brackets,
                target_state: target_state.clone(),
                target_dir,
            },
        });
    }
    Ok(())
}

fn has_pointing(brackets: &[BracketAst]) -> bool {
    brackets
        .iter()
        .any(|b| b.alts.iter().any(|a| !a.negated && a.orient == OrientAst::PointsAtCenter))
}

/// Split a source side at top-level `|` characters, returning each part
/// with its byte offset within the segment.
fn split_top_level(src: &str) -> Vec<(&str, usize)> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, b) in src.bytes().enumerate() {
        match b {
            b'[' => depth += 1,
            b']' => depth = depth.saturating_sub(1),
            b'|' if depth == 0 => {
                parts.push((&src[start..i], start));
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push((&src[start..], start));
    parts
}

/// Byte cursor over one fragment of a rule.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    rule: &'a str,
    line: usize,
    /// byte offset of this fragment within the rule segment
    col_base: usize,
    /// byte offset of this fragment within the full source text
    offset_base: usize,
}

impl<'a> Cursor<'a> {
    fn new(fragment: &'a str, rule: &'a str, line: usize, col_base: usize, offset_base: usize) -> Self {
        Self {
            bytes: fragment.as_bytes(),
            pos: 0,
            rule,
            line,
            col_base,
            offset_base,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek();
        if b.is_some() {
            self.pos += 1;
        }
        b
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ') | Some(b'\t') | Some(b'\r')) {
            self.pos += 1;
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            line: self.line,
            column: self.col_base + self.pos + 1,
            offset: self.offset_base + self.pos,
            rule: self.rule.trim().to_string(),
            message: message.into(),
        }
    }

    /// Consume a single direction digit, `1..=6`.
    fn direction(&mut self) -> Result<Direction, ParseError> {
        match self.peek() {
            Some(c) if c.is_ascii_digit() => match Direction::new(c - b'0') {
                Some(d) => {
                    self.pos += 1;
                    Ok(d)
                }
                None => Err(self.error("directions are 1..6")),
            },
            _ => Err(self.error("expected a direction 1..6")),
        }
    }

    /// Consume a run of digits, if any.
    fn number(&mut self) -> Option<u32> {
        let mut value: Option<u32> = None;
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            self.pos += 1;
            value = Some(value.unwrap_or(0).saturating_mul(10) + u32::from(c - b'0'));
        }
        value
    }
}

/// Parse a state token: `_` or a lowercase identifier.
fn parse_state(cur: &mut Cursor) -> Result<String, ParseError> {
    cur.skip_ws();
    match cur.peek() {
        Some(b'_') => {
            cur.bump();
            if let Some(c) = cur.peek() {
                if c.is_ascii_lowercase() || c == b'_' {
                    return Err(cur.error("identifiers cannot start with `_`"));
                }
            }
            Ok(EMPTY_STATE.to_string())
        }
        Some(c) if c.is_ascii_lowercase() => {
            let start = cur.pos;
            cur.bump();
            while let Some(c) = cur.peek() {
                if c.is_ascii_lowercase() || c == b'_' {
                    cur.bump();
                } else {
                    break;
                }
            }
            Ok(String::from_utf8_lossy(&cur.bytes[start..cur.pos]).into_owned())
        }
        Some(c) if c.is_ascii_digit() => Err(cur.error("states cannot contain digits")),
        _ => Err(cur.error("expected a state identifier")),
    }
}

/// Reject `abc3def` shapes: a direction digit must not be glued to more
/// identifier characters.
fn reject_ident_after_digit(cur: &mut Cursor) -> Result<(), ParseError> {
    if let Some(c) = cur.peek() {
        if c.is_ascii_lowercase() || c == b'_' {
            return Err(cur.error("states cannot contain digits"));
        }
    }
    Ok(())
}

fn parse_source(cur: &mut Cursor) -> Result<(String, SourceDir, Vec<BracketAst>), ParseError> {
    let state = parse_state(cur)?;
    cur.skip_ws();
    let dir = match cur.peek() {
        Some(b'%') => {
            cur.bump();
            SourceDir::Any
        }
        Some(c) if c.is_ascii_digit() => {
            let d = cur.direction()?;
            reject_ident_after_digit(cur)?;
            SourceDir::Literal(d)
        }
        _ => SourceDir::Unspecified,
    };
    let mut brackets = Vec::new();
    loop {
        cur.skip_ws();
        if cur.peek() == Some(b'[') {
            brackets.push(parse_bracket(cur)?);
        } else {
            break;
        }
    }
    cur.skip_ws();
    if cur.peek().is_some() {
        return Err(cur.error("unexpected character after source pattern"));
    }
    Ok((state, dir, brackets))
}

fn parse_bracket(cur: &mut Cursor) -> Result<BracketAst, ParseError> {
    cur.bump(); // '['
    cur.skip_ws();
    let mut alts = Vec::new();
    if cur.peek() == Some(b']') {
        cur.bump();
        // `[]` is shorthand for an empty-neighbor slot
        alts.push(AltAst {
            negated: false,
            position: None,
            state: EMPTY_STATE.to_string(),
            orient: OrientAst::Unspecified,
        });
    } else {
        loop {
            alts.push(parse_alt(cur)?);
            cur.skip_ws();
            match cur.bump() {
                Some(b'|') => continue,
                Some(b']') => break,
                _ => return Err(cur.error("expected `|` or `]` in condition bracket")),
            }
        }
    }
    let repeat = match cur.peek() {
        Some(c) if c.is_ascii_digit() => {
            let n = cur.number().unwrap_or(0);
            if !(1..=6).contains(&n) {
                return Err(cur.error("bracket repeat counts are 1..6"));
            }
            n as u8
        }
        _ => 1,
    };
    Ok(BracketAst { alts, repeat })
}

fn parse_alt(cur: &mut Cursor) -> Result<AltAst, ParseError> {
    cur.skip_ws();
    let negated = if cur.peek() == Some(b'-') {
        cur.bump();
        true
    } else {
        false
    };
    cur.skip_ws();
    let position = match cur.peek() {
        Some(c) if c.is_ascii_digit() => Some(cur.direction()?),
        _ => None,
    };
    let state = parse_state(cur)?;
    let orient = match cur.peek() {
        Some(b'.') => {
            cur.bump();
            OrientAst::PointsAtCenter
        }
        Some(b'%') => {
            cur.bump();
            OrientAst::AnyDirection
        }
        Some(c) if c.is_ascii_digit() => OrientAst::Literal(cur.direction()?),
        _ => OrientAst::Unspecified,
    };
    if orient == OrientAst::PointsAtCenter && position.is_some() {
        return Err(cur.error("pointing shorthand `state.` takes no explicit position"));
    }
    Ok(AltAst {
        negated,
        position,
        state,
        orient,
    })
}

fn parse_target(cur: &mut Cursor) -> Result<(String, TargetDirAst), ParseError> {
    let state = parse_state(cur)?;
    cur.skip_ws();
    let dir = match cur.peek() {
        Some(b'%') => {
            cur.bump();
            match cur.number() {
                Some(n) if n <= 5 => TargetDirAst::Percent(n as u8),
                Some(_) => return Err(cur.error("target rotations are %0..%5")),
                None => TargetDirAst::Percent(0),
            }
        }
        Some(b'.') => {
            cur.bump();
            match cur.number() {
                Some(n) if n <= 5 => TargetDirAst::Transfer(n as u8),
                Some(_) => return Err(cur.error("transfer rotations are .0...5")),
                None => return Err(cur.error("expected a rotation after `.`")),
            }
        }
        Some(c) if c.is_ascii_digit() => {
            let d = cur.direction()?;
            reject_ident_after_digit(cur)?;
            TargetDirAst::Literal(d)
        }
        _ => TargetDirAst::Unspecified,
    };
    cur.skip_ws();
    if cur.peek().is_some() {
        return Err(cur.error("unexpected character after target"));
    }
    Ok((state, dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(text: &str) -> AbstractRule {
        let rules = parse_rules(text).unwrap();
        assert_eq!(rules.len(), 1, "expected one rule from {:?}", text);
        rules.into_iter().next().unwrap().rule
    }

    #[test]
    fn test_simple_rule() {
        let rule = parse_one("a => b");
        assert_eq!(rule.source_state, "a");
        assert_eq!(rule.source_dir, SourceDir::Unspecified);
        assert!(rule.brackets.is_empty());
        assert_eq!(rule.target_state, "b");
        assert_eq!(rule.target_dir, TargetDirAst::Unspecified);
    }

    #[test]
    fn test_directional_rule() {
        let rule = parse_one("a3 => b2");
        assert_eq!(rule.source_dir, SourceDir::Literal(Direction::new(3).unwrap()));
        assert_eq!(rule.target_dir, TargetDirAst::Literal(Direction::new(2).unwrap()));
    }

    #[test]
    fn test_source_any_and_target_rotation() {
        let rule = parse_one("x% => y%5");
        assert_eq!(rule.source_dir, SourceDir::Any);
        assert_eq!(rule.target_dir, TargetDirAst::Percent(5));

        let rule = parse_one("a => b%");
        assert_eq!(rule.target_dir, TargetDirAst::Percent(0));
    }

    #[test]
    fn test_condition_forms() {
        let rule = parse_one("a[2b4] => c");
        let alt = &rule.brackets[0].alts[0];
        assert_eq!(alt.position, Direction::new(2));
        assert_eq!(alt.state, "b");
        assert_eq!(alt.orient, OrientAst::Literal(Direction::new(4).unwrap()));

        let rule = parse_one("a[x%] => c");
        assert_eq!(rule.brackets[0].alts[0].orient, OrientAst::AnyDirection);

        let rule = parse_one("_[t.] => a");
        let alt = &rule.brackets[0].alts[0];
        assert_eq!(alt.position, None);
        assert_eq!(alt.orient, OrientAst::PointsAtCenter);
    }

    #[test]
    fn test_negation_with_and_without_position() {
        let rule = parse_one("t[-2a] => t");
        let alt = &rule.brackets[0].alts[0];
        assert!(alt.negated);
        assert_eq!(alt.position, Direction::new(2));

        // unpositioned negation is universal ("no neighbor is a")
        let rule = parse_one("t[-a] => t%");
        let alt = &rule.brackets[0].alts[0];
        assert!(alt.negated);
        assert_eq!(alt.position, None);
    }

    #[test]
    fn test_bracket_repeat_and_alternatives() {
        let rule = parse_one("_[a]3[x|y] => a");
        assert_eq!(rule.brackets.len(), 2);
        assert_eq!(rule.brackets[0].repeat, 3);
        assert_eq!(rule.brackets[1].alts.len(), 2);

        let rule = parse_one("a[] => b");
        assert_eq!(rule.brackets[0].alts[0].state, EMPTY_STATE);
    }

    #[test]
    fn test_top_level_or_shares_group() {
        let rules = parse_rules("a[x] | a[y] => b").unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].group, 0);
        assert_eq!(rules[1].group, 0);
        assert_eq!(rules[0].rule.target_state, "b");
        assert_eq!(rules[1].rule.target_state, "b");
    }

    #[test]
    fn test_separators_comments_and_blank_lines() {
        let rules = parse_rules("a => b; b => c\n\n# comment line\nc => a").unwrap();
        assert_eq!(rules.len(), 3);
        let groups: Vec<usize> = rules.iter().map(|r| r.group).collect();
        assert_eq!(groups, vec![0, 1, 2]);
    }

    #[test]
    fn test_preset_b3s23() {
        let rules = parse_rules("b3s23").unwrap();
        assert_eq!(rules.len(), 4);
        let groups: Vec<usize> = rules.iter().map(|r| r.group).collect();
        assert_eq!(groups, vec![0, 1, 2, 2]);
        assert_eq!(rules[0].rule.target_state, "a");
        assert_eq!(rules[3].rule.target_state, EMPTY_STATE);

        // rules after the preset keep counting groups
        let rules = parse_rules("b3s23\nt => x").unwrap();
        assert_eq!(rules.last().unwrap().group, 3);
    }

    #[test]
    fn test_transfer_target_requires_pointing() {
        let rules = parse_rules("_[t.] => z.2").unwrap();
        assert_eq!(rules[0].rule.target_dir, TargetDirAst::Transfer(2));

        let err = parse_rules("_[t] => z.2").unwrap_err();
        assert!(err.message.contains("pointing"));
    }

    #[test]
    fn test_rejects_missing_arrow() {
        let err = parse_rules("a b").unwrap_err();
        assert!(err.message.contains("=>"));
    }

    #[test]
    fn test_rejects_digits_in_identifiers() {
        assert!(parse_rules("3a => b").is_err());
        assert!(parse_rules("a3b => c").is_err());
        assert!(parse_rules("a => b2x").is_err());
    }

    #[test]
    fn test_rejects_out_of_range_numbers() {
        let err = parse_rules("a[x]7 => b").unwrap_err();
        assert!(err.message.contains("repeat"));

        let err = parse_rules("a => b%9").unwrap_err();
        assert!(err.message.contains("rotation"));

        assert!(parse_rules("a7 => b").is_err());
        assert!(parse_rules("a[7x] => b").is_err());
    }

    #[test]
    fn test_rejects_positioned_pointing() {
        let err = parse_rules("a[2x.] => b").unwrap_err();
        assert!(err.message.contains("pointing"));
    }

    #[test]
    fn test_error_location() {
        let err = parse_rules("a => b\nc => 9").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.rule, "c => 9");
        // offset points into the second line
        assert!(err.offset > "a => b".len());
    }

    #[test]
    fn test_canonical_text_round_trips() {
        let text = "b3s23\nt%[x.|-2y]3 => z%1\n_[t.] => z.2";
        let parsed = parse_rules(text).unwrap();
        let canonical = canonical_text(&parsed);
        let reparsed = parse_rules(&canonical).unwrap();
        assert_eq!(parsed, reparsed);
    }
}
