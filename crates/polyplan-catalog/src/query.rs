//! Target queries - pick runtime targets from the matrix by market share,
//! version and maintenance status.
//!
//! ```text
//! > 0.5%, last 2 versions, not dead
//! chrome >= 58, firefox >= 115
//! > 1% and not ie 11
//! ```
//!
//! Clauses separated by `,` or ` or ` are unioned left to right. A clause
//! starting with `not` removes its matches from everything selected so far.
//! Terms inside a clause joined by ` and ` are intersected; a `not` in front
//! of such a term complements it.

use crate::capability::TargetId;
use crate::matrix::{RuntimeTarget, SupportMatrix};
use crate::version::Version;
use std::collections::BTreeSet;

/// Expansion of the `defaults` keyword.
pub const DEFAULTS: &str = "> 0.5%, last 2 versions, not dead";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("empty target query")]
    Empty,
    #[error("invalid query clause '{clause}': {reason}")]
    Syntax { clause: String, reason: String },
    #[error("unknown target family or id '{0}'")]
    UnknownName(String),
    #[error("unknown version '{version}' for family '{family}'")]
    UnknownVersion { family: String, version: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
}

impl Op {
    fn parse(s: &str) -> Option<Self> {
        match s {
            ">" => Some(Op::Gt),
            ">=" => Some(Op::Ge),
            "<" => Some(Op::Lt),
            "<=" => Some(Op::Le),
            "=" | "==" => Some(Op::Eq),
            _ => None,
        }
    }

    fn test<T: PartialOrd>(self, lhs: &T, rhs: &T) -> bool {
        match self {
            Op::Gt => lhs > rhs,
            Op::Ge => lhs >= rhs,
            Op::Lt => lhs < rhs,
            Op::Le => lhs <= rhs,
            Op::Eq => lhs == rhs,
        }
    }
}

#[derive(Debug, Clone)]
enum Atom {
    All,
    Defaults,
    Dead,
    Usage { op: Op, percent: f64 },
    Last { count: usize, family: Option<String> },
    /// A family name or a target id; which one is decided against the matrix.
    Name(String),
    Version { family: String, op: Op, version: String },
}

#[derive(Debug, Clone)]
struct Term {
    negate: bool,
    atom: Atom,
}

#[derive(Debug, Clone)]
struct Clause {
    exclude: bool,
    terms: Vec<Term>,
}

/// A parsed target query.
#[derive(Debug, Clone)]
pub struct TargetQuery {
    raw: String,
    clauses: Vec<Clause>,
}

impl TargetQuery {
    pub fn parse(query: &str) -> Result<Self, QueryError> {
        let mut clauses = Vec::new();
        for part in split_union(query) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (exclude, body) = match strip_not(part) {
                Some(rest) => (true, rest),
                None => (false, part),
            };
            let mut terms = Vec::new();
            for term in split_keyword(body, "and") {
                let term = term.trim();
                let (negate, atom) = match strip_not(term) {
                    Some(rest) => (true, rest),
                    None => (false, term),
                };
                terms.push(Term {
                    negate,
                    atom: parse_atom(atom)?,
                });
            }
            clauses.push(Clause { exclude, terms });
        }
        if clauses.is_empty() {
            return Err(QueryError::Empty);
        }
        Ok(Self {
            raw: query.trim().to_string(),
            clauses,
        })
    }

    /// Evaluate against a matrix. The result is sorted by target id.
    pub fn select(&self, matrix: &SupportMatrix) -> Result<BTreeSet<TargetId>, QueryError> {
        let mut selected = BTreeSet::new();
        for clause in &self.clauses {
            let mut matched: Option<BTreeSet<TargetId>> = None;
            for term in &clause.terms {
                let mut set = eval_atom(&term.atom, matrix)?;
                if term.negate {
                    set = matrix
                        .targets()
                        .map(|t| t.id.clone())
                        .filter(|id| !set.contains(id))
                        .collect();
                }
                matched = Some(match matched {
                    None => set,
                    Some(prev) => prev.intersection(&set).cloned().collect(),
                });
            }
            let matched = matched.unwrap_or_default();
            if clause.exclude {
                selected.retain(|id| !matched.contains(id));
            } else {
                selected.extend(matched);
            }
        }
        tracing::debug!(query = %self.raw, selected = selected.len(), "target query evaluated");
        Ok(selected)
    }
}

/// Parse and evaluate in one step.
pub fn select_targets(query: &str, matrix: &SupportMatrix) -> Result<BTreeSet<TargetId>, QueryError> {
    TargetQuery::parse(query)?.select(matrix)
}

fn split_union(query: &str) -> Vec<&str> {
    query
        .split(',')
        .flat_map(|part| split_keyword(part, "or"))
        .collect()
}

/// Split on a whitespace-delimited keyword, case-insensitively.
fn split_keyword<'a>(s: &'a str, keyword: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut prev_end = 0;
    for word in s.split_whitespace() {
        // split_whitespace yields subslices of `s`; recover their offsets.
        let offset = word.as_ptr() as usize - s.as_ptr() as usize;
        if word.eq_ignore_ascii_case(keyword) && offset > start {
            parts.push(&s[start..prev_end]);
            start = offset + word.len();
        }
        prev_end = offset + word.len();
    }
    parts.push(&s[start..]);
    parts
}

fn strip_not(s: &str) -> Option<&str> {
    let (first, rest) = s.split_once(char::is_whitespace)?;
    first.eq_ignore_ascii_case("not").then(|| rest.trim_start())
}

fn syntax(clause: &str, reason: &str) -> QueryError {
    QueryError::Syntax {
        clause: clause.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_atom(atom: &str) -> Result<Atom, QueryError> {
    let atom = atom.trim();
    if atom.is_empty() {
        return Err(syntax(atom, "empty term"));
    }

    if atom.starts_with('>') || atom.starts_with('<') {
        let compact: String = atom.chars().filter(|c| !c.is_whitespace()).collect();
        let Some(body) = compact.strip_suffix('%') else {
            return Err(syntax(atom, "usage comparisons must end with '%'"));
        };
        let split = body
            .find(|c: char| !matches!(c, '>' | '<' | '='))
            .unwrap_or(body.len());
        let op = Op::parse(&body[..split]).ok_or_else(|| syntax(atom, "unknown comparison"))?;
        let percent: f64 = body[split..]
            .parse()
            .map_err(|_| syntax(atom, "expected a percentage"))?;
        return Ok(Atom::Usage { op, percent });
    }

    let words: Vec<&str> = atom.split_whitespace().collect();
    let lower: Vec<String> = words.iter().map(|w| w.to_ascii_lowercase()).collect();
    match lower.as_slice() {
        [w] if w == "all" => Ok(Atom::All),
        [w] if w == "defaults" => Ok(Atom::Defaults),
        [w] if w == "dead" => Ok(Atom::Dead),
        [last, n, versions] if last == "last" && is_versions(versions) => Ok(Atom::Last {
            count: parse_count(atom, n)?,
            family: None,
        }),
        [last, n, _, versions] if last == "last" && is_versions(versions) => Ok(Atom::Last {
            count: parse_count(atom, n)?,
            family: Some(lower[2].clone()),
        }),
        [_] => Ok(Atom::Name(words[0].to_string())),
        [_, _] => Ok(Atom::Version {
            family: lower[0].clone(),
            op: Op::Eq,
            version: words[1].to_string(),
        }),
        [_, op, _] => Ok(Atom::Version {
            family: lower[0].clone(),
            op: Op::parse(op).ok_or_else(|| syntax(atom, "unknown comparison"))?,
            version: words[2].to_string(),
        }),
        _ => Err(syntax(atom, "unrecognized query")),
    }
}

fn is_versions(word: &str) -> bool {
    word == "versions" || word == "version"
}

fn parse_count(atom: &str, n: &str) -> Result<usize, QueryError> {
    n.parse()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| syntax(atom, "expected a positive version count"))
}

fn ids<'a>(targets: impl Iterator<Item = &'a RuntimeTarget>) -> BTreeSet<TargetId> {
    targets.map(|t| t.id.clone()).collect()
}

fn find_family<'a>(matrix: &'a SupportMatrix, name: &str) -> Option<&'a str> {
    matrix
        .families()
        .into_iter()
        .find(|f| f.eq_ignore_ascii_case(name))
}

fn eval_atom(atom: &Atom, matrix: &SupportMatrix) -> Result<BTreeSet<TargetId>, QueryError> {
    match atom {
        Atom::All => Ok(ids(matrix.targets())),
        Atom::Defaults => select_targets(DEFAULTS, matrix),
        Atom::Dead => Ok(ids(matrix.targets().filter(|t| t.dead))),
        Atom::Usage { op, percent } => Ok(ids(matrix
            .targets()
            .filter(|t| op.test(&t.usage, percent)))),
        Atom::Last { count, family } => {
            let families: Vec<&str> = match family {
                Some(name) => vec![
                    find_family(matrix, name)
                        .ok_or_else(|| QueryError::UnknownName(name.clone()))?,
                ],
                None => matrix.families().into_iter().collect(),
            };
            let mut selected = BTreeSet::new();
            for family in families {
                let members = matrix.family(family);
                let skip = members.len().saturating_sub(*count);
                selected.extend(members.into_iter().skip(skip).map(|t| t.id.clone()));
            }
            Ok(selected)
        }
        Atom::Name(name) => {
            if matrix.contains_target(name) {
                return Ok(BTreeSet::from([name.clone()]));
            }
            let family =
                find_family(matrix, name).ok_or_else(|| QueryError::UnknownName(name.clone()))?;
            Ok(ids(matrix.family(family).into_iter()))
        }
        Atom::Version {
            family,
            op,
            version,
        } => {
            let joined = format!("{} {}", family, version);
            if *op == Op::Eq && matrix.contains_target(&joined) {
                return Ok(BTreeSet::from([joined]));
            }
            let name = find_family(matrix, family)
                .ok_or_else(|| QueryError::UnknownName(family.clone()))?;
            let wanted = Version::parse(version);
            let selected = ids(matrix
                .family(name)
                .into_iter()
                .filter(|t| op.test(&t.version, &wanted)));
            if *op == Op::Eq && selected.is_empty() {
                return Err(QueryError::UnknownVersion {
                    family: name.to_string(),
                    version: version.clone(),
                });
            }
            Ok(selected)
        }
    }
}
