//! Version ordering for runtime targets within a family.
//!
//! Versions are compared segment by segment on `.`. Numeric segments compare
//! numerically, text segments sort after every number and compare
//! lexicographically. Missing trailing segments count as `0`, so `10 == 10.0`.
//! A range such as `15.2-15.3` orders by its lower bound.

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Segment {
    Num(u64),
    Text(String),
}

impl Segment {
    fn parse(s: &str) -> Self {
        match s.parse::<u64>() {
            Ok(n) => Segment::Num(n),
            Err(_) => Segment::Text(s.to_string()),
        }
    }
}

/// A target version, ordered within its family.
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    segments: Vec<Segment>,
}

impl Version {
    /// Parse a version string. Never fails: anything that isn't numeric is
    /// kept as a text segment.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let lower = raw.split_once('-').map(|(lo, _)| lo).unwrap_or(raw);
        let segments = lower
            .split('.')
            .filter(|s| !s.is_empty())
            .map(Segment::parse)
            .collect();
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        let zero = Segment::Num(0);
        for i in 0..len {
            let a = self.segments.get(i).unwrap_or(&zero);
            let b = other.segments.get(i).unwrap_or(&zero);
            match a.cmp(b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
