//! Usage sets: which capabilities each build unit uses.
//!
//! Usage sets come from a feature-usage extractor that runs outside
//! polyplan. They are passed on the command line (`--uses a,b,c`) or in a
//! usage file with one table per unit:
//!
//! ```toml
//! [unit.main]
//! uses = ["async-await", "fetch"]
//!
//! [unit.worker]
//! uses = ["promise"]
//! targets = "last 1 chrome versions"
//! ```

use polyplan_catalog::CapabilityId;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Unit name used for `--uses`.
pub const DEFAULT_UNIT: &str = "main";

#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid usage file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("usage file {} defines no units", .0.display())]
    Empty(PathBuf),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct UsageFile {
    #[serde(default)]
    unit: BTreeMap<String, UnitEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct UnitEntry {
    #[serde(default)]
    uses: Vec<CapabilityId>,
    targets: Option<String>,
}

/// One build unit to plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub name: String,
    pub uses: BTreeSet<CapabilityId>,
    /// Overrides the command-wide target query.
    pub targets: Option<String>,
}

impl Unit {
    pub fn new(name: impl Into<String>, uses: impl IntoIterator<Item = CapabilityId>) -> Self {
        Self {
            name: name.into(),
            uses: uses.into_iter().collect(),
            targets: None,
        }
    }
}

/// Parse a usage file, units ordered by name.
pub fn parse_units(content: &str, path: &Path) -> Result<Vec<Unit>, UsageError> {
    let file: UsageFile = toml::from_str(content).map_err(|source| UsageError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if file.unit.is_empty() {
        return Err(UsageError::Empty(path.to_path_buf()));
    }
    Ok(file
        .unit
        .into_iter()
        .map(|(name, entry)| Unit {
            name,
            uses: normalize(entry.uses),
            targets: entry.targets,
        })
        .collect())
}

pub fn read_units(path: &Path) -> Result<Vec<Unit>, UsageError> {
    let content = std::fs::read_to_string(path).map_err(|source| UsageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_units(&content, path)
}

/// Trim ids and drop empty ones.
pub fn normalize(ids: impl IntoIterator<Item = String>) -> BTreeSet<CapabilityId> {
    ids.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
