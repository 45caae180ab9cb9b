//! Support matrix store.
//!
//! Maps each capability to the set of runtime targets that support it
//! natively, and each target back to its capabilities. Built once from a
//! [`CatalogSource`]; read-only afterwards.

use crate::capability::{CapabilityId, TargetId};
use crate::error::{CatalogError, CatalogProblem};
use crate::source::CatalogSource;
use crate::version::Version;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A runtime a build may target.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeTarget {
    pub id: TargetId,
    pub family: String,
    #[serde(serialize_with = "serialize_version")]
    pub version: Version,
    /// Global usage share in percent.
    pub usage: f64,
    pub dead: bool,
    /// Capabilities this target supports natively.
    pub supports: BTreeSet<CapabilityId>,
}

fn serialize_version<S: serde::Serializer>(v: &Version, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(v.as_str())
}

/// Capability → supporting targets, plus the target table itself.
#[derive(Debug, Clone, Default)]
pub struct SupportMatrix {
    targets: BTreeMap<TargetId, RuntimeTarget>,
    support: BTreeMap<CapabilityId, BTreeSet<TargetId>>,
}

impl SupportMatrix {
    /// Load the matrix part of a catalog source (targets and capability
    /// support). Registrations are not looked at.
    pub fn load(source: &CatalogSource) -> Result<Self, CatalogError> {
        let mut problems = Vec::new();
        let matrix = Self::build(source, &mut problems);
        if problems.is_empty() {
            Ok(matrix)
        } else {
            Err(CatalogError::Malformed { problems })
        }
    }

    /// Build the matrix, pushing every defect found into `problems`.
    pub(crate) fn build(source: &CatalogSource, problems: &mut Vec<CatalogProblem>) -> Self {
        let mut targets = BTreeMap::new();
        for entry in &source.targets {
            let id = entry.resolved_id();
            if id.trim().is_empty() || entry.family.trim().is_empty() {
                problems.push(CatalogProblem::EmptyIdentifier("target"));
                continue;
            }
            if !entry.usage.is_finite() || !(0.0..=100.0).contains(&entry.usage) {
                problems.push(CatalogProblem::InvalidUsage {
                    target: id.clone(),
                    usage: entry.usage.to_string(),
                });
            }
            if targets.contains_key(&id) {
                problems.push(CatalogProblem::DuplicateTarget(id));
                continue;
            }
            targets.insert(
                id.clone(),
                RuntimeTarget {
                    id,
                    family: entry.family.clone(),
                    version: Version::parse(&entry.version),
                    usage: entry.usage,
                    dead: entry.dead,
                    supports: BTreeSet::new(),
                },
            );
        }

        let families: BTreeSet<&str> = targets.values().map(|t| t.family.as_str()).collect();

        let mut support: BTreeMap<CapabilityId, BTreeSet<TargetId>> = BTreeMap::new();
        for entry in &source.capabilities {
            if entry.id.trim().is_empty() {
                problems.push(CatalogProblem::EmptyIdentifier("capability"));
                continue;
            }
            if support.contains_key(&entry.id) {
                problems.push(CatalogProblem::DuplicateCapability(entry.id.clone()));
                continue;
            }

            let mut supported = BTreeSet::new();
            for target in &entry.supported_by {
                if targets.contains_key(target) {
                    supported.insert(target.clone());
                } else {
                    problems.push(CatalogProblem::UnknownTarget {
                        capability: entry.id.clone(),
                        target: target.clone(),
                    });
                }
            }
            for (family, min) in &entry.since {
                if !families.contains(family.as_str()) {
                    problems.push(CatalogProblem::UnknownFamily {
                        capability: entry.id.clone(),
                        family: family.clone(),
                    });
                    continue;
                }
                let min = Version::parse(min);
                supported.extend(
                    targets
                        .values()
                        .filter(|t| &t.family == family && t.version >= min)
                        .map(|t| t.id.clone()),
                );
            }
            support.insert(entry.id.clone(), supported);
        }

        for (capability, supporting) in &support {
            for target in supporting {
                if let Some(t) = targets.get_mut(target) {
                    t.supports.insert(capability.clone());
                }
            }
        }

        Self { targets, support }
    }

    /// Targets that natively support `capability`, or `None` if the
    /// capability is not in the matrix.
    pub fn query(&self, capability: &str) -> Option<&BTreeSet<TargetId>> {
        self.support.get(capability)
    }

    /// Targets from `targets` that lack native support for `capability`.
    pub fn missing(
        &self,
        capability: &str,
        targets: &BTreeSet<TargetId>,
    ) -> Option<BTreeSet<TargetId>> {
        let supported = self.query(capability)?;
        Some(targets.difference(supported).cloned().collect())
    }

    pub fn target(&self, id: &str) -> Option<&RuntimeTarget> {
        self.targets.get(id)
    }

    pub fn contains_target(&self, id: &str) -> bool {
        self.targets.contains_key(id)
    }

    /// All targets, ordered by id.
    pub fn targets(&self) -> impl Iterator<Item = &RuntimeTarget> {
        self.targets.values()
    }

    /// Distinct family names, ordered.
    pub fn families(&self) -> BTreeSet<&str> {
        self.targets.values().map(|t| t.family.as_str()).collect()
    }

    /// Targets of one family, oldest version first.
    pub fn family(&self, family: &str) -> Vec<&RuntimeTarget> {
        let mut members: Vec<_> = self
            .targets
            .values()
            .filter(|t| t.family == family)
            .collect();
        members.sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.id.cmp(&b.id)));
        members
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(toml: &str) -> CatalogSource {
        CatalogSource::from_toml_str(toml).unwrap()
    }

    const BROWSERS: &str = r#"
[[target]]
family = "chrome"
version = "9"
[[target]]
family = "chrome"
version = "58"
[[target]]
family = "chrome"
version = "100"
[[target]]
family = "firefox"
version = "52"
"#;

    #[test]
    fn test_since_uses_version_ordering() {
        let toml = format!(
            "{BROWSERS}\n[[capability]]\nid = \"promise\"\nkind = \"api\"\nsince = {{ chrome = \"33\" }}\n"
        );
        let matrix = SupportMatrix::load(&source(&toml)).unwrap();
        let supported = matrix.query("promise").unwrap();
        let expected: BTreeSet<TargetId> =
            ["chrome 100", "chrome 58"].iter().map(|s| s.to_string()).collect();
        assert_eq!(supported, &expected);
    }

    #[test]
    fn test_supported_by_and_since_combine() {
        let toml = format!(
            "{BROWSERS}\n[[capability]]\nid = \"fetch\"\nkind = \"api\"\nsupported_by = [\"firefox 52\"]\nsince = {{ chrome = \"100\" }}\n"
        );
        let matrix = SupportMatrix::load(&source(&toml)).unwrap();
        assert_eq!(matrix.query("fetch").unwrap().len(), 2);
        assert!(matrix.target("firefox 52").unwrap().supports.contains("fetch"));
        assert!(!matrix.target("chrome 58").unwrap().supports.contains("fetch"));
    }

    #[test]
    fn test_missing_is_set_difference() {
        let toml = format!(
            "{BROWSERS}\n[[capability]]\nid = \"let\"\nkind = \"syntax\"\nsince = {{ chrome = \"58\", firefox = \"44\" }}\n"
        );
        let matrix = SupportMatrix::load(&source(&toml)).unwrap();
        let targets: BTreeSet<TargetId> = ["chrome 9", "chrome 58", "firefox 52"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let missing = matrix.missing("let", &targets).unwrap();
        assert_eq!(missing.into_iter().collect::<Vec<_>>(), vec!["chrome 9"]);
        assert!(matrix.missing("unknown", &targets).is_none());
    }

    #[test]
    fn test_family_sorted_by_version() {
        let matrix = SupportMatrix::load(&source(BROWSERS)).unwrap();
        let versions: Vec<_> = matrix
            .family("chrome")
            .iter()
            .map(|t| t.version.as_str().to_string())
            .collect();
        assert_eq!(versions, vec!["9", "58", "100"]);
    }

    #[test]
    fn test_rejects_unknown_targets_and_duplicates() {
        let toml = format!(
            "{BROWSERS}\n[[target]]\nfamily = \"chrome\"\nversion = \"58\"\n\
             [[capability]]\nid = \"let\"\nkind = \"syntax\"\nsupported_by = [\"opera 12\"]\nsince = {{ safari = \"10\" }}\n\
             [[capability]]\nid = \"let\"\nkind = \"syntax\"\n"
        );
        let Err(CatalogError::Malformed { problems }) = SupportMatrix::load(&source(&toml)) else {
            panic!("expected malformed catalog");
        };
        assert!(problems.contains(&CatalogProblem::DuplicateTarget("chrome 58".into())));
        assert!(problems.contains(&CatalogProblem::DuplicateCapability("let".into())));
        assert!(problems.contains(&CatalogProblem::UnknownTarget {
            capability: "let".into(),
            target: "opera 12".into(),
        }));
        assert!(problems.contains(&CatalogProblem::UnknownFamily {
            capability: "let".into(),
            family: "safari".into(),
        }));
    }

    #[test]
    fn test_rejects_invalid_usage() {
        let toml = "[[target]]\nfamily = \"x\"\nversion = \"1\"\nusage = 140.0\n";
        assert!(matches!(
            SupportMatrix::load(&source(toml)),
            Err(CatalogError::Malformed { .. })
        ));
    }
}
