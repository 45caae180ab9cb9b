//! Capability resolver.
//!
//! For every used capability, decides whether the selected targets run it
//! natively, need a polyfill, need a source transform, or cannot run it at
//! all. Dependencies of non-native capabilities (the capability's own
//! `requires` plus the chosen strategy's) are resolved as implied usage.
//!
//! Resolution is a pure function of the catalog, the usage set, the target
//! set and the polyfill mode. Top-level capabilities are resolved in
//! parallel; results are merged by capability id so the outcome never
//! depends on scheduling.

use crate::error::{ResolveError, UnsupportedCapability};
use polyplan_catalog::{Capability, CapabilityId, CapabilityKind, Catalog, TargetId};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How polyfills are brought in.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum PolyfillMode {
    /// Polyfill what the unit uses (default).
    #[default]
    Usage,
    /// Polyfill everything in the catalog the targets lack, used or not.
    Entry,
    /// Never polyfill; missing APIs are reported as unsupported.
    Off,
}

impl PolyfillMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Usage => "usage",
            Self::Entry => "entry",
            Self::Off => "off",
        }
    }
}

impl std::str::FromStr for PolyfillMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "usage" => Ok(Self::Usage),
            "entry" => Ok(Self::Entry),
            "off" | "false" | "none" => Ok(Self::Off),
            other => Err(format!(
                "unknown polyfill mode '{}' (expected usage, entry or off)",
                other
            )),
        }
    }
}

impl std::fmt::Display for PolyfillMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision for one capability against the whole target set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum Resolution {
    /// Every target supports it.
    Native,
    /// A polyfill module covers the gap.
    #[serde(rename = "polyfill")]
    Polyfillable {
        module: String,
        /// Capabilities the polyfilled code relies on.
        requires: Vec<CapabilityId>,
        /// Targets lacking native support, sorted.
        missing: Vec<TargetId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        size: Option<u64>,
    },
    /// A source transform removes the syntax.
    #[serde(rename = "transform")]
    Transformable {
        transform: String,
        /// Capabilities the transformed code relies on.
        requires: Vec<CapabilityId>,
        missing: Vec<TargetId>,
    },
    /// Nothing covers the gap.
    Unsupported { missing: Vec<TargetId> },
}

impl Resolution {
    pub fn strategy(&self) -> &'static str {
        match self {
            Resolution::Native => "native",
            Resolution::Polyfillable { .. } => "polyfill",
            Resolution::Transformable { .. } => "transform",
            Resolution::Unsupported { .. } => "unsupported",
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Resolution::Native)
    }

    /// Dependencies pulled in by this decision.
    pub fn requires(&self) -> &[CapabilityId] {
        match self {
            Resolution::Polyfillable { requires, .. }
            | Resolution::Transformable { requires, .. } => requires,
            Resolution::Native | Resolution::Unsupported { .. } => &[],
        }
    }

    /// Targets lacking native support (empty for `Native`).
    pub fn missing(&self) -> &[TargetId] {
        match self {
            Resolution::Native => &[],
            Resolution::Polyfillable { missing, .. }
            | Resolution::Transformable { missing, .. }
            | Resolution::Unsupported { missing } => missing,
        }
    }
}

/// A resolved capability and why it is part of the unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct ResolvedCapability {
    pub kind: CapabilityKind,
    #[serde(flatten)]
    pub resolution: Resolution,
    /// Listed in the usage set.
    pub direct: bool,
    /// Capabilities whose strategy pulled this one in.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub required_by: BTreeSet<CapabilityId>,
}

/// Result of resolving one unit: every decision plus the accumulated
/// unsupported capabilities.
#[derive(Debug, Clone, PartialEq, Serialize, schemars::JsonSchema)]
pub struct ResolveOutcome {
    pub targets: Vec<TargetId>,
    pub mode: PolyfillMode,
    pub resolutions: BTreeMap<CapabilityId, ResolvedCapability>,
    pub errors: Vec<UnsupportedCapability>,
}

impl ResolveOutcome {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone)]
struct Node {
    kind: CapabilityKind,
    resolution: Resolution,
    required_by: BTreeSet<CapabilityId>,
}

/// Resolves usage sets against one catalog and one target set.
pub struct Resolver<'a> {
    catalog: &'a Catalog,
    targets: BTreeSet<TargetId>,
    mode: PolyfillMode,
}

impl<'a> Resolver<'a> {
    /// Create a resolver. Every target must exist in the catalog.
    pub fn new(catalog: &'a Catalog, targets: BTreeSet<TargetId>) -> Result<Self, ResolveError> {
        if targets.is_empty() {
            return Err(ResolveError::NoTargets);
        }
        let unknown: Vec<TargetId> = targets
            .iter()
            .filter(|t| !catalog.matrix().contains_target(t))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ResolveError::UnknownTarget { ids: unknown });
        }
        Ok(Self {
            catalog,
            targets,
            mode: PolyfillMode::default(),
        })
    }

    pub fn with_mode(mut self, mode: PolyfillMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn targets(&self) -> &BTreeSet<TargetId> {
        &self.targets
    }

    /// Decide a single capability, without looking at its dependencies.
    pub fn decide(&self, capability: &Capability) -> Resolution {
        let missing = self
            .catalog
            .matrix()
            .missing(&capability.id, &self.targets)
            .unwrap_or_else(|| self.targets.clone());
        if missing.is_empty() {
            return Resolution::Native;
        }
        let missing: Vec<TargetId> = missing.into_iter().collect();

        if self.mode != PolyfillMode::Off
            && let Some(polyfill) = self.catalog.polyfill(&capability.id)
        {
            return Resolution::Polyfillable {
                module: polyfill.module.clone(),
                requires: union(&capability.requires, &polyfill.requires),
                missing,
                size: polyfill.size,
            };
        }

        if capability.kind == CapabilityKind::Syntax
            && let Some(transform) = self.catalog.transform(&capability.id)
        {
            return Resolution::Transformable {
                transform: transform.id.clone(),
                requires: union(&capability.requires, &transform.requires),
                missing,
            };
        }

        Resolution::Unsupported { missing }
    }

    /// Resolve a usage set and the dependency closure of its non-native
    /// capabilities.
    pub fn resolve<I, S>(&self, used: I) -> Result<ResolveOutcome, ResolveError>
    where
        I: IntoIterator<Item = S>,
        S: Into<CapabilityId>,
    {
        let used: BTreeSet<CapabilityId> = used.into_iter().map(Into::into).collect();

        let unknown: Vec<CapabilityId> = used
            .iter()
            .filter(|id| self.catalog.capability(id).is_none())
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ResolveError::UnknownCapability { ids: unknown });
        }

        let mut roots = used.clone();
        if self.mode == PolyfillMode::Entry {
            for polyfill in self.catalog.polyfills() {
                if let Some(cap) = self.catalog.capability(&polyfill.capability)
                    && !self.decide(cap).is_native()
                {
                    roots.insert(cap.id.clone());
                }
            }
        }

        let roots: Vec<&CapabilityId> = roots.iter().collect();
        let closures: Vec<Result<BTreeMap<CapabilityId, Node>, ResolveError>> =
            roots.par_iter().map(|root| self.closure(root)).collect();

        let mut merged: BTreeMap<CapabilityId, Node> = BTreeMap::new();
        for closure in closures {
            for (id, node) in closure? {
                match merged.get_mut(&id) {
                    Some(existing) => existing.required_by.extend(node.required_by),
                    None => {
                        merged.insert(id, node);
                    }
                }
            }
        }

        let mut errors = Vec::new();
        let mut resolutions = BTreeMap::new();
        for (id, node) in merged {
            tracing::debug!(
                capability = %id,
                strategy = node.resolution.strategy(),
                missing = node.resolution.missing().len(),
                "resolved"
            );
            if let Resolution::Unsupported { missing } = &node.resolution
                && let Some(first) = missing.first()
            {
                tracing::warn!(capability = %id, target = %first, "unsupported capability");
                errors.push(UnsupportedCapability {
                    capability: id.clone(),
                    target: first.clone(),
                    missing_targets: missing.len(),
                });
            }
            resolutions.insert(
                id.clone(),
                ResolvedCapability {
                    kind: node.kind,
                    resolution: node.resolution,
                    direct: used.contains(&id),
                    required_by: node.required_by,
                },
            );
        }

        Ok(ResolveOutcome {
            targets: self.targets.iter().cloned().collect(),
            mode: self.mode,
            resolutions,
            errors,
        })
    }

    /// Resolve `root` and everything its strategy depends on.
    fn closure(&self, root: &str) -> Result<BTreeMap<CapabilityId, Node>, ResolveError> {
        let mut walk = Walk::default();
        self.visit(root, None, &mut walk)?;
        Ok(walk.out)
    }

    fn visit(&self, id: &str, parent: Option<&str>, walk: &mut Walk) -> Result<(), ResolveError> {
        if walk.on_path.contains(id) {
            let pos = walk.path.iter().position(|p| p == id).unwrap_or_default();
            let mut cycle = walk.path[pos..].to_vec();
            cycle.push(id.to_string());
            return Err(ResolveError::DependencyCycle { path: cycle });
        }
        if let Some(node) = walk.out.get_mut(id) {
            if let Some(parent) = parent {
                node.required_by.insert(parent.to_string());
            }
            return Ok(());
        }

        let capability =
            self.catalog
                .capability(id)
                .ok_or_else(|| ResolveError::UnknownCapability {
                    ids: vec![id.to_string()],
                })?;
        let resolution = self.decide(capability);
        let deps = resolution.requires().to_vec();
        walk.out.insert(
            id.to_string(),
            Node {
                kind: capability.kind,
                resolution,
                required_by: parent.map(str::to_string).into_iter().collect(),
            },
        );

        walk.path.push(id.to_string());
        walk.on_path.insert(id.to_string());
        for dep in &deps {
            self.visit(dep, Some(id), walk)?;
        }
        walk.on_path.remove(id);
        walk.path.pop();
        Ok(())
    }
}

/// DFS state for one closure. `on_path` mirrors `path` for O(log n)
/// membership; `path` keeps the order for cycle reports.
#[derive(Default)]
struct Walk {
    path: Vec<CapabilityId>,
    on_path: BTreeSet<CapabilityId>,
    out: BTreeMap<CapabilityId, Node>,
}

pub(crate) fn union(a: &[CapabilityId], b: &[CapabilityId]) -> Vec<CapabilityId> {
    a.iter()
        .chain(b)
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Resolve `used` against `targets` in one call.
pub fn resolve(
    catalog: &Catalog,
    used: &BTreeSet<CapabilityId>,
    targets: &BTreeSet<TargetId>,
    mode: PolyfillMode,
) -> Result<ResolveOutcome, ResolveError> {
    Resolver::new(catalog, targets.clone())?
        .with_mode(mode)
        .resolve(used.iter().cloned())
}
