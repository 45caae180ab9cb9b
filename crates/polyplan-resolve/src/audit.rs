//! Catalog-wide dependency checks that need no usage set or targets.
//!
//! The resolver only walks the capabilities a unit reaches, so a cycle in
//! an unused corner of the catalog stays hidden until some unit uses it.
//! [`catalog_cycles`] walks every registration up front.

use crate::error::{PlanError, ResolveError};
use crate::plan::plan;
use crate::resolve::{Resolution, ResolvedCapability, union};
use polyplan_catalog::{CapabilityId, Catalog};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A dependency cycle found in a catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, schemars::JsonSchema)]
#[serde(tag = "level", rename_all = "lowercase")]
pub enum CatalogCycle {
    /// Capabilities whose `requires` lists loop; starts and ends on the
    /// same id, rotated to start at the smallest one.
    Capability { path: Vec<CapabilityId> },
    /// Polyfill modules that would have to precede each other.
    Module { modules: Vec<String> },
}

impl std::fmt::Display for CatalogCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogCycle::Capability { path } => {
                let err = ResolveError::DependencyCycle { path: path.clone() };
                write!(f, "{err}")
            }
            CatalogCycle::Module { modules } => {
                let err = PlanError::DependencyCycle {
                    modules: modules.clone(),
                };
                write!(f, "{err}")
            }
        }
    }
}

/// Every capability the catalog lists as a dependency of `id`, through any
/// strategy registered for it.
fn edges<'a>(catalog: &'a Catalog, id: &str) -> BTreeSet<&'a str> {
    let mut out = BTreeSet::new();
    if let Some(capability) = catalog.capability(id) {
        out.extend(capability.requires.iter().map(String::as_str));
    }
    if let Some(polyfill) = catalog.polyfill(id) {
        out.extend(polyfill.requires.iter().map(String::as_str));
    }
    if let Some(transform) = catalog.transform(id) {
        out.extend(transform.requires.iter().map(String::as_str));
    }
    out
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnPath,
    Done,
}

fn walk<'a>(
    catalog: &'a Catalog,
    id: &'a str,
    marks: &mut BTreeMap<&'a str, Mark>,
    path: &mut Vec<&'a str>,
    found: &mut BTreeSet<CatalogCycle>,
) {
    match marks.get(id) {
        Some(Mark::Done) => return,
        Some(Mark::OnPath) => {
            let pos = path.iter().position(|p| *p == id).unwrap_or_default();
            let mut cycle: Vec<CapabilityId> = path[pos..].iter().map(|s| s.to_string()).collect();
            if let Some(min) = cycle
                .iter()
                .enumerate()
                .min_by(|a, b| a.1.cmp(b.1))
                .map(|(i, _)| i)
            {
                cycle.rotate_left(min);
            }
            if let Some(first) = cycle.first().cloned() {
                cycle.push(first);
            }
            found.insert(CatalogCycle::Capability { path: cycle });
            return;
        }
        None => {}
    }
    marks.insert(id, Mark::OnPath);
    path.push(id);
    for dep in edges(catalog, id) {
        walk(catalog, dep, marks, path, found);
    }
    path.pop();
    marks.insert(id, Mark::Done);
}

/// Find dependency cycles anywhere in `catalog`, sorted.
///
/// Module-level cycles are only looked for when the capability graph is
/// acyclic; a capability cycle usually implies a module cycle too.
pub fn catalog_cycles(catalog: &Catalog) -> Vec<CatalogCycle> {
    let mut found = BTreeSet::new();
    let mut marks = BTreeMap::new();
    for capability in catalog.capabilities() {
        let mut path = Vec::new();
        walk(catalog, &capability.id, &mut marks, &mut path, &mut found);
    }
    if !found.is_empty() {
        return found.into_iter().collect();
    }

    // Plan as if every registration were needed at once.
    let everything: BTreeMap<CapabilityId, ResolvedCapability> = catalog
        .capabilities()
        .map(|capability| {
            let resolution = if let Some(polyfill) = catalog.polyfill(&capability.id) {
                Resolution::Polyfillable {
                    module: polyfill.module.clone(),
                    requires: union(&capability.requires, &polyfill.requires),
                    missing: Vec::new(),
                    size: polyfill.size,
                }
            } else if let Some(transform) = catalog.transform(&capability.id) {
                Resolution::Transformable {
                    transform: transform.id.clone(),
                    requires: union(&capability.requires, &transform.requires),
                    missing: Vec::new(),
                }
            } else {
                Resolution::Native
            };
            let resolved = ResolvedCapability {
                kind: capability.kind,
                resolution,
                direct: false,
                required_by: BTreeSet::new(),
            };
            (capability.id.clone(), resolved)
        })
        .collect();
    match plan(&everything) {
        Ok(_) => Vec::new(),
        Err(PlanError::DependencyCycle { modules }) => vec![CatalogCycle::Module { modules }],
    }
}
