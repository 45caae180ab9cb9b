//! The validated catalog: support matrix, capability definitions and the
//! polyfill/transform registries.

use crate::capability::{Capability, CapabilityId, CapabilityKind, Polyfill, Transform};
use crate::error::{CatalogError, CatalogProblem};
use crate::matrix::SupportMatrix;
use crate::source::CatalogSource;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Immutable input to every resolution. Safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    matrix: SupportMatrix,
    capabilities: BTreeMap<CapabilityId, Capability>,
    polyfills: BTreeMap<CapabilityId, Polyfill>,
    transforms: BTreeMap<CapabilityId, Transform>,
}

impl Catalog {
    /// Validate a source and build the catalog.
    ///
    /// Every problem in the source is collected and reported together.
    pub fn from_source(source: &CatalogSource) -> Result<Self, CatalogError> {
        let mut problems = Vec::new();
        let matrix = SupportMatrix::build(source, &mut problems);

        let mut capabilities = BTreeMap::new();
        for entry in &source.capabilities {
            // Duplicates and empty ids were already reported by the matrix.
            if entry.id.trim().is_empty() || capabilities.contains_key(&entry.id) {
                continue;
            }
            capabilities.insert(
                entry.id.clone(),
                Capability {
                    id: entry.id.clone(),
                    kind: entry.kind,
                    requires: sorted(&entry.requires),
                    description: entry.description.clone(),
                },
            );
        }

        for cap in capabilities.values() {
            check_dependencies(
                &format!("capability '{}'", cap.id),
                &cap.requires,
                &capabilities,
                &mut problems,
            );
        }

        let mut polyfills = BTreeMap::new();
        for entry in &source.polyfills {
            let Some(cap) = capabilities.get(&entry.capability) else {
                problems.push(CatalogProblem::UnregisteredCapability {
                    registration: "polyfill",
                    capability: entry.capability.clone(),
                });
                continue;
            };
            if entry.module.trim().is_empty() {
                problems.push(CatalogProblem::EmptyIdentifier("polyfill module"));
                continue;
            }
            if cap.kind == CapabilityKind::Syntax {
                problems.push(CatalogProblem::PolyfillForSyntax(cap.id.clone()));
                continue;
            }
            if polyfills.contains_key(&entry.capability) {
                problems.push(CatalogProblem::DuplicateRegistration {
                    registration: "polyfill",
                    capability: entry.capability.clone(),
                });
                continue;
            }
            let requires = sorted(&entry.requires);
            check_dependencies(
                &format!("polyfill '{}'", entry.module),
                &requires,
                &capabilities,
                &mut problems,
            );
            polyfills.insert(
                entry.capability.clone(),
                Polyfill {
                    capability: entry.capability.clone(),
                    module: entry.module.clone(),
                    requires,
                    size: entry.size,
                },
            );
        }

        let mut transforms = BTreeMap::new();
        for entry in &source.transforms {
            let Some(cap) = capabilities.get(&entry.capability) else {
                problems.push(CatalogProblem::UnregisteredCapability {
                    registration: "transform",
                    capability: entry.capability.clone(),
                });
                continue;
            };
            if entry.id.trim().is_empty() {
                problems.push(CatalogProblem::EmptyIdentifier("transform"));
                continue;
            }
            if cap.kind == CapabilityKind::Api {
                problems.push(CatalogProblem::TransformForApi(cap.id.clone()));
                continue;
            }
            if transforms.contains_key(&entry.capability) {
                problems.push(CatalogProblem::DuplicateRegistration {
                    registration: "transform",
                    capability: entry.capability.clone(),
                });
                continue;
            }
            let requires = sorted(&entry.requires);
            check_dependencies(
                &format!("transform '{}'", entry.id),
                &requires,
                &capabilities,
                &mut problems,
            );
            transforms.insert(
                entry.capability.clone(),
                Transform {
                    capability: entry.capability.clone(),
                    id: entry.id.clone(),
                    requires,
                },
            );
        }

        if !problems.is_empty() {
            return Err(CatalogError::Malformed { problems });
        }

        tracing::debug!(
            targets = matrix.targets().count(),
            capabilities = capabilities.len(),
            polyfills = polyfills.len(),
            transforms = transforms.len(),
            "catalog loaded"
        );

        Ok(Self {
            matrix,
            capabilities,
            polyfills,
            transforms,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        Self::from_source(&CatalogSource::from_toml_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self, CatalogError> {
        Self::from_source(&CatalogSource::from_json_str(content)?)
    }

    /// Read and validate a catalog file (`.toml` or `.json`).
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        Self::from_source(&CatalogSource::read(path)?)
    }

    pub fn matrix(&self) -> &SupportMatrix {
        &self.matrix
    }

    pub fn capability(&self, id: &str) -> Option<&Capability> {
        self.capabilities.get(id)
    }

    pub fn capabilities(&self) -> impl Iterator<Item = &Capability> {
        self.capabilities.values()
    }

    /// Polyfill registered for `capability`, if any.
    pub fn polyfill(&self, capability: &str) -> Option<&Polyfill> {
        self.polyfills.get(capability)
    }

    pub fn polyfills(&self) -> impl Iterator<Item = &Polyfill> {
        self.polyfills.values()
    }

    /// Transform registered for `capability`, if any.
    pub fn transform(&self, capability: &str) -> Option<&Transform> {
        self.transforms.get(capability)
    }

    pub fn transforms(&self) -> impl Iterator<Item = &Transform> {
        self.transforms.values()
    }
}

fn sorted(ids: &[String]) -> Vec<CapabilityId> {
    ids.iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn check_dependencies(
    owner: &str,
    requires: &[CapabilityId],
    capabilities: &BTreeMap<CapabilityId, Capability>,
    problems: &mut Vec<CatalogProblem>,
) {
    for dep in requires {
        if !capabilities.contains_key(dep) {
            problems.push(CatalogProblem::UnknownDependency {
                owner: owner.to_string(),
                dependency: dep.clone(),
            });
        }
    }
}
