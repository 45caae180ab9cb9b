//! Injection planning: turns resolutions into an ordered, deduplicated
//! module list plus the set of transforms to apply.
//!
//! Module `M` must be emitted after module `N` when some capability `M`
//! provides depends on a capability `N` provides. Dependencies that go
//! through transformed capabilities are followed to the polyfills behind
//! them. Ties are broken by module id, so equal inputs give equal output.

use crate::error::PlanError;
use crate::resolve::{Resolution, ResolvedCapability};
use polyplan_catalog::CapabilityId;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct PlannedModule {
    pub module: String,
    /// Capabilities this module provides, sorted.
    pub provides: Vec<CapabilityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct PlannedTransform {
    pub transform: String,
    pub capabilities: Vec<CapabilityId>,
}

/// What to inject and apply, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct InjectionPlan {
    /// Dependencies before dependents; each module appears once.
    pub modules: Vec<PlannedModule>,
    /// Sorted by transform id.
    pub transforms: Vec<PlannedTransform>,
    /// Sum of known module sizes in bytes, saturating at `u64::MAX`.
    pub total_size: u64,
    /// Number of modules whose size the catalog does not record.
    pub unknown_sizes: usize,
}

impl InjectionPlan {
    pub fn module_ids(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.module.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.transforms.is_empty()
    }
}

/// Order the polyfill modules required by `resolutions`.
pub fn plan(
    resolutions: &BTreeMap<CapabilityId, ResolvedCapability>,
) -> Result<InjectionPlan, PlanError> {
    let mut modules: BTreeMap<&str, PlannedModule> = BTreeMap::new();
    let mut transforms: BTreeMap<&str, BTreeSet<CapabilityId>> = BTreeMap::new();

    for (id, resolved) in resolutions {
        match &resolved.resolution {
            Resolution::Polyfillable { module, size, .. } => {
                let entry = modules
                    .entry(module.as_str())
                    .or_insert_with(|| PlannedModule {
                        module: module.clone(),
                        provides: Vec::new(),
                        size: None,
                    });
                entry.provides.push(id.clone());
                entry.size = entry.size.max(*size);
            }
            Resolution::Transformable { transform, .. } => {
                transforms
                    .entry(transform.as_str())
                    .or_default()
                    .insert(id.clone());
            }
            Resolution::Native | Resolution::Unsupported { .. } => {}
        }
    }

    // deps[m] = modules that must precede m
    let mut deps: BTreeMap<&str, BTreeSet<&str>> =
        modules.keys().map(|m| (*m, BTreeSet::new())).collect();
    for resolved in resolutions.values() {
        let Resolution::Polyfillable {
            module, requires, ..
        } = &resolved.resolution
        else {
            continue;
        };
        let mut seen = BTreeSet::new();
        for dep in requires {
            providers(dep, resolutions, &mut seen, &mut |provider| {
                if provider != module.as_str()
                    && let Some(set) = deps.get_mut(module.as_str())
                {
                    set.insert(provider);
                }
            });
        }
    }

    let order = toposort(&deps)?;
    tracing::debug!(modules = order.len(), transforms = transforms.len(), "planned");

    let mut plan = InjectionPlan::default();
    for id in order {
        if let Some(module) = modules.remove(id) {
            match module.size {
                Some(size) => plan.total_size = plan.total_size.saturating_add(size),
                None => plan.unknown_sizes += 1,
            }
            plan.modules.push(module);
        }
    }
    plan.transforms = transforms
        .into_iter()
        .map(|(transform, capabilities)| PlannedTransform {
            transform: transform.to_string(),
            capabilities: capabilities.into_iter().collect(),
        })
        .collect();
    Ok(plan)
}

/// Report every polyfill module providing `capability`, looking through
/// transformed capabilities.
fn providers<'a>(
    capability: &'a str,
    resolutions: &'a BTreeMap<CapabilityId, ResolvedCapability>,
    seen: &mut BTreeSet<&'a str>,
    found: &mut impl FnMut(&'a str),
) {
    if !seen.insert(capability) {
        return;
    }
    let Some(resolved) = resolutions.get(capability) else {
        return;
    };
    match &resolved.resolution {
        Resolution::Polyfillable { module, .. } => found(module),
        Resolution::Transformable { requires, .. } => {
            for dep in requires {
                providers(dep, resolutions, seen, found);
            }
        }
        Resolution::Native | Resolution::Unsupported { .. } => {}
    }
}

/// Kahn's algorithm with the ready set ordered by id.
fn toposort<'a>(deps: &BTreeMap<&'a str, BTreeSet<&'a str>>) -> Result<Vec<&'a str>, PlanError> {
    let mut pending: BTreeMap<&str, usize> = deps.iter().map(|(m, d)| (*m, d.len())).collect();
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (module, before) in deps {
        for dep in before {
            dependents.entry(*dep).or_default().push(*module);
        }
    }

    let mut ready: BTreeSet<&str> = pending
        .iter()
        .filter(|(_, n)| **n == 0)
        .map(|(m, _)| *m)
        .collect();
    let mut order = Vec::with_capacity(deps.len());

    while let Some(next) = ready.pop_first() {
        pending.remove(next);
        order.push(next);
        for dependent in dependents.get(next).into_iter().flatten() {
            if let Some(n) = pending.get_mut(dependent) {
                *n -= 1;
                if *n == 0 {
                    ready.insert(*dependent);
                }
            }
        }
    }

    if pending.is_empty() {
        Ok(order)
    } else {
        Err(PlanError::DependencyCycle {
            modules: find_cycle(deps, &pending),
        })
    }
}

/// Every module left after Kahn's algorithm waits on another leftover
/// module, so walking smallest-first from the smallest one must revisit a
/// node.
fn find_cycle(deps: &BTreeMap<&str, BTreeSet<&str>>, pending: &BTreeMap<&str, usize>) -> Vec<String> {
    let Some(start) = pending.keys().next() else {
        return Vec::new();
    };
    let mut path: Vec<&str> = vec![*start];
    let mut current = *start;
    loop {
        let next = deps
            .get(current)
            .and_then(|before| before.iter().find(|d| pending.contains_key(*d)).copied());
        let Some(next) = next else {
            return path.into_iter().map(str::to_string).collect();
        };
        if let Some(pos) = path.iter().position(|p| *p == next) {
            let mut cycle: Vec<String> = path[pos..].iter().map(|s| s.to_string()).collect();
            // Walk direction is "waits on"; report in emission direction.
            cycle.reverse();
            if let Some(min) = cycle
                .iter()
                .enumerate()
                .min_by(|a, b| a.1.cmp(b.1))
                .map(|(i, _)| i)
            {
                cycle.rotate_left(min);
            }
            return cycle;
        }
        path.push(next);
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{PolyfillMode, resolve};
    use crate::testing::{catalog, set};
    use polyplan_catalog::CapabilityKind;

    fn polyfill(module: &str, requires: &[&str]) -> ResolvedCapability {
        ResolvedCapability {
            kind: CapabilityKind::Api,
            resolution: Resolution::Polyfillable {
                module: module.into(),
                requires: requires.iter().map(|s| s.to_string()).collect(),
                missing: vec!["old".into()],
                size: Some(100),
            },
            direct: true,
            required_by: BTreeSet::new(),
        }
    }

    fn resolutions(entries: Vec<(&str, ResolvedCapability)>) -> BTreeMap<CapabilityId, ResolvedCapability> {
        entries.into_iter().map(|(id, r)| (id.to_string(), r)).collect()
    }

    #[test]
    fn test_promise_polyfill_plan() {
        let cat = catalog(
            r#"
[[target]]
id = "T1"
family = "t"
version = "1"
[[capability]]
id = "promise"
kind = "api"
[[polyfill]]
capability = "promise"
module = "poly-promise"
"#,
        );
        let outcome = resolve(&cat, &set(&["promise"]), &set(&["T1"]), PolyfillMode::Usage).unwrap();
        assert_eq!(
            outcome.resolutions["promise"].resolution,
            Resolution::Polyfillable {
                module: "poly-promise".into(),
                requires: vec![],
                missing: vec!["T1".into()],
                size: None,
            }
        );
        let plan = plan(&outcome.resolutions).unwrap();
        assert_eq!(plan.module_ids().collect::<Vec<_>>(), vec!["poly-promise"]);
        assert_eq!(plan.unknown_sizes, 1);
    }

    #[test]
    fn test_shared_module_emitted_once() {
        let input = resolutions(vec![
            ("array-from", polyfill("core-js/array", &[])),
            ("array-of", polyfill("core-js/array", &[])),
        ]);
        let plan = plan(&input).unwrap();
        assert_eq!(plan.modules.len(), 1);
        assert_eq!(plan.modules[0].provides, vec!["array-from", "array-of"]);
        assert_eq!(plan.total_size, 100);
    }

    #[test]
    fn test_dependencies_come_first() {
        let input = resolutions(vec![
            ("a-fetch", polyfill("a-fetch-shim", &["promise"])),
            ("promise", polyfill("z-promise", &["symbol"])),
            ("symbol", polyfill("m-symbol", &[])),
        ]);
        let plan = plan(&input).unwrap();
        assert_eq!(
            plan.module_ids().collect::<Vec<_>>(),
            vec!["m-symbol", "z-promise", "a-fetch-shim"]
        );
        assert_eq!(plan.total_size, 300);
    }

    #[test]
    fn test_ties_broken_by_module_id() {
        let input = resolutions(vec![
            ("x", polyfill("c", &[])),
            ("y", polyfill("a", &[])),
            ("z", polyfill("b", &[])),
        ]);
        let plan = plan(&input).unwrap();
        assert_eq!(plan.module_ids().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_dependency_through_transform() {
        let mut input = resolutions(vec![
            ("generator-helpers", polyfill("helpers", &["generators"])),
            ("regenerator", polyfill("regenerator-runtime", &[])),
        ]);
        input.insert(
            "generators".into(),
            ResolvedCapability {
                kind: CapabilityKind::Syntax,
                resolution: Resolution::Transformable {
                    transform: "transform-regenerator".into(),
                    requires: vec!["regenerator".into()],
                    missing: vec!["old".into()],
                },
                direct: false,
                required_by: BTreeSet::new(),
            },
        );
        let plan = plan(&input).unwrap();
        assert_eq!(
            plan.module_ids().collect::<Vec<_>>(),
            vec!["regenerator-runtime", "helpers"]
        );
        assert_eq!(
            plan.transforms,
            vec![PlannedTransform {
                transform: "transform-regenerator".into(),
                capabilities: vec!["generators".into()],
            }]
        );
    }

    #[test]
    fn test_native_and_unsupported_are_not_planned() {
        let mut input = resolutions(vec![("promise", polyfill("poly-promise", &["symbol"]))]);
        input.insert(
            "symbol".into(),
            ResolvedCapability {
                kind: CapabilityKind::Api,
                resolution: Resolution::Native,
                direct: false,
                required_by: BTreeSet::new(),
            },
        );
        input.insert(
            "clipboard".into(),
            ResolvedCapability {
                kind: CapabilityKind::Api,
                resolution: Resolution::Unsupported {
                    missing: vec!["old".into()],
                },
                direct: true,
                required_by: BTreeSet::new(),
            },
        );
        let plan = plan(&input).unwrap();
        assert_eq!(plan.module_ids().collect::<Vec<_>>(), vec!["poly-promise"]);
    }

    #[test]
    fn test_module_cycle_is_fatal() {
        let input = resolutions(vec![
            ("a", polyfill("mod-b", &["b"])),
            ("b", polyfill("mod-a", &["a"])),
            ("c", polyfill("mod-c", &[])),
        ]);
        assert_eq!(
            plan(&input),
            Err(PlanError::DependencyCycle {
                modules: vec!["mod-a".into(), "mod-b".into()]
            })
        );
    }

    #[test]
    fn test_three_module_cycle_starts_at_smallest() {
        let input = resolutions(vec![
            ("x", polyfill("m3", &["y"])),
            ("y", polyfill("m1", &["z"])),
            ("z", polyfill("m2", &["x"])),
        ]);
        let Err(PlanError::DependencyCycle { modules }) = plan(&input) else {
            panic!("expected a cycle");
        };
        assert_eq!(modules.len(), 3);
        assert_eq!(modules[0], "m1");
    }

    #[test]
    fn test_total_size_saturates() {
        let mut toml = String::from("[[target]]\nid = \"T1\"\nfamily = \"t\"\nversion = \"1\"\n");
        for id in ["a", "b", "c"] {
            toml.push_str(&format!(
                "[[capability]]\nid = \"{id}\"\nkind = \"api\"\n\
                 [[polyfill]]\ncapability = \"{id}\"\nmodule = \"mod-{id}\"\n\
                 size = 9223372036854775807\n"
            ));
        }
        let cat = catalog(&toml);
        let outcome = resolve(&cat, &set(&["a", "b", "c"]), &set(&["T1"]), PolyfillMode::Usage).unwrap();
        let plan = plan(&outcome.resolutions).unwrap();
        assert_eq!(plan.modules.len(), 3);
        assert_eq!(plan.total_size, u64::MAX);
        assert_eq!(plan.unknown_sizes, 0);
    }

    #[test]
    fn test_empty_plan() {
        let plan = plan(&BTreeMap::new()).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.total_size, 0);
    }
}
