//! Per-unit build pipeline: select targets, resolve, plan.
//!
//! Units are independent and run in parallel; the batch report lists them
//! in the order they were given, which for usage files is unit-name order.

use crate::usage::Unit;
use polyplan_catalog::{Catalog, CapabilityId, QueryError, TargetId, select_targets};
use polyplan_resolve::{
    InjectionPlan, PlanError, PolyfillMode, ResolveError, ResolvedCapability, Resolver,
    UnsupportedCapability, plan,
};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, thiserror::Error)]
pub enum UnitError {
    #[error("invalid target query: {0}")]
    Query(#[from] QueryError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// Everything decided for one unit.
#[derive(Debug, Clone, Serialize, schemars::JsonSchema)]
pub struct UnitPlan {
    pub targets: Vec<TargetId>,
    pub mode: PolyfillMode,
    pub plan: InjectionPlan,
    pub resolutions: BTreeMap<CapabilityId, ResolvedCapability>,
    pub unsupported: Vec<UnsupportedCapability>,
}

#[derive(Debug, Serialize, schemars::JsonSchema)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UnitOutcome {
    Ok { data: UnitPlan },
    Error { message: String },
}

#[derive(Debug, Serialize, schemars::JsonSchema)]
pub struct UnitResult {
    pub unit: String,
    #[serde(flatten)]
    pub outcome: UnitOutcome,
}

impl UnitResult {
    pub fn plan(&self) -> Option<&UnitPlan> {
        match &self.outcome {
            UnitOutcome::Ok { data } => Some(data),
            UnitOutcome::Error { .. } => None,
        }
    }
}

/// Plans units against one catalog with shared defaults.
pub struct Pipeline<'a> {
    catalog: &'a Catalog,
    default_targets: BTreeSet<TargetId>,
    mode: PolyfillMode,
}

impl<'a> Pipeline<'a> {
    /// Fails if the default target query is invalid.
    pub fn new(
        catalog: &'a Catalog,
        default_query: &str,
        mode: PolyfillMode,
    ) -> Result<Self, QueryError> {
        let default_targets = select_targets(default_query, catalog.matrix())?;
        Ok(Self {
            catalog,
            default_targets,
            mode,
        })
    }

    /// Resolve and plan one unit.
    pub fn plan_unit(&self, unit: &Unit) -> Result<UnitPlan, UnitError> {
        let targets = match &unit.targets {
            Some(query) => select_targets(query, self.catalog.matrix())?,
            None => self.default_targets.clone(),
        };
        let outcome = Resolver::new(self.catalog, targets)?
            .with_mode(self.mode)
            .resolve(unit.uses.iter().cloned())?;
        let plan = plan(&outcome.resolutions)?;

        tracing::info!(
            unit = %unit.name,
            targets = outcome.targets.len(),
            modules = plan.modules.len(),
            transforms = plan.transforms.len(),
            unsupported = outcome.errors.len(),
            "unit planned"
        );

        Ok(UnitPlan {
            targets: outcome.targets,
            mode: outcome.mode,
            plan,
            resolutions: outcome.resolutions,
            unsupported: outcome.errors,
        })
    }

    /// Plan every unit in parallel. A failing unit does not stop the others.
    pub fn run(&self, units: &[Unit]) -> Vec<UnitResult> {
        units
            .par_iter()
            .map(|unit| {
                let outcome = match self.plan_unit(unit) {
                    Ok(data) => UnitOutcome::Ok { data },
                    Err(e) => {
                        tracing::debug!(unit = %unit.name, error = %e, "unit failed");
                        UnitOutcome::Error {
                            message: e.to_string(),
                        }
                    }
                };
                UnitResult {
                    unit: unit.name.clone(),
                    outcome,
                }
            })
            .collect()
    }
}
