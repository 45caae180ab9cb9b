//! `polyplan explain`: per-target support and the chosen strategy for one
//! capability.

use crate::cli::Context;
use clap::Args;
use polyplan_catalog::{Capability, CapabilityId, CapabilityKind, Catalog, TargetId, select_targets};
use polyplan_output::{OutputFormatter, dimmed, heading, paint_strategy};
use polyplan_resolve::{PolyfillMode, Resolution, ResolveError, Resolver};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// Capability id
    pub capability: String,

    /// Target query (default: config `targets`, then "defaults")
    #[arg(long, short)]
    pub targets: Option<String>,

    /// Polyfill mode: usage, entry, or off
    #[arg(long)]
    pub mode: Option<PolyfillMode>,
}

#[derive(Debug, Serialize, schemars::JsonSchema)]
pub struct TargetSupport {
    pub target: TargetId,
    pub supported: bool,
}

#[derive(Debug, Serialize, schemars::JsonSchema)]
pub struct Registration {
    pub id: String,
    pub requires: Vec<CapabilityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Serialize, schemars::JsonSchema)]
pub struct ExplainReport {
    pub capability: CapabilityId,
    pub kind: CapabilityKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub requires: Vec<CapabilityId>,
    /// Capabilities, polyfills and transforms that depend on this one.
    pub required_by: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polyfill: Option<Registration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<Registration>,
    pub support: Vec<TargetSupport>,
    pub resolution: Resolution,
}

impl ExplainReport {
    pub fn build(
        catalog: &Catalog,
        capability: &str,
        targets: BTreeSet<TargetId>,
        mode: PolyfillMode,
    ) -> Result<Self, ResolveError> {
        let cap = catalog
            .capability(capability)
            .ok_or_else(|| ResolveError::UnknownCapability {
                ids: vec![capability.to_string()],
            })?;
        let resolver = Resolver::new(catalog, targets)?.with_mode(mode);
        let resolution = resolver.decide(cap);

        let supported = catalog.matrix().query(&cap.id);
        let support = resolver
            .targets()
            .iter()
            .map(|t| TargetSupport {
                target: t.clone(),
                supported: supported.is_some_and(|s| s.contains(t)),
            })
            .collect();

        Ok(Self {
            capability: cap.id.clone(),
            kind: cap.kind,
            description: cap.description.clone(),
            requires: cap.requires.clone(),
            required_by: dependents(catalog, &cap.id),
            polyfill: catalog.polyfill(&cap.id).map(|p| Registration {
                id: p.module.clone(),
                requires: p.requires.clone(),
                size: p.size,
            }),
            transform: catalog.transform(&cap.id).map(|t| Registration {
                id: t.id.clone(),
                requires: t.requires.clone(),
                size: None,
            }),
            support,
            resolution,
        })
    }
}

fn dependents(catalog: &Catalog, id: &str) -> Vec<String> {
    let needs = |requires: &[CapabilityId]| requires.iter().any(|r| r == id);
    let mut out: Vec<String> = catalog
        .capabilities()
        .filter(|c: &&Capability| needs(&c.requires))
        .map(|c| format!("capability {}", c.id))
        .collect();
    out.extend(
        catalog
            .polyfills()
            .filter(|p| needs(&p.requires))
            .map(|p| format!("polyfill {}", p.module)),
    );
    out.extend(
        catalog
            .transforms()
            .filter(|t| needs(&t.requires))
            .map(|t| format!("transform {}", t.id)),
    );
    out.sort();
    out
}

impl ExplainReport {
    fn render(&self, colors: bool) -> String {
        let strategy = self.resolution.strategy();
        let mut lines = vec![format!(
            "{} ({}): {}",
            heading(&self.capability, colors),
            self.kind,
            paint_strategy(strategy, strategy, colors)
        )];
        if let Some(description) = &self.description {
            lines.push(format!("  {}", dimmed(description, colors)));
        }
        if !self.requires.is_empty() {
            lines.push(format!("  requires: {}", self.requires.join(", ")));
        }
        if !self.required_by.is_empty() {
            lines.push(format!("  required by: {}", self.required_by.join(", ")));
        }
        if let Some(polyfill) = &self.polyfill {
            lines.push(format!("  polyfill: {}{}", polyfill.id, deps(&polyfill.requires)));
        }
        if let Some(transform) = &self.transform {
            lines.push(format!(
                "  transform: {}{}",
                transform.id,
                deps(&transform.requires)
            ));
        }
        lines.push("  support:".to_string());
        for entry in &self.support {
            let (state, text) = if entry.supported {
                ("native", "yes")
            } else {
                (strategy, "no")
            };
            lines.push(format!(
                "    {} {}",
                entry.target,
                paint_strategy(state, text, colors)
            ));
        }
        lines.join("\n")
    }
}

fn deps(requires: &[CapabilityId]) -> String {
    if requires.is_empty() {
        String::new()
    } else {
        format!(" (requires {})", requires.join(", "))
    }
}

impl OutputFormatter for ExplainReport {
    fn format_text(&self) -> String {
        self.render(false)
    }

    fn format_pretty(&self, colors: bool) -> String {
        self.render(colors)
    }
}

pub fn run(args: ExplainArgs, ctx: &Context) -> anyhow::Result<i32> {
    let catalog = ctx.load_catalog()?;
    let query = args
        .targets
        .as_deref()
        .unwrap_or_else(|| ctx.config.targets_query());
    let targets = select_targets(query, catalog.matrix())?;
    let mode = args.mode.unwrap_or_else(|| ctx.config.mode());
    ExplainReport::build(&catalog, &args.capability, targets, mode)?.print(&ctx.format)?;
    Ok(0)
}
