//! `polyplan check`: validate the catalog and summarize it.

use crate::cli::Context;
use polyplan_catalog::{CapabilityId, CapabilityKind, Catalog, TargetId};
use polyplan_output::{OutputFormatter, heading, paint_strategy};
use polyplan_resolve::{CatalogCycle, catalog_cycles};
use serde::Serialize;
use std::collections::BTreeSet;

/// A capability that some target lacks and that no registration covers.
#[derive(Debug, Serialize, schemars::JsonSchema)]
pub struct Uncovered {
    pub capability: CapabilityId,
    pub missing: Vec<TargetId>,
}

#[derive(Debug, Serialize, schemars::JsonSchema)]
pub struct CheckReport {
    pub catalog: String,
    pub targets: usize,
    pub families: Vec<String>,
    pub syntax: usize,
    pub api: usize,
    pub polyfills: usize,
    pub transforms: usize,
    pub uncovered: Vec<Uncovered>,
    /// Dependency cycles; any entry makes the catalog unusable for planning.
    pub cycles: Vec<CatalogCycle>,
}

impl CheckReport {
    pub fn build(catalog: &Catalog, path: &str) -> Self {
        let matrix = catalog.matrix();
        let all: BTreeSet<TargetId> = matrix.targets().map(|t| t.id.clone()).collect();
        let count = |kind| catalog.capabilities().filter(|c| c.kind == kind).count();

        let uncovered = catalog
            .capabilities()
            .filter(|c| match c.kind {
                CapabilityKind::Api => catalog.polyfill(&c.id).is_none(),
                CapabilityKind::Syntax => catalog.transform(&c.id).is_none(),
            })
            .filter_map(|c| {
                let missing = matrix.missing(&c.id, &all)?;
                (!missing.is_empty()).then(|| Uncovered {
                    capability: c.id.clone(),
                    missing: missing.into_iter().collect(),
                })
            })
            .collect();

        Self {
            catalog: path.to_string(),
            targets: all.len(),
            families: matrix.families().into_iter().map(str::to_string).collect(),
            syntax: count(CapabilityKind::Syntax),
            api: count(CapabilityKind::Api),
            polyfills: catalog.polyfills().count(),
            transforms: catalog.transforms().count(),
            uncovered,
            cycles: catalog_cycles(catalog),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.cycles.is_empty()
    }

    fn render(&self, colors: bool) -> String {
        let status = if self.is_ok() {
            "ok".to_string()
        } else {
            format!("{} dependency cycles", self.cycles.len())
        };
        let mut lines = vec![
            format!("{}: {}", heading(&self.catalog, colors), status),
            format!(
                "  {} targets in {} families ({})",
                self.targets,
                self.families.len(),
                self.families.join(", ")
            ),
            format!(
                "  {} capabilities ({} syntax, {} api)",
                self.syntax + self.api,
                self.syntax,
                self.api
            ),
            format!(
                "  {} polyfills, {} transforms",
                self.polyfills, self.transforms
            ),
        ];
        if !self.uncovered.is_empty() {
            lines.push(format!(
                "  {} capabilities without a fallback:",
                self.uncovered.len()
            ));
            for entry in &self.uncovered {
                lines.push(format!(
                    "    {} (missing on {})",
                    paint_strategy("unsupported", &entry.capability, colors),
                    entry.missing.join(", ")
                ));
            }
        }
        for cycle in &self.cycles {
            lines.push(format!("  {}", paint_strategy("unsupported", &cycle.to_string(), colors)));
        }
        lines.join("\n")
    }
}

impl OutputFormatter for CheckReport {
    fn format_text(&self) -> String {
        self.render(false)
    }

    fn format_pretty(&self, colors: bool) -> String {
        self.render(colors)
    }
}

pub fn run(ctx: &Context) -> anyhow::Result<i32> {
    let path = ctx.catalog_path();
    let catalog = ctx.load_catalog()?;
    let report = CheckReport::build(&catalog, &path.display().to_string());
    report.print(&ctx.format)?;
    for cycle in &report.cycles {
        eprintln!("error: {}", cycle);
    }
    Ok(if report.is_ok() { 0 } else { 1 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_and_uncovered() {
        let catalog = Catalog::from_toml_str(
            r#"
[[target]]
family = "chrome"
version = "60"
[[target]]
family = "ie"
version = "11"

[[capability]]
id = "promise"
kind = "api"
since = { chrome = "33" }
[[capability]]
id = "clipboard"
kind = "api"
since = { chrome = "40" }
[[capability]]
id = "const"
kind = "syntax"
supported_by = ["chrome 60", "ie 11"]

[[polyfill]]
capability = "promise"
module = "core-js/es.promise"
"#,
        )
        .unwrap();
        let report = CheckReport::build(&catalog, "catalog.toml");
        assert_eq!(
            report.format_text(),
            "catalog.toml: ok\n\
             \x20 2 targets in 2 families (chrome, ie)\n\
             \x20 3 capabilities (1 syntax, 2 api)\n\
             \x20 1 polyfills, 0 transforms\n\
             \x20 1 capabilities without a fallback:\n\
             \x20   clipboard (missing on ie 11)"
        );
        assert!(report.is_ok());
    }

    #[test]
    fn test_cycle_is_not_ok() {
        let catalog = Catalog::from_toml_str(
            r#"
[[target]]
family = "chrome"
version = "60"

[[capability]]
id = "promise"
kind = "api"
[[capability]]
id = "symbol"
kind = "api"

[[polyfill]]
capability = "promise"
module = "core-js/es.promise"
requires = ["symbol"]
[[polyfill]]
capability = "symbol"
module = "core-js/es.symbol"
requires = ["promise"]
"#,
        )
        .unwrap();
        let report = CheckReport::build(&catalog, "catalog.toml");
        assert!(!report.is_ok());
        assert_eq!(
            report.format_text(),
            "catalog.toml: 1 dependency cycles\n\
             \x20 1 targets in 1 families (chrome)\n\
             \x20 2 capabilities (0 syntax, 2 api)\n\
             \x20 2 polyfills, 0 transforms\n\
             \x20 dependency cycle among capabilities: promise -> symbol -> promise"
        );
    }
}
