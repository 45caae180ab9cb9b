//! `polyplan targets`: show which targets a query selects.

use crate::cli::Context;
use clap::Args;
use polyplan_catalog::{Catalog, QueryError, select_targets};
use polyplan_output::{OutputFormatter, dimmed, heading, share_bar};
use serde::Serialize;

#[derive(Args, Debug)]
pub struct TargetsArgs {
    /// Target query (default: config `targets`, then "defaults")
    pub query: Option<String>,
}

#[derive(Debug, Serialize, schemars::JsonSchema)]
pub struct TargetRow {
    pub id: String,
    pub family: String,
    pub version: String,
    pub usage: f64,
    pub dead: bool,
}

#[derive(Debug, Serialize, schemars::JsonSchema)]
pub struct TargetsReport {
    pub query: String,
    pub targets: Vec<TargetRow>,
    /// Combined usage share of the selected targets, in percent.
    pub coverage: f64,
}

impl TargetsReport {
    pub fn build(catalog: &Catalog, query: &str) -> Result<Self, QueryError> {
        let selected = select_targets(query, catalog.matrix())?;
        let targets: Vec<TargetRow> = selected
            .iter()
            .filter_map(|id| catalog.matrix().target(id))
            .map(|t| TargetRow {
                id: t.id.clone(),
                family: t.family.clone(),
                version: t.version.to_string(),
                usage: t.usage,
                dead: t.dead,
            })
            .collect();
        let coverage: f64 = targets.iter().map(|t| t.usage).sum();
        Ok(Self {
            query: query.to_string(),
            targets,
            coverage,
        })
    }
}

impl OutputFormatter for TargetsReport {
    fn format_text(&self) -> String {
        let mut lines = vec![format!(
            "{} targets ({:.2}%) for '{}'",
            self.targets.len(),
            self.coverage,
            self.query
        )];
        for t in &self.targets {
            let dead = if t.dead { " dead" } else { "" };
            lines.push(format!("  {} {:.2}%{}", t.id, t.usage, dead));
        }
        lines.join("\n")
    }

    fn format_pretty(&self, colors: bool) -> String {
        let width = self.targets.iter().map(|t| t.id.len()).max().unwrap_or(0);
        let mut lines = vec![heading(
            &format!(
                "{} targets covering {:.2}% for '{}'",
                self.targets.len(),
                self.coverage,
                self.query
            ),
            colors,
        )];
        let max = self.targets.iter().map(|t| t.usage).fold(0.0, f64::max);
        for t in &self.targets {
            let share = if max > 0.0 { t.usage / max * 100.0 } else { 0.0 };
            let mut line = format!(
                "  {:width$}  {} {:>6.2}%",
                t.id,
                share_bar(share, 20),
                t.usage,
                width = width
            );
            if t.dead {
                line.push_str(&format!("  {}", dimmed("dead", colors)));
            }
            lines.push(line);
        }
        lines.join("\n")
    }
}

pub fn run(args: TargetsArgs, ctx: &Context) -> anyhow::Result<i32> {
    let catalog = ctx.load_catalog()?;
    let query = args
        .query
        .as_deref()
        .unwrap_or_else(|| ctx.config.targets_query());
    TargetsReport::build(&catalog, query)?.print(&ctx.format)?;
    Ok(0)
}
