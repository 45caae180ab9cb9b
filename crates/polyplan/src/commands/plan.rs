//! `polyplan plan`: resolve and plan one or more build units.

use crate::cli::Context;
use crate::pipeline::{Pipeline, UnitOutcome, UnitPlan, UnitResult};
use crate::usage::{self, DEFAULT_UNIT, Unit};
use clap::Args;
use polyplan_output::{OutputFormatter, dimmed, format_size, heading, paint_strategy};
use polyplan_resolve::PolyfillMode;
use serde::Serialize;
use std::path::PathBuf;

/// Exit status when a plan leaves capabilities unsupported under `--strict`.
pub const EXIT_UNSUPPORTED: i32 = 2;

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Capabilities used by the unit, comma separated
    #[arg(long, value_delimiter = ',', conflicts_with = "usage")]
    pub uses: Vec<String>,

    /// Usage file with one [unit.<name>] table per build unit
    #[arg(long, value_name = "FILE")]
    pub usage: Option<PathBuf>,

    /// Target query (default: config `targets`, then "defaults")
    #[arg(long, short)]
    pub targets: Option<String>,

    /// Polyfill mode: usage, entry, or off
    #[arg(long)]
    pub mode: Option<PolyfillMode>,

    /// Exit with status 2 when a capability is unsupported
    #[arg(long)]
    pub strict: bool,

    /// Also list natively supported capabilities
    #[arg(long, short)]
    pub verbose: bool,
}

#[derive(Debug, Serialize, schemars::JsonSchema)]
pub struct PlanReport {
    pub units: Vec<UnitResult>,
    #[serde(skip)]
    verbose: bool,
}

impl PlanReport {
    pub fn has_failures(&self) -> bool {
        self.units.iter().any(|u| u.plan().is_none())
    }

    pub fn has_unsupported(&self) -> bool {
        self.units
            .iter()
            .filter_map(UnitResult::plan)
            .any(|p| !p.unsupported.is_empty())
    }

    fn render(&self, colors: bool) -> String {
        let mut lines = Vec::new();
        for result in &self.units {
            match &result.outcome {
                UnitOutcome::Ok { data } => {
                    render_unit(&result.unit, data, self.verbose, colors, &mut lines)
                }
                UnitOutcome::Error { message } => lines.push(format!(
                    "{}: {}",
                    heading(&result.unit, colors),
                    paint_strategy("unsupported", &format!("error: {}", message), colors)
                )),
            }
        }
        lines.join("\n")
    }
}

fn render_unit(name: &str, unit: &UnitPlan, verbose: bool, colors: bool, lines: &mut Vec<String>) {
    lines.push(format!(
        "{}: {} targets, mode {}",
        heading(name, colors),
        unit.targets.len(),
        unit.mode
    ));

    let plan = &unit.plan;
    if plan.is_empty() && unit.unsupported.is_empty() {
        lines.push(format!("  {}", dimmed("nothing to inject", colors)));
    }

    if !plan.modules.is_empty() {
        let mut size = format_size(plan.total_size);
        if plan.unknown_sizes > 0 {
            size.push_str(&format!(" + {} unsized", plan.unknown_sizes));
        }
        lines.push(format!("  modules ({}, {}):", plan.modules.len(), size));
        for module in &plan.modules {
            lines.push(format!(
                "    {}  {}",
                paint_strategy("polyfill", &module.module, colors),
                dimmed(&format!("[{}]", module.provides.join(", ")), colors)
            ));
        }
    }

    if !plan.transforms.is_empty() {
        lines.push(format!("  transforms ({}):", plan.transforms.len()));
        for transform in &plan.transforms {
            lines.push(format!(
                "    {}  {}",
                paint_strategy("transform", &transform.transform, colors),
                dimmed(&format!("[{}]", transform.capabilities.join(", ")), colors)
            ));
        }
    }

    if !unit.unsupported.is_empty() {
        lines.push(format!("  unsupported ({}):", unit.unsupported.len()));
        for err in &unit.unsupported {
            lines.push(format!(
                "    {}: not supported by '{}'{}",
                paint_strategy("unsupported", &err.capability, colors),
                err.target,
                if err.missing_targets > 1 {
                    format!(" and {} more", err.missing_targets - 1)
                } else {
                    String::new()
                }
            ));
        }
    }

    if verbose {
        let native: Vec<&str> = unit
            .resolutions
            .iter()
            .filter(|(_, r)| r.resolution.is_native())
            .map(|(id, _)| id.as_str())
            .collect();
        if !native.is_empty() {
            lines.push(format!(
                "  native ({}): {}",
                native.len(),
                paint_strategy("native", &native.join(", "), colors)
            ));
        }
    }
}

impl OutputFormatter for PlanReport {
    fn format_text(&self) -> String {
        self.render(false)
    }

    fn format_pretty(&self, colors: bool) -> String {
        self.render(colors)
    }
}

pub fn run(args: PlanArgs, ctx: &Context) -> anyhow::Result<i32> {
    let catalog = ctx.load_catalog()?;
    let query = args
        .targets
        .as_deref()
        .unwrap_or_else(|| ctx.config.targets_query());
    let mode = args.mode.unwrap_or_else(|| ctx.config.mode());
    let strict = args.strict || ctx.config.strict();

    let units = match &args.usage {
        Some(path) => usage::read_units(&ctx.root.join(path))?,
        None => vec![Unit::new(DEFAULT_UNIT, usage::normalize(args.uses))],
    };

    let pipeline = Pipeline::new(&catalog, query, mode)?;
    let report = PlanReport {
        units: pipeline.run(&units),
        verbose: args.verbose,
    };
    report.print(&ctx.format)?;

    for result in &report.units {
        if let UnitOutcome::Error { message } = &result.outcome {
            eprintln!("error: unit '{}': {}", result.unit, message);
        }
    }

    Ok(if report.has_failures() {
        1
    } else if strict && report.has_unsupported() {
        EXIT_UNSUPPORTED
    } else {
        0
    })
}
