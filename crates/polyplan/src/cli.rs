//! Command-line interface.

use crate::commands::{check, explain, plan, targets};
use crate::config::PolyplanConfig;
use anyhow::Context as _;
use clap::{Parser, Subcommand};
use polyplan_catalog::Catalog;
use polyplan_output::OutputFormat;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "polyplan",
    version,
    about = "Plan polyfill injection and syntax transforms for runtime targets"
)]
pub struct Cli {
    /// Project root; config and the default catalog are looked up here
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Catalog file (.toml or .json), overriding the config
    #[arg(long, global = true, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Output as JSON Lines
    #[arg(long, global = true)]
    pub jsonl: bool,

    /// Filter JSON output through a jq expression
    #[arg(long, global = true, value_name = "FILTER")]
    pub jq: Option<String>,

    /// Human-friendly output with colors
    #[arg(long, global = true, conflicts_with = "compact")]
    pub pretty: bool,

    /// Plain text output
    #[arg(long, global = true)]
    pub compact: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve used capabilities and print the injection plan
    Plan(plan::PlanArgs),
    /// Show which targets a query selects
    Targets(targets::TargetsArgs),
    /// Show per-target support and the chosen strategy for one capability
    Explain(explain::ExplainArgs),
    /// Validate the catalog and print a summary
    Check,
}

/// Resolved settings shared by every command.
pub struct Context {
    pub root: PathBuf,
    pub config: PolyplanConfig,
    pub format: OutputFormat,
    catalog: Option<PathBuf>,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        let config = PolyplanConfig::load(&cli.root)?;
        let format = OutputFormat::from_cli(
            cli.json,
            cli.jsonl,
            cli.jq.as_deref(),
            cli.pretty,
            cli.compact,
            &config.pretty,
        );
        Ok(Self {
            root: cli.root.clone(),
            config,
            format,
            catalog: cli.catalog.clone(),
        })
    }

    pub fn catalog_path(&self) -> PathBuf {
        match &self.catalog {
            Some(path) => path.clone(),
            None => self.config.catalog_path(&self.root),
        }
    }

    pub fn load_catalog(&self) -> anyhow::Result<Catalog> {
        let path = self.catalog_path();
        tracing::debug!(path = %path.display(), "loading catalog");
        Catalog::load(&path).with_context(|| format!("invalid catalog {}", path.display()))
    }
}

/// Run a parsed command line. Returns the process exit code.
pub fn run(cli: Cli) -> anyhow::Result<i32> {
    let ctx = Context::from_cli(&cli)?;
    match cli.command {
        Command::Plan(args) => plan::run(args, &ctx),
        Command::Targets(args) => targets::run(args, &ctx),
        Command::Explain(args) => explain::run(args, &ctx),
        Command::Check => check::run(&ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_plan_flags() {
        let cli = Cli::try_parse_from([
            "polyplan",
            "plan",
            "--uses",
            "promise,async-await",
            "--mode",
            "entry",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        let Command::Plan(args) = cli.command else {
            panic!("expected plan");
        };
        assert_eq!(args.uses, vec!["promise", "async-await"]);
        assert_eq!(args.mode, Some(polyplan_resolve::PolyfillMode::Entry));
    }

    #[test]
    fn test_uses_conflicts_with_usage_file() {
        assert!(
            Cli::try_parse_from(["polyplan", "plan", "--uses", "a", "--usage", "u.toml"]).is_err()
        );
    }
}
