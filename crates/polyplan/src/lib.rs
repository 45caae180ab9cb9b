//! polyplan: decide which polyfills and transforms a build needs.
//!
//! Given the capabilities a build unit uses and the runtimes it must run
//! on, polyplan resolves every capability against a support catalog and
//! produces an ordered, duplicate-free list of polyfill modules to inject
//! plus the syntax transforms the compiler must apply.

pub mod cli;
pub mod commands;
pub mod config;
pub mod pipeline;
pub mod usage;

pub use cli::{Cli, Context, run};
pub use config::PolyplanConfig;
pub use pipeline::{Pipeline, UnitError, UnitOutcome, UnitPlan, UnitResult};
pub use usage::Unit;
