//! CLI command implementations - one command per file.

pub mod check;
pub mod explain;
pub mod plan;
pub mod targets;
