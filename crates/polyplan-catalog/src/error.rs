//! Load-time errors.

use std::path::PathBuf;

/// Errors raised while loading a catalog. All of them are fatal: nothing
/// downstream of a broken catalog can be trusted.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid catalog TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported catalog format '{0}' (expected .toml or .json)")]
    UnsupportedFormat(String),
    #[error("malformed catalog:\n{}", format_problems(.problems))]
    Malformed { problems: Vec<CatalogProblem> },
}

fn format_problems(problems: &[CatalogProblem]) -> String {
    problems
        .iter()
        .map(|p| format!("  - {}", p))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A single defect found while validating a catalog source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogProblem {
    #[error("duplicate target '{0}'")]
    DuplicateTarget(String),
    #[error("target '{target}' has invalid usage share {usage}")]
    InvalidUsage { target: String, usage: String },
    #[error("duplicate capability '{0}'")]
    DuplicateCapability(String),
    #[error("capability '{capability}' is supported by unknown target '{target}'")]
    UnknownTarget { capability: String, target: String },
    #[error("capability '{capability}' declares support for unknown family '{family}'")]
    UnknownFamily { capability: String, family: String },
    #[error("{owner} requires unknown capability '{dependency}'")]
    UnknownDependency { owner: String, dependency: String },
    #[error("{registration} registered for unknown capability '{capability}'")]
    UnregisteredCapability {
        registration: &'static str,
        capability: String,
    },
    #[error("duplicate {registration} for capability '{capability}'")]
    DuplicateRegistration {
        registration: &'static str,
        capability: String,
    },
    #[error("transform registered for api capability '{0}' (api capabilities are polyfilled)")]
    TransformForApi(String),
    #[error("polyfill registered for syntax capability '{0}' (syntax capabilities are transformed)")]
    PolyfillForSyntax(String),
    #[error("{0} with empty identifier")]
    EmptyIdentifier(&'static str),
}
