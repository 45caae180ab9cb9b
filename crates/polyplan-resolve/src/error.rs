//! Resolution and planning errors.

use polyplan_catalog::{CapabilityId, TargetId};
use serde::Serialize;

/// Fatal errors: no resolution is produced for the unit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("unknown capability: {}", .ids.join(", "))]
    UnknownCapability { ids: Vec<CapabilityId> },
    #[error("unknown target: {}", .ids.join(", "))]
    UnknownTarget { ids: Vec<TargetId> },
    #[error("no targets selected")]
    NoTargets,
    #[error("dependency cycle among capabilities: {}", .path.join(" -> "))]
    DependencyCycle { path: Vec<CapabilityId> },
}

/// Fatal planning error: the modules cannot be ordered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("dependency cycle among polyfill modules: {}", format_cycle(.modules))]
    DependencyCycle { modules: Vec<String> },
}

fn format_cycle(modules: &[String]) -> String {
    let mut parts = modules.to_vec();
    if let Some(first) = modules.first() {
        parts.push(first.clone());
    }
    parts.join(" -> ")
}

/// A capability that no strategy covers on at least one target.
///
/// Collected alongside partial results instead of aborting the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema, thiserror::Error)]
#[error(
    "capability '{capability}' is not supported by '{target}' and has no usable polyfill or transform"
)]
pub struct UnsupportedCapability {
    pub capability: CapabilityId,
    /// Lexicographically smallest target lacking support.
    pub target: TargetId,
    /// Number of selected targets lacking support.
    pub missing_targets: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_messages() {
        let err = ResolveError::DependencyCycle {
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(
            err.to_string(),
            "dependency cycle among capabilities: a -> b -> a"
        );

        let err = PlanError::DependencyCycle {
            modules: vec!["m1".into(), "m2".into()],
        };
        assert_eq!(
            err.to_string(),
            "dependency cycle among polyfill modules: m1 -> m2 -> m1"
        );
    }

    #[test]
    fn test_unsupported_message_names_target() {
        let err = UnsupportedCapability {
            capability: "let".into(),
            target: "ie 10".into(),
            missing_targets: 2,
        };
        assert!(err.to_string().contains("'let'"));
        assert!(err.to_string().contains("'ie 10'"));
    }
}
