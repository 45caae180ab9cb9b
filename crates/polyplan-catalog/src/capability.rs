//! Capabilities - the syntax features and host APIs a code unit can rely on.

use serde::{Deserialize, Serialize};

/// Identifier of a capability (e.g. `"promise"`, `"arrow-functions"`).
pub type CapabilityId = String;

/// Identifier of a runtime target (e.g. `"chrome 58"`).
pub type TargetId = String;

/// What kind of thing a capability is.
///
/// The kind decides which strategies can cover a missing capability:
/// host APIs can be polyfilled, syntax can only be transformed away.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    schemars::JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityKind {
    /// Language syntax decided by the engine (let, arrow functions, async/await).
    Syntax,
    /// Host API offered by the runtime (fetch, Promise, navigator.clipboard).
    Api,
}

impl CapabilityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Syntax => "syntax",
            Self::Api => "api",
        }
    }
}

impl std::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A capability as defined by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capability {
    pub id: CapabilityId,
    pub kind: CapabilityKind,
    /// Other capabilities needed to use this one meaningfully
    /// (async-await needs promise). Sorted, no duplicates.
    pub requires: Vec<CapabilityId>,
    pub description: Option<String>,
}

impl Capability {
    pub fn new(id: impl Into<CapabilityId>, kind: CapabilityKind) -> Self {
        Self {
            id: id.into(),
            kind,
            requires: Vec::new(),
            description: None,
        }
    }

    pub fn is_syntax(&self) -> bool {
        self.kind == CapabilityKind::Syntax
    }
}

/// A registered polyfill: a module that makes an API available on targets
/// that lack it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Polyfill {
    /// Capability this polyfill provides.
    pub capability: CapabilityId,
    /// Module reference handed to the bundler (e.g. `"core-js/es.promise"`).
    pub module: String,
    /// Capabilities the polyfill itself relies on. Sorted, no duplicates.
    pub requires: Vec<CapabilityId>,
    /// Minified size in bytes, if known.
    pub size: Option<u64>,
}

/// A registered transform: a source rewrite that removes reliance on a
/// syntax capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transform {
    /// Capability this transform eliminates.
    pub capability: CapabilityId,
    /// Transform identifier handed to the compiler (e.g. `"transform-arrow-functions"`).
    pub id: String,
    /// Capabilities the rewritten code relies on
    /// (the async transform needs a regenerator runtime). Sorted, no duplicates.
    pub requires: Vec<CapabilityId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serde_is_lowercase() {
        let json = serde_json::to_string(&CapabilityKind::Syntax).unwrap();
        assert_eq!(json, "\"syntax\"");
        let kind: CapabilityKind = serde_json::from_str("\"api\"").unwrap();
        assert_eq!(kind, CapabilityKind::Api);
    }

    #[test]
    fn test_new_capability_has_no_requirements() {
        let cap = Capability::new("let", CapabilityKind::Syntax);
        assert!(cap.is_syntax());
        assert!(cap.requires.is_empty());
        assert!(cap.description.is_none());
    }
}
