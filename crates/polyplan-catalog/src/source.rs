//! On-disk catalog format.
//!
//! A catalog source is a TOML or JSON document:
//!
//! ```toml
//! [[target]]
//! family = "chrome"
//! version = "58"
//! usage = 0.4
//!
//! [[target]]
//! family = "ie"
//! version = "11"
//! usage = 0.3
//! dead = true
//!
//! [[capability]]
//! id = "promise"
//! kind = "api"
//! since = { chrome = "33" }
//!
//! [[capability]]
//! id = "async-await"
//! kind = "syntax"
//! requires = ["promise"]
//! supported_by = ["chrome 58"]
//!
//! [[polyfill]]
//! capability = "promise"
//! module = "core-js/es.promise"
//! size = 9800
//!
//! [[transform]]
//! capability = "async-await"
//! id = "transform-async-to-generator"
//! requires = ["regenerator"]
//! ```
//!
//! These types are a faithful mirror of the document; validation happens in
//! [`crate::Catalog::from_source`].

use crate::CatalogError;
use crate::capability::CapabilityKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Root of a catalog document.
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogSource {
    #[serde(rename = "target")]
    pub targets: Vec<TargetEntry>,
    #[serde(rename = "capability")]
    pub capabilities: Vec<CapabilityEntry>,
    #[serde(rename = "polyfill")]
    pub polyfills: Vec<PolyfillEntry>,
    #[serde(rename = "transform")]
    pub transforms: Vec<TransformEntry>,
}

/// A runtime target (browser or engine release).
#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TargetEntry {
    /// Identifier. Defaults to `"<family> <version>"`.
    #[serde(default)]
    pub id: Option<String>,
    /// Family name, lowercase by convention (`chrome`, `firefox`, `node`).
    pub family: String,
    pub version: String,
    /// Global usage share in percent.
    #[serde(default)]
    pub usage: f64,
    /// No longer maintained by its vendor.
    #[serde(default)]
    pub dead: bool,
}

impl TargetEntry {
    pub fn resolved_id(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("{} {}", self.family, self.version))
    }
}

/// A capability and the targets that support it natively.
#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CapabilityEntry {
    pub id: String,
    pub kind: CapabilityKind,
    #[serde(default)]
    pub requires: Vec<String>,
    /// Explicit list of supporting target ids.
    #[serde(default)]
    pub supported_by: Vec<String>,
    /// Minimum supporting version per family; every loaded target of that
    /// family at or above the version supports the capability.
    #[serde(default)]
    pub since: BTreeMap<String, String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PolyfillEntry {
    pub capability: String,
    pub module: String,
    #[serde(default)]
    pub requires: Vec<String>,
    /// Minified size in bytes.
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TransformEntry {
    pub capability: String,
    pub id: String,
    #[serde(default)]
    pub requires: Vec<String>,
}

impl CatalogSource {
    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Read a source file, picking the format from the extension.
    pub fn read(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            other => Err(CatalogError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_arrays() {
        let source = CatalogSource::from_toml_str(
            r#"
[[target]]
family = "chrome"
version = "58"
usage = 1.5

[[capability]]
id = "promise"
kind = "api"
since = { chrome = "33" }

[[polyfill]]
capability = "promise"
module = "core-js/es.promise"
"#,
        )
        .unwrap();
        assert_eq!(source.targets.len(), 1);
        assert_eq!(source.targets[0].resolved_id(), "chrome 58");
        assert_eq!(source.capabilities[0].since["chrome"], "33");
        assert_eq!(source.polyfills[0].size, None);
        assert!(source.transforms.is_empty());
    }

    #[test]
    fn test_parse_json() {
        let source = CatalogSource::from_json_str(
            r#"{"target": [{"id": "t1", "family": "x", "version": "1"}],
                "capability": [{"id": "let", "kind": "syntax", "supported_by": ["t1"]}]}"#,
        )
        .unwrap();
        assert_eq!(source.targets[0].resolved_id(), "t1");
        assert_eq!(source.capabilities[0].kind, CapabilityKind::Syntax);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = CatalogSource::from_toml_str(
            r#"
[[capability]]
id = "promise"
kind = "api"
suported_by = ["chrome 58"]
"#,
        );
        assert!(matches!(err, Err(CatalogError::Toml(_))));
    }

    #[test]
    fn test_read_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.yaml");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(
            CatalogSource::read(&path),
            Err(CatalogError::UnsupportedFormat(ext)) if ext == "yaml"
        ));
    }
}
