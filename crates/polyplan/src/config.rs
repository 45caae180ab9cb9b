//! Configuration for polyplan.
//!
//! Loads config from:
//! 1. Global: ~/.config/polyplan/config.toml (respects `XDG_CONFIG_HOME`)
//! 2. Per-project: .polyplan/config.toml (overrides global field by field)
//!
//! Example config.toml:
//! ```toml
//! catalog = "support/catalog.toml"
//! targets = "> 0.5%, last 2 versions, not dead"
//! mode = "usage"
//! strict = true
//!
//! [pretty]
//! colors = "never"
//! ```

use polyplan_catalog::query::DEFAULTS;
use polyplan_output::PrettyConfig;
use polyplan_resolve::PolyfillMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default catalog location relative to the project root.
pub const DEFAULT_CATALOG: &str = ".polyplan/catalog.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct PolyplanConfig {
    /// Catalog file (`.toml` or `.json`), relative to the project root.
    pub catalog: Option<PathBuf>,
    /// Target query used when `--targets` is not given.
    pub targets: Option<String>,
    pub mode: Option<PolyfillMode>,
    /// Exit with status 2 when a capability is unsupported.
    pub strict: Option<bool>,
    pub pretty: PrettyConfig,
}

impl PolyplanConfig {
    /// Load and merge global and project config for `root`.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        Self::load_with_global(Self::global_config_path().as_deref(), root)
    }

    /// Same as [`load`](Self::load) with an explicit global config path.
    pub fn load_with_global(global: Option<&Path>, root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = global
            && let Some(global) = Self::load_file(path)?
        {
            config = config.merge(global);
        }
        let project = root.join(".polyplan").join("config.toml");
        if let Some(project) = Self::load_file(&project)? {
            config = config.merge(project);
        }
        Ok(config)
    }

    fn global_config_path() -> Option<PathBuf> {
        let config_home = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))?;
        Some(config_home.join("polyplan").join("config.toml"))
    }

    /// `Ok(None)` when the file does not exist.
    fn load_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        tracing::debug!(path = %path.display(), "loading config");
        toml::from_str(&content)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Layer `other` over `self`; fields set in `other` win.
    pub fn merge(self, other: Self) -> Self {
        Self {
            catalog: other.catalog.or(self.catalog),
            targets: other.targets.or(self.targets),
            mode: other.mode.or(self.mode),
            strict: other.strict.or(self.strict),
            pretty: self.pretty.merge(other.pretty),
        }
    }

    pub fn catalog_path(&self, root: &Path) -> PathBuf {
        let path = self
            .catalog
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG));
        if path.is_absolute() {
            path
        } else {
            root.join(path)
        }
    }

    pub fn targets_query(&self) -> &str {
        self.targets.as_deref().unwrap_or(DEFAULTS)
    }

    pub fn mode(&self) -> PolyfillMode {
        self.mode.unwrap_or_default()
    }

    pub fn strict(&self) -> bool {
        self.strict.unwrap_or(false)
    }
}
