//! Capability catalog and runtime support matrix for polyplan.
//!
//! The catalog is the immutable input to every resolution: which runtime
//! targets exist, which capabilities each one supports natively, and which
//! polyfills and transforms can stand in for a missing capability.
//!
//! ```
//! use polyplan_catalog::{Catalog, select_targets};
//!
//! let catalog = Catalog::from_toml_str(r#"
//! [[target]]
//! family = "chrome"
//! version = "58"
//! usage = 1.0
//!
//! [[target]]
//! family = "ie"
//! version = "11"
//! usage = 0.4
//! dead = true
//!
//! [[capability]]
//! id = "promise"
//! kind = "api"
//! since = { chrome = "33" }
//!
//! [[polyfill]]
//! capability = "promise"
//! module = "core-js/es.promise"
//! "#).unwrap();
//!
//! let targets = select_targets("> 0.2%", catalog.matrix()).unwrap();
//! assert_eq!(targets.len(), 2);
//!
//! let missing = catalog.matrix().missing("promise", &targets).unwrap();
//! assert!(missing.contains("ie 11"));
//! ```
//!
//! Malformed sources (unknown targets, duplicate definitions, dangling
//! dependencies) are rejected by [`Catalog::from_source`] so that resolution
//! never has to deal with a broken catalog.

mod capability;
mod catalog;
mod error;
mod matrix;
pub mod query;
pub mod source;
mod version;

pub use capability::{Capability, CapabilityId, CapabilityKind, Polyfill, TargetId, Transform};
pub use catalog::Catalog;
pub use error::{CatalogError, CatalogProblem};
pub use matrix::{RuntimeTarget, SupportMatrix};
pub use query::{QueryError, TargetQuery, select_targets};
pub use source::CatalogSource;
pub use version::Version;
