//! Capability resolution and injection planning.
//!
//! [`Resolver`] decides, for each capability a unit uses, whether the
//! selected targets run it natively or need a polyfill or a transform.
//! [`plan`] turns those decisions into an ordered list of polyfill modules.
//! [`catalog_cycles`] checks a whole catalog for dependency loops.
//!
//! ```
//! use polyplan_catalog::Catalog;
//! use polyplan_resolve::{PolyfillMode, Resolver, plan};
//!
//! let catalog = Catalog::from_toml_str(r#"
//! [[target]]
//! id = "T1"
//! family = "t"
//! version = "1"
//!
//! [[capability]]
//! id = "promise"
//! kind = "api"
//!
//! [[polyfill]]
//! capability = "promise"
//! module = "poly-promise"
//! "#).unwrap();
//!
//! let resolver = Resolver::new(&catalog, ["T1".to_string()].into())
//!     .unwrap()
//!     .with_mode(PolyfillMode::Usage);
//! let outcome = resolver.resolve(["promise"]).unwrap();
//! let plan = plan(&outcome.resolutions).unwrap();
//! assert_eq!(plan.module_ids().collect::<Vec<_>>(), ["poly-promise"]);
//! ```

mod audit;
mod error;
mod plan;
mod resolve;

pub use audit::{CatalogCycle, catalog_cycles};
pub use error::{PlanError, ResolveError, UnsupportedCapability};
pub use plan::{InjectionPlan, PlannedModule, PlannedTransform, plan};
pub use resolve::{
    PolyfillMode, Resolution, ResolveOutcome, ResolvedCapability, Resolver, resolve,
};

#[cfg(test)]
mod testing {
    use polyplan_catalog::Catalog;
    use std::collections::BTreeSet;

    pub fn catalog(toml: &str) -> Catalog {
        Catalog::from_toml_str(toml).unwrap()
    }

    pub fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }
}
