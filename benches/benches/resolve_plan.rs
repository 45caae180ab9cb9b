//! Resolution and planning over a synthetic catalog.
//!
//! The catalog has a chain of api capabilities (each polyfill requires the
//! previous one) plus independent syntax capabilities with transforms, and
//! several target families with staggered support.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use polyplan_catalog::{Catalog, select_targets};
use polyplan_resolve::{PolyfillMode, Resolver, plan};
use std::fmt::Write;

fn synthetic_catalog(capabilities: usize) -> String {
    let mut toml = String::new();
    for family in ["chrome", "firefox", "safari", "edge"] {
        for version in 1..=20 {
            let _ = writeln!(
                toml,
                "[[target]]\nfamily = \"{family}\"\nversion = \"{version}\"\nusage = 0.{version}\n"
            );
        }
    }
    for i in 0..capabilities {
        let since = i % 20 + 1;
        if i % 3 == 0 {
            let _ = writeln!(
                toml,
                "[[capability]]\nid = \"syntax-{i}\"\nkind = \"syntax\"\n\
                 since = {{ chrome = \"{since}\", firefox = \"{since}\" }}\n\
                 [[transform]]\ncapability = \"syntax-{i}\"\nid = \"transform-{i}\"\n"
            );
        } else {
            let _ = writeln!(
                toml,
                "[[capability]]\nid = \"api-{i}\"\nkind = \"api\"\n\
                 since = {{ chrome = \"{since}\", safari = \"{since}\" }}\n\
                 [[polyfill]]\ncapability = \"api-{i}\"\nmodule = \"poly-{i}\"\nsize = {size}",
                size = 100 + i
            );
            // chain each polyfill to an earlier api capability
            let prev = (1..i).rev().find(|j| j % 3 != 0);
            match prev {
                Some(j) => {
                    let _ = writeln!(toml, "requires = [\"api-{j}\"]\n");
                }
                None => {
                    let _ = writeln!(toml);
                }
            }
        }
    }
    toml
}

fn used_ids(capabilities: usize) -> Vec<String> {
    (0..capabilities)
        .map(|i| {
            if i % 3 == 0 {
                format!("syntax-{i}")
            } else {
                format!("api-{i}")
            }
        })
        .collect()
}

fn bench_resolve_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_plan");
    for size in [50usize, 200, 800] {
        let catalog = Catalog::from_toml_str(&synthetic_catalog(size)).unwrap();
        let targets = select_targets("last 5 versions", catalog.matrix()).unwrap();
        let used = used_ids(size);

        group.bench_with_input(BenchmarkId::new("resolve", size), &used, |b, used| {
            let resolver = Resolver::new(&catalog, targets.clone()).unwrap();
            b.iter(|| black_box(resolver.resolve(used.iter().cloned()).unwrap()));
        });

        let outcome = Resolver::new(&catalog, targets.clone())
            .unwrap()
            .with_mode(PolyfillMode::Usage)
            .resolve(used.iter().cloned())
            .unwrap();
        group.bench_with_input(
            BenchmarkId::new("plan", size),
            &outcome.resolutions,
            |b, resolutions| b.iter(|| black_box(plan(resolutions).unwrap())),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_resolve_plan);
criterion_main!(benches);
