//! Shared helpers for the integration tests.
#![allow(dead_code)]

use kwparametrize::collection::{CollectedItem, Collection, TestFunction};
use kwparametrize::config::ResolverConfig;
use kwparametrize::Value;

/// Collects `functions` with the default configuration, ignoring failures.
pub fn collect(functions: impl IntoIterator<Item = TestFunction>) -> Collection {
    collect_with(ResolverConfig::default(), functions)
}

pub fn collect_with(
    config: ResolverConfig,
    functions: impl IntoIterator<Item = TestFunction>,
) -> Collection {
    let mut collection = Collection::new(config);
    for function in functions {
        let _ = collection.collect(&function);
    }
    collection
}

/// The item's parameters as `(name, value)` pairs.
pub fn params(item: &CollectedItem) -> Vec<(&str, &Value)> {
    item.params.iter().map(|(k, v)| (k.as_str(), v)).collect()
}

pub fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"))
}
