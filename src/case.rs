//! Case descriptors: one keyword-style mapping per test case.
//!
//! A descriptor maps parameter names to values. It may also carry the host's
//! reserved per-case keys (`id`, `marks`), which are metadata rather than
//! parameters; the resolver tells the two apart using the host vocabulary.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::host::Mark;
use crate::value::Value;

/// One named set of argument values, in insertion order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseDescriptor {
    entries: IndexMap<String, Value>,
}

impl CaseDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces one entry, builder style.
    ///
    /// ```rust
    /// use kwparametrize::case::CaseDescriptor;
    /// let case = CaseDescriptor::new().with("a", 1).with("b", "two");
    /// assert_eq!(case.keys().collect::<Vec<_>>(), ["a", "b"]);
    /// ```
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets the reserved `id` entry.
    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.with("id", Value::String(id.into()))
    }

    /// Sets the reserved `marks` entry.
    pub fn with_marks(self, marks: impl IntoIterator<Item = Mark>) -> Self {
        let marks: Vec<Value> = marks.into_iter().map(mark_to_value).collect();
        self.with("marks", Value::List(marks))
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reads a descriptor from an untyped value; only maps qualify.
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_map().cloned().map(Self::from)
    }
}

fn mark_to_value(mark: Mark) -> Value {
    match mark.reason {
        None => Value::String(mark.name),
        Some(reason) => {
            let mut map = IndexMap::new();
            map.insert("name".to_string(), Value::String(mark.name));
            map.insert("reason".to_string(), Value::String(reason));
            Value::Map(map)
        }
    }
}

impl From<IndexMap<String, Value>> for CaseDescriptor {
    fn from(entries: IndexMap<String, Value>) -> Self {
        Self { entries }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for CaseDescriptor {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for CaseDescriptor {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

/// Builds a [`CaseDescriptor`] from `name: value` pairs.
///
/// ```rust
/// use kwparametrize::case;
/// let c = case! { test_input: "3+5", expected: 8, id: "add" };
/// assert_eq!(c.len(), 3);
/// ```
#[macro_export]
macro_rules! case {
    () => {
        $crate::case::CaseDescriptor::new()
    };
    ($($name:ident : $value:expr),+ $(,)?) => {
        $crate::case::CaseDescriptor::new()$(.with(stringify!($name), $value))+
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macro_keeps_insertion_order() {
        let c = case! { zeta: 1, alpha: 2, mid: 3 };
        assert_eq!(c.keys().collect::<Vec<_>>(), ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn marks_round_trip_through_values() {
        let c = CaseDescriptor::new()
            .with("a", 1)
            .with_marks([Mark::xfail().with_reason("flaky"), Mark::new("basic")]);
        let marks = Mark::list_from_value(c.get("marks").unwrap()).unwrap();
        assert_eq!(
            marks,
            vec![Mark::xfail().with_reason("flaky"), Mark::new("basic")]
        );
    }

    #[test]
    fn only_maps_become_descriptors() {
        assert!(CaseDescriptor::from_value(&Value::from(vec![1])).is_none());
        let c = CaseDescriptor::from([("x", 1)]);
        assert_eq!(
            CaseDescriptor::from_value(&Value::Map(c.entries.clone())),
            Some(c)
        );
    }
}
