//! In-memory reference host.
//!
//! [`Collection`] plays the host's part for the CLI and for tests. It accepts
//! parametrizations the way pytest's `Metafunc.parametrize` does: argument
//! checks, stacked parametrizations multiplied into call specs, and generated
//! item ids. It runs nothing.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Serialize;

use crate::config::ResolverConfig;
use crate::diagnostics::{KwparamError, Result};
use crate::err_msg;
use crate::host::{Ids, Indirect, Mark, Metafunc, ParamSet, ParametrizeOptions, Scope};
use crate::marker::Kwparametrize;
use crate::plugin;
use crate::value::Value;

/// A test function as declared by a test author.
#[derive(Debug, Clone)]
pub struct TestFunction {
    pub name: String,
    pub parameters: Vec<String>,
    pub markers: Vec<Kwparametrize>,
}

impl TestFunction {
    pub fn new<S: Into<String>>(name: impl Into<String>, parameters: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            parameters: parameters.into_iter().map(Into::into).collect(),
            markers: Vec::new(),
        }
    }

    /// Attaches a `kwparametrize` marker.
    pub fn mark(mut self, marker: Kwparametrize) -> Self {
        self.markers.push(marker);
        self
    }
}

/// One runnable test item produced by collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectedItem {
    pub nodeid: String,
    pub function: String,
    pub params: IndexMap<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub indirect: Vec<String>,
    pub scope: Scope,
}

impl CollectedItem {
    pub fn is_xfail(&self) -> bool {
        self.marks.iter().any(Mark::is_xfail)
    }

    pub fn is_skipped(&self) -> bool {
        self.marks.iter().any(Mark::is_skip)
    }
}

/// A test function whose collection failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectError {
    pub function: String,
    pub message: String,
    /// Whether the host would show an internal trace for this failure.
    pub pytrace: bool,
}

#[derive(Debug, Clone, Default)]
struct CallSpec {
    params: IndexMap<String, Value>,
    ids: Vec<String>,
    marks: Vec<Mark>,
    indirect: Vec<String>,
    scope: Option<Scope>,
}

/// [`Metafunc`] for one test function during collection.
#[derive(Debug)]
pub struct FunctionCollector<'a> {
    function: &'a TestFunction,
    calls: Vec<CallSpec>,
}

impl<'a> FunctionCollector<'a> {
    pub fn new(function: &'a TestFunction) -> Self {
        Self {
            function,
            calls: Vec::new(),
        }
    }

    fn fail(&self, message: String) -> KwparamError {
        err_msg!(Host, self.function.name, "{}", message)
    }

    fn validate(
        &self,
        argnames: &[String],
        argvalues: &[ParamSet],
        options: &ParametrizeOptions,
    ) -> Result<()> {
        for (i, name) in argnames.iter().enumerate() {
            let parametrized = self.calls.first().is_some_and(|c| c.params.contains_key(name));
            if parametrized || argnames[..i].contains(name) {
                return Err(self.fail(format!("duplicate '{name}'")));
            }
            if !self.function.parameters.contains(name) {
                let kind = if options.indirect.applies_to(name) {
                    "fixture"
                } else {
                    "argument"
                };
                return Err(self.fail(format!("function uses no {kind} '{name}'")));
            }
        }
        if let Indirect::Names(names) = &options.indirect {
            if let Some(missing) = names.iter().find(|n| !argnames.contains(n)) {
                return Err(self.fail(format!("indirect fixture '{missing}' doesn't exist")));
            }
        }
        for (index, param_set) in argvalues.iter().enumerate() {
            if param_set.values.len() != argnames.len() {
                return Err(self.fail(format!(
                    "wrong number of values in parameter set #{index}: expected {}, got {}",
                    argnames.len(),
                    param_set.values.len()
                )));
            }
        }
        if let Some(Ids::Explicit(ids)) = &options.ids {
            if ids.len() != argvalues.len() {
                return Err(self.fail(format!(
                    "{} parameter sets specified, with different number of ids: {}",
                    argvalues.len(),
                    ids.len()
                )));
            }
        }
        Ok(())
    }

    /// Ids for each parameter set, disambiguating duplicates by position.
    fn make_ids(argnames: &[String], argvalues: &[ParamSet], ids: Option<&Ids>) -> Vec<String> {
        let mut resolved: Vec<String> = argvalues
            .iter()
            .enumerate()
            .map(|(index, param_set)| {
                if let Some(id) = &param_set.id {
                    return id.clone();
                }
                if let Some(Ids::Explicit(explicit)) = ids {
                    if let Some(Some(id)) = explicit.get(index) {
                        return id.clone();
                    }
                }
                argnames
                    .iter()
                    .zip(&param_set.values)
                    .map(|(argname, value)| {
                        let custom = match ids {
                            Some(Ids::Callable(f)) => (**f)(value),
                            _ => None,
                        };
                        custom.unwrap_or_else(|| value_id(argname, value, index))
                    })
                    .collect::<Vec<_>>()
                    .join("-")
            })
            .collect();

        let mut counts: HashMap<String, usize> = HashMap::new();
        for id in &resolved {
            *counts.entry(id.clone()).or_default() += 1;
        }
        for (index, id) in resolved.iter_mut().enumerate() {
            if counts[id.as_str()] > 1 {
                id.push_str(&index.to_string());
            }
        }
        resolved
    }

    /// Consumes the collector, yielding one item per registered call spec.
    pub fn into_items(self) -> Vec<CollectedItem> {
        let function = self.function;
        let name = &function.name;
        if self.calls.is_empty() {
            return vec![CollectedItem {
                nodeid: name.clone(),
                function: name.clone(),
                params: IndexMap::new(),
                marks: Vec::new(),
                indirect: Vec::new(),
                scope: Scope::Function,
            }];
        }
        self.calls
            .into_iter()
            .map(|call| CollectedItem {
                nodeid: format!("{}[{}]", name, call.ids.join("-")),
                function: name.clone(),
                params: call.params,
                marks: call.marks,
                indirect: call.indirect,
                scope: call.scope.unwrap_or(Scope::Function),
            })
            .collect()
    }
}

fn value_id(argname: &str, value: &Value, index: usize) -> String {
    match value {
        Value::String(s) => ascii_escaped(s),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Nil | Value::Number(_) => value.to_string(),
        _ => format!("{argname}{index}"),
    }
}

/// Escapes non-printable and non-ASCII characters as `\xNN`, `\uNNNN` or
/// `\UNNNNNNNN`, leaving printable ASCII verbatim.
fn ascii_escaped(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ' '..='~' => out.push(c),
            c if (c as u32) < 0x100 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c if (c as u32) < 0x10000 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push_str(&format!("\\U{:08x}", c as u32)),
        }
    }
    out
}

impl Metafunc for FunctionCollector<'_> {
    fn function_name(&self) -> &str {
        &self.function.name
    }

    fn parameter_names(&self) -> &[String] {
        &self.function.parameters
    }

    fn parametrize(
        &mut self,
        argnames: Vec<String>,
        mut argvalues: Vec<ParamSet>,
        options: ParametrizeOptions,
    ) -> Result<()> {
        self.validate(&argnames, &argvalues, &options)?;
        if argvalues.is_empty() {
            let reason = format!(
                "got empty parameter set {:?}, function {}",
                argnames, self.function.name
            );
            argvalues.push(
                ParamSet::new(vec![Value::Nil; argnames.len()])
                    .with_id("NOTSET")
                    .with_marks([Mark::skip().with_reason(reason)]),
            );
        }

        let ids = Self::make_ids(&argnames, &argvalues, options.ids.as_ref());
        let indirect: Vec<String> = argnames
            .iter()
            .filter(|name| options.indirect.applies_to(name))
            .cloned()
            .collect();
        let previous = if self.calls.is_empty() {
            vec![CallSpec::default()]
        } else {
            std::mem::take(&mut self.calls)
        };

        for call in &previous {
            for (param_set, id) in argvalues.iter().zip(&ids) {
                let mut next = call.clone();
                next.params.extend(
                    argnames
                        .iter()
                        .cloned()
                        .zip(param_set.values.iter().cloned()),
                );
                next.ids.push(id.clone());
                next.marks.extend(param_set.marks.iter().cloned());
                next.indirect.extend(indirect.iter().cloned());
                if options.scope.is_some() {
                    next.scope = options.scope;
                }
                self.calls.push(next);
            }
        }
        tracing::trace!(
            function = %self.function.name,
            argnames = ?argnames,
            calls = self.calls.len(),
            "registered parametrization"
        );
        Ok(())
    }
}

/// Collected items and errors for a set of test functions.
#[derive(Debug, Default)]
pub struct Collection {
    config: ResolverConfig,
    items: Vec<CollectedItem>,
    errors: Vec<CollectError>,
}

impl Collection {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Collects one test function. A failing parametrization records a
    /// [`CollectError`] and yields no items for that function.
    pub fn collect(&mut self, function: &TestFunction) -> Result<()> {
        let mut collector = FunctionCollector::new(function);
        match plugin::generate_tests(&mut collector, &function.markers, &self.config) {
            Ok(()) => {
                let items = collector.into_items();
                tracing::debug!(function = %function.name, items = items.len(), "collected");
                self.items.extend(items);
                Ok(())
            }
            Err(err) => {
                self.record_error(&function.name, &err);
                Err(err)
            }
        }
    }

    /// Records a failure to collect `function` that happened outside [`Collection::collect`].
    pub fn record_error(&mut self, function: &str, err: &KwparamError) {
        tracing::debug!(function, error = %err, "collection failed");
        self.errors.push(CollectError {
            function: function.to_string(),
            message: err.to_string(),
            pytrace: err.shows_trace(),
        });
    }

    pub fn items(&self) -> &[CollectedItem] {
        &self.items
    }

    pub fn errors(&self) -> &[CollectError] {
        &self.errors
    }

    pub fn item(&self, nodeid: &str) -> Option<&CollectedItem> {
        self.items.iter().find(|item| item.nodeid == nodeid)
    }

    pub fn nodeids(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.nodeid.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case;
    use crate::kwparametrize;
    use crate::vocabulary::Vocabulary;

    fn collect(function: TestFunction) -> Collection {
        let mut collection = Collection::new(ResolverConfig::default());
        let _ = collection.collect(&function);
        collection
    }

    #[test]
    fn host_keywords_match_the_vocabulary_table() {
        Vocabulary::current()
            .verify(ParametrizeOptions::KEYWORDS, ParamSet::KEYWORDS)
            .unwrap();
    }

    #[test]
    fn unparametrized_function_yields_one_item() {
        let collection = collect(TestFunction::new("test_plain", ["caplog"]));
        assert_eq!(collection.nodeids(), ["test_plain"]);
    }

    #[test]
    fn automatic_ids_join_values() {
        let collection = collect(
            TestFunction::new("test_eval", ["test_input", "expected"]).mark(kwparametrize![
                case! { test_input: "3+5", expected: 8 },
                case! { test_input: "6*9", expected: 42, marks: "xfail" },
            ]),
        );
        assert_eq!(collection.nodeids(), ["test_eval[3+5-8]", "test_eval[6*9-42]"]);
        assert!(collection.item("test_eval[6*9-42]").unwrap().is_xfail());
    }

    #[test]
    fn non_scalar_values_use_argname_and_index() {
        let collection = collect(
            TestFunction::new("test_lists", ["xs"]).mark(kwparametrize![
                case! { xs: vec![1, 2] },
                case! { xs: vec![3] },
            ]),
        );
        assert_eq!(collection.nodeids(), ["test_lists[xs0]", "test_lists[xs1]"]);
    }

    #[test]
    fn duplicate_ids_get_position_suffix() {
        let collection = collect(
            TestFunction::new("test_dup", ["a"]).mark(kwparametrize![
                case! { a: 1 },
                case! { a: 1 },
                case! { a: 2 },
            ]),
        );
        assert_eq!(
            collection.nodeids(),
            ["test_dup[10]", "test_dup[11]", "test_dup[2]"]
        );
    }

    #[test]
    fn stacked_markers_multiply() {
        let collection = collect(
            TestFunction::new("test_grid", ["x", "y"])
                .mark(kwparametrize![case! { x: 0 }, case! { x: 1 }])
                .mark(kwparametrize![case! { y: "a" }, case! { y: "b" }]),
        );
        assert_eq!(
            collection.nodeids(),
            [
                "test_grid[0-a]",
                "test_grid[0-b]",
                "test_grid[1-a]",
                "test_grid[1-b]"
            ]
        );
    }

    #[test]
    fn same_argument_in_two_markers_is_a_duplicate() {
        let collection = collect(
            TestFunction::new("test_twice", ["x"])
                .mark(kwparametrize![case! { x: 0 }])
                .mark(kwparametrize![case! { x: 1 }]),
        );
        assert!(collection.items().is_empty());
        assert_eq!(collection.errors()[0].message, "In test_twice: duplicate 'x'");
    }

    #[test]
    fn ids_length_must_match_cases() {
        let collection = collect(
            TestFunction::new("test_ids", ["x"])
                .mark(kwparametrize![case! { x: 0 }, case! { x: 1 }].ids(["only-one"])),
        );
        assert_eq!(
            collection.errors()[0].message,
            "In test_ids: 2 parameter sets specified, with different number of ids: 1"
        );
    }

    #[test]
    fn empty_case_list_is_skipped() {
        let collection = collect(
            TestFunction::new("test_empty", ["x"])
                .mark(Kwparametrize::new([]).required("x")),
        );
        let item = collection.item("test_empty[NOTSET]").unwrap();
        assert!(item.is_skipped());
    }

    #[test]
    fn indirect_names_must_be_parametrized() {
        let collection = collect(
            TestFunction::new("test_fixture", ["db", "x"])
                .mark(kwparametrize![case! { x: 1 }].indirect(vec!["db"])),
        );
        assert_eq!(
            collection.errors()[0].message,
            "In test_fixture: indirect fixture 'db' doesn't exist"
        );
    }

    #[test]
    fn non_ascii_ids_are_escaped() {
        assert_eq!(ascii_escaped("caf\u{e9}"), "caf\\xe9");
        assert_eq!(ascii_escaped("\u{263a}"), "\\u263a");
        assert_eq!(ascii_escaped("\u{1f600}"), "\\U0001f600");
        assert_eq!(ascii_escaped("a\tb\\c\u{7}"), "a\\tb\\\\c\\x07");
        assert_eq!(ascii_escaped("don't"), "don't");
    }

    #[test]
    fn escaped_strings_appear_in_nodeids() {
        let collection = collect(
            TestFunction::new("test_word", ["word"]).mark(kwparametrize![case! { word: "caf\u{e9}" }]),
        );
        assert_eq!(collection.nodeids(), ["test_word[caf\\xe9]"]);
    }

    #[test]
    fn booleans_and_none_render_like_python() {
        let collection = collect(
            TestFunction::new("test_b", ["flag", "n"]).mark(kwparametrize![
                case! { flag: true, n: Value::Nil },
                case! { flag: false, n: 1.5 },
            ]),
        );
        assert_eq!(collection.nodeids(), ["test_b[True-None]", "test_b[False-1.5]"]);
    }

    #[test]
    fn empty_string_gives_an_empty_id_part() {
        let collection = collect(
            TestFunction::new("test_s", ["s", "n"]).mark(kwparametrize![case! { s: "", n: 1 }]),
        );
        assert_eq!(collection.nodeids(), ["test_s[-1]"]);
    }

    #[test]
    fn param_mark_is_not_applied_to_items() {
        let marker = crate::MarkerCall::new(vec![Value::Map(
            [("a".to_string(), Value::from(1))].into_iter().collect(),
        )])
        .kwarg("_param_mark", "xfail")
        .into_marker("test_pm", Vocabulary::current())
        .unwrap();
        let collection = collect(TestFunction::new("test_pm", ["a"]).mark(marker));
        let item = &collection.items()[0];
        assert!(!item.is_xfail());
        assert!(item.marks.is_empty());
    }

    #[test]
    fn configuration_errors_have_no_trace() {
        let collection = collect(
            TestFunction::new("test_missing", ["a"])
                .mark(kwparametrize![case! { a: 1 }, case! {}]),
        );
        let error = &collection.errors()[0];
        assert!(!error.pytrace);
        assert!(error.message.contains("'a' parameter was omitted"));
    }
}
