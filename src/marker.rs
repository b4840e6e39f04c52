//! The `kwparametrize` marker attached to a test function.
//!
//! There are two typed entry points that produce the same marker:
//!
//! - [`Kwparametrize::new`] takes one ordered sequence of cases;
//! - the [`kwparametrize!`](crate::kwparametrize!) macro takes individual cases.
//!
//! [`MarkerCall`] covers untyped front ends (such as case files), where the
//! call shape has to be detected from the positional arguments.

use indexmap::IndexMap;
use serde::Deserialize;
use std::sync::Arc;

use crate::case::CaseDescriptor;
use crate::config::ResolverConfig;
use crate::diagnostics::{KwparamError, Result};
use crate::host::{Ids, Indirect, Metafunc, ParametrizeOptions, Scope};
use crate::resolver::{self, DefaultValue, DefaultsTable, Resolution, DEFAULTS_KEYWORD};
use crate::value::Value;
use crate::vocabulary::Vocabulary;

/// Keyword-style parametrization of one test function.
#[derive(Debug, Clone, Default)]
pub struct Kwparametrize {
    cases: Vec<CaseDescriptor>,
    defaults: DefaultsTable,
    options: ParametrizeOptions,
}

impl Kwparametrize {
    /// Parametrizes from one ordered sequence of cases.
    ///
    /// ```rust
    /// use kwparametrize::{case, Kwparametrize};
    /// let marker = Kwparametrize::new(vec![case! { a: 1 }, case! { a: 2 }]).with_default("b", 0);
    /// assert_eq!(marker.cases().len(), 2);
    /// ```
    pub fn new(cases: impl IntoIterator<Item = CaseDescriptor>) -> Self {
        Self {
            cases: cases.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_default(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(name, DefaultValue::value(value));
        self
    }

    /// Declares a parameter every case must supply.
    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.defaults.insert(name, DefaultValue::Required);
        self
    }

    /// Merges a whole defaults table, as the nested `defaults=` keyword does.
    pub fn defaults(mut self, table: DefaultsTable) -> Self {
        self.defaults.extend(table);
        self
    }

    pub fn ids<S: Into<String>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
        self.options.ids = Some(Ids::Explicit(
            ids.into_iter().map(|id| Some(id.into())).collect(),
        ));
        self
    }

    pub fn ids_fn(mut self, f: impl Fn(&Value) -> Option<String> + Send + Sync + 'static) -> Self {
        self.options.ids = Some(Ids::Callable(Arc::new(f)));
        self
    }

    pub fn indirect(mut self, indirect: impl Into<Indirect>) -> Self {
        self.options.indirect = indirect.into();
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.options.scope = Some(scope);
        self
    }

    pub fn cases(&self) -> &[CaseDescriptor] {
        &self.cases
    }

    pub fn defaults_table(&self) -> &DefaultsTable {
        &self.defaults
    }

    pub fn options(&self) -> &ParametrizeOptions {
        &self.options
    }

    /// Resolves the cases without registering them.
    pub fn resolve(
        &self,
        function: &str,
        declared: &[String],
        vocabulary: &Vocabulary,
        config: &ResolverConfig,
    ) -> Result<Resolution> {
        resolver::resolve(
            function,
            declared,
            &self.cases,
            &self.defaults,
            vocabulary,
            config,
        )
    }

    /// Resolves the cases and registers them with `metafunc`.
    pub fn apply<M: Metafunc + ?Sized>(&self, metafunc: &mut M, config: &ResolverConfig) -> Result<()> {
        resolver::kwparametrize(
            metafunc,
            &self.cases,
            &self.defaults,
            self.options.clone(),
            config,
        )
    }
}

/// Builds a [`Kwparametrize`] marker from individual cases.
///
/// ```rust
/// use kwparametrize::{case, kwparametrize};
/// let marker = kwparametrize![case! { x: 1 }, case! { x: 2 }].required("x");
/// assert_eq!(marker.cases().len(), 2);
/// ```
#[macro_export]
macro_rules! kwparametrize {
    ($($case:expr),* $(,)?) => {
        $crate::marker::Kwparametrize::new(::std::vec![$($case),*])
    };
}

/// A marker invocation with untyped arguments.
///
/// `required` lists keyword names passed the required sentinel.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkerCall {
    pub args: Vec<Value>,
    pub kwargs: IndexMap<String, Value>,
    pub required: Vec<String>,
}

impl MarkerCall {
    pub fn new(args: Vec<Value>) -> Self {
        Self {
            args,
            ..Self::default()
        }
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(name.into(), value.into());
        self
    }

    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }

    /// True when the call passed one list of cases rather than individual cases.
    pub fn has_one_sequence(&self) -> bool {
        matches!(self.args.as_slice(), [Value::List(_)])
    }

    /// Extracts the case descriptors, detecting the call shape.
    pub fn cases(&self, function: &str) -> Result<Vec<CaseDescriptor>> {
        let raw: &[Value] = match self.args.as_slice() {
            [Value::List(items)] => items,
            args => args,
        };
        raw.iter()
            .enumerate()
            .map(|(index, value)| {
                CaseDescriptor::from_value(value).ok_or_else(|| KwparamError::InvalidCase {
                    function: function.to_string(),
                    index,
                    message: format!("expected a Map of parameters, got {}", value.type_name()),
                })
            })
            .collect()
    }

    /// True when the only non-control keyword is a `defaults` map.
    fn has_nested_defaults(&self, vocabulary: &Vocabulary) -> bool {
        let mut inline = self
            .kwargs
            .iter()
            .filter(|(name, _)| !vocabulary.is_parametrize_keyword(name));
        matches!(
            (inline.next(), inline.next()),
            (Some((name, Value::Map(_))), None) if name == DEFAULTS_KEYWORD
        )
    }

    /// Converts the call into a typed marker.
    ///
    /// When the defaults come as one nested `defaults` map, `required` names
    /// join that table rather than sitting beside it.
    pub fn into_marker(self, function: &str, vocabulary: &Vocabulary) -> Result<Kwparametrize> {
        let cases = self.cases(function)?;
        let nested = self.has_nested_defaults(vocabulary);
        let (inline_required, nested_required): (Vec<String>, Vec<String>) = self
            .required
            .into_iter()
            .partition(|name| !nested || vocabulary.is_parametrize_keyword(name));

        let mut keywords: IndexMap<String, DefaultValue> = self
            .kwargs
            .into_iter()
            .map(|(k, v)| (k, DefaultValue::Value(v)))
            .collect();
        for name in inline_required {
            keywords.insert(name, DefaultValue::Required);
        }
        let (mut defaults, options) = resolver::split_keywords(function, keywords, vocabulary)?;
        for name in nested_required {
            defaults.insert(name, DefaultValue::Required);
        }
        Ok(Kwparametrize {
            cases,
            defaults,
            options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case;

    fn case_values() -> Vec<Value> {
        vec![
            Value::Map(
                [("a".to_string(), Value::from(1))].into_iter().collect(),
            ),
            Value::Map(
                [("a".to_string(), Value::from(2))].into_iter().collect(),
            ),
        ]
    }

    #[test]
    fn one_list_argument_is_the_case_sequence() {
        let call = MarkerCall::new(vec![Value::List(case_values())]);
        assert!(call.has_one_sequence());
        assert_eq!(call.cases("f").unwrap(), vec![case! { a: 1 }, case! { a: 2 }]);
    }

    #[test]
    fn several_arguments_are_individual_cases() {
        let call = MarkerCall::new(case_values());
        assert!(!call.has_one_sequence());
        assert_eq!(call.cases("f").unwrap(), vec![case! { a: 1 }, case! { a: 2 }]);
    }

    #[test]
    fn single_map_argument_is_one_case() {
        let call = MarkerCall::new(vec![case_values().remove(0)]);
        assert!(!call.has_one_sequence());
        assert_eq!(call.cases("f").unwrap().len(), 1);
    }

    #[test]
    fn scalar_argument_is_not_a_case() {
        let call = MarkerCall::new(vec![Value::from(3)]);
        let err = call.cases("test_f").unwrap_err();
        assert!(err.to_string().contains("expected a Map of parameters, got Number"));
    }

    #[test]
    fn required_keywords_become_sentinels() {
        let marker = MarkerCall::new(case_values())
            .kwarg("b", 42)
            .required("a")
            .into_marker("f", Vocabulary::current())
            .unwrap();
        assert_eq!(
            marker.defaults_table().names().collect::<Vec<_>>(),
            ["b", "a"]
        );
        assert!(marker.defaults_table().get("a").unwrap().is_required());
    }

    fn map(pairs: &[(&str, Value)]) -> Value {
        Value::Map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn required_names_join_nested_defaults() {
        let marker = MarkerCall::new(vec![map(&[("a", Value::from(5))])])
            .kwarg("defaults", map(&[("b", Value::from(1))]))
            .kwarg("ids", vec!["only"])
            .required("a")
            .into_marker("test_f", Vocabulary::current())
            .unwrap();
        let table = marker.defaults_table();
        assert_eq!(table.names().collect::<Vec<_>>(), ["b", "a"]);
        assert!(table.get("a").unwrap().is_required());
        assert_eq!(table.get("b"), Some(&DefaultValue::value(1)));
    }

    #[test]
    fn required_control_option_fails_with_nested_defaults() {
        let err = MarkerCall::new(vec![])
            .kwarg("defaults", map(&[("b", Value::from(1))]))
            .required("scope")
            .into_marker("test_f", Vocabulary::current())
            .unwrap_err();
        assert!(matches!(err, KwparamError::InvalidOption { ref option, .. } if option == "scope"));
    }

    #[test]
    fn defaults_beside_other_keywords_stays_a_parameter() {
        let marker = MarkerCall::new(vec![])
            .kwarg("defaults", map(&[("b", Value::from(1))]))
            .kwarg("c", 2)
            .into_marker("test_f", Vocabulary::current())
            .unwrap();
        assert_eq!(
            marker.defaults_table().names().collect::<Vec<_>>(),
            ["defaults", "c"]
        );
    }

    #[test]
    fn macro_and_sequence_build_equal_markers() {
        let a = kwparametrize![case! { x: 1 }, case! { x: 2 }];
        let b = Kwparametrize::new([case! { x: 1 }, case! { x: 2 }]);
        assert_eq!(a.cases(), b.cases());
    }
}
