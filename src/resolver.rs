//! Case resolution: turning keyword-style case mappings into ordered argument
//! tuples.
//!
//! ## Algorithm
//!
//! 1. Keyword inputs are split into control options for the host's registration
//!    call and a [`DefaultsTable`] ([`split_keywords`]).
//! 2. Every non-reserved key of every case is registered as a parameter. Keys
//!    without a default are marked [`DefaultValue::Required`].
//! 3. For each case, each parameter (in discovery order) takes the case's own
//!    value, else its concrete default. A required parameter missing from any
//!    case aborts the whole parametrization.
//! 4. Reserved per-case keys (`id`, `marks`) become the case entry's metadata.
//!
//! The host's registration call is then invoked exactly once ([`kwparametrize`]).

use indexmap::IndexMap;

use crate::case::CaseDescriptor;
use crate::config::{ResolverConfig, UnknownKeyPolicy};
use crate::diagnostics::{KwparamError, Result};
use crate::host::{Ids, Indirect, Mark, Metafunc, ParamSet, ParametrizeOptions, Scope};
use crate::value::Value;
use crate::vocabulary::Vocabulary;

/// Keyword that carries a nested defaults mapping.
pub const DEFAULTS_KEYWORD: &str = "defaults";

/// A default for one parameter.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DefaultValue {
    /// No default: every case must supply the parameter.
    #[default]
    Required,
    Value(Value),
}

impl DefaultValue {
    pub fn value(value: impl Into<Value>) -> Self {
        DefaultValue::Value(value.into())
    }

    pub fn is_required(&self) -> bool {
        matches!(self, DefaultValue::Required)
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            DefaultValue::Required => None,
            DefaultValue::Value(v) => Some(v),
        }
    }
}

impl From<Value> for DefaultValue {
    fn from(value: Value) -> Self {
        DefaultValue::Value(value)
    }
}

/// Fallback values for parameters a case omits, in parameter order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DefaultsTable {
    entries: IndexMap<String, DefaultValue>,
}

impl DefaultsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, default: DefaultValue) {
        self.entries.insert(name.into(), default);
    }

    /// Registers `name` as a parameter, marking it required if it has no entry yet.
    pub fn register(&mut self, name: &str) {
        if !self.entries.contains_key(name) {
            self.entries.insert(name.to_string(), DefaultValue::Required);
        }
    }

    pub fn get(&self, name: &str) -> Option<&DefaultValue> {
        self.entries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DefaultValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn extend(&mut self, other: DefaultsTable) {
        self.entries.extend(other.entries);
    }
}

impl<K: Into<String>> FromIterator<(K, DefaultValue)> for DefaultsTable {
    fn from_iter<I: IntoIterator<Item = (K, DefaultValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Ordered parameter names and one case entry per descriptor.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resolution {
    pub argnames: Vec<String>,
    pub argvalues: Vec<ParamSet>,
}

/// Splits marker keywords into the defaults table and the control options.
///
/// If the non-control keywords are exactly one `defaults` entry holding a map,
/// that map is the defaults table; otherwise the keywords themselves are.
pub fn split_keywords(
    function: &str,
    keywords: IndexMap<String, DefaultValue>,
    vocabulary: &Vocabulary,
) -> Result<(DefaultsTable, ParametrizeOptions)> {
    let mut options = ParametrizeOptions::default();
    let mut defaults = DefaultsTable::new();
    for (name, keyword) in keywords {
        if vocabulary.is_parametrize_keyword(&name) {
            let value = match keyword {
                DefaultValue::Value(v) => v,
                DefaultValue::Required => {
                    return Err(invalid_option(function, &name, "cannot be marked required"))
                }
            };
            parse_option(function, &name, value, &mut options)?;
        } else {
            defaults.insert(name, keyword);
        }
    }

    if defaults.len() == 1 {
        if let Some(DefaultValue::Value(Value::Map(nested))) = defaults.get(DEFAULTS_KEYWORD) {
            let nested = nested
                .iter()
                .map(|(k, v)| (k.clone(), DefaultValue::Value(v.clone())))
                .collect();
            return Ok((nested, options));
        }
    }
    Ok((defaults, options))
}

fn parse_option(
    function: &str,
    name: &str,
    value: Value,
    options: &mut ParametrizeOptions,
) -> Result<()> {
    match name {
        "ids" => {
            let items = match value {
                Value::List(items) => items,
                other => {
                    return Err(invalid_option(
                        function,
                        name,
                        format!("expected a List, got {}", other.type_name()),
                    ))
                }
            };
            let ids = items
                .into_iter()
                .map(|item| match item {
                    Value::Nil => Ok(None),
                    Value::String(s) => Ok(Some(s)),
                    Value::Bool(true) => Ok(Some("True".to_string())),
                    Value::Bool(false) => Ok(Some("False".to_string())),
                    Value::Number(_) => Ok(Some(item.to_string())),
                    other => Err(invalid_option(
                        function,
                        name,
                        format!("ids must be scalars, got {}", other.type_name()),
                    )),
                })
                .collect::<Result<Vec<_>>>()?;
            options.ids = Some(Ids::Explicit(ids));
        }
        "indirect" => {
            options.indirect = match value {
                Value::Bool(all) => Indirect::from(all),
                Value::List(items) => Indirect::Names(
                    items
                        .into_iter()
                        .map(|item| match item {
                            Value::String(s) => Ok(s),
                            other => Err(invalid_option(
                                function,
                                name,
                                format!("argument names must be Strings, got {}", other.type_name()),
                            )),
                        })
                        .collect::<Result<Vec<_>>>()?,
                ),
                other => {
                    return Err(invalid_option(
                        function,
                        name,
                        format!("expected a Bool or List, got {}", other.type_name()),
                    ))
                }
            };
        }
        "scope" => {
            options.scope = match value {
                Value::Nil => None,
                Value::String(s) => {
                    Some(s.parse::<Scope>().map_err(|e| invalid_option(function, name, e))?)
                }
                other => {
                    return Err(invalid_option(
                        function,
                        name,
                        format!("expected a String, got {}", other.type_name()),
                    ))
                }
            };
        }
        "_param_mark" => {
            options.param_mark = match value {
                Value::Nil => None,
                other => {
                    Some(Mark::from_value(&other).map_err(|e| invalid_option(function, name, e))?)
                }
            };
        }
        other => {
            return Err(invalid_option(
                function,
                other,
                "keyword is reserved by the host but not supported",
            ))
        }
    }
    Ok(())
}

fn invalid_option(function: &str, option: &str, message: impl Into<String>) -> KwparamError {
    KwparamError::InvalidOption {
        function: function.to_string(),
        option: option.to_string(),
        message: message.into(),
    }
}

/// Resolves `cases` against `defaults` into ordered argument tuples.
///
/// `declared` lists the parameters the test function accepts; it is only
/// consulted when `config` rejects unknown keys.
pub fn resolve(
    function: &str,
    declared: &[String],
    cases: &[CaseDescriptor],
    defaults: &DefaultsTable,
    vocabulary: &Vocabulary,
    config: &ResolverConfig,
) -> Result<Resolution> {
    let mut table = defaults.clone();
    for case in cases {
        for key in case.keys() {
            if !vocabulary.is_param_keyword(key) {
                table.register(key);
            }
        }
    }

    if config.unknown_keys == UnknownKeyPolicy::Reject {
        if let Some(unknown) = table.names().find(|name| !declared.iter().any(|d| d.as_str() == *name)) {
            return Err(KwparamError::UnknownParameter {
                function: function.to_string(),
                parameter: unknown.to_string(),
            });
        }
    }

    let argvalues = cases
        .iter()
        .enumerate()
        .map(|(index, case)| resolve_case(function, index, case, &table, vocabulary))
        .collect::<Result<Vec<_>>>()?;
    let argnames: Vec<String> = table.names().map(String::from).collect();

    tracing::debug!(
        function,
        argnames = ?argnames,
        cases = argvalues.len(),
        "resolved keyword test cases"
    );
    Ok(Resolution {
        argnames,
        argvalues,
    })
}

fn resolve_case(
    function: &str,
    index: usize,
    case: &CaseDescriptor,
    table: &DefaultsTable,
    vocabulary: &Vocabulary,
) -> Result<ParamSet> {
    let values = table
        .iter()
        .map(|(name, default)| match (case.get(name), default) {
            (Some(value), _) => Ok(value.clone()),
            (None, DefaultValue::Value(value)) => Ok(value.clone()),
            (None, DefaultValue::Required) => Err(KwparamError::MissingParameter {
                function: function.to_string(),
                parameter: name.to_string(),
                case_index: index,
            }),
        })
        .collect::<Result<Vec<_>>>()?;

    let mut param_set = ParamSet::new(values);
    for (key, value) in case.iter().filter(|(k, _)| vocabulary.is_param_keyword(k)) {
        apply_case_keyword(function, index, key, value, &mut param_set)?;
    }
    tracing::trace!(function, index, id = ?param_set.id, "resolved case");
    Ok(param_set)
}

fn apply_case_keyword(
    function: &str,
    index: usize,
    key: &str,
    value: &Value,
    param_set: &mut ParamSet,
) -> Result<()> {
    let invalid = |message: String| KwparamError::InvalidCase {
        function: function.to_string(),
        index,
        message,
    };
    match key {
        "id" => {
            param_set.id = match value {
                Value::Nil => None,
                Value::String(id) => Some(id.clone()),
                other => {
                    return Err(invalid(format!(
                        "'id' must be a String, got {}",
                        other.type_name()
                    )))
                }
            };
        }
        "marks" => {
            param_set.marks = Mark::list_from_value(value).map_err(invalid)?;
        }
        other => {
            return Err(invalid(format!(
                "reserved keyword '{other}' is not supported"
            )))
        }
    }
    Ok(())
}

/// Resolves `cases` for the function behind `metafunc` and registers them with
/// one call to [`Metafunc::parametrize`].
pub fn kwparametrize<M: Metafunc + ?Sized>(
    metafunc: &mut M,
    cases: &[CaseDescriptor],
    defaults: &DefaultsTable,
    options: ParametrizeOptions,
    config: &ResolverConfig,
) -> Result<()> {
    let resolution = resolve(
        metafunc.function_name(),
        metafunc.parameter_names(),
        cases,
        defaults,
        metafunc.vocabulary(),
        config,
    )?;
    metafunc.parametrize(resolution.argnames, resolution.argvalues, options)
}
