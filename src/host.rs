//! The calling convention of the host test-execution framework.
//!
//! The host owns discovery, fixtures and running test bodies. This crate only
//! needs a handle on the function being collected ([`Metafunc`]), the host's
//! single-case primitive ([`ParamSet`]) and the control options its registration
//! call understands ([`ParametrizeOptions`]).

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::diagnostics::Result;
use crate::value::Value;
use crate::vocabulary::Vocabulary;

/// A marker attached to a single case, such as `xfail` or `skip`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mark {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Mark {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: None,
        }
    }

    pub fn xfail() -> Self {
        Self::new("xfail")
    }

    pub fn skip() -> Self {
        Self::new("skip")
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn is_xfail(&self) -> bool {
        self.name == "xfail"
    }

    pub fn is_skip(&self) -> bool {
        self.name == "skip"
    }

    /// Reads a mark from a string name or a `{name, reason}` map.
    pub fn from_value(value: &Value) -> std::result::Result<Mark, String> {
        match value {
            Value::String(name) => Ok(Mark::new(name.as_str())),
            Value::Map(map) => {
                let name = map
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| "mark map needs a string 'name'".to_string())?;
                let mut mark = Mark::new(name);
                match map.get("reason") {
                    None | Some(Value::Nil) => {}
                    Some(Value::String(reason)) => mark.reason = Some(reason.clone()),
                    Some(other) => {
                        return Err(format!(
                            "mark reason must be a String, got {}",
                            other.type_name()
                        ))
                    }
                }
                Ok(mark)
            }
            other => Err(format!(
                "a mark must be a String or Map, got {}",
                other.type_name()
            )),
        }
    }

    /// Reads one mark or a list of marks.
    pub fn list_from_value(value: &Value) -> std::result::Result<Vec<Mark>, String> {
        match value {
            Value::List(items) => items.iter().map(Mark::from_value).collect(),
            single => Mark::from_value(single).map(|mark| vec![mark]),
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{}({:?})", self.name, reason),
            None => write!(f, "{}", self.name),
        }
    }
}

/// One case entry for the registration call: positional values plus metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ParamSet {
    pub values: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

impl ParamSet {
    /// Keyword arguments of the single-case primitive besides the values.
    pub const KEYWORDS: &'static [&'static str] = &["id", "marks"];

    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values,
            id: None,
            marks: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_marks(mut self, marks: impl IntoIterator<Item = Mark>) -> Self {
        self.marks.extend(marks);
        self
    }
}

/// Produces part of a test id for one value; `None` falls back to the automatic id.
pub type IdFn = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// The `ids` control option.
#[derive(Clone)]
pub enum Ids {
    /// One entry per case; `None` keeps the automatic id.
    Explicit(Vec<Option<String>>),
    /// Called for every value of every case.
    Callable(IdFn),
}

impl fmt::Debug for Ids {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ids::Explicit(ids) => f.debug_tuple("Explicit").field(ids).finish(),
            Ids::Callable(_) => f.write_str("Callable(..)"),
        }
    }
}

/// The `indirect` control option: which arguments are routed to fixtures.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Indirect {
    #[default]
    Off,
    All,
    Names(Vec<String>),
}

impl Indirect {
    pub fn applies_to(&self, argname: &str) -> bool {
        match self {
            Indirect::Off => false,
            Indirect::All => true,
            Indirect::Names(names) => names.iter().any(|n| n == argname),
        }
    }
}

impl From<Vec<String>> for Indirect {
    fn from(names: Vec<String>) -> Self {
        Indirect::Names(names)
    }
}

impl From<Vec<&str>> for Indirect {
    fn from(names: Vec<&str>) -> Self {
        Indirect::Names(names.into_iter().map(String::from).collect())
    }
}

impl From<bool> for Indirect {
    fn from(all: bool) -> Self {
        if all {
            Indirect::All
        } else {
            Indirect::Off
        }
    }
}

/// The `scope` control option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Function,
    Class,
    Module,
    Package,
    Session,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Function => "function",
            Scope::Class => "class",
            Scope::Module => "module",
            Scope::Package => "package",
            Scope::Session => "session",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "function" => Ok(Scope::Function),
            "class" => Ok(Scope::Class),
            "module" => Ok(Scope::Module),
            "package" => Ok(Scope::Package),
            "session" => Ok(Scope::Session),
            other => Err(format!(
                "unknown scope '{other}', expected one of function, class, module, package, session"
            )),
        }
    }
}

/// Control options forwarded unchanged to the registration call.
#[derive(Debug, Clone, Default)]
pub struct ParametrizeOptions {
    pub ids: Option<Ids>,
    pub indirect: Indirect,
    pub scope: Option<Scope>,
    /// Forwarded with the call; [`crate::collection`] does not add it to item marks.
    pub param_mark: Option<Mark>,
}

impl ParametrizeOptions {
    /// Keyword arguments of the registration call besides names and values.
    pub const KEYWORDS: &'static [&'static str] = &["ids", "indirect", "scope", "_param_mark"];
}

/// The test function currently being collected, as seen by a parametrization.
pub trait Metafunc {
    /// Name used in error messages.
    fn function_name(&self) -> &str;

    /// Parameter names the test function declares.
    fn parameter_names(&self) -> &[String];

    /// Keyword names reserved by this host's parametrization API.
    fn vocabulary(&self) -> &'static Vocabulary {
        Vocabulary::current()
    }

    /// Registers one parametrization of the function.
    fn parametrize(
        &mut self,
        argnames: Vec<String>,
        argvalues: Vec<ParamSet>,
        options: ParametrizeOptions,
    ) -> Result<()>;
}
