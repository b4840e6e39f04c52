//! Keyword-style test parametrization.
//!
//! Each test case is a map from parameter names to values. Parameters a case
//! leaves out fall back to marker-level defaults, and cases can carry their own
//! id and marks. See [`Kwparametrize`] and the [`kwparametrize!`] macro.

pub use crate::case::CaseDescriptor;
pub use crate::diagnostics::{ErrorType, KwparamError, Result};
pub use crate::host::{Ids, Indirect, Mark, Metafunc, ParamSet, ParametrizeOptions, Scope};
pub use crate::marker::{Kwparametrize, MarkerCall};
pub use crate::resolver::{kwparametrize, DefaultValue, DefaultsTable};
pub use crate::value::Value;

pub mod case;
pub mod casefile;
pub mod cli;
pub mod collection;
pub mod config;
pub mod diagnostics;
pub mod host;
pub mod marker;
pub mod plugin;
pub mod resolver;
pub mod value;
pub mod vocabulary;
