//! Reserved keyword vocabulary of the host's parametrization API.
//!
//! Keyword names accepted by the host's registration call (`ids`, `scope`, ...)
//! and by its single-case primitive (`id`, `marks`) cannot be used as test
//! parameter names. The tables are pinned per host API version and built once.

use std::collections::BTreeSet;
use std::fmt;

use lazy_static::lazy_static;

use crate::diagnostics::{KwparamError, Result};

/// Host API versions with a known keyword table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HostApiVersion {
    /// The pytest 6.x `Metafunc.parametrize` / `pytest.param` signatures.
    #[default]
    Pytest6,
}

impl fmt::Display for HostApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostApiVersion::Pytest6 => write!(f, "pytest 6"),
        }
    }
}

const PYTEST6_PARAMETRIZE_KEYWORDS: &[&str] = &["indirect", "ids", "scope", "_param_mark"];
const PYTEST6_PARAM_KEYWORDS: &[&str] = &["marks", "id"];

/// Reserved keyword names for one host API version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    version: HostApiVersion,
    parametrize: BTreeSet<&'static str>,
    param: BTreeSet<&'static str>,
}

lazy_static! {
    static ref PYTEST6: Vocabulary = Vocabulary {
        version: HostApiVersion::Pytest6,
        parametrize: PYTEST6_PARAMETRIZE_KEYWORDS.iter().copied().collect(),
        param: PYTEST6_PARAM_KEYWORDS.iter().copied().collect(),
    };
}

impl Vocabulary {
    pub fn for_version(version: HostApiVersion) -> &'static Vocabulary {
        match version {
            HostApiVersion::Pytest6 => &PYTEST6,
        }
    }

    /// Table for the default host API version.
    pub fn current() -> &'static Vocabulary {
        Self::for_version(HostApiVersion::default())
    }

    pub fn version(&self) -> HostApiVersion {
        self.version
    }

    /// Is `name` a control option of the registration call?
    pub fn is_parametrize_keyword(&self, name: &str) -> bool {
        self.parametrize.contains(name)
    }

    /// Is `name` a reserved per-case metadata key?
    pub fn is_param_keyword(&self, name: &str) -> bool {
        self.param.contains(name)
    }

    pub fn parametrize_keywords(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.parametrize.iter().copied()
    }

    pub fn param_keywords(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.param.iter().copied()
    }

    /// Compares the table with the keywords a host actually accepts.
    pub fn verify(&self, parametrize: &[&str], param: &[&str]) -> Result<()> {
        let mut problems = Vec::new();
        Self::diff("parametrize", &self.parametrize, parametrize, &mut problems);
        Self::diff("param", &self.param, param, &mut problems);
        if problems.is_empty() {
            return Ok(());
        }
        Err(KwparamError::VocabularyMismatch {
            version: self.version.to_string(),
            message: problems.join("; "),
        })
    }

    fn diff(
        call: &str,
        expected: &BTreeSet<&'static str>,
        actual: &[&str],
        problems: &mut Vec<String>,
    ) {
        let actual: BTreeSet<&str> = actual.iter().copied().collect();
        for missing in expected.iter().filter(|k| !actual.contains(*k)) {
            problems.push(format!("{call}() no longer accepts '{missing}'"));
        }
        for extra in actual.iter().filter(|k| !expected.contains(*k)) {
            problems.push(format!("{call}() accepts unlisted keyword '{extra}'"));
        }
    }
}
