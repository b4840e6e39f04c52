use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Environment variable that overrides [`ResolverConfig::unknown_keys`].
pub const UNKNOWN_KEYS_ENV: &str = "KWPARAMETRIZE_UNKNOWN_KEYS";

/// What to do with a case key the test function does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownKeyPolicy {
    /// Fail parametrization with `UnknownParameter`.
    #[default]
    Reject,
    /// Late-bind the key as a new parameter (legacy behaviour).
    Accept,
}

impl FromStr for UnknownKeyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(UnknownKeyPolicy::Reject),
            "accept" => Ok(UnknownKeyPolicy::Accept),
            other => Err(format!(
                "unknown key policy '{other}', expected 'reject' or 'accept'"
            )),
        }
    }
}

/// Resolver settings. Everything else about a parametrization comes from the
/// marker itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ResolverConfig {
    pub unknown_keys: UnknownKeyPolicy,
}

impl ResolverConfig {
    pub fn with_unknown_keys(mut self, policy: UnknownKeyPolicy) -> Self {
        self.unknown_keys = policy;
        self
    }

    /// Defaults overridden by the environment. Unparsable values are ignored
    /// with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(UNKNOWN_KEYS_ENV) {
            match raw.parse() {
                Ok(policy) => config.unknown_keys = policy,
                Err(e) => tracing::warn!(variable = UNKNOWN_KEYS_ENV, "{e}"),
            }
        }
        config
    }
}
