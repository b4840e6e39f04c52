//! Error types for case resolution and the reference host.
//!
//! Every failure is a [`KwparamError`]. Errors raised while resolving cases are
//! configuration errors: they abort parametrization of one test function and are
//! reported to the user as a plain message, without an internal trace. The
//! `err_msg!` macro builds message-only variants.

use miette::Diagnostic;
use thiserror::Error;

/// Type-safe error classification corresponding to [`KwparamError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Malformed parametrization: missing or unknown parameters, bad metadata
    Configuration,
    /// Unreadable or malformed case files
    Input,
    /// Rejections raised by the host while registering cases
    Host,
    /// Broken invariants inside this crate
    Internal,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Configuration => "configuration",
            ErrorType::Input => "input",
            ErrorType::Host => "host",
            ErrorType::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum KwparamError {
    #[error(
        "In {function}: The '{parameter}' parameter was omitted in a @kwparametrize test case but marked as required"
    )]
    MissingParameter {
        function: String,
        parameter: String,
        case_index: usize,
    },
    #[error("In {function}: function uses no argument '{parameter}'")]
    UnknownParameter { function: String, parameter: String },
    #[error("In {function}: test case #{index} is invalid: {message}")]
    InvalidCase {
        function: String,
        index: usize,
        message: String,
    },
    #[error("In {function}: invalid '{option}' option: {message}")]
    InvalidOption {
        function: String,
        option: String,
        message: String,
    },
    #[error("Reserved keyword vocabulary for {version} does not match the host: {message}")]
    VocabularyMismatch { version: String, message: String },
    #[error("In {function}: {message}")]
    Host { function: String, message: String },
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse case file '{path}': {message}")]
    CaseFile { path: String, message: String },
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl KwparamError {
    pub fn error_type(&self) -> ErrorType {
        match self {
            KwparamError::MissingParameter { .. }
            | KwparamError::UnknownParameter { .. }
            | KwparamError::InvalidCase { .. }
            | KwparamError::InvalidOption { .. } => ErrorType::Configuration,
            KwparamError::Io { .. } | KwparamError::CaseFile { .. } => ErrorType::Input,
            KwparamError::Host { .. } => ErrorType::Host,
            KwparamError::VocabularyMismatch { .. } | KwparamError::Internal { .. } => {
                ErrorType::Internal
            }
        }
    }

    /// Whether a host should attach an internal trace when reporting this error.
    ///
    /// Configuration errors point at the test author's input, so only the message
    /// is shown.
    pub fn shows_trace(&self) -> bool {
        matches!(self.error_type(), ErrorType::Internal)
    }

    /// Name of the test function the error is scoped to, if any.
    pub fn function(&self) -> Option<&str> {
        match self {
            KwparamError::MissingParameter { function, .. }
            | KwparamError::UnknownParameter { function, .. }
            | KwparamError::InvalidCase { function, .. }
            | KwparamError::InvalidOption { function, .. }
            | KwparamError::Host { function, .. } => Some(function),
            _ => None,
        }
    }

    fn code_suffix(&self) -> &'static str {
        match self {
            KwparamError::MissingParameter { .. } => "missing_parameter",
            KwparamError::UnknownParameter { .. } => "unknown_parameter",
            KwparamError::InvalidCase { .. } => "invalid_case",
            KwparamError::InvalidOption { .. } => "invalid_option",
            KwparamError::VocabularyMismatch { .. } => "vocabulary_mismatch",
            KwparamError::Host { .. } => "host",
            KwparamError::Io { .. } => "io",
            KwparamError::CaseFile { .. } => "case_file",
            KwparamError::Internal { .. } => "internal",
        }
    }
}

impl Diagnostic for KwparamError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        Some(Box::new(format!("kwparametrize::{}", self.code_suffix())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let help = match self {
            KwparamError::MissingParameter {
                parameter,
                case_index,
                ..
            } => format!(
                "add '{parameter}' to test case #{case_index}, or give it a default value"
            ),
            KwparamError::UnknownParameter { parameter, .. } => format!(
                "check '{parameter}' for typos, or add it to the test function's parameters"
            ),
            KwparamError::VocabularyMismatch { .. } => {
                "update the reserved keyword table for this host version".to_string()
            }
            KwparamError::Internal { .. } => {
                "This is an internal error. Please report this as a bug.".to_string()
            }
            _ => return None,
        };
        Some(Box::new(help))
    }
}

/// Result type alias for kwparametrize operations.
pub type Result<T> = std::result::Result<T, KwparamError>;

/// Constructs a message-only [`KwparamError`] variant.
///
/// `err_msg!(Internal, "fmt", args..)` builds an internal error;
/// `err_msg!(Host, function, "fmt", args..)` builds an error scoped to a function.
#[macro_export]
macro_rules! err_msg {
    (Internal, $($arg:tt)+) => {
        $crate::KwparamError::Internal {
            message: format!($($arg)+),
        }
    };
    ($variant:ident, $function:expr, $($arg:tt)+) => {
        $crate::KwparamError::$variant {
            function: $function.to_string(),
            message: format!($($arg)+),
        }
    };
}
