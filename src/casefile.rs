//! Case files: test functions and their markers written as YAML or JSON.
//!
//! ```yaml
//! functions:
//!   - name: test_eval
//!     parameters: [test_input, expected]
//!     markers:
//!       - args:
//!           - {test_input: "3+5", expected: 8}
//!           - {test_input: "6*9", expected: 42, marks: [xfail]}
//!         kwargs: {ids: [add, multiply]}
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::collection::TestFunction;
use crate::diagnostics::{KwparamError, Result};
use crate::marker::MarkerCall;
use crate::vocabulary::Vocabulary;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseFile {
    #[serde(default)]
    pub functions: Vec<FunctionSpec>,
}

/// One test function: its declared parameters and `kwparametrize` markers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionSpec {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub markers: Vec<MarkerCall>,
}

impl FunctionSpec {
    pub fn to_test_function(&self, vocabulary: &Vocabulary) -> Result<TestFunction> {
        let mut function = TestFunction::new(self.name.as_str(), self.parameters.iter().cloned());
        for call in &self.markers {
            function = function.mark(call.clone().into_marker(&self.name, vocabulary)?);
        }
        Ok(function)
    }
}

impl CaseFile {
    pub fn from_yaml_str(source: &str, path: &str) -> Result<Self> {
        serde_yaml::from_str(source).map_err(|e| KwparamError::CaseFile {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    pub fn from_json_str(source: &str, path: &str) -> Result<Self> {
        serde_json::from_str(source).map_err(|e| KwparamError::CaseFile {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    /// Loads a case file; `.json` files are read as JSON, anything else as YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let path_str = path.display().to_string();
        let source = std::fs::read_to_string(path).map_err(|source| KwparamError::Io {
            path: path_str.clone(),
            source,
        })?;
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        tracing::debug!(path = %path_str, json = is_json, "loading case file");
        if is_json {
            Self::from_json_str(&source, &path_str)
        } else {
            Self::from_yaml_str(&source, &path_str)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    const EVAL: &str = r#"
functions:
  - name: test_eval
    parameters: [test_input, expected]
    markers:
      - args:
          - {test_input: "3+5", expected: 8}
          - {test_input: "6*9", expected: 42, marks: [xfail]}
        kwargs: {ids: [add, multiply]}
        required: [expected]
"#;

    #[test]
    fn parses_yaml_functions_and_markers() {
        let file = CaseFile::from_yaml_str(EVAL, "eval.yaml").unwrap();
        let spec = &file.functions[0];
        assert_eq!(spec.name, "test_eval");
        assert_eq!(spec.markers[0].args.len(), 2);
        assert_eq!(spec.markers[0].required, ["expected"]);
        assert_eq!(
            spec.markers[0].kwargs["ids"],
            Value::List(vec![Value::from("add"), Value::from("multiply")])
        );
    }

    #[test]
    fn builds_test_functions() {
        let file = CaseFile::from_yaml_str(EVAL, "eval.yaml").unwrap();
        let function = file.functions[0]
            .to_test_function(Vocabulary::current())
            .unwrap();
        assert_eq!(function.markers.len(), 1);
        assert!(function.markers[0]
            .defaults_table()
            .get("expected")
            .unwrap()
            .is_required());
    }

    #[test]
    fn json_is_accepted() {
        let file = CaseFile::from_json_str(
            r#"{"functions": [{"name": "test_j", "markers": [{"args": [[{"a": 1}]]}]}]}"#,
            "j.json",
        )
        .unwrap();
        assert!(file.functions[0].markers[0].has_one_sequence());
    }

    #[test]
    fn required_names_join_a_nested_defaults_map() {
        let file = CaseFile::from_yaml_str(
            r#"
functions:
  - name: test_nested
    parameters: [a, b]
    markers:
      - args: [{a: 1}]
        kwargs: {defaults: {b: 2}}
        required: [a]
"#,
            "nested.yaml",
        )
        .unwrap();
        let function = file.functions[0]
            .to_test_function(Vocabulary::current())
            .unwrap();
        let table = function.markers[0].defaults_table();
        assert_eq!(table.names().collect::<Vec<_>>(), ["b", "a"]);
        assert!(table.get("a").unwrap().is_required());
    }

    #[test]
    fn load_picks_the_format_from_the_extension() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
        let json = CaseFile::load(&dir.join("indirect.json")).unwrap();
        assert_eq!(json.functions[0].name, "test_indirect");
        let yaml = CaseFile::load(&dir.join("eval.yaml")).unwrap();
        assert_eq!(yaml.functions.len(), 2);
    }

    #[test]
    fn load_reports_unreadable_files() {
        let err = CaseFile::load(Path::new("no/such/cases.yaml")).unwrap_err();
        assert!(matches!(err, KwparamError::Io { ref path, .. } if path == "no/such/cases.yaml"));
    }

    #[test]
    fn unknown_fields_are_reported_with_path() {
        let err = CaseFile::from_yaml_str("functions: []\nextra: 1\n", "bad.yaml").unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse case file 'bad.yaml'"));
    }
}
