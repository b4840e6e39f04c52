//! Host integration hook.
//!
//! Hosts call [`generate_tests`] once per collected test function with the
//! `kwparametrize` markers attached to it.

use crate::config::ResolverConfig;
use crate::diagnostics::Result;
use crate::host::Metafunc;
use crate::marker::Kwparametrize;

pub const MARKER_NAME: &str = "kwparametrize";

/// Marker documentation in the host's `--markers` listing format.
pub const MARKER_HELP: &str = "kwparametrize(*cases, **defaults): call a test function \
multiple times, passing in different arguments in turn. Each case is a mapping from \
argument names to values; 'id' and 'marks' entries set the case id and marks. Keyword \
arguments other than ids, indirect and scope give default values for arguments a case \
omits, either inline or as one 'defaults' mapping.";

/// Applies every marker to the function behind `metafunc`, in order.
///
/// Each marker registers its own parametrization, so several markers combine
/// the way stacked parametrizations do in the host.
pub fn generate_tests<M: Metafunc + ?Sized>(
    metafunc: &mut M,
    markers: &[Kwparametrize],
    config: &ResolverConfig,
) -> Result<()> {
    for marker in markers {
        tracing::debug!(
            function = metafunc.function_name(),
            cases = marker.cases().len(),
            "applying {MARKER_NAME} marker"
        );
        marker.apply(metafunc, config)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case;
    use crate::host::{ParamSet, ParametrizeOptions};
    use crate::kwparametrize;

    #[derive(Default)]
    struct Recorder {
        params: Vec<String>,
        calls: Vec<(Vec<String>, Vec<ParamSet>)>,
    }

    impl Metafunc for Recorder {
        fn function_name(&self) -> &str {
            "test_recorded"
        }

        fn parameter_names(&self) -> &[String] {
            &self.params
        }

        fn parametrize(
            &mut self,
            argnames: Vec<String>,
            argvalues: Vec<ParamSet>,
            _options: ParametrizeOptions,
        ) -> Result<()> {
            self.calls.push((argnames, argvalues));
            Ok(())
        }
    }

    #[test]
    fn each_marker_registers_once() {
        let mut recorder = Recorder {
            params: vec!["a".into(), "b".into()],
            ..Recorder::default()
        };
        let markers = [
            kwparametrize![case! { a: 1 }, case! { a: 2 }],
            kwparametrize![case! { b: "x" }],
        ];
        generate_tests(&mut recorder, &markers, &ResolverConfig::default()).unwrap();
        assert_eq!(recorder.calls.len(), 2);
        assert_eq!(recorder.calls[0].0, ["a"]);
        assert_eq!(recorder.calls[0].1.len(), 2);
        assert_eq!(recorder.calls[1].0, ["b"]);
    }

    #[test]
    fn failing_marker_stops_registration() {
        let mut recorder = Recorder {
            params: vec!["a".into()],
            ..Recorder::default()
        };
        let markers = [
            kwparametrize![case! { a: 1 }, case! {}].required("a"),
            kwparametrize![case! { a: 3 }],
        ];
        let err = generate_tests(&mut recorder, &markers, &ResolverConfig::default()).unwrap_err();
        assert!(err.to_string().contains("'a' parameter was omitted"));
        assert!(recorder.calls.is_empty());
    }
}
