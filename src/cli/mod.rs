//! The `kwparametrize` command-line interface.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::casefile::CaseFile;
use crate::cli::args::{Command, KwparamArgs, OutputFormat};
use crate::collection::Collection;
use crate::config::{ResolverConfig, UnknownKeyPolicy};
use crate::diagnostics::{KwparamError, Result};
use crate::vocabulary::Vocabulary;

pub mod args;
pub mod output;

/// Entry point for the binary.
pub fn run() {
    init_tracing();
    let args = KwparamArgs::parse();

    let result = match args.command {
        Command::Resolve {
            files,
            format,
            unknown_keys,
        } => handle_resolve(&files, format, unknown_keys),
        Command::Markers => output::write_markers(&mut output::stdout())
            .map(|()| true)
            .map_err(stdout_error),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            report(e);
            process::exit(1);
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn stdout_error(source: std::io::Error) -> KwparamError {
    KwparamError::Io {
        path: "<stdout>".to_string(),
        source,
    }
}

fn report(error: KwparamError) {
    eprintln!("{:?}", miette::Report::new(error));
}

/// Collects every function in `files`. Returns `Ok(false)` when any
/// function failed to collect; those failures are reported on stderr.
fn handle_resolve(
    files: &[PathBuf],
    format: OutputFormat,
    unknown_keys: Option<UnknownKeyPolicy>,
) -> Result<bool> {
    let mut config = ResolverConfig::from_env();
    if let Some(policy) = unknown_keys {
        config = config.with_unknown_keys(policy);
    }
    let vocabulary = Vocabulary::current();

    let case_files = files
        .iter()
        .map(|path| CaseFile::load(path))
        .collect::<Result<Vec<_>>>()?;

    let mut collection = Collection::new(config);
    let mut failures = Vec::new();
    for spec in case_files.iter().flat_map(|file| &file.functions) {
        let outcome = match spec.to_test_function(vocabulary) {
            Ok(function) => collection.collect(&function),
            Err(err) => {
                collection.record_error(&spec.name, &err);
                Err(err)
            }
        };
        if let Err(err) = outcome {
            failures.push(err);
        }
    }

    let mut stdout = output::stdout();
    let written = match format {
        OutputFormat::Text => output::write_items(&mut stdout, collection.items(), collection.errors()),
        OutputFormat::Json => output::write_json(&mut stdout, collection.items(), collection.errors()),
    };
    written.map_err(stdout_error)?;

    let clean = failures.is_empty();
    for failure in failures {
        report(failure);
    }
    Ok(clean)
}
