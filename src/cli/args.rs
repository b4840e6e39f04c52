//! Command-line arguments and subcommands for the `kwparametrize` binary.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::UnknownKeyPolicy;

#[derive(Debug, Parser)]
#[command(
    name = "kwparametrize",
    version,
    about = "Resolve keyword-style test parametrizations into collected test items."
)]
pub struct KwparamArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Collect the test functions declared in case files and list the items.
    Resolve {
        /// Case files to load (`.json` is read as JSON, anything else as YAML).
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Overrides the unknown case key policy (`reject` or `accept`).
        #[arg(long)]
        unknown_keys: Option<UnknownKeyPolicy>,
    },
    /// Show the marker documentation.
    Markers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
