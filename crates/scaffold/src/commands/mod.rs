//! Command implementations for the Scaffold CLI
//!
//! Each command module handles the CLI interface and delegates to
//! scaffold-core for the actual compilation.

pub mod build;
pub mod check;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use scaffold_core::{BuildOutput, BuildRequest, CompilerConfig};

/// Arguments shared by every compiling command.
#[derive(Debug, Args)]
pub struct CompileArgs {
    /// Documents to compile, in output order
    #[arg(required = true, value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// YAML configuration file
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Activate a flag (repeatable)
    #[arg(short = 'f', long = "flag", value_name = "NAME")]
    pub flags: Vec<String>,

    /// Pass an option to extensions (repeatable)
    #[arg(long = "option", value_name = "KEY")]
    pub options: Vec<String>,

    /// Promote diagnostics at or below this level to errors (0-3)
    #[arg(long, value_name = "N")]
    pub error_threshold: Option<u8>,

    /// Print diagnostics as JSON, one object per line
    #[arg(long)]
    pub json: bool,
}

impl CompileArgs {
    /// Load the configuration file, if any, and apply command-line overrides.
    pub fn load_config(&self) -> Result<CompilerConfig> {
        let mut config = match &self.config {
            Some(path) => CompilerConfig::from_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => CompilerConfig::default(),
        };
        if let Some(threshold) = self.error_threshold {
            config.error_threshold = threshold;
        }
        config.validate().context("Invalid command-line options")?;
        Ok(config)
    }

    pub fn request(&self) -> BuildRequest {
        BuildRequest::new(self.files.iter().cloned())
            .with_flags(self.flags.iter().cloned())
            .with_options(self.options.iter().cloned())
    }
}

/// Print every diagnostic of a build to stderr.
pub fn print_diagnostics(output: &BuildOutput, json: bool) {
    for diagnostic in output.all_diagnostics() {
        if json {
            eprintln!("{}", diagnostic.to_json());
        } else {
            eprint!("{}", diagnostic.to_text());
        }
    }
}
