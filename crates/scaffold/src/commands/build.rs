/*
 * build.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Build command implementation
 */

//! Build command implementation.
//!
//! This module implements `scaffold build`, which compiles one or more
//! documents and writes the concatenated CSS to stdout or a file.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::info;

use scaffold_core::{Compiler, build};

use super::{CompileArgs, print_diagnostics};

/// Arguments for the build command
#[derive(Debug)]
pub struct BuildArgs {
    pub compile: CompileArgs,
    /// Output file; stdout when absent
    pub output: Option<PathBuf>,
    /// Compress the output regardless of configuration
    pub minify: bool,
}

/// Execute the build command
pub fn execute(args: BuildArgs) -> Result<ExitCode> {
    let mut config = args.compile.load_config()?;
    if args.minify {
        config.formatter.compress = true;
    }

    let compiler = Compiler::new(config);
    let output = build(&compiler, &args.compile.request());
    print_diagnostics(&output, args.compile.json);

    match &args.output {
        Some(path) => {
            std::fs::write(path, &output.css)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), bytes = output.length, "Wrote stylesheet");
        }
        None => print!("{}", output.css),
    }

    if output.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        info!(failed = output.failures.len(), "Build finished with errors");
        Ok(ExitCode::FAILURE)
    }
}
