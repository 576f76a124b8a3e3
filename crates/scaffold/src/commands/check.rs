//! Check command implementation.
//!
//! `scaffold check` compiles documents and reports their diagnostics
//! without producing output.

use std::process::ExitCode;

use anyhow::Result;
use tracing::info;

use scaffold_core::{Compiler, build};

use super::{CompileArgs, print_diagnostics};

/// Execute the check command
pub fn execute(args: CompileArgs) -> Result<ExitCode> {
    let compiler = Compiler::new(args.load_config()?);
    let output = build(&compiler, &args.request());
    print_diagnostics(&output, args.json);

    info!(
        files = args.files.len(),
        failed = output.failures.len(),
        diagnostics = output.diagnostics.len(),
        "Check complete"
    );

    Ok(if output.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
