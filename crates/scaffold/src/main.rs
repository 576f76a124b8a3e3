//! Scaffold CLI - Main entry point

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::CompileArgs;

#[derive(Parser)]
#[command(name = "scaffold")]
#[command(version)]
#[command(about = "Scaffold CSS compiler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile documents into a single stylesheet
    Build {
        #[command(flatten)]
        compile: CompileArgs,

        /// Write output to FILE instead of stdout
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Compress the output
        #[arg(long)]
        minify: bool,
    },

    /// Compile documents and report diagnostics without writing output
    Check {
        #[command(flatten)]
        compile: CompileArgs,
    },
}

fn main() -> Result<ExitCode> {
    // Initialize logging; stdout carries the compiled CSS
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scaffold=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            compile,
            output,
            minify,
        } => commands::build::execute(commands::build::BuildArgs {
            compile,
            output,
            minify,
        }),
        Commands::Check { compile } => commands::check::execute(compile),
    }
}
