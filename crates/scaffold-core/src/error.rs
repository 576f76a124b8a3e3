//! Error types for scaffold-core

use std::path::PathBuf;

use scaffold_error_reporting::DiagnosticMessage;
use thiserror::Error;

use crate::config::ConfigError;
use crate::scanner::ScanError;

#[derive(Error, Debug)]
pub enum ScaffoldError {
    /// Compilation of the current document aborted.
    ///
    /// Carries the diagnostic that caused the abort, either fatal in its own
    /// right or promoted by the configured error threshold.
    #[error("{0}")]
    Fatal(DiagnosticMessage),

    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Scan(#[from] ScanError),
}

impl ScaffoldError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Convert this error into the diagnostic reported to the caller.
    ///
    /// Non-diagnostic errors are wrapped with an appropriate catalog code so
    /// that every document failure can be rendered uniformly.
    pub fn into_diagnostic(self) -> DiagnosticMessage {
        use scaffold_error_reporting::DiagnosticMessageBuilder;

        match self {
            ScaffoldError::Fatal(msg) => msg,
            ScaffoldError::Io { path, source } => DiagnosticMessageBuilder::fatal("Cannot read file")
                .with_code("S-0-1")
                .problem(format!("{}: {}", path.display(), source))
                .build(),
            ScaffoldError::Config(err) => DiagnosticMessageBuilder::fatal("Invalid configuration")
                .with_code("S-0-1")
                .problem(err.to_string())
                .build(),
            ScaffoldError::Scan(err) => DiagnosticMessageBuilder::fatal("Unbalanced delimiter")
                .with_code("S-2-2")
                .problem(err.to_string())
                .add_hint("Is a `}` or `)` missing?")
                .build(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScaffoldError>;
