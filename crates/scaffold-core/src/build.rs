/*
 * build.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Multi-document builds.
 */

//! Multi-document builds.
//!
//! A [`BuildRequest`] names the documents to compile together with the
//! active flags and options. Each document compiles independently: a fatal
//! error in one is recorded as a [`DocumentFailure`] and the others still
//! compile. The compiled texts are concatenated in request order.
//!
//! The output also carries what a caching layer needs: the byte length of
//! the CSS and the latest modification time among every file consumed,
//! included files counted.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use scaffold_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder, SourceLocation};
use serde::{Deserialize, Serialize};

use crate::pipeline::Compiler;

/// Documents to compile and the switches to compile them with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub files: Vec<PathBuf>,
    #[serde(default)]
    pub flags: Vec<String>,
    /// Opaque keys read by extensions.
    #[serde(default)]
    pub options: Vec<String>,
}

impl BuildRequest {
    pub fn new(files: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_flags(mut self, flags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.flags.extend(flags.into_iter().map(Into::into));
        self
    }

    pub fn with_options(mut self, options: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.options.extend(options.into_iter().map(Into::into));
        self
    }
}

/// A document whose compilation aborted.
#[derive(Debug, Clone)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub diagnostic: DiagnosticMessage,
}

/// The combined result of a build.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub css: String,
    /// Byte length of `css`.
    pub length: usize,
    /// Latest modification time among all consumed files.
    pub last_modified: Option<SystemTime>,
    /// Non-fatal diagnostics of every document, in request order.
    pub diagnostics: Vec<DiagnosticMessage>,
    pub failures: Vec<DocumentFailure>,
}

impl BuildOutput {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Every diagnostic, fatal ones last.
    pub fn all_diagnostics(&self) -> impl Iterator<Item = &DiagnosticMessage> {
        self.diagnostics
            .iter()
            .chain(self.failures.iter().map(|f| &f.diagnostic))
    }
}

fn is_css(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("css"))
}

/// Compile every document of `request`.
pub fn build(compiler: &Compiler, request: &BuildRequest) -> BuildOutput {
    let mut output = BuildOutput::default();

    for path in &request.files {
        if !is_css(path) {
            output.failures.push(DocumentFailure {
                path: path.clone(),
                diagnostic: DiagnosticMessageBuilder::fatal("Unsupported input")
                    .with_code("S-1-3")
                    .problem(format!("`{}` is not a .css file", path.display()))
                    .with_location(SourceLocation::file(path))
                    .build(),
            });
            continue;
        }

        match compiler.compile_file(path, &request.flags, &request.options) {
            Ok(compiled) => {
                tracing::info!(
                    path = %path.display(),
                    bytes = compiled.css.len(),
                    diagnostics = compiled.diagnostics.len(),
                    "Compiled document"
                );
                output.css.push_str(&compiled.css);
                output.last_modified = output.last_modified.max(compiled.last_modified);
                output.diagnostics.extend(compiled.diagnostics);
            }
            Err(err) => {
                let mut diagnostic = err.into_diagnostic();
                if diagnostic.location.is_none() {
                    diagnostic = diagnostic.with_location(SourceLocation::file(path));
                }
                tracing::error!(path = %path.display(), "{}", diagnostic);
                output.failures.push(DocumentFailure {
                    path: path.clone(),
                    diagnostic,
                });
            }
        }
    }

    output.length = output.css.len();
    output
}
