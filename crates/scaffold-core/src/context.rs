/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Per-document compilation state.
 */

//! Per-document compilation state.
//!
//! A [`PipelineContext`] is created for each document and threaded through
//! every phase by the [`Compiler`](crate::pipeline::Compiler). It is never
//! shared between documents.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use indexmap::{IndexMap, IndexSet};
use scaffold_error_reporting::{DiagnosticMessage, Severity, SourceLocation};

use crate::config::CompilerConfig;
use crate::constants::ConstantTable;
use crate::error::{Result, ScaffoldError};
use crate::layout::GridSettings;
use crate::mixins::MixinTable;

/// Mutable state carried through the phases of one document's compilation.
#[derive(Debug)]
pub struct PipelineContext {
    /// The document being compiled.
    pub path: PathBuf,

    /// Current working text. Each phase rewrites it in place.
    pub text: String,

    pub config: Arc<CompilerConfig>,

    pub constants: ConstantTable,

    pub mixins: MixinTable,

    /// Grid settings from the document's `@grid` block, if any.
    pub grid: Option<GridSettings>,

    flags: IndexSet<String>,

    options: IndexSet<String>,

    /// Every file consumed so far, with its modification time.
    files: IndexMap<PathBuf, Option<SystemTime>>,

    diagnostics: Vec<DiagnosticMessage>,
}

impl PipelineContext {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>, config: Arc<CompilerConfig>) -> Self {
        let flags = if config.disable_flags {
            IndexSet::new()
        } else {
            config.flags.iter().cloned().collect()
        };
        Self {
            path: path.into(),
            text: text.into(),
            config,
            constants: ConstantTable::new(),
            mixins: MixinTable::new(),
            grid: None,
            flags,
            options: IndexSet::new(),
            files: IndexMap::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Directory of the document, used to resolve relative references.
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Activate a flag. Ignored when flags are disabled by configuration.
    pub fn activate_flag(&mut self, flag: impl Into<String>) {
        if !self.config.disable_flags {
            self.flags.insert(flag.into());
        }
    }

    pub fn is_flag_active(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    pub fn active_flags(&self) -> impl Iterator<Item = &str> {
        self.flags.iter().map(String::as_str)
    }

    pub fn set_option(&mut self, option: impl Into<String>) {
        self.options.insert(option.into());
    }

    /// Whether an opaque build option was requested.
    pub fn option(&self, key: &str) -> bool {
        self.options.contains(key)
    }

    /// Record a consumed file. Returns `false` if it was already recorded.
    pub fn record_file(&mut self, path: impl Into<PathBuf>, modified: Option<SystemTime>) -> bool {
        let path = path.into();
        if self.files.contains_key(&path) {
            return false;
        }
        self.files.insert(path, modified);
        true
    }

    pub fn has_file(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    /// Latest modification time among all consumed files.
    pub fn last_modified(&self) -> Option<SystemTime> {
        self.files.values().flatten().max().copied()
    }

    /// Record a diagnostic.
    ///
    /// Returns an abort error when the diagnostic is fatal, or when its level
    /// is at or below the configured error threshold.
    pub fn report(&mut self, diagnostic: DiagnosticMessage) -> Result<()> {
        let diagnostic = if diagnostic.location.is_none() {
            diagnostic.with_location(SourceLocation::file(&self.path))
        } else {
            diagnostic
        };

        if diagnostic.severity.is_fatal_at(self.config.error_threshold) {
            return Err(ScaffoldError::Fatal(diagnostic.promoted()));
        }

        match diagnostic.severity {
            Severity::Warning => tracing::warn!(path = %self.path.display(), "{}", diagnostic),
            Severity::Info => tracing::info!(path = %self.path.display(), "{}", diagnostic),
            _ => tracing::debug!(path = %self.path.display(), "{}", diagnostic),
        }
        self.diagnostics.push(diagnostic);
        Ok(())
    }

    /// Build the abort error for a fatal diagnostic.
    pub fn fatal(&self, diagnostic: DiagnosticMessage) -> ScaffoldError {
        let diagnostic = if diagnostic.location.is_none() {
            diagnostic.with_location(SourceLocation::file(&self.path))
        } else {
            diagnostic
        };
        ScaffoldError::Fatal(diagnostic.promoted())
    }

    pub fn diagnostics(&self) -> &[DiagnosticMessage] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<DiagnosticMessage> {
        std::mem::take(&mut self.diagnostics)
    }
}
