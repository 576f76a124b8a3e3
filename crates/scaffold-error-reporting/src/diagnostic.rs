//! Core diagnostic message types.
//!
//! This module defines the structures used to represent compiler diagnostics
//! (fatal errors, warnings, info and debug messages).

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Severity of a diagnostic, ordered from most to least severe.
///
/// The numeric level (0..=3) is part of the public contract: configuration
/// files express the error threshold with the same numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Halts compilation of the current document
    Fatal = 0,
    /// A problem that doesn't prevent completion
    Warning = 1,
    /// Informational message
    Info = 2,
    /// Debugging aid
    Debug = 3,
}

/// Returned when a numeric level is outside `0..=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid severity level {0} (expected 0 = fatal, 1 = warning, 2 = info, 3 = debug)")]
pub struct InvalidSeverity(pub u8);

impl Severity {
    /// The numeric level of this severity.
    pub fn level(self) -> u8 {
        self as u8
    }

    /// Convert a numeric level back into a severity.
    pub fn from_level(level: u8) -> Result<Self, InvalidSeverity> {
        match level {
            0 => Ok(Severity::Fatal),
            1 => Ok(Severity::Warning),
            2 => Ok(Severity::Info),
            3 => Ok(Severity::Debug),
            other => Err(InvalidSeverity(other)),
        }
    }

    /// Whether a diagnostic of this severity aborts compilation under the
    /// given threshold.
    ///
    /// Fatal diagnostics always abort; anything else aborts when its level
    /// is at or below the threshold.
    pub fn is_fatal_at(self, threshold: u8) -> bool {
        self == Severity::Fatal || self.level() <= threshold
    }

    /// Human-readable label used in text output.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Fatal => "Error",
            Severity::Warning => "Warning",
            Severity::Info => "Info",
            Severity::Debug => "Debug",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How detail items should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailKind {
    /// Error detail (✖ bullet)
    Error,
    /// Info detail (i bullet)
    Info,
    /// Note detail (plain bullet)
    Note,
}

impl DetailKind {
    fn bullet(self) -> &'static str {
        match self {
            DetailKind::Error => "✖",
            DetailKind::Info => "ℹ",
            DetailKind::Note => "•",
        }
    }
}

/// A detail bullet attached to a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailItem {
    pub kind: DetailKind,
    pub content: String,
}

/// Where a diagnostic originated.
///
/// Most compiler phases work on text that has already been rewritten, so
/// only the file is always known; a line number is attached when the
/// diagnostic refers to the original source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl SourceLocation {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            line: None,
        }
    }

    pub fn at_line(path: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            path: path.into(),
            line: Some(line),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.path.display(), line),
            None => write!(f, "{}", self.path.display()),
        }
    }
}

/// A diagnostic message.
///
/// Structure:
/// 1. **Code**: Optional catalog code (e.g., "S-2-1") for searchability
/// 2. **Title**: Brief message
/// 3. **Severity**: Fatal, Warning, Info or Debug
/// 4. **Problem**: What went wrong
/// 5. **Details**: Specific information (bulleted)
/// 6. **Hints**: Optional guidance for fixing (ends with ?)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    pub title: String,

    pub severity: Severity,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<DetailItem>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl DiagnosticMessage {
    /// Create a new diagnostic message with just a title and severity.
    ///
    /// Note: Consider using [`DiagnosticMessageBuilder`](crate::DiagnosticMessageBuilder)
    /// instead for better structure.
    pub fn new(severity: Severity, title: impl Into<String>) -> Self {
        Self {
            code: None,
            title: title.into(),
            severity,
            problem: None,
            details: Vec::new(),
            hints: Vec::new(),
            location: None,
        }
    }

    pub fn fatal(title: impl Into<String>) -> Self {
        Self::new(Severity::Fatal, title)
    }

    pub fn warning(title: impl Into<String>) -> Self {
        Self::new(Severity::Warning, title)
    }

    pub fn info(title: impl Into<String>) -> Self {
        Self::new(Severity::Info, title)
    }

    /// Set the catalog code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attach the file (and optionally line) the diagnostic refers to.
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Return the same diagnostic with its severity raised to fatal.
    ///
    /// Used when an error threshold promotes a recoverable diagnostic into
    /// an abort; the original severity is kept as a detail.
    pub fn promoted(mut self) -> Self {
        if self.severity != Severity::Fatal {
            self.details.push(DetailItem {
                kind: DetailKind::Note,
                content: format!(
                    "Reported as {} (level {}), promoted by the error threshold",
                    self.severity.label().to_lowercase(),
                    self.severity.level()
                ),
            });
            self.severity = Severity::Fatal;
        }
        self
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }

    /// Render this diagnostic as plain text.
    ///
    /// Format:
    /// ```text
    /// Error [S-2-1]: title
    /// Problem statement here
    /// ✖ Error detail
    /// ℹ Info detail
    /// • Note detail
    /// ? Hint
    ///   at path/to/file.css:12
    /// ```
    pub fn to_text(&self) -> String {
        use std::fmt::Write;

        let mut result = String::new();

        match &self.code {
            Some(code) => {
                let _ = writeln!(result, "{} [{}]: {}", self.severity.label(), code, self.title);
            }
            None => {
                let _ = writeln!(result, "{}: {}", self.severity.label(), self.title);
            }
        }

        if let Some(problem) = &self.problem {
            let _ = writeln!(result, "{}", problem);
        }

        for detail in &self.details {
            let _ = writeln!(result, "{} {}", detail.kind.bullet(), detail.content);
        }

        for hint in &self.hints {
            let _ = writeln!(result, "? {}", hint);
        }

        if let Some(location) = &self.location {
            let _ = writeln!(result, "  at {}", location);
        }

        result
    }

    /// Render this diagnostic as a JSON value.
    ///
    /// ```json
    /// {
    ///   "severity": "fatal",
    ///   "level": 0,
    ///   "title": "Missing constant",
    ///   "code": "S-2-1",
    ///   "problem": "...",
    ///   "details": [{"kind": "error", "content": "..."}],
    ///   "hints": ["..."]
    /// }
    /// ```
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;

        let mut obj = json!({
            "severity": self.severity,
            "level": self.severity.level(),
            "title": self.title,
        });

        if let Some(code) = &self.code {
            obj["code"] = json!(code);
        }
        if let Some(problem) = &self.problem {
            obj["problem"] = json!(problem);
        }
        if !self.details.is_empty() {
            obj["details"] = json!(self.details);
        }
        if !self.hints.is_empty() {
            obj["hints"] = json!(self.hints);
        }
        if let Some(location) = &self.location {
            obj["location"] = json!(location);
        }

        obj
    }
}

impl fmt::Display for DiagnosticMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{}] {}", code, self.title)?,
            None => write!(f, "{}", self.title)?,
        }
        if let Some(problem) = &self.problem {
            write!(f, ": {}", problem)?;
        }
        Ok(())
    }
}
