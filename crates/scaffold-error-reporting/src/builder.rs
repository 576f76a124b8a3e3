//! Builder API for diagnostic messages.

use crate::diagnostic::{DetailItem, DetailKind, DiagnosticMessage, Severity, SourceLocation};

/// Builder for [`DiagnosticMessage`].
///
/// # Example
///
/// ```
/// use scaffold_error_reporting::DiagnosticMessageBuilder;
///
/// let msg = DiagnosticMessageBuilder::fatal("Cannot find @include file")
///     .with_code("S-1-1")
///     .problem("`reset.css` was not found")
///     .add_info("Searched next to the including file and in 2 include paths")
///     .build();
///
/// assert_eq!(msg.code.as_deref(), Some("S-1-1"));
/// ```
#[derive(Debug, Clone)]
pub struct DiagnosticMessageBuilder {
    message: DiagnosticMessage,
}

impl DiagnosticMessageBuilder {
    pub fn new(severity: Severity, title: impl Into<String>) -> Self {
        Self {
            message: DiagnosticMessage::new(severity, title),
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

    pub fn debug(title: impl Into<String>) -> Self {
        Self::new(Severity::Debug, title)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.message.code = Some(code.into());
        self
    }

    /// The problem statement (what went wrong).
    pub fn problem(mut self, problem: impl Into<String>) -> Self {
        self.message.problem = Some(problem.into());
        self
    }

    /// Add an error detail (✖ bullet).
    pub fn add_detail(self, content: impl Into<String>) -> Self {
        self.push_detail(DetailKind::Error, content)
    }

    /// Add an info detail (ℹ bullet).
    pub fn add_info(self, content: impl Into<String>) -> Self {
        self.push_detail(DetailKind::Info, content)
    }

    /// Add a note detail (• bullet).
    pub fn add_note(self, content: impl Into<String>) -> Self {
        self.push_detail(DetailKind::Note, content)
    }

    /// Add a hint. Hints are phrased as questions.
    pub fn add_hint(mut self, hint: impl Into<String>) -> Self {
        self.message.hints.push(hint.into());
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.message.location = Some(location);
        self
    }

    pub fn build(self) -> DiagnosticMessage {
        self.message
    }

    fn push_detail(mut self, kind: DetailKind, content: impl Into<String>) -> Self {
        self.message.details.push(DetailItem {
            kind,
            content: content.into(),
        });
        self
    }
}
