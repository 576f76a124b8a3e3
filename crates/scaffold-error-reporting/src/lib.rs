//! Error reporting and diagnostic messages for the Scaffold CSS compiler.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Every problem the compiler notices is recorded as a [`DiagnosticMessage`]
//! carrying a numeric [`Severity`]:
//!
//! | Level | Severity  | Meaning                                  |
//! |-------|-----------|------------------------------------------|
//! | 0     | `Fatal`   | compilation of the document aborts       |
//! | 1     | `Warning` | something is wrong, output still usable  |
//! | 2     | `Info`    | informational                            |
//! | 3     | `Debug`   | debugging aid                            |
//!
//! A deployment can tighten strictness with an error threshold: any
//! diagnostic whose level is at or below the threshold is promoted to a
//! fatal abort (see [`Severity::is_fatal_at`]).
//!
//! # Example
//!
//! ```
//! use scaffold_error_reporting::{DiagnosticMessageBuilder, Severity};
//!
//! let msg = DiagnosticMessageBuilder::fatal("Missing constant")
//!     .with_code("S-2-1")
//!     .problem("`$brand` is referenced but never defined")
//!     .add_hint("Define it inside an @constants block?")
//!     .build();
//!
//! assert_eq!(msg.severity, Severity::Fatal);
//! assert!(msg.to_text().contains("[S-2-1]"));
//! ```

pub mod builder;
pub mod catalog;
pub mod diagnostic;

pub use builder::DiagnosticMessageBuilder;
pub use catalog::{ERROR_CATALOG, ErrorCodeInfo, get_error_info, get_subsystem};
pub use diagnostic::{
    DetailItem, DetailKind, DiagnosticMessage, InvalidSeverity, Severity, SourceLocation,
};
