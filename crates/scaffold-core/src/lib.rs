//! Core compiler for Scaffold CSS
//!
//! Scaffold is a CSS superset: constants, mixins, conditionals, flags,
//! loops, file inclusion, a grid layout helper and nested selectors, all
//! compiled down to plain CSS.
//!
//! # Architecture
//!
//! Compilation is organized around these key types:
//!
//! - [`Compiler`] - Loads a document and runs every phase over it
//! - [`ModuleRegistry`] - Ordered set of [`Module`]s, one per language feature
//! - [`PipelineContext`] - Per-document mutable state passed through the phases
//! - [`CompilerConfig`] - Settings shared by every document of a build
//! - [`build()`] - Compiles several documents into one stylesheet
//!
//! # Example
//!
//! ```ignore
//! use scaffold_core::{BuildRequest, Compiler, CompilerConfig, build};
//!
//! let config = CompilerConfig::from_file(Path::new("scaffold.yml"))?;
//! let compiler = Compiler::new(config);
//!
//! let request = BuildRequest::new(["css/site.css"]).with_flags(["print"]);
//! let output = build(&compiler, &request);
//!
//! for diagnostic in output.all_diagnostics() {
//!     eprintln!("{}", diagnostic.to_text());
//! }
//! ```

pub mod build;
pub mod conditional;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod extensions;
pub mod flags;
pub mod format;
pub mod import;
pub mod iteration;
pub mod layout;
pub mod mixins;
pub mod nesting;
pub mod pipeline;
pub mod scanner;
pub mod source;
pub mod urls;

// Re-export commonly used types
pub use build::{BuildOutput, BuildRequest, DocumentFailure, build};
pub use config::{CompilerConfig, ConfigError, FormatterConfig};
pub use constants::ConstantTable;
pub use context::PipelineContext;
pub use error::{Result, ScaffoldError};
pub use extensions::{ExtensionRegistry, FunctionExtension, PropertyExtension};
pub use mixins::MixinTable;
pub use pipeline::{CompiledDocument, Compiler, Module, ModuleRegistry, Phase};
pub use source::SourceDocument;
