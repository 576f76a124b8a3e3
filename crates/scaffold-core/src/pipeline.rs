/*
 * pipeline.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Phase pipeline infrastructure.
 */

//! Phase pipeline infrastructure.
//!
//! This module provides the core abstractions for compiling a document:
//!
//! - [`Phase`] - The fixed, ordered stages of compilation
//! - [`Module`] - The trait implemented by every language feature
//! - [`ModuleRegistry`] - Ordered collection of modules
//! - [`Compiler`] - Runs the registry over one document
//!
//! # Architecture
//!
//! Every document passes through the phases in order:
//!
//! 1. **import** - file inclusion
//! 2. **pre-process** - constant seeding, grid and loop parsing, mixin extraction
//! 3. **process** - constant substitution, mixin expansion, conditionals, flags
//! 4. **post-process** - nesting flattening, extensions
//! 5. **formatting** - URL rewriting, pretty-printing or minification
//!
//! Within a phase, every module that declares the phase runs, in
//! registration order. Flags resolve after mixin expansion, and flattening
//! happens after both, so output produced by a mixin is still subject to
//! flags and nesting.
//!
//! # Example
//!
//! ```ignore
//! use scaffold_core::pipeline::{Compiler, Module, ModuleRegistry, Phase};
//!
//! struct Banner;
//!
//! impl Module for Banner {
//!     fn name(&self) -> &str { "banner" }
//!     fn phases(&self) -> &'static [Phase] { &[Phase::Formatting] }
//!     fn run(&self, _phase: Phase, ctx: &mut PipelineContext) -> Result<()> {
//!         ctx.text.insert_str(0, "/* generated */\n");
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = ModuleRegistry::standard();
//! registry.push(Box::new(Banner));
//! let compiler = Compiler::new(config).with_registry(registry);
//! let compiled = compiler.compile_file(Path::new("site.css"), &[], &[])?;
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use scaffold_error_reporting::DiagnosticMessage;

use crate::conditional::ConditionalsModule;
use crate::config::CompilerConfig;
use crate::constants::ConstantsModule;
use crate::context::PipelineContext;
use crate::error::Result;
use crate::extensions::ExtensionsModule;
use crate::flags::FlagsModule;
use crate::format::FormatterModule;
use crate::import::{ImportModule, file_key};
use crate::iteration::IterationModule;
use crate::layout::LayoutModule;
use crate::mixins::MixinsModule;
use crate::nesting::NestingModule;
use crate::source::SourceDocument;
use crate::urls::UrlsModule;

/// A compilation stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    Import,
    PreProcess,
    Process,
    PostProcess,
    Formatting,
}

impl Phase {
    /// Every phase, in execution order.
    pub const ALL: [Phase; 5] = [
        Phase::Import,
        Phase::PreProcess,
        Phase::Process,
        Phase::PostProcess,
        Phase::Formatting,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Import => "import",
            Phase::PreProcess => "pre-process",
            Phase::Process => "process",
            Phase::PostProcess => "post-process",
            Phase::Formatting => "formatting",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for language features.
///
/// A module declares the phases it takes part in and is called once per
/// declared phase with the document's context.
///
/// # Thread Safety
///
/// Modules must be `Send + Sync` so one registry can serve documents
/// compiled on different threads.
pub trait Module: Send + Sync {
    /// Human-readable name for this module.
    ///
    /// Used for logging and debugging.
    fn name(&self) -> &str;

    /// The phases this module runs in.
    fn phases(&self) -> &'static [Phase];

    /// Run the module for one phase.
    ///
    /// # Errors
    ///
    /// Returns an error to abort compilation of the current document.
    fn run(&self, phase: Phase, ctx: &mut PipelineContext) -> Result<()>;
}

/// An ordered collection of modules.
///
/// Modules run in insertion order within each phase.
pub struct ModuleRegistry {
    modules: Vec<Box<dyn Module>>,
}

impl ModuleRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// The built-in modules in their standard order.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.extend([
            Box::new(ImportModule) as Box<dyn Module>,
            Box::new(ConstantsModule::new()),
            Box::new(LayoutModule),
            Box::new(IterationModule),
            Box::new(MixinsModule),
            Box::new(ConditionalsModule),
            Box::new(FlagsModule),
            Box::new(NestingModule),
            Box::new(ExtensionsModule::default()),
            Box::new(UrlsModule),
            Box::new(FormatterModule),
        ]);
        registry
    }

    /// Add a module to the registry.
    ///
    /// Modules run in the order they are added.
    pub fn push(&mut self, module: Box<dyn Module>) {
        self.modules.push(module);
    }

    /// Add multiple modules to the registry.
    pub fn extend(&mut self, modules: impl IntoIterator<Item = Box<dyn Module>>) {
        self.modules.extend(modules);
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// List the names of all modules in registration order.
    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    /// Run every module that takes part in `phase`.
    pub fn run_phase(&self, phase: Phase, ctx: &mut PipelineContext) -> Result<()> {
        for module in self.modules.iter().filter(|m| m.phases().contains(&phase)) {
            tracing::debug!(module = module.name(), phase = %phase, "Running module");
            module.run(phase, ctx)?;
        }
        Ok(())
    }

    /// Run all phases in order.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered. Execution stops on error.
    pub fn execute(&self, ctx: &mut PipelineContext) -> Result<()> {
        for phase in Phase::ALL {
            self.run_phase(phase, ctx)?;
        }
        Ok(())
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.module_names())
            .finish()
    }
}

/// A successfully compiled document.
#[derive(Debug, Clone)]
pub struct CompiledDocument {
    pub css: String,
    /// Latest modification time among the document and everything it
    /// included.
    pub last_modified: Option<SystemTime>,
    /// Non-fatal diagnostics recorded while compiling.
    pub diagnostics: Vec<DiagnosticMessage>,
}

/// Compiles documents with a shared configuration and module registry.
#[derive(Debug)]
pub struct Compiler {
    config: Arc<CompilerConfig>,
    registry: ModuleRegistry,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            config: Arc::new(config),
            registry: ModuleRegistry::standard(),
        }
    }

    pub fn with_registry(mut self, registry: ModuleRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Load and compile one document.
    ///
    /// On a fatal error the document's non-fatal diagnostics are lost; the
    /// error carries the diagnostic that aborted it.
    pub fn compile_file(&self, path: &Path, flags: &[String], options: &[String]) -> Result<CompiledDocument> {
        let doc = SourceDocument::load(path)?;
        self.compile(doc, flags, options)
    }

    /// Compile an already loaded document.
    pub fn compile(&self, doc: SourceDocument, flags: &[String], options: &[String]) -> Result<CompiledDocument> {
        let mut ctx = PipelineContext::new(&doc.path, doc.text, Arc::clone(&self.config));
        ctx.record_file(file_key(&doc.path), doc.modified);
        for flag in flags {
            ctx.activate_flag(flag.as_str());
        }
        for option in options {
            ctx.set_option(option.as_str());
        }

        self.registry.execute(&mut ctx)?;

        Ok(CompiledDocument {
            last_modified: ctx.last_modified(),
            diagnostics: ctx.take_diagnostics(),
            css: ctx.text,
        })
    }
}
