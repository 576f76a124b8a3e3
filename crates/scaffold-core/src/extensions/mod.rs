/*
 * extensions/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Pluggable CSS functions and properties.
 */

//! Pluggable CSS functions and properties.
//!
//! Extensions run during post-processing, after nested rules have been
//! flattened. Two kinds exist:
//!
//! - [`FunctionExtension`]: a CSS function call `name(arg, ...)` is replaced
//!   by the text the extension returns.
//! - [`PropertyExtension`]: a declaration `name: value;` is replaced by the
//!   declarations the extension returns.
//!
//! Properties run before functions, each kind in registration order. An
//! extension that returns `None` rejects its input, which aborts the
//! document with an "invalid extension syntax" diagnostic.
//!
//! # Example
//!
//! ```ignore
//! struct Double;
//!
//! impl FunctionExtension for Double {
//!     fn name(&self) -> &str { "double" }
//!
//!     fn call(&self, args: &[&str], _ctx: &PipelineContext) -> Option<String> {
//!         let n: f64 = args.first()?.parse().ok()?;
//!         Some(format!("{}", n * 2.0))
//!     }
//! }
//!
//! let mut registry = ExtensionRegistry::with_builtins();
//! registry.register_function(Box::new(Double));
//! ```

mod baseline;
mod color;

pub use baseline::{Baseline, BaselineRound};
pub use color::{Cmyk, Cmyka, Hsla};

use scaffold_error_reporting::DiagnosticMessageBuilder;

use crate::context::PipelineContext;
use crate::error::Result;
use crate::pipeline::{Module, Phase};
use crate::scanner::{self, Delimiter, ScanError};

/// A CSS function implemented by the compiler.
pub trait FunctionExtension: Send + Sync {
    /// Function name as written in CSS. Matched case-insensitively.
    fn name(&self) -> &str;

    /// Produce the replacement for one call, or `None` if the arguments are
    /// invalid.
    fn call(&self, args: &[&str], ctx: &PipelineContext) -> Option<String>;
}

/// A CSS property implemented by the compiler.
pub trait PropertyExtension: Send + Sync {
    fn name(&self) -> &str;

    /// Produce replacement declarations for one value, or `None` if the
    /// value is invalid.
    fn expand(&self, value: &str, ctx: &PipelineContext) -> Option<String>;
}

/// Ordered collection of extensions.
pub struct ExtensionRegistry {
    functions: Vec<Box<dyn FunctionExtension>>,
    properties: Vec<Box<dyn PropertyExtension>>,
}

impl ExtensionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            functions: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// A registry with the built-in color and baseline functions.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_function(Box::new(Hsla));
        registry.register_function(Box::new(Cmyk));
        registry.register_function(Box::new(Cmyka));
        registry.register_function(Box::new(Baseline));
        registry.register_function(Box::new(BaselineRound));
        registry
    }

    pub fn register_function(&mut self, extension: Box<dyn FunctionExtension>) {
        self.functions.push(extension);
    }

    pub fn register_property(&mut self, extension: Box<dyn PropertyExtension>) {
        self.properties.push(extension);
    }

    pub fn function_names(&self) -> Vec<&str> {
        self.functions.iter().map(|f| f.name()).collect()
    }

    pub fn property_names(&self) -> Vec<&str> {
        self.properties.iter().map(|p| p.name()).collect()
    }

    /// Apply every extension to `text`.
    pub fn apply(&self, text: &str, ctx: &PipelineContext) -> Result<String> {
        let mut text = text.to_string();

        for property in &self.properties {
            let found = find_declarations(&text, property.name());
            text = splice(&text, &found, |decl| {
                let expanded = property
                    .expand(&decl.args, ctx)
                    .ok_or_else(|| invalid_syntax(ctx, property.name(), &decl.source))?;
                let expanded = expanded.trim().to_string();
                Ok(if expanded.is_empty() || expanded.ends_with(';') {
                    expanded
                } else {
                    format!("{expanded};")
                })
            })?;
        }

        for function in &self.functions {
            let found = find_calls(&text, function.name())?;
            text = splice(&text, &found, |call| {
                let args: Vec<&str> = scanner::split_top_level(&call.args, ',')
                    .into_iter()
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .collect();
                tracing::trace!(function = function.name(), args = ?args, "Calling extension");
                function
                    .call(&args, ctx)
                    .ok_or_else(|| invalid_syntax(ctx, function.name(), &call.source))
            })?;
        }

        Ok(text)
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("functions", &self.function_names())
            .field("properties", &self.property_names())
            .finish()
    }
}

fn invalid_syntax(ctx: &PipelineContext, name: &str, source: &str) -> crate::error::ScaffoldError {
    ctx.fatal(
        DiagnosticMessageBuilder::fatal("Invalid extension syntax")
            .with_code("S-8-1")
            .problem(format!("`{name}` rejected `{source}`"))
            .build(),
    )
}

/// One occurrence of an extension in the text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Occurrence {
    start: usize,
    end: usize,
    /// Argument list for functions, value for properties.
    args: String,
    source: String,
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

fn name_at(bytes: &[u8], i: usize, name: &[u8]) -> bool {
    (i == 0 || !is_ident_byte(bytes[i - 1]))
        && bytes.len() - i >= name.len()
        && bytes[i..i + name.len()].eq_ignore_ascii_case(name)
        && bytes.get(i + name.len()).is_none_or(|b| !is_ident_byte(*b))
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Find `name(...)` calls outside strings and comments.
fn find_calls(text: &str, name: &str) -> std::result::Result<Vec<Occurrence>, ScanError> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if let Some(next) = scanner::skip_literal(bytes, i) {
            i = next;
            continue;
        }
        if name_at(bytes, i, name.as_bytes()) {
            let open = skip_whitespace(bytes, i + name.len());
            if bytes.get(open) == Some(&b'(') {
                let close = scanner::find_close(text, open, Delimiter::Paren)?;
                found.push(Occurrence {
                    start: i,
                    end: close + 1,
                    args: text[open + 1..close].to_string(),
                    source: text[i..=close].to_string(),
                });
                i = close + 1;
                continue;
            }
        }
        i += 1;
    }
    Ok(found)
}

/// Find `name: value;` declarations. The value ends at a top-level `;` or
/// `}`; the `;` is part of the occurrence.
fn find_declarations(text: &str, name: &str) -> Vec<Occurrence> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if let Some(next) = scanner::skip_literal(bytes, i) {
            i = next;
            continue;
        }
        if name_at(bytes, i, name.as_bytes()) && starts_declaration(text, i) {
            let colon = skip_whitespace(bytes, i + name.len());
            if bytes.get(colon) == Some(&b':') {
                let value_end = value_end(bytes, colon + 1);
                let end = if bytes.get(value_end) == Some(&b';') {
                    value_end + 1
                } else {
                    value_end
                };
                found.push(Occurrence {
                    start: i,
                    end,
                    args: text[colon + 1..value_end].trim().to_string(),
                    source: text[i..end].to_string(),
                });
                i = end;
                continue;
            }
        }
        i += 1;
    }
    found
}

fn starts_declaration(text: &str, i: usize) -> bool {
    text[..i]
        .trim_end()
        .chars()
        .next_back()
        .is_none_or(|c| matches!(c, '{' | ';' | '}'))
}

fn value_end(bytes: &[u8], mut i: usize) -> usize {
    let mut depth = 0usize;
    while i < bytes.len() {
        if let Some(next) = scanner::skip_literal(bytes, i) {
            i = next;
            continue;
        }
        match bytes[i] {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b';' | b'}' if depth == 0 => return i,
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

fn splice<F>(text: &str, found: &[Occurrence], mut f: F) -> Result<String>
where
    F: FnMut(&Occurrence) -> Result<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for occurrence in found {
        out.push_str(&text[last..occurrence.start]);
        out.push_str(&f(occurrence)?);
        last = occurrence.end;
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Runs the extension registry during post-processing.
#[derive(Debug, Default)]
pub struct ExtensionsModule {
    registry: ExtensionRegistry,
}

impl ExtensionsModule {
    pub fn new(registry: ExtensionRegistry) -> Self {
        Self { registry }
    }
}

impl Module for ExtensionsModule {
    fn name(&self) -> &str {
        "extensions"
    }

    fn phases(&self) -> &'static [Phase] {
        &[Phase::PostProcess]
    }

    fn run(&self, _phase: Phase, ctx: &mut PipelineContext) -> Result<()> {
        ctx.text = self.registry.apply(&ctx.text, ctx)?;
        Ok(())
    }
}

/// Parse the leading integer of an argument the way loosely typed numeric
/// coercion does: `"50%"` is 50, `"abc"` is `None`.
pub(crate) fn leading_integer(arg: &str) -> Option<i64> {
    let arg = arg.trim();
    let digits_start = usize::from(arg.starts_with('-') || arg.starts_with('+'));
    let digits = arg[digits_start..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }
    arg[..digits_start + digits].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerConfig;
    use crate::error::ScaffoldError;
    use std::sync::Arc;

    fn context() -> PipelineContext {
        PipelineContext::new("/tmp/doc.css", "", Arc::new(CompilerConfig::default()))
    }

    struct Shout;

    impl FunctionExtension for Shout {
        fn name(&self) -> &str {
            "shout"
        }

        fn call(&self, args: &[&str], _ctx: &PipelineContext) -> Option<String> {
            if args.is_empty() {
                return None;
            }
            Some(args.join("-").to_uppercase())
        }
    }

    struct BorderRadius;

    impl PropertyExtension for BorderRadius {
        fn name(&self) -> &str {
            "border-radius"
        }

        fn expand(&self, value: &str, ctx: &PipelineContext) -> Option<String> {
            if ctx.option("no-prefix") {
                return Some(format!("border-radius:{value}"));
            }
            Some(format!("-moz-border-radius:{value};border-radius:{value}"))
        }
    }

    #[test]
    fn test_custom_function() {
        let mut registry = ExtensionRegistry::new();
        registry.register_function(Box::new(Shout));
        let ctx = context();
        let out = registry
            .apply(".a{content:SHOUT( a , b );x:noshout(c);}", &ctx)
            .unwrap();
        assert_eq!(out, ".a{content:A-B;x:noshout(c);}");
    }

    #[test]
    fn test_function_inside_string_untouched() {
        let mut registry = ExtensionRegistry::new();
        registry.register_function(Box::new(Shout));
        let out = registry.apply(".a{content:'shout(x)';}", &context()).unwrap();
        assert_eq!(out, ".a{content:'shout(x)';}");
    }

    #[test]
    fn test_rejected_call_is_fatal() {
        let mut registry = ExtensionRegistry::new();
        registry.register_function(Box::new(Shout));
        let err = registry.apply(".a{x:shout();}", &context()).unwrap_err();
        let ScaffoldError::Fatal(msg) = err else {
            panic!("expected fatal");
        };
        assert_eq!(msg.code.as_deref(), Some("S-8-1"));
        assert!(msg.problem.unwrap().contains("shout()"));
    }

    #[test]
    fn test_property_extension() {
        let mut registry = ExtensionRegistry::new();
        registry.register_property(Box::new(BorderRadius));
        let out = registry
            .apply(".a{color:red;border-radius: 4px;}.b{border-radius:2px}", &context())
            .unwrap();
        assert_eq!(
            out,
            ".a{color:red;-moz-border-radius:4px;border-radius:4px;}.b{-moz-border-radius:2px;border-radius:2px;}"
        );
    }

    #[test]
    fn test_property_reads_options() {
        let mut registry = ExtensionRegistry::new();
        registry.register_property(Box::new(BorderRadius));
        let mut ctx = context();
        ctx.set_option("no-prefix");
        let out = registry.apply(".a{border-radius:4px;}", &ctx).unwrap();
        assert_eq!(out, ".a{border-radius:4px;}");
    }

    #[test]
    fn test_property_name_must_start_declaration() {
        let mut registry = ExtensionRegistry::new();
        registry.register_property(Box::new(BorderRadius));
        let out = registry
            .apply(".a{-webkit-border-radius:1px;transition:border-radius 1s;}", &context())
            .unwrap();
        assert_eq!(out, ".a{-webkit-border-radius:1px;transition:border-radius 1s;}");
    }

    #[test]
    fn test_builtin_names() {
        let registry = ExtensionRegistry::with_builtins();
        assert_eq!(
            registry.function_names(),
            vec!["hsla", "cmyk", "cmyka", "baseline", "baseline_round"]
        );
        assert!(registry.property_names().is_empty());
    }

    #[test]
    fn test_module_runs_builtins() {
        let mut ctx = context();
        ctx.text = ".a{color:cmyk(0,100,100,0);}".to_string();
        ExtensionsModule::default().run(Phase::PostProcess, &mut ctx).unwrap();
        assert_eq!(ctx.text, ".a{color:rgb(255,0,0);}");
    }

    #[test]
    fn test_leading_integer() {
        assert_eq!(leading_integer("50%"), Some(50));
        assert_eq!(leading_integer(" -10deg"), Some(-10));
        assert_eq!(leading_integer("0.75"), Some(0));
        assert_eq!(leading_integer("red"), None);
    }
}
