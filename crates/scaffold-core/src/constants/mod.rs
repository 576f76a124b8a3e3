/*
 * constants/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Constant table and placeholder interpolation.
 */

//! Constant table and placeholder interpolation.
//!
//! Constants are referenced as `$name` or `{$name}` and live in one flat,
//! document-wide namespace. The table is populated in this order, each
//! stage overriding identically-named earlier entries:
//!
//! 1. `constants.global` from configuration
//! 2. the external constants feed
//! 3. inline `@constants { name: value; }` blocks, each value interpolated
//!    against the table built so far
//! 4. grid-derived constants ([`crate::layout`])
//! 5. loop induction variables ([`crate::iteration`])
//!
//! Interpolation is strict: every placeholder in a template must resolve
//! before anything is substituted, including placeholders inside `@if`
//! branches that will later be discarded. Substitution is a single pass;
//! a value containing a placeholder is not expanded again.

pub mod feed;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use scaffold_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder};
use thiserror::Error;

use crate::context::PipelineContext;
use crate::error::Result;
use crate::pipeline::{Module, Phase};
use crate::scanner::{self, Delimiter};

/// `{$name}` (group 1) or `$name` (group 2).
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\$([A-Za-z0-9_-]+)\}|\$([A-Za-z0-9_-]+)").unwrap());

static CONSTANTS_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"@constants\b").unwrap());

/// Flat name → value mapping. Last write wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstantTable {
    values: IndexMap<String, String>,
}

impl ConstantTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a constant, returning the value it replaced.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Remove a constant, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.values.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for ConstantTable {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set(k, v);
        }
    }
}

/// A placeholder with no table entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("constant `${name}` is referenced but has no value")]
pub struct MissingConstant {
    pub name: String,
}

impl MissingConstant {
    pub fn to_diagnostic(&self) -> DiagnosticMessage {
        DiagnosticMessageBuilder::fatal("Missing constant")
            .with_code("S-2-1")
            .problem(format!("`${}` is referenced but has no value", self.name))
            .add_hint(format!(
                "Define `{}` in an @constants block or the global configuration?",
                self.name
            ))
            .build()
    }
}

fn placeholder_name<'t>(caps: &Captures<'t>) -> &'t str {
    caps.get(1)
        .or_else(|| caps.get(2))
        .map_or("", |m| m.as_str())
}

/// Distinct placeholder names referenced by a template, in order of first use.
pub fn references(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(template) {
        let name = placeholder_name(&caps);
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Substitute every placeholder in `template` from `table`.
///
/// Fails with the first unresolved name before substituting anything.
pub fn interpolate(template: &str, table: &ConstantTable) -> std::result::Result<String, MissingConstant> {
    if let Some(name) = references(template)
        .into_iter()
        .find(|name| !table.contains(name))
    {
        return Err(MissingConstant { name });
    }

    Ok(PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            table.get(placeholder_name(caps)).unwrap_or_default().to_string()
        })
        .into_owned())
}

impl PipelineContext {
    /// Interpolate against this document's constant table.
    pub fn interpolate(&self, template: &str) -> Result<String> {
        interpolate(template, &self.constants).map_err(|e| self.fatal(e.to_diagnostic()))
    }
}

/// Seeds the constant table and substitutes placeholders in the document.
#[derive(Debug, Default)]
pub struct ConstantsModule;

impl ConstantsModule {
    pub fn new() -> Self {
        Self
    }

    fn seed(&self, ctx: &mut PipelineContext) -> Result<()> {
        let config = ctx.config.clone();
        ctx.constants.extend(config.constants.global.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        if let Some(feed_path) = &config.constants.feed {
            if feed_path.exists() {
                let feed = feed::load_feed(feed_path).map_err(|e| {
                    ctx.fatal(
                        DiagnosticMessageBuilder::fatal("Invalid constants feed")
                            .with_code("S-1-5")
                            .problem(e.to_string())
                            .add_info(format!("Feed: {}", feed_path.display()))
                            .build(),
                    )
                })?;
                tracing::debug!(count = feed.len(), feed = %feed_path.display(), "Loaded constants feed");
                ctx.constants.extend(feed);
            } else {
                ctx.report(
                    DiagnosticMessageBuilder::warning("Constants feed missing")
                        .with_code("S-1-4")
                        .problem(format!("`{}` does not exist", feed_path.display()))
                        .add_note("Feed constants are disabled for this build")
                        .build(),
                )?;
            }
        }

        let (text, blocks) = scanner::extract_blocks(&ctx.text, &CONSTANTS_BLOCK, Delimiter::Brace)?;
        ctx.text = text;
        for block in &blocks {
            for (name, value) in scanner::parse_properties(&block.body) {
                let value = ctx.interpolate(&value)?;
                ctx.constants.set(name, value);
            }
        }
        Ok(())
    }
}

impl Module for ConstantsModule {
    fn name(&self) -> &str {
        "constants"
    }

    fn phases(&self) -> &'static [Phase] {
        &[Phase::PreProcess, Phase::Process]
    }

    fn run(&self, phase: Phase, ctx: &mut PipelineContext) -> Result<()> {
        match phase {
            Phase::PreProcess => self.seed(ctx),
            Phase::Process => {
                ctx.text = ctx.interpolate(&ctx.text)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerConfig;
    use crate::error::ScaffoldError;
    use scaffold_error_reporting::Severity;
    use std::sync::Arc;

    fn table(pairs: &[(&str, &str)]) -> ConstantTable {
        let mut t = ConstantTable::new();
        t.extend(pairs.iter().copied());
        t
    }

    #[test]
    fn test_references_both_forms_distinct() {
        assert_eq!(
            references("$a {$b} $a x{$c-d}y"),
            vec!["a".to_string(), "b".to_string(), "c-d".to_string()]
        );
    }

    #[test]
    fn test_interpolate_basic() {
        let t = table(&[("color", "red"), ("w", "10")]);
        assert_eq!(
            interpolate("a{color:$color;width:{$w}px}", &t).unwrap(),
            "a{color:red;width:10px}"
        );
    }

    #[test]
    fn test_interpolate_missing_is_error_before_substitution() {
        let t = table(&[("a", "1")]);
        let err = interpolate("$a $missing", &t).unwrap_err();
        assert_eq!(err.name, "missing");
        let diag = err.to_diagnostic();
        assert_eq!(diag.severity, Severity::Fatal);
        assert_eq!(diag.code.as_deref(), Some("S-2-1"));
    }

    #[test]
    fn test_interpolate_is_single_pass() {
        let t = table(&[("a", "$b"), ("b", "deep")]);
        assert_eq!(interpolate("$a", &t).unwrap(), "$b");
    }

    #[test]
    fn test_attribute_selector_dollar_is_not_a_placeholder() {
        let t = ConstantTable::new();
        assert_eq!(
            interpolate(r#"a[href$=".pdf"]{}"#, &t).unwrap(),
            r#"a[href$=".pdf"]{}"#
        );
    }

    #[test]
    fn test_table_last_write_wins() {
        let mut t = ConstantTable::new();
        assert_eq!(t.set("a", "1"), None);
        assert_eq!(t.set("a", "2"), Some("1".to_string()));
        assert_eq!(t.get("a"), Some("2"));
        assert_eq!(t.remove("a"), Some("2".to_string()));
        assert!(t.is_empty());
    }

    fn run_seed(config: CompilerConfig, text: &str) -> Result<PipelineContext> {
        let mut ctx = PipelineContext::new("/tmp/doc.css", text, Arc::new(config));
        ConstantsModule::new().run(Phase::PreProcess, &mut ctx)?;
        Ok(ctx)
    }

    #[test]
    fn test_seed_order_and_inline_interpolation() {
        let mut config = CompilerConfig::default();
        config.constants.global.insert("brand".into(), "blue".into());
        config.constants.global.insert("size".into(), "12px".into());

        let ctx = run_seed(
            config,
            "@constants { brand: red; border: 1px solid $brand; }\n.a{color:$brand;}",
        )
        .unwrap();

        assert_eq!(ctx.constants.get("brand"), Some("red"));
        assert_eq!(ctx.constants.get("border"), Some("1px solid red"));
        assert_eq!(ctx.constants.get("size"), Some("12px"));
        assert_eq!(ctx.text.trim(), ".a{color:$brand;}");
    }

    #[test]
    fn test_seed_feed_overrides_global() {
        let dir = tempfile::tempdir().unwrap();
        let feed = dir.path().join("feed.json");
        std::fs::write(&feed, r#"{"brand": "green"}"#).unwrap();

        let mut config = CompilerConfig::default();
        config.constants.global.insert("brand".into(), "blue".into());
        config.constants.feed = Some(feed);

        let ctx = run_seed(config, "").unwrap();
        assert_eq!(ctx.constants.get("brand"), Some("green"));
    }

    #[test]
    fn test_seed_missing_feed_is_warning() {
        let mut config = CompilerConfig::default();
        config.constants.feed = Some("/no/such/feed.xml".into());

        let ctx = run_seed(config, "").unwrap();
        assert_eq!(ctx.diagnostics().len(), 1);
        assert_eq!(ctx.diagnostics()[0].code.as_deref(), Some("S-1-4"));
        assert_eq!(ctx.diagnostics()[0].severity, Severity::Warning);
    }

    #[test]
    fn test_seed_missing_feed_promoted_by_threshold() {
        let config = CompilerConfig {
            error_threshold: 1,
            constants: crate::config::ConstantsConfig {
                feed: Some("/no/such/feed.xml".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = run_seed(config, "").unwrap_err();
        assert!(matches!(err, ScaffoldError::Fatal(_)));
    }

    #[test]
    fn test_inline_value_referencing_unknown_constant_is_fatal() {
        let err = run_seed(CompilerConfig::default(), "@constants { a: $nope; }").unwrap_err();
        let ScaffoldError::Fatal(msg) = err else {
            panic!("expected fatal");
        };
        assert_eq!(msg.code.as_deref(), Some("S-2-1"));
    }

    #[test]
    fn test_process_substitutes_document() {
        let mut ctx = run_seed(
            CompilerConfig::default(),
            "@constants { pad: 4px; }\n.a{padding:$pad;}",
        )
        .unwrap();
        ConstantsModule::new().run(Phase::Process, &mut ctx).unwrap();
        assert_eq!(ctx.text.trim(), ".a{padding:4px;}");
    }
}
