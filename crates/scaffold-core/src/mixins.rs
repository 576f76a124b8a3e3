/*
 * mixins.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Mixin definition and expansion.
 */

//! Mixin definition and expansion.
//!
//! ```css
//! =button($color, $size=12px) {
//!   background: $color;
//!   font-size: $size;
//! }
//!
//! .save { +button(green); }
//! ```
//!
//! Definitions are extracted from the document during pre-processing.
//! Invocations are expanded during processing, in document order and
//! depth-first: a mixin's own invocations are fully resolved before the
//! next invocation in the enclosing text. The chain of mixins currently
//! being expanded is kept on a stack so that cycles are detected and
//! dropped instead of recursing forever.

use std::path::Path;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use scaffold_error_reporting::DiagnosticMessageBuilder;
use walkdir::WalkDir;

use crate::conditional;
use crate::context::PipelineContext;
use crate::error::{Result, ScaffoldError};
use crate::pipeline::{Module, Phase};
use crate::scanner::{self, Delimiter, ScanError};
use crate::source;

/// `=name` or `=name(params)`.
static DEFINITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"=([A-Za-z0-9_-]+)\s*(?:\(((?:[^()]|\([^()]*\))*)\))?").unwrap());

/// `+name`.
static INVOCATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\+([A-Za-z0-9_-]+)").unwrap());

/// Definition and invocation markers must start the text or follow
/// whitespace, `;`, `{` or `}`.
fn at_boundary(text: &str, start: usize) -> bool {
    start == 0
        || matches!(
            text.as_bytes()[start - 1],
            b' ' | b'\t' | b'\n' | b'\r' | b';' | b'{' | b'}'
        )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixinParam {
    pub name: String,
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixinDefinition {
    pub name: String,
    pub params: Vec<MixinParam>,
    /// Raw body, placeholders unresolved.
    pub template: String,
}

impl MixinDefinition {
    /// Parse a `$a, $b=default` parameter list.
    pub fn parse_params(list: &str) -> Vec<MixinParam> {
        scanner::split_top_level(list, ',')
            .into_iter()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| {
                let (name, default) = match p.split_once('=') {
                    Some((name, default)) => (name, Some(scanner::unquote(default).to_string())),
                    None => (p, None),
                };
                MixinParam {
                    name: name.trim().trim_start_matches('$').to_string(),
                    default,
                }
            })
            .collect()
    }
}

/// Registered mixins by name. Redefinition replaces the earlier body.
#[derive(Debug, Clone, Default)]
pub struct MixinTable {
    definitions: IndexMap<String, MixinDefinition>,
}

impl MixinTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, definition: MixinDefinition) {
        self.definitions.insert(definition.name.clone(), definition);
    }

    pub fn get(&self, name: &str) -> Option<&MixinDefinition> {
        self.definitions.get(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }
}

/// A `+name(args);` or `+name;` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixinInvocation {
    pub name: String,
    pub args: Vec<String>,
    /// Byte offset of the `+`.
    pub start: usize,
    /// Byte offset one past the token (including its `;`).
    pub end: usize,
}

/// Find every invocation token in `text`, in document order.
///
/// A `+name` not followed by an argument list or `;` (such as the sibling
/// combinator in `h1 +p {}`) is not an invocation, and neither is one inside
/// a string or comment.
pub fn find_invocations(text: &str) -> std::result::Result<Vec<MixinInvocation>, ScanError> {
    let bytes = text.as_bytes();
    let literals = scanner::literal_spans(text);
    let skip_ws = |i: usize| i + (text[i..].len() - text[i..].trim_start().len());

    let mut invocations = Vec::new();
    let mut pos = 0;
    while let Some(caps) = INVOCATION.captures_at(text, pos) {
        let (Some(token), Some(name)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let start = token.start();
        pos = token.end();
        if scanner::in_spans(&literals, start) || !at_boundary(text, start) {
            continue;
        }

        let next = skip_ws(name.end());
        let (args, end) = match bytes.get(next) {
            Some(b'(') => {
                let close = scanner::find_close(text, next, Delimiter::Paren)?;
                let raw = &text[next + 1..close];
                let args = if raw.trim().is_empty() {
                    Vec::new()
                } else {
                    scanner::split_top_level(raw, ',')
                        .into_iter()
                        .map(|a| scanner::unquote(a).to_string())
                        .collect()
                };
                let after = skip_ws(close + 1);
                let end = if bytes.get(after) == Some(&b';') {
                    after + 1
                } else {
                    close + 1
                };
                (args, end)
            }
            Some(b';') => (Vec::new(), next + 1),
            _ => continue,
        };
        invocations.push(MixinInvocation {
            name: name.as_str().to_string(),
            args,
            start,
            end,
        });
        pos = end;
    }
    Ok(invocations)
}

/// Expand every invocation in `text`.
///
/// `stack` holds the names of the mixins whose expansion is in progress.
pub fn expand_all(text: &str, ctx: &mut PipelineContext, stack: &mut Vec<String>) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for invocation in find_invocations(text)? {
        out.push_str(&text[last..invocation.start]);
        out.push_str(&expand_invocation(&invocation, ctx, stack)?);
        last = invocation.end;
    }
    out.push_str(&text[last..]);
    Ok(out)
}

fn expand_invocation(
    invocation: &MixinInvocation,
    ctx: &mut PipelineContext,
    stack: &mut Vec<String>,
) -> Result<String> {
    let name = invocation.name.as_str();

    let Some(definition) = ctx.mixins.get(name).cloned() else {
        ctx.report(
            DiagnosticMessageBuilder::info("Unknown mixin")
                .with_code("S-3-2")
                .problem(format!("`+{name}` was invoked but never defined"))
                .add_note("The invocation was removed")
                .build(),
        )?;
        return Ok(String::new());
    };

    if stack.iter().any(|n| n == name) {
        let chain = stack
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(name))
            .collect::<Vec<_>>()
            .join(" -> ");
        ctx.report(
            DiagnosticMessageBuilder::warning("Recursive mixin")
                .with_code("S-3-3")
                .problem(format!("`+{name}` invokes itself"))
                .add_detail(chain)
                .add_note("The recursive invocation was removed")
                .build(),
        )?;
        return Ok(String::new());
    }

    if stack.len() >= ctx.config.max_mixin_depth {
        return Err(ctx.fatal(
            DiagnosticMessageBuilder::fatal("Mixin expansion too deep")
                .with_code("S-3-4")
                .problem(format!(
                    "Expanding `+{name}` exceeded the maximum depth of {}",
                    ctx.config.max_mixin_depth
                ))
                .add_hint("Raise `max_mixin_depth` in the configuration?")
                .build(),
        ));
    }

    let mut bindings = Vec::with_capacity(definition.params.len());
    for (i, param) in definition.params.iter().enumerate() {
        let value = match (invocation.args.get(i), &param.default) {
            (Some(arg), _) => arg.clone(),
            (None, Some(default)) => ctx.interpolate(default)?,
            (None, None) => {
                return Err(ctx.fatal(
                    DiagnosticMessageBuilder::fatal("Missing mixin parameter")
                        .with_code("S-3-1")
                        .problem(format!(
                            "`+{name}` requires `${}` but no argument or default was given",
                            param.name
                        ))
                        .build(),
                ));
            }
        };
        bindings.push((param.name.clone(), value));
    }

    let interpolated = with_bindings(ctx, bindings, |ctx| ctx.interpolate(&definition.template))?;
    let evaluated = conditional::resolve(&interpolated).map_err(|e| e.into_error(ctx))?;

    stack.push(name.to_string());
    let expanded = expand_all(&evaluated, ctx, stack);
    stack.pop();

    Ok(expanded?.trim().to_string())
}

/// Run `f` with `bindings` shadowing same-named constants, then restore them.
fn with_bindings<T>(
    ctx: &mut PipelineContext,
    bindings: Vec<(String, String)>,
    f: impl FnOnce(&mut PipelineContext) -> T,
) -> T {
    let saved: Vec<(String, Option<String>)> = bindings
        .into_iter()
        .map(|(name, value)| {
            let previous = ctx.constants.set(name.clone(), value);
            (name, previous)
        })
        .collect();

    let result = f(ctx);

    for (name, previous) in saved.into_iter().rev() {
        match previous {
            Some(value) => ctx.constants.set(name, value),
            None => ctx.constants.remove(&name),
        };
    }
    result
}

/// Append every `.css` file under `dir` to the document.
fn auto_include(ctx: &mut PipelineContext, dir: &Path) -> Result<()> {
    let mut appended = 0;
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            ScaffoldError::io(path, std::io::Error::other(e.to_string()))
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "css") {
            continue;
        }
        let doc = source::SourceDocument::load(path)?;
        ctx.record_file(&doc.path, doc.modified);
        ctx.text.push('\n');
        ctx.text.push_str(&source::strip_block_comments(&doc.text));
        appended += 1;
    }
    tracing::debug!(dir = %dir.display(), files = appended, "Auto-included mixins");
    Ok(())
}

/// Registers mixin definitions and expands invocations.
#[derive(Debug, Default)]
pub struct MixinsModule;

impl MixinsModule {
    fn extract(&self, ctx: &mut PipelineContext) -> Result<()> {
        let text = &ctx.text;
        let blocks = scanner::find_blocks_where(text, &DEFINITION, Delimiter::Brace, |start| {
            at_boundary(text, start)
        })?;
        for block in &blocks {
            let definition = MixinDefinition {
                name: block.group(1).unwrap_or_default().to_string(),
                params: MixinDefinition::parse_params(block.group(2).unwrap_or_default()),
                template: block.body.clone(),
            };
            tracing::trace!(mixin = %definition.name, params = definition.params.len(), "Defined mixin");
            ctx.mixins.define(definition);
        }
        ctx.text = scanner::replace_blocks(&ctx.text, &blocks, |_| Ok::<_, ScaffoldError>(String::new()))?;
        Ok(())
    }

    fn expand(&self, ctx: &mut PipelineContext) -> Result<()> {
        let text = std::mem::take(&mut ctx.text);
        let mut stack = Vec::new();
        ctx.text = expand_all(&text, ctx, &mut stack)?;
        Ok(())
    }
}

impl Module for MixinsModule {
    fn name(&self) -> &str {
        "mixins"
    }

    fn phases(&self) -> &'static [Phase] {
        &[Phase::Import, Phase::PreProcess, Phase::Process]
    }

    fn run(&self, phase: Phase, ctx: &mut PipelineContext) -> Result<()> {
        match phase {
            Phase::Import => match ctx.config.mixins.auto_include.clone() {
                Some(dir) => auto_include(ctx, &dir),
                None => Ok(()),
            },
            Phase::PreProcess => self.extract(ctx),
            Phase::Process => self.expand(ctx),
            _ => Ok(()),
        }
    }
}
