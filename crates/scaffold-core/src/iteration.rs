/*
 * iteration.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * `@for` loop expansion.
 */

//! `@for` loop expansion.
//!
//! ```css
//! @for $i from 1 to 3 { .span-$i { width: {$i}0px; } }
//! ```
//!
//! Bounds are interpolated and must be integers; the range is inclusive and
//! empty when the start exceeds the end. The loop variable is an ordinary
//! constant and keeps its final value after the loop.

use once_cell::sync::Lazy;
use regex::Regex;
use scaffold_error_reporting::DiagnosticMessageBuilder;

use crate::context::PipelineContext;
use crate::error::Result;
use crate::pipeline::{Module, Phase};
use crate::scanner::{self, Delimiter};

static FOR_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)@for\s+\$([A-Za-z0-9_-]+)\s+from\s+(.+?)\s+to\s+([^{;}]+)").unwrap()
});

fn parse_bound(ctx: &PipelineContext, raw: &str, which: &str) -> Result<i64> {
    let value = ctx.interpolate(raw.trim())?;
    value.trim().parse::<i64>().map_err(|_| {
        ctx.fatal(
            DiagnosticMessageBuilder::fatal("Invalid loop bound")
                .with_code("S-5-1")
                .problem(format!("The {which} bound `{}` is not an integer", value.trim()))
                .build(),
        )
    })
}

/// Expand every `@for` loop in `text`, innermost loops once per iteration.
pub fn expand_loops(text: &str, ctx: &mut PipelineContext) -> Result<String> {
    let blocks = scanner::find_blocks(text, &FOR_HEADER, Delimiter::Brace)?;
    scanner::replace_blocks(text, &blocks, |block| {
        let var = block.group(1).unwrap_or_default();
        let from = parse_bound(ctx, block.group(2).unwrap_or_default(), "start")?;
        let to = parse_bound(ctx, block.group(3).unwrap_or_default(), "end")?;
        tracing::trace!(var, from, to, "Expanding loop");

        let mut expanded = String::new();
        for i in from..=to {
            ctx.constants.set(var, i.to_string());
            let body = expand_loops(&block.body, ctx)?;
            expanded.push_str(&ctx.interpolate(&body)?);
        }
        Ok(expanded)
    })
}

/// Expands `@for` loops during pre-processing.
#[derive(Debug, Default)]
pub struct IterationModule;

impl Module for IterationModule {
    fn name(&self) -> &str {
        "iteration"
    }

    fn phases(&self) -> &'static [Phase] {
        &[Phase::PreProcess]
    }

    fn run(&self, _phase: Phase, ctx: &mut PipelineContext) -> Result<()> {
        let text = std::mem::take(&mut ctx.text);
        ctx.text = expand_loops(&text, ctx)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerConfig;
    use crate::error::ScaffoldError;
    use std::sync::Arc;

    fn run(text: &str) -> Result<PipelineContext> {
        let mut ctx = PipelineContext::new("/tmp/doc.css", text, Arc::new(CompilerConfig::default()));
        IterationModule.run(Phase::PreProcess, &mut ctx)?;
        Ok(ctx)
    }

    #[test]
    fn test_simple_loop() {
        let ctx = run("@for $i from 1 to 3 { .m-$i{margin:{$i}px;} }").unwrap();
        assert_eq!(ctx.text, " .m-1{margin:1px;}  .m-2{margin:2px;}  .m-3{margin:3px;} ");
    }

    #[test]
    fn test_loop_variable_persists() {
        let ctx = run("@for $n from 2 to 4 {x}").unwrap();
        assert_eq!(ctx.text, "xxx");
        assert_eq!(ctx.constants.get("n"), Some("4"));
    }

    #[test]
    fn test_empty_range() {
        let ctx = run("a @for $i from 5 to 1 { .x-$i{} } b").unwrap();
        assert_eq!(ctx.text, "a  b");
        assert!(!ctx.constants.contains("i"));
    }

    #[test]
    fn test_bounds_from_constants() {
        let mut ctx = PipelineContext::new(
            "/tmp/doc.css",
            "@for $i from 1 to $cols {[$i]}",
            Arc::new(CompilerConfig::default()),
        );
        ctx.constants.set("cols", "3");
        IterationModule.run(Phase::PreProcess, &mut ctx).unwrap();
        assert_eq!(ctx.text, "[1][2][3]");
    }

    #[test]
    fn test_nested_loops() {
        let ctx = run("@for $r from 1 to 2 {@for $c from 1 to $r {($r,$c)}}").unwrap();
        assert_eq!(ctx.text, "(1,1)(2,1)(2,2)");
    }

    #[test]
    fn test_non_integer_bound_is_fatal() {
        let err = run("@for $i from 1 to lots {x}").unwrap_err();
        let ScaffoldError::Fatal(msg) = err else {
            panic!("expected fatal");
        };
        assert_eq!(msg.code.as_deref(), Some("S-5-1"));
        assert!(msg.problem.unwrap().contains("`lots`"));
    }
}
