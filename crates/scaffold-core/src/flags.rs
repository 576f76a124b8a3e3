/*
 * flags.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * `@flag` gated blocks.
 */

//! `@flag` gated blocks.
//!
//! ```css
//! @flag(ie6, ie7) { .clearfix { zoom: 1; } }
//! ```
//!
//! The block is unwrapped when any listed flag is active and removed
//! otherwise. Flags come from configuration and the build request; the
//! compiler never changes them.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::PipelineContext;
use crate::error::{Result, ScaffoldError};
use crate::pipeline::{Module, Phase};
use crate::scanner::{self, Delimiter};

static FLAG_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"@flag\s*\(([^)]*)\)").unwrap());

/// Keep or drop every `@flag` block until none remain.
///
/// Repeats because an unwrapped body may itself contain flag blocks.
pub fn resolve_flags(text: &str, ctx: &PipelineContext) -> Result<String> {
    let mut text = text.to_string();
    loop {
        let blocks = scanner::find_blocks(&text, &FLAG_HEADER, Delimiter::Brace)?;
        if blocks.is_empty() {
            return Ok(text);
        }
        text = scanner::replace_blocks(&text, &blocks, |block| {
            let names = block.group(1).unwrap_or_default();
            let active = names
                .split(',')
                .map(str::trim)
                .any(|name| ctx.is_flag_active(name));
            tracing::trace!(flags = names, active, "Resolved flag block");
            Ok::<_, ScaffoldError>(if active { block.body.clone() } else { String::new() })
        })?;
    }
}

/// Resolves flag blocks after mixin expansion.
#[derive(Debug, Default)]
pub struct FlagsModule;

impl Module for FlagsModule {
    fn name(&self) -> &str {
        "flags"
    }

    fn phases(&self) -> &'static [Phase] {
        &[Phase::Process]
    }

    fn run(&self, _phase: Phase, ctx: &mut PipelineContext) -> Result<()> {
        ctx.text = resolve_flags(&ctx.text, ctx)?;
        Ok(())
    }
}
