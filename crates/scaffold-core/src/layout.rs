/*
 * layout.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * `@grid` layout settings.
 */

//! `@grid` layout settings.
//!
//! ```css
//! @grid {
//!   column-count: 12;
//!   baseline: 18;
//!   grid-width: 960;
//!   left-gutter-width: 10;
//!   right-gutter-width: 10;
//! }
//! ```
//!
//! The block is removed from the document and turned into constants:
//! `$columns_1` … `$columns_n` (the width spanned by n columns),
//! `$column_width`, `$gutter_width`, `$left_gutter_width`,
//! `$right_gutter_width`, `$grid_width`, `$baseline` (all in px) and the
//! unitless `$column_count`.

use once_cell::sync::Lazy;
use regex::Regex;
use scaffold_error_reporting::DiagnosticMessageBuilder;

use crate::context::PipelineContext;
use crate::error::Result;
use crate::pipeline::{Module, Phase};
use crate::scanner::{self, Delimiter};

static GRID_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"@grid\b").unwrap());
static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(-?(?:\d+(?:\.\d+)?|\.\d+))").unwrap());

const REQUIRED: [&str; 3] = ["column-count", "baseline", "grid-width"];

/// Parsed and derived grid measurements, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSettings {
    pub column_count: u32,
    pub column_width: f64,
    pub gutter_width: f64,
    pub left_gutter_width: f64,
    pub right_gutter_width: f64,
    pub grid_width: f64,
    pub baseline: f64,
}

impl GridSettings {
    /// Derive the grid from its defining properties.
    pub fn derive(column_count: u32, baseline: f64, grid_width: f64, left: f64, right: f64) -> Self {
        let gutter = left + right;
        let count = f64::from(column_count.max(1));
        let column_width = ((grid_width - count * gutter) / count).floor();
        Self {
            column_count,
            column_width,
            gutter_width: gutter,
            left_gutter_width: left,
            right_gutter_width: right,
            grid_width,
            baseline,
        }
    }

    /// Width spanned by `n` columns and the gutters between them.
    pub fn columns(&self, n: u32) -> f64 {
        let n = f64::from(n);
        n * self.column_width + n * self.gutter_width - self.gutter_width
    }

    /// The constants this grid contributes, in registration order.
    pub fn constants(&self) -> Vec<(String, String)> {
        let px = |v: f64| format!("{}px", format_number(v));
        let mut out: Vec<(String, String)> = (1..=self.column_count)
            .map(|i| (format!("columns_{i}"), px(self.columns(i))))
            .collect();
        out.extend([
            ("column_width".to_string(), px(self.column_width)),
            ("gutter_width".to_string(), px(self.gutter_width)),
            ("left_gutter_width".to_string(), px(self.left_gutter_width)),
            ("right_gutter_width".to_string(), px(self.right_gutter_width)),
            ("grid_width".to_string(), px(self.grid_width)),
            ("baseline".to_string(), px(self.baseline)),
            ("column_count".to_string(), self.column_count.to_string()),
        ]);
        out
    }
}

/// Leading numeric part of a CSS value (`"960px"` → `960.0`).
pub fn leading_number(value: &str) -> Option<f64> {
    LEADING_NUMBER
        .captures(value)
        .and_then(|caps| caps[1].parse().ok())
}

/// Format a number without a trailing `.0` for integral values.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let s = format!("{value:.4}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Reads the document's `@grid` block during pre-processing.
#[derive(Debug, Default)]
pub struct LayoutModule;

impl Module for LayoutModule {
    fn name(&self) -> &str {
        "layout"
    }

    fn phases(&self) -> &'static [Phase] {
        &[Phase::PreProcess]
    }

    fn run(&self, _phase: Phase, ctx: &mut PipelineContext) -> Result<()> {
        let (text, blocks) = scanner::extract_blocks(&ctx.text, &GRID_BLOCK, Delimiter::Brace)?;
        let block = match blocks.as_slice() {
            [] => return Ok(()),
            [block] => block,
            _ => {
                return Err(ctx.fatal(
                    DiagnosticMessageBuilder::fatal("Multiple grid blocks")
                        .with_code("S-6-1")
                        .problem(format!("Found {} @grid blocks; only one is allowed", blocks.len()))
                        .build(),
                ));
            }
        };
        ctx.text = text;

        let props = scanner::parse_properties(&block.body);
        let get = |name: &str| {
            props
                .iter()
                .rev()
                .find(|(n, _)| n == name)
                .and_then(|(_, v)| leading_number(v))
        };

        for name in REQUIRED {
            if get(name).is_none() {
                return Err(ctx.fatal(
                    DiagnosticMessageBuilder::fatal("Missing grid property")
                        .with_code("S-6-2")
                        .problem(format!("@grid is missing a numeric `{name}`"))
                        .add_info("Required: column-count, baseline, grid-width")
                        .build(),
                ));
            }
        }

        let grid = GridSettings::derive(
            get("column-count").unwrap_or_default().max(0.0) as u32,
            get("baseline").unwrap_or_default(),
            get("grid-width").unwrap_or_default(),
            get("left-gutter-width").unwrap_or_default(),
            get("right-gutter-width").unwrap_or_default(),
        );
        tracing::debug!(
            columns = grid.column_count,
            column_width = grid.column_width,
            baseline = grid.baseline,
            "Parsed grid"
        );

        ctx.constants.extend(grid.constants());
        ctx.grid = Some(grid);
        Ok(())
    }
}
