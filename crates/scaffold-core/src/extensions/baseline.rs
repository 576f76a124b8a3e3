//! Baseline functions backed by the document's `@grid`.
//!
//! Copyright (c) 2025 Posit, PBC

use super::FunctionExtension;
use crate::context::PipelineContext;
use crate::layout::{format_number, leading_number};

/// `baseline(n)`: `n` baselines in px. Rejected without a grid.
#[derive(Debug, Default)]
pub struct Baseline;

impl FunctionExtension for Baseline {
    fn name(&self) -> &str {
        "baseline"
    }

    fn call(&self, args: &[&str], ctx: &PipelineContext) -> Option<String> {
        let [n] = args else {
            return None;
        };
        let baseline = ctx.grid.as_ref()?.baseline;
        Some(format!("{}px", format_number(baseline * leading_number(n)?)))
    }
}

/// `baseline_round(n)`: `n` rounded to the nearest baseline multiple, in px.
#[derive(Debug, Default)]
pub struct BaselineRound;

impl FunctionExtension for BaselineRound {
    fn name(&self) -> &str {
        "baseline_round"
    }

    fn call(&self, args: &[&str], ctx: &PipelineContext) -> Option<String> {
        let [n] = args else {
            return None;
        };
        let baseline = ctx.grid.as_ref()?.baseline;
        if baseline == 0.0 {
            return None;
        }
        let rounded = (leading_number(n)? / baseline).round() * baseline;
        Some(format!("{}px", format_number(rounded)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerConfig;
    use crate::layout::GridSettings;
    use std::sync::Arc;

    fn context(baseline: Option<f64>) -> PipelineContext {
        let mut ctx = PipelineContext::new("/tmp/doc.css", "", Arc::new(CompilerConfig::default()));
        ctx.grid = baseline.map(|b| GridSettings::derive(12, b, 960.0, 10.0, 10.0));
        ctx
    }

    #[test]
    fn test_baseline() {
        let ctx = context(Some(18.0));
        assert_eq!(Baseline.call(&["2"], &ctx).unwrap(), "36px");
        assert_eq!(Baseline.call(&["0.5"], &ctx).unwrap(), "9px");
    }

    #[test]
    fn test_baseline_round() {
        let ctx = context(Some(18.0));
        assert_eq!(BaselineRound.call(&["40px"], &ctx).unwrap(), "36px");
        assert_eq!(BaselineRound.call(&["45"], &ctx).unwrap(), "54px");
    }

    #[test]
    fn test_without_grid_rejected() {
        let ctx = context(None);
        assert!(Baseline.call(&["2"], &ctx).is_none());
        assert!(BaselineRound.call(&["2"], &ctx).is_none());
    }

    #[test]
    fn test_non_numeric_rejected() {
        let ctx = context(Some(18.0));
        assert!(Baseline.call(&["two"], &ctx).is_none());
        assert!(Baseline.call(&["1", "2"], &ctx).is_none());
    }
}
