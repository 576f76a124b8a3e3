//! Color functions: `hsla()`, `cmyk()` and `cmyka()`.
//!
//! Copyright (c) 2025 Posit, PBC

use super::{FunctionExtension, leading_integer};
use crate::context::PipelineContext;
use crate::layout::format_number;

/// `hsla(h, s, l, a)` → `rgba(r,g,b,a)`.
///
/// Hue is in degrees, saturation and lightness in percent. Alpha is passed
/// through unchanged.
#[derive(Debug, Default)]
pub struct Hsla;

impl FunctionExtension for Hsla {
    fn name(&self) -> &str {
        "hsla"
    }

    fn call(&self, args: &[&str], _ctx: &PipelineContext) -> Option<String> {
        let [h, s, l, a] = args else {
            return None;
        };
        let (r, g, b) = hsl_to_rgb(
            leading_integer(h)? as f64 / 360.0,
            leading_integer(s)? as f64 / 100.0,
            leading_integer(l)? as f64 / 100.0,
        );
        Some(format!(
            "rgba({},{},{},{a})",
            format_number(r),
            format_number(g),
            format_number(b)
        ))
    }
}

/// Sector-based conversion; `h`, `s` and `l` are fractions.
fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (f64, f64, f64) {
    if s == 0.0 {
        let v = l * 255.0;
        return (v, v, v);
    }
    let var_h = h * 6.0;
    let sector = var_h.floor();
    let p = l * (1.0 - s);
    let q = l * (1.0 - s * (var_h - sector));
    let t = l * (1.0 - s * (1.0 - (var_h - sector)));
    let (r, g, b) = match sector as i64 {
        0 => (l, t, p),
        1 => (q, l, p),
        2 => (p, l, t),
        3 => (p, q, l),
        4 => (t, p, l),
        _ => (l, p, q),
    };
    ((r * 255.0).ceil(), (g * 255.0).ceil(), (b * 255.0).ceil())
}

fn cmyk_to_rgb(args: &[&str]) -> Option<(i64, i64, i64)> {
    let [c, m, y, k] = args else {
        return None;
    };
    let c = leading_integer(c)? as f64 / 100.0;
    let m = leading_integer(m)? as f64 / 100.0;
    let y = leading_integer(y)? as f64 / 100.0;
    let k = leading_integer(k)? as f64 / 100.0;
    let channel = |v: f64| ((1.0 - (v * (1.0 - k) + k).min(1.0)) * 255.0 + 0.5) as i64;
    Some((channel(c), channel(m), channel(y)))
}

/// `cmyk(c, m, y, k)` → `rgb(r,g,b)`, all inputs in percent.
#[derive(Debug, Default)]
pub struct Cmyk;

impl FunctionExtension for Cmyk {
    fn name(&self) -> &str {
        "cmyk"
    }

    fn call(&self, args: &[&str], _ctx: &PipelineContext) -> Option<String> {
        let (r, g, b) = cmyk_to_rgb(args)?;
        Some(format!("rgb({r},{g},{b})"))
    }
}

/// `cmyka(c, m, y, k, a)` → `rgba(r,g,b,a)`.
#[derive(Debug, Default)]
pub struct Cmyka;

impl FunctionExtension for Cmyka {
    fn name(&self) -> &str {
        "cmyka"
    }

    fn call(&self, args: &[&str], _ctx: &PipelineContext) -> Option<String> {
        let [cmyk @ .., a] = args else {
            return None;
        };
        let (r, g, b) = cmyk_to_rgb(cmyk)?;
        Some(format!("rgba({r},{g},{b},{a})"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerConfig;
    use std::sync::Arc;

    fn call(ext: &dyn FunctionExtension, args: &[&str]) -> Option<String> {
        let ctx = PipelineContext::new("/tmp/doc.css", "", Arc::new(CompilerConfig::default()));
        ext.call(args, &ctx)
    }

    #[test]
    fn test_hsla() {
        assert_eq!(call(&Hsla, &["0", "100%", "50%", "0.5"]).unwrap(), "rgba(128,0,0,0.5)");
        assert_eq!(call(&Hsla, &["180", "100", "50", ".3"]).unwrap(), "rgba(0,128,128,.3)");
    }

    #[test]
    fn test_hsla_grey() {
        assert_eq!(call(&Hsla, &["0", "0", "100", "1"]).unwrap(), "rgba(255,255,255,1)");
    }

    #[test]
    fn test_hsla_arity() {
        assert!(call(&Hsla, &["0", "0", "100"]).is_none());
        assert!(call(&Hsla, &["red", "0", "100", "1"]).is_none());
    }

    #[test]
    fn test_cmyk() {
        assert_eq!(call(&Cmyk, &["0", "100", "100", "0"]).unwrap(), "rgb(255,0,0)");
        assert_eq!(call(&Cmyk, &["0", "50", "100", "0"]).unwrap(), "rgb(255,128,0)");
        assert_eq!(call(&Cmyk, &["0", "0", "0", "100"]).unwrap(), "rgb(0,0,0)");
        assert!(call(&Cmyk, &["0", "0", "0"]).is_none());
    }

    #[test]
    fn test_cmyka() {
        assert_eq!(
            call(&Cmyka, &["100", "0", "0", "0", "0.5"]).unwrap(),
            "rgba(0,255,255,0.5)"
        );
        assert!(call(&Cmyka, &["0", "0", "0", "0"]).is_none());
    }
}
