/*
 * format.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Output formatting.
 */

//! Output formatting.
//!
//! The last step of compilation renders the flat stylesheet either
//! human-readable or compressed, depending on `formatter.compress`.
//!
//! Pretty output puts one declaration per line, indents two spaces per
//! nesting level and separates top-level rules with a blank line:
//!
//! ```css
//! .nav a {
//!   color: blue;
//! }
//!
//! @media print {
//!   .nav {
//!     display: none;
//!   }
//! }
//! ```
//!
//! Compressed output collapses whitespace and drops the last `;` of each
//! block. The remaining formatter options only apply when compressing:
//! comments are kept only with `preserve_comments`, `rgb_to_hex` turns
//! `rgb(255,0,0)` into `#ff0000`, `font_weights_to_numbers` turns `bold`
//! and `normal` weights into `700` and `400`, and
//! `remove_empty_measurements` turns `0px` into `0`.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::config::FormatterConfig;
use crate::context::PipelineContext;
use crate::error::Result;
use crate::nesting::{self, Node};
use crate::pipeline::{Module, Phase};
use crate::scanner;

static RGB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\brgb\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*\)").unwrap()
});
static EMPTY_MEASUREMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(^|[\s,(])-?0(?:\.0+)?(?:px|em|rem|ex|ch|pt|pc|in|cm|mm|vw|vh)\b").unwrap()
});

const INDENT: &str = "  ";

/// Render nodes as indented, human-readable CSS.
pub fn pretty(nodes: &[Node]) -> String {
    let mut out = String::new();
    write_pretty(nodes, 0, &mut out);
    out
}

fn write_pretty(nodes: &[Node], depth: usize, out: &mut String) {
    let indent = INDENT.repeat(depth);
    for node in nodes {
        match node {
            Node::Comment(c) => {
                out.push_str(&indent);
                out.push_str(c);
                out.push('\n');
            }
            Node::Import { url, media } => {
                out.push_str(&indent);
                out.push_str(&format!("@import '{url}'"));
                if !media.is_empty() {
                    out.push(' ');
                    out.push_str(media);
                }
                out.push_str(";\n");
            }
            Node::Statement(s) => {
                out.push_str(&indent);
                out.push_str(&scanner::collapse_whitespace(s));
                out.push_str(";\n");
            }
            Node::Declaration { name, value } => {
                out.push_str(&format!(
                    "{indent}{name}: {};\n",
                    scanner::collapse_whitespace(value)
                ));
            }
            Node::Rule { header, children } => {
                if depth == 0 && !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(&format!("{indent}{header} {{\n"));
                write_pretty(children, depth + 1, out);
                out.push_str(&indent);
                out.push_str("}\n");
            }
        }
    }
}

/// Render nodes as compressed CSS.
pub fn minify(nodes: &[Node], options: &FormatterConfig) -> String {
    let mut out = String::new();
    write_minified(nodes, options, &mut out);
    out
}

/// How an item is terminated inside a compressed block.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Terminator {
    None,
    /// Statements always keep their `;`.
    Required,
    /// The last declaration of a block drops its `;`.
    Optional,
}

fn write_minified(nodes: &[Node], options: &FormatterConfig, out: &mut String) {
    let mut items: Vec<(String, Terminator)> = Vec::new();
    let mut comments = String::new();

    for node in nodes {
        let (text, terminator) = match node {
            Node::Comment(c) => {
                if options.preserve_comments {
                    comments.push_str(c);
                }
                continue;
            }
            Node::Import { url, media } => {
                let media = tighten(media, b",");
                let text = if media.is_empty() {
                    format!("@import '{url}'")
                } else {
                    format!("@import '{url}' {media}")
                };
                (text, Terminator::Required)
            }
            Node::Statement(s) => (scanner::collapse_whitespace(s), Terminator::Required),
            Node::Declaration { name, value } => (
                format!("{name}:{}", minify_value(name, value, options)),
                Terminator::Optional,
            ),
            Node::Rule { header, children } => {
                let mut body = String::new();
                write_minified(children, options, &mut body);
                (format!("{}{{{body}}}", tighten(header, b",>")), Terminator::None)
            }
        };
        items.push((std::mem::take(&mut comments) + &text, terminator));
    }

    let count = items.len();
    for (i, (text, terminator)) in items.into_iter().enumerate() {
        out.push_str(&text);
        let is_last = i + 1 == count;
        match terminator {
            Terminator::Required => out.push(';'),
            Terminator::Optional if !is_last => out.push(';'),
            _ => {}
        }
    }
    out.push_str(&comments);
}

fn minify_value(name: &str, value: &str, options: &FormatterConfig) -> String {
    let mut value = tighten(&scanner::collapse_whitespace(value), b",");

    if options.rgb_to_hex {
        value = RGB
            .replace_all(&value, |caps: &Captures| {
                let channels: Option<Vec<u8>> = (1..=3).map(|i| caps[i].parse::<u8>().ok()).collect();
                match channels {
                    Some(c) => format!("#{:02x}{:02x}{:02x}", c[0], c[1], c[2]),
                    None => caps[0].to_string(),
                }
            })
            .into_owned();
    }

    if options.font_weights_to_numbers && name.eq_ignore_ascii_case("font-weight") {
        if value.eq_ignore_ascii_case("bold") {
            value = "700".to_string();
        } else if value.eq_ignore_ascii_case("normal") {
            value = "400".to_string();
        }
    }

    if options.remove_empty_measurements {
        value = EMPTY_MEASUREMENT.replace_all(&value, "${1}0").into_owned();
    }

    value
}

/// Remove whitespace next to any of `around`, outside string literals.
fn tighten(text: &str, around: &[u8]) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    let mut last = 0;
    while i < bytes.len() {
        if let Some(next) = scanner::skip_literal(bytes, i) {
            i = next;
            continue;
        }
        if around.contains(&bytes[i]) {
            out.push_str(text[last..i].trim_end());
            out.push(char::from(bytes[i]));
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            i = j;
            last = j;
            continue;
        }
        i += 1;
    }
    out.push_str(&text[last..]);
    out
}

/// Format flat CSS text according to the formatter options.
pub fn format_css(text: &str, options: &FormatterConfig) -> std::result::Result<String, scanner::ScanError> {
    let nodes = nesting::parse(text)?;
    Ok(if options.compress {
        minify(&nodes, options)
    } else {
        pretty(&nodes)
    })
}

/// Pretty-prints or compresses the final output.
#[derive(Debug, Default)]
pub struct FormatterModule;

impl Module for FormatterModule {
    fn name(&self) -> &str {
        "formatter"
    }

    fn phases(&self) -> &'static [Phase] {
        &[Phase::Formatting]
    }

    fn run(&self, _phase: Phase, ctx: &mut PipelineContext) -> Result<()> {
        ctx.text = format_css(&ctx.text, &ctx.config.formatter)?;
        Ok(())
    }
}
