/*
 * nesting.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Nested selector flattening.
 */

//! Nested selector flattening.
//!
//! The document is parsed into a tree of [`Node`]s and flattened into plain
//! CSS rules:
//!
//! ```css
//! .nav { color: red; a, span { color: blue; &:hover { color: green; } } }
//! ```
//!
//! becomes
//!
//! ```css
//! .nav{color:red;}.nav a{color:blue;}.nav span{color:blue;}.nav a:hover{color:green;}.nav span:hover{color:green;}
//! ```
//!
//! Grouping rules whose header matches the skip list (by default `@media`,
//! `@supports` and keyframes) discard the enclosing selector: their rules
//! are flattened from scratch and wrapped once in the grouping header.
//! `@import` statements are hoisted in front of everything else.
//!
//! Flattening is idempotent: flat CSS comes back unchanged apart from
//! whitespace.

use scaffold_error_reporting::DiagnosticMessageBuilder;

use crate::context::PipelineContext;
use crate::error::Result;
use crate::pipeline::{Module, Phase};
use crate::scanner::{self, Delimiter, ScanError};

/// A parsed stylesheet item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A `/* */` comment, delimiters included.
    Comment(String),
    Import { url: String, media: String },
    Declaration { name: String, value: String },
    /// A block-less statement such as `@charset "utf-8"`, without its `;`.
    Statement(String),
    Rule { header: String, children: Vec<Node> },
}

/// Parse stylesheet text into a node tree.
///
/// The final declaration of a block may omit its `;`.
pub fn parse(text: &str) -> std::result::Result<Vec<Node>, ScanError> {
    let bytes = text.as_bytes();
    let mut nodes = Vec::new();
    let mut depth = 0usize;
    let mut seg = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'*') && text[seg..i].trim().is_empty() {
            let end = scanner::skip_literal(bytes, i).unwrap_or(bytes.len());
            nodes.push(Node::Comment(text[i..end].to_string()));
            i = end;
            seg = end;
            continue;
        }
        if let Some(next) = scanner::skip_literal(bytes, i) {
            i = next;
            continue;
        }
        match bytes[i] {
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth = depth.saturating_sub(1),
            b'{' if depth == 0 => {
                let close = scanner::find_close(text, i, Delimiter::Brace)?;
                nodes.push(Node::Rule {
                    header: scanner::collapse_whitespace(&text[seg..i]),
                    children: parse(&text[i + 1..close])?,
                });
                i = close + 1;
                seg = i;
                continue;
            }
            b';' if depth == 0 => {
                push_statement(&mut nodes, &text[seg..i]);
                i += 1;
                seg = i;
                continue;
            }
            b'}' => {
                return Err(ScanError::UnexpectedClose {
                    close: '}',
                    offset: i,
                    line: scanner::line_of(text, i),
                });
            }
            _ => {}
        }
        i += 1;
    }
    push_statement(&mut nodes, &text[seg..]);
    Ok(nodes)
}

fn push_statement(nodes: &mut Vec<Node>, raw: &str) {
    let s = raw.trim();
    if s.is_empty() {
        return;
    }
    let is_import = s
        .get(..7)
        .is_some_and(|p| p.eq_ignore_ascii_case("@import"));
    if is_import {
        nodes.push(parse_import(&s[7..]));
    } else if s.starts_with('@') {
        nodes.push(Node::Statement(scanner::collapse_whitespace(s)));
    } else if let Some(colon) = scanner::find_top_level(s, b':') {
        nodes.push(Node::Declaration {
            name: s[..colon].trim().to_string(),
            value: s[colon + 1..].trim().to_string(),
        });
    } else {
        nodes.push(Node::Statement(s.to_string()));
    }
}

/// Parse the part of an `@import` after the keyword.
fn parse_import(rest: &str) -> Node {
    let rest = rest.trim();
    let (url, media) = if rest.len() >= 4 && rest[..4].eq_ignore_ascii_case("url(") {
        match scanner::find_close(rest, 3, Delimiter::Paren) {
            Ok(close) => (scanner::unquote(&rest[4..close]), &rest[close + 1..]),
            Err(_) => (rest, ""),
        }
    } else if rest.starts_with('"') || rest.starts_with('\'') {
        let end = scanner::skip_literal(rest.as_bytes(), 0).unwrap_or(rest.len());
        (scanner::unquote(&rest[..end]), &rest[end..])
    } else {
        rest.split_once(char::is_whitespace).unwrap_or((rest, ""))
    };
    Node::Import {
        url: url.to_string(),
        media: scanner::collapse_whitespace(media),
    }
}

/// Result of flattening a node tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flattened {
    /// Rendered `@import` statements, in document order.
    pub imports: Vec<String>,
    /// Flat rules and top-level statements.
    pub body: String,
    /// Headers of grouping rules whose direct declarations were dropped.
    pub dropped: Vec<String>,
}

impl Flattened {
    pub fn render(&self) -> String {
        let mut out = self.imports.concat();
        out.push_str(&self.body);
        out
    }
}

fn render_import(url: &str, media: &str) -> String {
    if media.is_empty() {
        format!("@import '{url}';")
    } else {
        format!("@import '{url}' {media};")
    }
}

struct Flattener<'a> {
    skip: &'a [String],
    result: Flattened,
}

impl Flattener<'_> {
    fn is_skipped(&self, header: &str) -> bool {
        self.skip.iter().any(|s| !s.is_empty() && header.contains(s.as_str()))
    }

    /// Flatten top-level nodes (no ancestor selector).
    fn flatten_top(&mut self, nodes: &[Node], out: &mut String) {
        for node in nodes {
            match node {
                Node::Comment(c) => out.push_str(c),
                Node::Import { url, media } => self.result.imports.push(render_import(url, media)),
                Node::Statement(s) => {
                    out.push_str(s);
                    out.push(';');
                }
                Node::Declaration { name, value } => {
                    out.push_str(&format!("{name}:{value};"));
                }
                Node::Rule { header, children } => self.flatten_rule(header, children, &[], out),
            }
        }
    }

    fn flatten_rule(&mut self, header: &str, children: &[Node], ancestors: &[String], out: &mut String) {
        if self.is_skipped(header) {
            self.flatten_grouping(header, children, out);
            return;
        }

        let branches = compose(ancestors, header);

        let mut own = String::new();
        let mut has_own = false;
        let mut has_nested = false;
        for child in children {
            match child {
                Node::Comment(c) => {
                    own.push_str(c);
                    has_own = true;
                }
                Node::Declaration { name, value } => {
                    own.push_str(&format!("{name}:{value};"));
                    has_own = true;
                }
                Node::Statement(s) => {
                    own.push_str(s);
                    own.push(';');
                    has_own = true;
                }
                Node::Rule { .. } => has_nested = true,
                Node::Import { .. } => {}
            }
        }

        if has_own || !has_nested {
            if ancestors.is_empty() {
                out.push_str(header);
                out.push('{');
                out.push_str(&own);
                out.push('}');
            } else {
                for branch in &branches {
                    out.push_str(branch);
                    out.push('{');
                    out.push_str(&own);
                    out.push('}');
                }
            }
        }

        for child in children {
            match child {
                Node::Rule {
                    header: child_header,
                    children: grandchildren,
                } => self.flatten_rule(child_header, grandchildren, &branches, out),
                Node::Import { url, media } => self.result.imports.push(render_import(url, media)),
                _ => {}
            }
        }
    }

    /// A skip-list rule: children start from an empty ancestor and the
    /// result is wrapped once in the header.
    fn flatten_grouping(&mut self, header: &str, children: &[Node], out: &mut String) {
        let mut inner = String::new();
        let mut dropped = false;
        for child in children {
            match child {
                Node::Comment(c) => inner.push_str(c),
                Node::Import { url, media } => self.result.imports.push(render_import(url, media)),
                Node::Declaration { .. } | Node::Statement(_) => dropped = true,
                Node::Rule {
                    header: child_header,
                    children: grandchildren,
                } => self.flatten_rule(child_header, grandchildren, &[], &mut inner),
            }
        }
        if dropped {
            self.result.dropped.push(header.to_string());
        }
        out.push_str(header);
        out.push('{');
        out.push_str(&inner);
        out.push('}');
    }
}

/// Compose a rule header with its ancestor selectors.
///
/// Each ancestor branch is combined with each comma branch of the header;
/// `&` in a header branch is replaced by the ancestor, otherwise the two are
/// joined as descendants.
pub fn compose(ancestors: &[String], header: &str) -> Vec<String> {
    let parts: Vec<&str> = scanner::split_top_level(header, ',')
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    if ancestors.is_empty() {
        return parts.into_iter().map(str::to_string).collect();
    }

    ancestors
        .iter()
        .flat_map(|ancestor| {
            parts.iter().map(move |part| {
                if part.contains('&') {
                    part.replace('&', ancestor)
                } else {
                    format!("{ancestor} {part}")
                }
            })
        })
        .collect()
}

/// Flatten a parsed tree using the given skip list.
pub fn flatten(nodes: &[Node], skip: &[String]) -> Flattened {
    let mut flattener = Flattener {
        skip,
        result: Flattened::default(),
    };
    let mut body = String::new();
    flattener.flatten_top(nodes, &mut body);
    flattener.result.body = body;
    flattener.result
}

/// Parse and flatten stylesheet text.
pub fn flatten_css(text: &str, skip: &[String]) -> std::result::Result<String, ScanError> {
    Ok(flatten(&parse(text)?, skip).render())
}

/// Flattens nested rules during post-processing.
#[derive(Debug, Default)]
pub struct NestingModule;

impl Module for NestingModule {
    fn name(&self) -> &str {
        "nesting"
    }

    fn phases(&self) -> &'static [Phase] {
        &[Phase::PostProcess]
    }

    fn run(&self, _phase: Phase, ctx: &mut PipelineContext) -> Result<()> {
        let nodes = parse(&ctx.text)?;
        let flat = flatten(&nodes, &ctx.config.nesting.skip);
        for header in &flat.dropped {
            ctx.report(
                DiagnosticMessageBuilder::warning("Declarations in grouping rule")
                    .with_code("S-7-1")
                    .problem(format!("Declarations placed directly inside `{header}` were dropped"))
                    .add_hint("Wrap them in a selector inside the grouping rule?")
                    .build(),
            )?;
        }
        ctx.text = flat.render();
        Ok(())
    }
}
