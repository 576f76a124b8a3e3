/*
 * scanner.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Balanced-delimiter scanning.
 */

//! Balanced-delimiter scanning.
//!
//! Every block-shaped construct of the language (`@constants { }`,
//! `=mixin(...) { }`, `@if(...) { }`, nested rules, function argument lists)
//! is found with the same primitive: locate a header, then walk forward
//! tracking a depth counter until the matching close delimiter.
//!
//! Quoted strings (`'…'`, `"…"`, with backslash escapes) and `/* … */`
//! comments are opaque to the scanner, so `content: "}"` does not close a
//! block. A string that is not terminated before the end of its line is
//! treated as ending there.

use std::ops::Range;

use regex::Regex;
use thiserror::Error;

/// Delimiter families recognized by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// `{ }` - selectors and at-groups
    Brace,
    /// `( )` - argument and parameter lists
    Paren,
}

impl Delimiter {
    pub fn open(self) -> u8 {
        match self {
            Delimiter::Brace => b'{',
            Delimiter::Paren => b'(',
        }
    }

    pub fn close(self) -> u8 {
        match self {
            Delimiter::Brace => b'}',
            Delimiter::Paren => b')',
        }
    }
}

/// Structural errors found while scanning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("`{open}` opened on line {line} is never closed")]
    Unclosed { open: char, offset: usize, line: usize },

    #[error("unexpected `{close}` on line {line}")]
    UnexpectedClose { close: char, offset: usize, line: usize },
}

/// A scanned `<header> <open> body <close>` region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralBlock {
    /// Byte offset of the start of the header match.
    pub start: usize,
    /// Byte offset one past the close delimiter.
    pub end: usize,
    /// Text matched by the header pattern.
    pub header: String,
    /// Capture groups of the header pattern (group 1 first).
    pub groups: Vec<Option<String>>,
    /// Text between the delimiters, exclusive.
    pub body: String,
    /// The full matched text, header through close delimiter.
    pub full: String,
}

impl StructuralBlock {
    /// Capture group `index` of the header pattern (1-based, like regex groups).
    pub fn group(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.groups.get(i))
            .and_then(|g| g.as_deref())
    }
}

/// 1-based line number of a byte offset.
pub fn line_of(text: &str, offset: usize) -> usize {
    let end = offset.min(text.len());
    text.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

/// If a string literal or comment starts at `i`, return the index just past it.
pub(crate) fn skip_literal(bytes: &[u8], i: usize) -> Option<usize> {
    match bytes[i] {
        quote @ (b'"' | b'\'') => {
            let mut j = i + 1;
            while j < bytes.len() {
                match bytes[j] {
                    b'\\' => j += 2,
                    b'\n' => return Some(j),
                    b if b == quote => return Some(j + 1),
                    _ => j += 1,
                }
            }
            Some(bytes.len())
        }
        b'/' if bytes.get(i + 1) == Some(&b'*') => {
            let rest = &bytes[i + 2..];
            let end = rest
                .windows(2)
                .position(|w| w == b"*/")
                .map_or(bytes.len(), |p| i + 2 + p + 2);
            Some(end)
        }
        _ => None,
    }
}

/// Byte ranges of every string literal and comment, in document order.
pub fn literal_spans(text: &str) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match skip_literal(bytes, i) {
            Some(end) => {
                spans.push(i..end);
                i = end;
            }
            None => i += 1,
        }
    }
    spans
}

/// Whether `offset` falls inside one of the sorted `spans`.
pub fn in_spans(spans: &[Range<usize>], offset: usize) -> bool {
    let idx = spans.partition_point(|span| span.end <= offset);
    spans.get(idx).is_some_and(|span| span.start <= offset)
}

/// Find the close delimiter matching the open delimiter at `open_index`.
///
/// Returns the byte offset of the close delimiter.
pub fn find_close(text: &str, open_index: usize, delimiter: Delimiter) -> Result<usize, ScanError> {
    let bytes = text.as_bytes();
    let (open, close) = (delimiter.open(), delimiter.close());
    let mut depth = 0usize;
    let mut i = open_index;

    while i < bytes.len() {
        if let Some(next) = skip_literal(bytes, i) {
            i = next;
            continue;
        }
        let b = bytes[i];
        if b == open {
            depth += 1;
        } else if b == close {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Ok(i);
            }
        }
        i += 1;
    }

    Err(ScanError::Unclosed {
        open: open as char,
        offset: open_index,
        line: line_of(text, open_index),
    })
}

/// Find every `<header> <open> body <close>` occurrence, left to right.
///
/// The header match must be followed by optional whitespace and then the
/// open delimiter; a header match that is not is skipped and the search
/// resumes one character later. Headers inside strings and comments are
/// ignored. Matches never overlap: blocks nested inside a matched body are
/// left for the caller to rescan.
pub fn find_blocks(
    text: &str,
    header: &Regex,
    delimiter: Delimiter,
) -> Result<Vec<StructuralBlock>, ScanError> {
    find_blocks_where(text, header, delimiter, |_| true)
}

/// [`find_blocks`], keeping only header matches whose start offset passes
/// `accept`.
pub fn find_blocks_where(
    text: &str,
    header: &Regex,
    delimiter: Delimiter,
    accept: impl Fn(usize) -> bool,
) -> Result<Vec<StructuralBlock>, ScanError> {
    let literals = literal_spans(text);
    let mut blocks = Vec::new();
    let mut pos = 0;

    while pos <= text.len() {
        let Some(caps) = header.captures_at(text, pos) else {
            break;
        };
        let Some(m) = caps.get(0) else {
            break;
        };

        let after = &text[m.end()..];
        let open_index = m.end() + (after.len() - after.trim_start().len());

        let is_header = !in_spans(&literals, m.start()) && accept(m.start());
        if is_header && text.as_bytes().get(open_index) == Some(&delimiter.open()) {
            let close = find_close(text, open_index, delimiter)?;
            let end = close + 1;
            blocks.push(StructuralBlock {
                start: m.start(),
                end,
                header: m.as_str().to_string(),
                groups: caps
                    .iter()
                    .skip(1)
                    .map(|g| g.map(|g| g.as_str().to_string()))
                    .collect(),
                body: text[open_index + 1..close].to_string(),
                full: text[m.start()..end].to_string(),
            });
            pos = end;
        } else {
            match text[m.start()..].chars().next() {
                Some(c) => pos = m.start() + c.len_utf8(),
                None => break,
            }
        }
    }

    Ok(blocks)
}

/// Find all blocks and remove them from the text.
pub fn extract_blocks(
    text: &str,
    header: &Regex,
    delimiter: Delimiter,
) -> Result<(String, Vec<StructuralBlock>), ScanError> {
    let blocks = find_blocks(text, header, delimiter)?;
    let mut remaining = text.to_string();
    for block in blocks.iter().rev() {
        remaining.replace_range(block.start..block.end, "");
    }
    Ok((remaining, blocks))
}

/// Replace each block (in document order) with the text produced by `f`.
pub fn replace_blocks<E, F>(text: &str, blocks: &[StructuralBlock], mut f: F) -> Result<String, E>
where
    F: FnMut(&StructuralBlock) -> Result<String, E>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for block in blocks {
        out.push_str(&text[last..block.start]);
        out.push_str(&f(block)?);
        last = block.end;
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Split on `sep` where it occurs outside brackets, quotes and comments.
///
/// `sep` must be an ASCII character.
pub fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let bytes = text.as_bytes();
    let sep = sep as u8;
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if let Some(next) = skip_literal(bytes, i) {
            i = next;
            continue;
        }
        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b if b == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&text[start..]);
    parts
}

/// Byte offset of the first `target` outside brackets, quotes and comments.
pub fn find_top_level(text: &str, target: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        if let Some(next) = skip_literal(bytes, i) {
            i = next;
            continue;
        }
        match bytes[i] {
            b if b == target && depth == 0 => return Some(i),
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Strip surrounding quotes and whitespace.
pub fn unquote(value: &str) -> &str {
    value.trim_matches(|c: char| c == '\'' || c == '"' || c.is_whitespace())
}

/// Collapse every run of whitespace into a single space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse an at-group body (`name: value; ...`) into ordered pairs.
///
/// Entries without a colon are ignored; values are unquoted.
pub fn parse_properties(body: &str) -> Vec<(String, String)> {
    split_top_level(body, ';')
        .into_iter()
        .filter_map(|entry| {
            let entry = entry.trim();
            let colon = find_top_level(entry, b':')?;
            let name = entry[..colon].trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), unquote(&entry[colon + 1..]).to_string()))
        })
        .collect()
}
