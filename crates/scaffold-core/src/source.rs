/*
 * source.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Loading source documents from disk.
 */

//! Loading source documents from disk.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{Result, ScaffoldError};
use crate::scanner;

/// A source file with `//` comments removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub text: String,
    pub modified: Option<SystemTime>,
}

impl SourceDocument {
    /// Read a file and strip its line comments.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| ScaffoldError::io(path, e))?;
        let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();
        tracing::debug!(path = %path.display(), bytes = raw.len(), "Loaded source");
        Ok(Self {
            path: path.to_path_buf(),
            text: strip_line_comments(&raw),
            modified,
        })
    }

    pub fn from_text(path: impl Into<PathBuf>, text: &str) -> Self {
        Self {
            path: path.into(),
            text: strip_line_comments(text),
            modified: None,
        }
    }
}

/// Remove `//` line comments. `/* */` comments are kept.
///
/// A `//` only starts a comment at the start of the text or after
/// whitespace, so `url(http://...)` survives. Markers inside strings and
/// block comments are not comments.
pub fn strip_line_comments(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut i = 0;
    while i < bytes.len() {
        let at_boundary = i == 0 || bytes[i - 1].is_ascii_whitespace();
        if at_boundary && bytes[i..].starts_with(b"//") {
            out.push_str(&text[last..i]);
            i = text[i..].find('\n').map_or(bytes.len(), |n| i + n);
            last = i;
            continue;
        }
        match scanner::skip_literal(bytes, i) {
            Some(next) => i = next,
            None => i += 1,
        }
    }
    out.push_str(&text[last..]);
    out
}

/// Remove `/* */` comments outside strings.
pub fn strip_block_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for span in scanner::literal_spans(text) {
        if text[span.start..].starts_with("/*") {
            out.push_str(&text[last..span.start]);
            last = span.end;
        }
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_line_comments() {
        let css = "// header\n.a { color: red; } // trailing\n.b { background: url(http://x.com/a.png); }";
        assert_eq!(
            strip_line_comments(css),
            "\n.a { color: red; } \n.b { background: url(http://x.com/a.png); }"
        );
    }

    #[test]
    fn test_block_comments_survive_line_stripping() {
        let css = "/* keep me */\n.a{}";
        assert_eq!(strip_line_comments(css), css);
        assert_eq!(strip_block_comments(css), "\n.a{}");
    }

    #[test]
    fn test_comment_markers_inside_literals() {
        let css = "/* see // here */\n.a{content:\"// x\";} // gone";
        assert_eq!(
            strip_line_comments(css),
            "/* see // here */\n.a{content:\"// x\";} "
        );
        assert_eq!(
            strip_block_comments(".a{content:'/* x */';}/* y */"),
            ".a{content:'/* x */';}"
        );
    }

    #[test]
    fn test_load_records_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.css");
        std::fs::write(&path, ".a { color: red; } // note").unwrap();

        let doc = SourceDocument::load(&path).unwrap();
        assert_eq!(doc.text, ".a { color: red; } ");
        assert!(doc.modified.is_some());
    }

    #[test]
    fn test_load_missing_file() {
        let err = SourceDocument::load(Path::new("/nope/missing.css")).unwrap_err();
        assert!(matches!(err, ScaffoldError::Io { .. }));
    }
}
