/*
 * import.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * `@include` file inclusion.
 */

//! `@include` file inclusion.
//!
//! `@include 'path';` is replaced by the text of the named file. Paths
//! resolve against the including file's directory first, then against each
//! configured include path. Each file is included at most once per
//! document (the document itself counts as already included), and
//! included files may include others relative to their own directory.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use scaffold_error_reporting::DiagnosticMessageBuilder;

use crate::context::PipelineContext;
use crate::error::Result;
use crate::pipeline::{Module, Phase};
use crate::scanner;
use crate::source::SourceDocument;

static INCLUDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"@include\s+(?:'([^'\n]+)'|"([^"\n]+)")\s*;?"#).unwrap());

/// Identity used to deduplicate files.
pub fn file_key(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Normalize the extension of an included name to `.css`.
///
/// Returns the normalized name and, if an extension was replaced, the
/// original one.
fn normalize_name(name: &str) -> (PathBuf, Option<String>) {
    let path = PathBuf::from(name);
    match path.extension().and_then(|e| e.to_str()) {
        None => {
            let mut s = path.into_os_string();
            s.push(".css");
            (PathBuf::from(s), None)
        }
        Some(ext) if ext.eq_ignore_ascii_case("css") => (path, None),
        Some(ext) => {
            let ext = ext.to_string();
            (path.with_extension("css"), Some(ext))
        }
    }
}

fn resolve_path(name: &Path, base_dir: &Path, include_paths: &[PathBuf]) -> (Option<PathBuf>, Vec<PathBuf>) {
    if name.is_absolute() {
        let found = name.is_file().then(|| name.to_path_buf());
        return (found, vec![name.to_path_buf()]);
    }
    let mut searched = Vec::new();
    for dir in std::iter::once(base_dir).chain(include_paths.iter().map(PathBuf::as_path)) {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return (Some(candidate), searched);
        }
        searched.push(candidate);
    }
    (None, searched)
}

/// Replace every `@include` in `text`, resolving relative to `base_dir`.
pub fn resolve_includes(text: &str, base_dir: &Path, ctx: &mut PipelineContext) -> Result<String> {
    let literals = scanner::literal_spans(text);
    let includes: Vec<(usize, usize, String)> = INCLUDE
        .captures_iter(text)
        .filter_map(|caps| {
            let m = caps.get(0)?;
            if scanner::in_spans(&literals, m.start()) {
                return None;
            }
            let name = caps.get(1).or_else(|| caps.get(2))?;
            Some((m.start(), m.end(), name.as_str().trim().to_string()))
        })
        .collect();

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (start, end, raw_name) in includes {
        out.push_str(&text[last..start]);
        last = end;

        let (name, replaced) = normalize_name(&raw_name);
        if let Some(ext) = replaced {
            ctx.report(
                DiagnosticMessageBuilder::warning("Invalid include extension")
                    .with_code("S-1-2")
                    .problem(format!("`{raw_name}` is not a .css file"))
                    .add_note(format!("Replaced `.{ext}` with `.css`"))
                    .build(),
            )?;
        }

        let include_paths = ctx.config.include_paths.clone();
        let (found, searched) = resolve_path(&name, base_dir, &include_paths);
        let Some(path) = found else {
            let mut diag = DiagnosticMessageBuilder::fatal("Included file not found")
                .with_code("S-1-1")
                .problem(format!("Cannot find `{}`", name.display()));
            for candidate in &searched {
                diag = diag.add_info(format!("Searched {}", candidate.display()));
            }
            return Err(ctx.fatal(diag.build()));
        };

        let doc = SourceDocument::load(&path)?;
        if !ctx.record_file(file_key(&path), doc.modified) {
            tracing::debug!(path = %path.display(), "Skipping already included file");
            continue;
        }
        tracing::debug!(path = %path.display(), "Including file");

        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        out.push_str(&resolve_includes(&doc.text, &dir, ctx)?);
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Inlines `@include` files during the import phase.
#[derive(Debug, Default)]
pub struct ImportModule;

impl Module for ImportModule {
    fn name(&self) -> &str {
        "import"
    }

    fn phases(&self) -> &'static [Phase] {
        &[Phase::Import]
    }

    fn run(&self, _phase: Phase, ctx: &mut PipelineContext) -> Result<()> {
        let text = std::mem::take(&mut ctx.text);
        let dir = ctx.directory().to_path_buf();
        ctx.text = resolve_includes(&text, &dir, ctx)?;
        Ok(())
    }
}
