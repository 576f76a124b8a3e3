/*
 * urls.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Relative URL rewriting.
 */

//! Relative URL rewriting.
//!
//! When a `document_root` is configured, relative `url(...)` and `@import`
//! targets are rewritten to absolute URL paths so the compiled CSS can be
//! served from anywhere. A document at `<root>/themes/dark/site.css`
//! referencing `url(../img/bg.png)` gets `url(/themes/img/bg.png)`.
//!
//! Absolute paths, `http(s)://`, `data:` and fragment URLs are left alone.
//! A rewritten `url()` whose target does not exist under the document root
//! is reported as a warning.

use std::path::{Component, Path};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use scaffold_error_reporting::DiagnosticMessageBuilder;

use crate::context::PipelineContext;
use crate::error::Result;
use crate::import::file_key;
use crate::pipeline::{Module, Phase};

static IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"@import\s+(?:url\(\s*)?['"]?([^'"\s;)]+)['"]?(?:\s*\))?([^;{}]*);"#).unwrap()
});
static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"url\(\s*['"]?([^'")]+?)['"]?\s*\)"#).unwrap());

/// Whether a URL is left as written.
pub fn is_absolute_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    url.starts_with('/')
        || url.starts_with('\\')
        || url.starts_with('#')
        || lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("data:")
}

/// URL path of `dir` relative to `root`, with a trailing `/`.
///
/// Returns `None` when `dir` is outside `root`.
pub fn url_path(dir: &Path, root: &Path) -> Option<String> {
    let relative = file_key(dir).strip_prefix(file_key(root)).ok()?.to_path_buf();
    let mut out = String::from("/");
    for component in relative.components() {
        if let Component::Normal(segment) = component {
            out.push_str(&segment.to_string_lossy());
            out.push('/');
        }
    }
    Some(out)
}

/// Resolve a relative URL against a directory URL path.
///
/// Every `../` segment climbs one directory; `./` segments are dropped.
pub fn absolutize(dir_url: &str, url: &str) -> String {
    let mut segments: Vec<&str> = dir_url.split('/').filter(|s| !s.is_empty()).collect();
    let mut rest = url;
    loop {
        if let Some(r) = rest.strip_prefix("../") {
            segments.pop();
            rest = r;
        } else if let Some(r) = rest.strip_prefix("./") {
            rest = r;
        } else {
            break;
        }
    }
    let mut out = String::from("/");
    for segment in segments {
        out.push_str(segment);
        out.push('/');
    }
    out.push_str(rest);
    out
}

/// Rewrite relative URLs in `text` for a document in `dir_url`.
pub fn rewrite_urls(text: &str, dir_url: &str, root: &Path, ctx: &mut PipelineContext) -> Result<String> {
    let text = IMPORT.replace_all(text, |caps: &Captures| {
        let target = &caps[1];
        if is_absolute_url(target) {
            return caps[0].to_string();
        }
        let media = caps[2].trim();
        let absolute = absolutize(dir_url, target);
        if media.is_empty() {
            format!("@import '{absolute}';")
        } else {
            format!("@import '{absolute}' {media};")
        }
    });

    let mut missing = Vec::new();
    let text = URL
        .replace_all(&text, |caps: &Captures| {
            let target = caps[1].trim();
            if is_absolute_url(target) {
                return caps[0].to_string();
            }
            let absolute = absolutize(dir_url, target);
            let file = absolute.split(['?', '#']).next().unwrap_or_default();
            if !root.join(file.trim_start_matches('/')).exists() {
                missing.push(absolute.clone());
            }
            format!("url({absolute})")
        })
        .into_owned();

    for url in missing {
        ctx.report(
            DiagnosticMessageBuilder::warning("Missing image")
                .with_code("S-9-1")
                .problem(format!("`{url}` does not exist under the document root"))
                .build(),
        )?;
    }
    Ok(text)
}

/// Rewrites relative URLs during formatting when a document root is set.
#[derive(Debug, Default)]
pub struct UrlsModule;

impl Module for UrlsModule {
    fn name(&self) -> &str {
        "urls"
    }

    fn phases(&self) -> &'static [Phase] {
        &[Phase::Formatting]
    }

    fn run(&self, _phase: Phase, ctx: &mut PipelineContext) -> Result<()> {
        let Some(root) = ctx.config.document_root.clone() else {
            return Ok(());
        };
        let Some(dir_url) = url_path(ctx.directory(), &root) else {
            tracing::debug!(
                path = %ctx.path.display(),
                root = %root.display(),
                "Document is outside the document root; URLs left unchanged"
            );
            return Ok(());
        };
        let text = std::mem::take(&mut ctx.text);
        ctx.text = rewrite_urls(&text, &dir_url, &root, ctx)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerConfig;
    use scaffold_error_reporting::Severity;
    use std::sync::Arc;

    #[test]
    fn test_absolutize() {
        assert_eq!(absolutize("/themes/dark/", "img/bg.png"), "/themes/dark/img/bg.png");
        assert_eq!(absolutize("/themes/dark/", "../img/bg.png"), "/themes/img/bg.png");
        assert_eq!(absolutize("/themes/dark/", "../../../bg.png"), "/bg.png");
        assert_eq!(absolutize("/", "./bg.png"), "/bg.png");
    }

    #[test]
    fn test_skipped_urls() {
        for url in ["/a.png", "http://x/a.png", "HTTPS://x", "data:image/png;base64,AAA", "#frag"] {
            assert!(is_absolute_url(url), "{url}");
        }
        assert!(!is_absolute_url("a.png"));
    }

    fn fixture() -> (tempfile::TempDir, PipelineContext) {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("themes/dark")).unwrap();
        std::fs::create_dir_all(root.path().join("themes/img")).unwrap();
        std::fs::write(root.path().join("themes/img/bg.png"), b"").unwrap();
        let config = CompilerConfig {
            document_root: Some(root.path().to_path_buf()),
            ..Default::default()
        };
        let ctx = PipelineContext::new(root.path().join("themes/dark/site.css"), "", Arc::new(config));
        (root, ctx)
    }

    #[test]
    fn test_rewrites_url_and_import() {
        let (_root, mut ctx) = fixture();
        ctx.text = "@import 'print.css' print;.a{background:url( \"../img/bg.png\" ) no-repeat;}".into();
        UrlsModule.run(Phase::Formatting, &mut ctx).unwrap();
        assert_eq!(
            ctx.text,
            "@import '/themes/dark/print.css' print;.a{background:url(/themes/img/bg.png) no-repeat;}"
        );
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn test_missing_image_warns() {
        let (_root, mut ctx) = fixture();
        ctx.text = ".a{background:url(missing.png);}".into();
        UrlsModule.run(Phase::Formatting, &mut ctx).unwrap();
        assert_eq!(ctx.text, ".a{background:url(/themes/dark/missing.png);}");
        assert_eq!(ctx.diagnostics()[0].severity, Severity::Warning);
        assert_eq!(ctx.diagnostics()[0].code.as_deref(), Some("S-9-1"));
    }

    #[test]
    fn test_absolute_urls_untouched() {
        let (_root, mut ctx) = fixture();
        let css = ".a{background:url(http://cdn/x.png);}.b{background:url(/x.png);}@import url(/base.css);";
        ctx.text = css.into();
        UrlsModule.run(Phase::Formatting, &mut ctx).unwrap();
        assert_eq!(ctx.text, css);
    }

    #[test]
    fn test_without_document_root() {
        let mut ctx = PipelineContext::new("/tmp/site.css", ".a{b:url(x.png);}", Arc::new(CompilerConfig::default()));
        UrlsModule.run(Phase::Formatting, &mut ctx).unwrap();
        assert_eq!(ctx.text, ".a{b:url(x.png);}");
    }
}
