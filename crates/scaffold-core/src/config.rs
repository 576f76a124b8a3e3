//! Compiler configuration.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Configuration is read from a YAML file; every key is optional and falls
//! back to the defaults documented on each field.
//!
//! ```yaml
//! error_threshold: 1
//! document_root: /srv/www
//! include_paths:
//!   - shared/css
//! flags: [ie6]
//! constants:
//!   global:
//!     brand: "#336699"
//!   feed: constants.xml
//! mixins:
//!   auto_include: mixins/
//! nesting:
//!   skip: ["@media", "@supports", "keyframes"]
//! formatter:
//!   compress: true
//!   preserve_comments: false
//! ```

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config{}: {source}", .path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    Parse {
        path: Option<PathBuf>,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("error_threshold must be between 0 and 3, got {0}")]
    InvalidThreshold(u8),
}

/// Top-level compiler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Diagnostics at or below this level abort the document (0..=3).
    pub error_threshold: u8,

    /// Web server document root. URL rewriting is enabled only when set.
    pub document_root: Option<PathBuf>,

    /// Extra directories searched by `@include` after the including file's
    /// own directory.
    pub include_paths: Vec<PathBuf>,

    /// Ignore every flag, including ones passed with the build request.
    pub disable_flags: bool,

    /// Flags that are always active.
    pub flags: Vec<String>,

    pub constants: ConstantsConfig,

    pub mixins: MixinsConfig,

    pub nesting: NestingConfig,

    /// Maximum depth of nested mixin expansion.
    pub max_mixin_depth: usize,

    pub formatter: FormatterConfig,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            error_threshold: 0,
            document_root: None,
            include_paths: Vec::new(),
            disable_flags: false,
            flags: Vec::new(),
            constants: ConstantsConfig::default(),
            mixins: MixinsConfig::default(),
            nesting: NestingConfig::default(),
            max_mixin_depth: 64,
            formatter: FormatterConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstantsConfig {
    /// Constants available to every document, lowest precedence.
    pub global: IndexMap<String, String>,

    /// XML or JSON file of externally fed constants.
    pub feed: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixinsConfig {
    /// Directory whose files are appended to every document at import time.
    pub auto_include: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NestingConfig {
    /// Header substrings marking grouping rules whose contents are flattened
    /// without the enclosing selector.
    pub skip: Vec<String>,
}

impl Default for NestingConfig {
    fn default() -> Self {
        Self {
            skip: vec![
                "@media".to_string(),
                "@supports".to_string(),
                "keyframes".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatterConfig {
    /// Minify instead of pretty-printing.
    pub compress: bool,
    pub preserve_comments: bool,
    pub rgb_to_hex: bool,
    pub font_weights_to_numbers: bool,
    pub remove_empty_measurements: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            compress: false,
            preserve_comments: true,
            rgb_to_hex: true,
            font_weights_to_numbers: true,
            remove_empty_measurements: true,
        }
    }
}

impl CompilerConfig {
    /// Parse configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Self::parse(yaml, None)
    }

    /// Load configuration from a YAML file.
    ///
    /// Relative paths inside the file (feed, include paths, auto-include
    /// directory, document root) are resolved against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&text, Some(path))?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    fn parse(yaml: &str, path: Option<&Path>) -> Result<Self, ConfigError> {
        // An empty file is a valid, all-defaults configuration
        let config: CompilerConfig = if yaml.trim().is_empty() {
            CompilerConfig::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
                path: path.map(Path::to_path_buf),
                source,
            })?
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.error_threshold > 3 {
            return Err(ConfigError::InvalidThreshold(self.error_threshold));
        }
        Ok(())
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        for path in &mut self.include_paths {
            resolve(path);
        }
        if let Some(feed) = self.constants.feed.as_mut() {
            resolve(feed);
        }
        if let Some(dir) = self.mixins.auto_include.as_mut() {
            resolve(dir);
        }
        if let Some(root) = self.document_root.as_mut() {
            resolve(root);
        }
    }
}
