//! Error code catalog and lookup.
//!
//! This module provides access to the centralized error catalog, which maps
//! codes (like "S-2-1") to their metadata (subsystem, title, default severity).

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::diagnostic::Severity;

/// Metadata for an error code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorCodeInfo {
    /// Subsystem name (e.g., "constants", "mixins", "nesting")
    pub subsystem: String,

    /// Short title for the diagnostic
    pub title: String,

    /// Default message template (may include placeholders)
    pub message_template: String,

    /// Severity the compiler reports this code with
    pub severity: Severity,

    /// When this code was introduced (version)
    pub since_version: String,
}

/// Global error catalog, embedded at compile time.
///
/// # Panics
///
/// Panics if the embedded JSON is invalid. This should only happen during
/// development if someone manually edits the catalog incorrectly.
pub static ERROR_CATALOG: Lazy<HashMap<String, ErrorCodeInfo>> = Lazy::new(|| {
    let json_data = include_str!("../error_catalog.json");
    serde_json::from_str(json_data).expect("Invalid error catalog JSON - this is a bug in Scaffold")
});

/// Look up error code information.
///
/// Returns `None` if the error code is not found in the catalog.
///
/// # Example
///
/// ```
/// use scaffold_error_reporting::catalog::get_error_info;
///
/// let info = get_error_info("S-2-1").unwrap();
/// assert_eq!(info.subsystem, "constants");
/// ```
pub fn get_error_info(code: &str) -> Option<&ErrorCodeInfo> {
    ERROR_CATALOG.get(code)
}

/// Get the subsystem name for an error code.
pub fn get_subsystem(code: &str) -> Option<&str> {
    ERROR_CATALOG.get(code).map(|info| info.subsystem.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads() {
        assert!(!ERROR_CATALOG.is_empty());
    }

    #[test]
    fn test_internal_error_exists() {
        let info = get_error_info("S-0-1").unwrap();
        assert_eq!(info.subsystem, "internal");
        assert_eq!(info.severity, Severity::Fatal);
    }

    #[test]
    fn test_recoverable_codes_are_not_fatal() {
        for code in ["S-3-2", "S-3-3", "S-1-4"] {
            let info = get_error_info(code).unwrap();
            assert_ne!(info.severity, Severity::Fatal, "{code} should be recoverable");
        }
    }

    #[test]
    fn test_codes_follow_naming_convention() {
        for code in ERROR_CATALOG.keys() {
            let parts: Vec<&str> = code.split('-').collect();
            assert_eq!(parts.len(), 3, "bad code {code}");
            assert_eq!(parts[0], "S");
            assert!(parts[1].parse::<u32>().is_ok());
            assert!(parts[2].parse::<u32>().is_ok());
        }
    }

    #[test]
    fn test_get_subsystem() {
        assert_eq!(get_subsystem("S-3-1"), Some("mixins"));
        assert_eq!(get_subsystem("S-99-99"), None);
    }
}
