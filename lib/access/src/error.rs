//! Error types for the access crate.
//!
//! Access decisions themselves never fail: malformed input resolves to the
//! deny side. The only fallible operation is loading a role catalog.

use std::fmt;

/// Errors from loading a role catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The catalog document is not valid JSON.
    InvalidJson { reason: String },
    /// The catalog document is not a slug → role mapping.
    NotAMapping,
    /// The catalog file could not be read.
    Unreadable { path: String, reason: String },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidJson { reason } => {
                write!(f, "role catalog is not valid JSON: {reason}")
            }
            Self::NotAMapping => {
                write!(f, "role catalog must be an object keyed by role slug")
            }
            Self::Unreadable { path, reason } => {
                write!(f, "cannot read role catalog '{path}': {reason}")
            }
        }
    }
}

impl std::error::Error for CatalogError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_json_display() {
        let err = CatalogError::InvalidJson {
            reason: "expected value at line 1".to_string(),
        };
        assert!(err.to_string().contains("not valid JSON"));
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn unreadable_display_names_path() {
        let err = CatalogError::Unreadable {
            path: "/etc/roles.json".to_string(),
            reason: "permission denied".to_string(),
        };
        assert!(err.to_string().contains("/etc/roles.json"));
    }
}
