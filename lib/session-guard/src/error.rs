//! Error types for the session guard crate.
//!
//! The guard itself never fails outward: a bad signal is logged and
//! dropped, a failed logout call is swallowed. These errors exist so the
//! pieces that *can* fail report why.

use std::fmt;

/// Errors from session guard operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    /// An expiration payload was not an ISO-8601 timestamp.
    InvalidExpiration { raw: String, reason: String },
    /// The best-effort server logout call failed.
    LogoutFailed { reason: String },
}

impl fmt::Display for GuardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidExpiration { raw, reason } => {
                write!(f, "invalid expiration timestamp '{raw}': {reason}")
            }
            Self::LogoutFailed { reason } => {
                write!(f, "server logout failed: {reason}")
            }
        }
    }
}

impl std::error::Error for GuardError {}
