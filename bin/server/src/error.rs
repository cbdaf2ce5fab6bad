//! Domain error types for server operations.

use std::fmt;

/// Errors from talking to the session backend.
///
/// None of these reach the browser: a failed lookup is treated as "no
/// session" and a failed logout still clears the cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The request could not be sent or timed out.
    Request { reason: String },
    /// The backend answered with an unexpected status.
    Status { status: u16 },
    /// The response body was not the expected JSON.
    Decode { reason: String },
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request { reason } => write!(f, "backend request failed: {reason}"),
            Self::Status { status } => write!(f, "backend returned status {status}"),
            Self::Decode { reason } => write!(f, "undecodable backend response: {reason}"),
        }
    }
}

impl std::error::Error for BackendError {}

/// Errors that stop the server from starting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupError {
    /// Environment configuration is missing or invalid.
    Config { reason: String },
    /// The configured role catalog could not be loaded.
    Catalog { reason: String },
    /// The backend HTTP client could not be built.
    HttpClient { reason: String },
    /// The listen address could not be bound.
    Bind { addr: String, reason: String },
    /// The server stopped with an I/O error.
    Serve { reason: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { reason } => write!(f, "invalid configuration: {reason}"),
            Self::Catalog { reason } => write!(f, "failed to load role catalog: {reason}"),
            Self::HttpClient { reason } => write!(f, "failed to build HTTP client: {reason}"),
            Self::Bind { addr, reason } => write!(f, "failed to bind to '{addr}': {reason}"),
            Self::Serve { reason } => write!(f, "server error: {reason}"),
        }
    }
}

impl std::error::Error for StartupError {}
