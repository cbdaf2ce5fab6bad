//! Session lookup against the backend that owns sessions.
//!
//! The server never creates or stores sessions. Each request's cookies are
//! forwarded to `GET {backend}/auth/session`, and whatever comes back is
//! the session for that request.

use crate::error::{BackendError, StartupError};
use async_trait::async_trait;
use axum::http::header::COOKIE;
use chrono::{DateTime, Utc};
use rootcause::prelude::Report;
use serde_json::Value;
use staffdesk_access::Session;
use staffdesk_session_guard::parse_expiration;
use std::time::Duration;

/// A session as resolved for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub session: Session,
    /// Moving deadline reported by the backend.
    pub expires_at: Option<DateTime<Utc>>,
}

impl ResolvedSession {
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            session,
            expires_at: None,
        }
    }

    #[must_use]
    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Parses `{ "session": {..}, "expiresAt": "<ISO-8601>" }`.
    ///
    /// A missing or null session is no session. An unparseable `expiresAt`
    /// is dropped; the session itself still counts.
    #[must_use]
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let session = Session::from_value(payload.get("session")?)?;

        let expires_at = match payload.get("expiresAt") {
            Some(Value::String(raw)) => match parse_expiration(raw) {
                Ok(at) => Some(at),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring backend expiration");
                    None
                }
            },
            _ => None,
        };

        Some(Self {
            session,
            expires_at,
        })
    }
}

/// The backend's session endpoints.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Resolves the session carried by `cookies` (a `Cookie` header value).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or answers with
    /// something other than a session or a rejection.
    async fn resolve(&self, cookies: &str) -> Result<Option<ResolvedSession>, Report<BackendError>>;

    /// Invalidates the session server-side.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or rejects the call.
    async fn logout(&self, cookies: &str) -> Result<(), Report<BackendError>>;
}

/// HTTP [`SessionBackend`].
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Creates a client for `base_url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, Report<StartupError>> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|e| StartupError::HttpClient {
                reason: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl SessionBackend for BackendClient {
    #[tracing::instrument(skip_all, fields(backend = %self.base_url))]
    async fn resolve(&self, cookies: &str) -> Result<Option<ResolvedSession>, Report<BackendError>> {
        let response = self
            .http
            .get(self.endpoint("/auth/session"))
            .header(COOKIE, cookies)
            .send()
            .await
            .map_err(|e| BackendError::Request {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.is_client_error() {
            tracing::debug!(%status, "backend rejected session");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
            }
            .into());
        }

        let payload: Value = response.json().await.map_err(|e| BackendError::Decode {
            reason: e.to_string(),
        })?;

        Ok(ResolvedSession::from_payload(&payload))
    }

    #[tracing::instrument(skip_all, fields(backend = %self.base_url))]
    async fn logout(&self, cookies: &str) -> Result<(), Report<BackendError>> {
        let response = self
            .http
            .post(self.endpoint("/auth/logout"))
            .header(COOKIE, cookies)
            .send()
            .await
            .map_err(|e| BackendError::Request {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
            }
            .into());
        }

        Ok(())
    }
}
