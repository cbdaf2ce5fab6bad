//! Collaborators the expiry guard drives: the browser location, the
//! server logout endpoint and the wall clock.

use crate::error::GuardError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rootcause::prelude::Report;

/// Source of wall-clock time. Read on every re-arm, so deadlines follow
/// clock steps and host suspend.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// [`Clock`] backed by the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Reads and changes the current location.
pub trait Navigator: Send + Sync {
    /// Current path and query, e.g. `/facturas?page=2`.
    fn current_location(&self) -> String;

    /// Navigates to `location`.
    fn redirect(&self, location: &str);
}

/// Best-effort server-side logout.
#[async_trait]
pub trait LogoutClient: Send + Sync {
    /// Asks the server to invalidate the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected. Callers are
    /// expected to ignore it.
    async fn logout(&self) -> Result<(), Report<GuardError>>;
}

/// [`LogoutClient`] posting to the server's logout endpoint.
#[derive(Debug, Clone)]
pub struct HttpLogoutClient {
    client: reqwest::Client,
    url: String,
}

impl HttpLogoutClient {
    /// Creates a client for `base_url`, e.g. `https://staff.example.com`.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            url: format!("{}/auth/logout", base_url.trim_end_matches('/')),
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl LogoutClient for HttpLogoutClient {
    #[tracing::instrument(skip(self), fields(url = %self.url))]
    async fn logout(&self) -> Result<(), Report<GuardError>> {
        let response = self
            .client
            .post(&self.url)
            .send()
            .await
            .map_err(|e| GuardError::LogoutFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GuardError::LogoutFailed {
                reason: format!("unexpected status {status}"),
            }
            .into());
        }

        Ok(())
    }
}
