//! Tab-scoped session state.
//!
//! One [`TabSession`] exists per tab (or process): the hydrated session and
//! its moving expiration. Clones share the same state. Nothing here is
//! synchronized across tabs.

use crate::signal::parse_expiration;
use chrono::{DateTime, Utc};
use staffdesk_access::Session;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct TabState {
    session: Option<Session>,
    expires_at: Option<DateTime<Utc>>,
}

/// Shared, tab-scoped session container.
#[derive(Debug, Clone, Default)]
pub struct TabSession {
    state: Arc<RwLock<TabState>>,
}

impl TabSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hydrates from the server-provided session and expiration.
    ///
    /// An expiration that does not parse is dropped with a warning; the
    /// session is still stored.
    pub fn hydrate(&self, session: Option<Session>, expires_at: Option<&str>) {
        let expires_at = expires_at.and_then(|raw| match parse_expiration(raw) {
            Ok(at) => Some(at),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring hydrated expiration");
                None
            }
        });

        let mut state = self.write();
        state.session = session;
        state.expires_at = expires_at;
    }

    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.read().session.clone()
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.read().session.is_some()
    }

    /// The next moment the session must be invalidated, if known.
    #[must_use]
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.read().expires_at
    }

    pub fn set_expiration(&self, expires_at: Option<DateTime<Utc>>) {
        self.write().expires_at = expires_at;
    }

    /// Replaces the session, e.g. after a tenant switch.
    pub fn set_session(&self, session: Option<Session>) {
        self.write().session = session;
    }

    /// Forgets the session and its expiration.
    pub fn clear(&self) {
        let mut state = self.write();
        state.session = None;
        state.expires_at = None;
    }

    fn read(&self) -> RwLockReadGuard<'_, TabState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TabState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
