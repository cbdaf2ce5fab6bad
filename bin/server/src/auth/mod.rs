//! Authentication and access enforcement for the staffdesk server.
//!
//! This module provides:
//! - Session resolution against the backend, per request
//! - The route guard middleware and session extractors for Axum routes
//! - The logout endpoint
//!
//! # Access Model
//!
//! The backend owns sessions and roles; this server only reads them. A
//! request whose session cannot be resolved for any reason (no cookie,
//! backend down, garbage payload) is anonymous. Section access is then
//! decided by [`RouteGuard`] before any handler runs.

pub mod backend;
pub mod middleware;
pub mod routes;

use crate::config::SessionConfig;
use staffdesk_access::{RoleCatalog, RouteGuard};
use std::sync::Arc;

pub use backend::{BackendClient, ResolvedSession, SessionBackend};
pub use middleware::{
    AuthRejection, CurrentSession, OptionalSession, RequireSession, SESSION_EXPIRES_HEADER,
    route_guard,
};
pub use routes::logout;

/// Shared application state.
pub struct AppState {
    /// Section access enforcement over the role catalog.
    pub guard: RouteGuard,
    /// Where sessions come from.
    pub backend: Arc<dyn SessionBackend>,
    /// Session configuration.
    pub session_config: SessionConfig,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        guard: RouteGuard,
        backend: Arc<dyn SessionBackend>,
        session_config: SessionConfig,
    ) -> Self {
        Self {
            guard,
            backend,
            session_config,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &RoleCatalog {
        self.guard.catalog()
    }
}
