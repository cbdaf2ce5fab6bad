//! JSON endpoints for the dashboard shell.

use crate::auth::{AppState, RequireSession};
use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;
use staffdesk_access::{Session, SidebarItem};
use std::sync::Arc;

/// Sidebar entries and landing path for the current session.
#[derive(Debug, Serialize)]
pub struct Navigation {
    pub items: Vec<SidebarItem>,
    pub landing: &'static str,
}

/// `GET /api/navigation`
pub async fn navigation(
    State(state): State<Arc<AppState>>,
    RequireSession(current): RequireSession,
) -> Json<Navigation> {
    let catalog = state.catalog();
    Json(Navigation {
        items: current.access.sidebar(catalog),
        landing: current.access.landing_path(catalog),
    })
}

/// Session and expiration the browser hydrates its tab session from.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session: Session,
    pub expires_at: Option<DateTime<Utc>>,
}

/// `GET /api/session`
pub async fn session(RequireSession(current): RequireSession) -> Json<SessionView> {
    Json(SessionView {
        session: current.session,
        expires_at: current.expires_at,
    })
}
