//! Page handlers.
//!
//! Section pages are rendered by the page layer; these placeholders only
//! exist so every section path is routed through the guard.

use crate::auth::{AppState, OptionalSession, RequireSession};
use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
};
use staffdesk_access::section_for_path;
use std::sync::Arc;

/// `GET /`. The guard always redirects first; this only answers if it
/// somehow did not.
pub async fn root(State(state): State<Arc<AppState>>) -> Redirect {
    Redirect::to(state.guard.login_path())
}

/// Login page placeholder. Only reached without a session.
pub async fn login_page(OptionalSession(current): OptionalSession) -> Response {
    if current.is_some() {
        return Redirect::to("/").into_response();
    }
    Html("<!DOCTYPE html><html lang=\"es\"><head><meta charset=\"utf-8\"><title>Acceso</title></head><body><main id=\"login\"></main></body></html>")
        .into_response()
}

/// Section page placeholder with the session's sidebar.
pub async fn section_page(
    State(state): State<Arc<AppState>>,
    RequireSession(current): RequireSession,
    uri: Uri,
) -> Response {
    let Some(section) = section_for_path(uri.path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let nav: String = current
        .access
        .sidebar(state.catalog())
        .iter()
        .map(|item| format!("<li><a href=\"{}\">{}</a></li>", item.path, item.label))
        .collect();

    Html(format!(
        "<!DOCTYPE html><html lang=\"es\"><head><meta charset=\"utf-8\"><title>{label}</title></head>\
         <body><nav><ul>{nav}</ul></nav><main data-section=\"{slug}\"><h1>{label}</h1></main></body></html>",
        label = section.label(),
        slug = section.slug(),
    ))
    .into_response()
}

/// `GET /healthz`
pub async fn healthz() -> &'static str {
    "ok"
}
