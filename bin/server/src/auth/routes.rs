//! Authentication routes.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use time::Duration as TimeDuration;

use super::{AppState, middleware::cookie_header};

/// Logs out: forwards to the backend, then removes the session cookie.
///
/// The cookie is removed even if the backend call fails; the browser is
/// logged out either way.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> impl IntoResponse {
    let cookie_name = state.session_config.cookie_name.clone();

    if jar.get(&cookie_name).is_some() {
        if let Err(e) = state.backend.logout(&cookie_header(&headers)).await {
            tracing::warn!(error = %e, "backend logout failed");
        }
    }

    let remove_session = Cookie::build((cookie_name, ""))
        .path("/")
        .http_only(true)
        .secure(state.session_config.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::ZERO);

    (jar.add(remove_session), StatusCode::NO_CONTENT)
}
