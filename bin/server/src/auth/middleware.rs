//! Route guard middleware and session extractors for Axum.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{COOKIE, LOCATION},
        request::Parts,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Local, SecondsFormat, Utc};
use staffdesk_access::{AccessContext, GuardDecision, RoleCatalog, Session};
use std::sync::Arc;

use super::{AppState, ResolvedSession};

/// Response header carrying the session's current expiration, so the
/// browser-side expiry guard can move its deadline.
pub const SESSION_EXPIRES_HEADER: &str = "x-session-expires-at";

/// The resolved session of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentSession {
    pub session: Session,
    pub access: AccessContext,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CurrentSession {
    #[must_use]
    pub fn new(resolved: ResolvedSession, catalog: &RoleCatalog) -> Self {
        let access = AccessContext::from_session(&resolved.session, catalog);
        Self {
            session: resolved.session,
            access,
            expires_at: resolved.expires_at,
        }
    }
}

/// Enforces section access before any handler runs.
///
/// On `Continue` the resolved session is stored in the request extensions
/// for [`RequireSession`] and [`OptionalSession`].
pub async fn route_guard(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let current = resolve_current_session(&state, request.headers()).await;

    let decision = state.guard.decide(
        request.uri().path(),
        request.uri().query(),
        current.as_ref().map(|c| &c.access),
        Local::now().date_naive(),
    );

    match decision {
        GuardDecision::Continue => {}
        GuardDecision::Redirect(location) => return found(&location),
        GuardDecision::Forbidden => return AuthRejection::Forbidden.into_response(),
    }

    let expires_at = current.as_ref().and_then(|c| c.expires_at);
    if let Some(current) = current {
        request.extensions_mut().insert(current);
    }

    let mut response = next.run(request).await;
    if let Some(at) = expires_at {
        let stamp = at.to_rfc3339_opts(SecondsFormat::AutoSi, true);
        if let Ok(value) = HeaderValue::from_str(&stamp) {
            response.headers_mut().insert(SESSION_EXPIRES_HEADER, value);
        }
    }
    response
}

async fn resolve_current_session(state: &AppState, headers: &HeaderMap) -> Option<CurrentSession> {
    let jar = CookieJar::from_headers(headers);
    if jar.get(&state.session_config.cookie_name).is_none() {
        return None;
    }

    match state.backend.resolve(&cookie_header(headers)).await {
        Ok(Some(resolved)) => Some(CurrentSession::new(resolved, state.catalog())),
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(error = %e, "session lookup failed, treating request as anonymous");
            None
        }
    }
}

/// All `Cookie` headers of a request, joined for forwarding.
pub(crate) fn cookie_header(headers: &HeaderMap) -> String {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A 302 redirect.
fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(LOCATION, value)]).into_response(),
        Err(_) => {
            tracing::error!(location, "redirect target is not a valid header value");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Extractor for requiring a resolved session.
pub struct RequireSession(pub CurrentSession);

impl<S> FromRequestParts<S> for RequireSession
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentSession>()
            .cloned()
            .map(RequireSession)
            .ok_or(AuthRejection::NotAuthenticated)
    }
}

/// Extractor for optionally getting the resolved session.
pub struct OptionalSession(pub Option<CurrentSession>);

impl<S> FromRequestParts<S> for OptionalSession
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match RequireSession::from_request_parts(parts, state).await {
            Ok(RequireSession(current)) => Ok(OptionalSession(Some(current))),
            Err(_) => Ok(OptionalSession(None)),
        }
    }
}

/// Rejection type for session extractors and the route guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    NotAuthenticated,
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::NotAuthenticated => (StatusCode::UNAUTHORIZED, "Not authenticated").into_response(),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Access denied").into_response(),
        }
    }
}
