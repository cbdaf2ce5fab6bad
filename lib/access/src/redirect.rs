//! Redirect URL construction.
//!
//! Query strings are rebuilt with `application/x-www-form-urlencoded`
//! encoding so a `next` parameter survives its own `?` and `&`.

use url::form_urlencoded;

/// Default login page path.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// `reason` value for a session invalidated by the expiry guard.
pub const SESSION_EXPIRED_REASON: &str = "session-expired";

/// Joins a path and an optional raw query into `path?query`.
#[must_use]
pub fn path_and_query(path: &str, query: Option<&str>) -> String {
    match query.filter(|q| !q.is_empty()) {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    }
}

/// Builds a login URL: `login_path?reason=..&next=..`.
///
/// Both parameters are optional; a `next` equal to `/` is dropped because it
/// is where login lands anyway.
#[must_use]
pub fn login_url(login_path: &str, reason: Option<&str>, next: Option<&str>) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if let Some(reason) = reason {
        query.append_pair("reason", reason);
    }
    if let Some(next) = next.filter(|n| !n.is_empty() && *n != "/") {
        query.append_pair("next", next);
    }
    path_and_query(login_path, Some(&query.finish()))
}

/// Returns true if `path` is the login page or lies beneath it.
#[must_use]
pub fn is_login_path(login_path: &str, path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.strip_prefix(login_path)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Returns the value of a query parameter, decoded.
#[must_use]
pub fn query_param(query: Option<&str>, key: &str) -> Option<String> {
    form_urlencoded::parse(query?.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Replaces (or adds) one query parameter, keeping the others in order.
#[must_use]
pub fn with_query_param(query: Option<&str>, key: &str, value: &str) -> String {
    let mut out = form_urlencoded::Serializer::new(String::new());
    if let Some(query) = query {
        for (k, v) in form_urlencoded::parse(query.as_bytes()) {
            if k != key {
                out.append_pair(&k, &v);
            }
        }
    }
    out.append_pair(key, value);
    out.finish()
}
