//! Router assembly.

use crate::api;
use crate::auth::{self, AppState, route_guard};
use crate::pages;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use staffdesk_access::Section;
use std::path::Path;
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Builds the application router.
///
/// Pages and the JSON API run behind [`route_guard`]; logout, health and
/// static assets do not.
pub fn router(state: Arc<AppState>, assets_dir: Option<&Path>) -> Router {
    let login_path = state.guard.login_path().to_string();

    let mut guarded = Router::new()
        .route("/", get(pages::root))
        .route(&login_path, get(pages::login_page))
        .route("/api/navigation", get(api::navigation))
        .route("/api/session", get(api::session));

    for section in Section::ALL {
        guarded = guarded
            .route(section.path(), get(pages::section_page))
            .route(&format!("{}/{{*rest}}", section.path()), get(pages::section_page));
    }

    let mut app = guarded
        .layer(middleware::from_fn_with_state(Arc::clone(&state), route_guard))
        .route("/auth/logout", post(auth::logout))
        .route("/healthz", get(pages::healthz));

    if let Some(dir) = assets_dir {
        app = app.nest_service("/assets", ServeDir::new(dir));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{ResolvedSession, SESSION_EXPIRES_HEADER, SessionBackend};
    use crate::config::SessionConfig;
    use crate::error::BackendError;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use chrono::{TimeZone, Utc};
    use rootcause::prelude::Report;
    use serde_json::{Value, json};
    use staffdesk_access::{RoleCatalog, RouteGuard, Session, StaffUser};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// In-memory backend keyed by the full `Cookie` header.
    #[derive(Default)]
    struct StaticBackend {
        sessions: HashMap<String, ResolvedSession>,
        unreachable: bool,
        logouts: Mutex<Vec<String>>,
    }

    impl StaticBackend {
        fn with(mut self, cookies: &str, session: ResolvedSession) -> Self {
            self.sessions.insert(cookies.to_string(), session);
            self
        }
    }

    #[async_trait]
    impl SessionBackend for StaticBackend {
        async fn resolve(
            &self,
            cookies: &str,
        ) -> Result<Option<ResolvedSession>, Report<BackendError>> {
            if self.unreachable {
                return Err(BackendError::Request {
                    reason: "connection refused".to_string(),
                }
                .into());
            }
            Ok(self.sessions.get(cookies).cloned())
        }

        async fn logout(&self, cookies: &str) -> Result<(), Report<BackendError>> {
            self.logouts.lock().expect("lock").push(cookies.to_string());
            if self.unreachable {
                return Err(BackendError::Status { status: 503 }.into());
            }
            Ok(())
        }
    }

    fn staff(role: &str) -> ResolvedSession {
        ResolvedSession::new(Session::new(StaffUser::new(role)))
    }

    fn backend() -> StaticBackend {
        StaticBackend::default()
            .with("session=admin", staff("admin"))
            .with("session=waiter", staff("camarero"))
            .with(
                "session=limited",
                ResolvedSession::new(Session::new(
                    StaffUser::new("admin")
                        .with_importance(Some(90))
                        .with_section_access(vec![Section::Reservations, Section::Invoices]),
                )),
            )
            .with("session=nobody", staff("sommelier"))
    }

    fn app_with(backend: Arc<StaticBackend>) -> Router {
        let state = Arc::new(AppState::new(
            RouteGuard::new(Arc::new(RoleCatalog::builtin())),
            backend,
            SessionConfig::default(),
        ));
        router(state, None)
    }

    fn app() -> Router {
        app_with(Arc::new(backend()))
    }

    fn get_as(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).expect("request")
    }

    fn location(response: &axum::response::Response) -> &str {
        response.headers()[header::LOCATION]
            .to_str()
            .expect("location")
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn anonymous_section_request_redirects_to_login_with_next() {
        let response = app()
            .oneshot(get_as("/facturas?page=2", None))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/login?next=%2Ffacturas%3Fpage%3D2");
    }

    #[tokio::test]
    async fn unknown_cookie_is_anonymous() {
        let response = app()
            .oneshot(get_as("/menus", Some("session=forged")))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/login?next=%2Fmenus");
    }

    #[tokio::test]
    async fn unreachable_backend_is_anonymous() {
        let backend = StaticBackend {
            unreachable: true,
            ..backend()
        };
        let response = app_with(Arc::new(backend))
            .oneshot(get_as("/menus", Some("session=admin")))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/login?next=%2Fmenus");
    }

    #[tokio::test]
    async fn waiter_is_sent_to_clock_in() {
        let response = app()
            .oneshot(get_as("/facturas", Some("session=waiter")))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/fichaje");
    }

    #[tokio::test]
    async fn explicit_access_hides_members() {
        let response = app()
            .oneshot(get_as("/miembros", Some("session=limited")))
            .await
            .expect("response");

        assert_eq!(location(&response), "/reservas");
    }

    #[tokio::test]
    async fn root_and_login_go_to_landing() {
        let app = app();
        let response = app
            .clone()
            .oneshot(get_as("/", Some("session=waiter")))
            .await
            .expect("response");
        assert_eq!(location(&response), "/fichaje");

        let response = app
            .oneshot(get_as("/login", Some("session=admin")))
            .await
            .expect("response");
        assert_eq!(location(&response), "/reservas");
    }

    #[tokio::test]
    async fn anonymous_login_page_renders() {
        let response = app()
            .oneshot(get_as("/login?reason=session-expired", None))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn allowed_section_renders_with_sidebar() {
        let response = app()
            .oneshot(get_as("/facturas/2024/17", Some("session=limited")))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let html = String::from_utf8(bytes.to_vec()).expect("utf8");
        assert!(html.contains("<h1>Facturas</h1>"));
        assert!(html.contains("href=\"/reservas\""));
        assert!(!html.contains("href=\"/miembros\""));
    }

    #[tokio::test]
    async fn sidebar_lists_every_allowed_section_in_order() {
        let response = app()
            .oneshot(get_as("/facturas", Some("session=limited")))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let html = String::from_utf8(bytes.to_vec()).expect("utf8");
        assert!(html.contains(
            "<nav><ul><li><a href=\"/reservas\">Reservas</a></li>\
             <li><a href=\"/facturas\">Facturas</a></li></ul></nav>"
        ));
    }

    #[tokio::test]
    async fn reservations_get_a_date_parameter() {
        let response = app()
            .oneshot(get_as("/reservas?table=4", Some("session=admin")))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::FOUND);
        assert!(
            location(&response).starts_with("/reservas?table=4&date="),
            "got {}",
            location(&response)
        );
    }

    #[tokio::test]
    async fn nothing_reachable_is_forbidden() {
        let response = app()
            .oneshot(get_as("/fichaje", Some("session=nobody")))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn navigation_matches_access() {
        let response = app()
            .oneshot(get_as("/api/navigation", Some("session=waiter")))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({
                "items": [{ "section": "fichaje", "path": "/fichaje", "label": "Fichaje" }],
                "landing": "/fichaje"
            })
        );
    }

    #[tokio::test]
    async fn navigation_requires_a_session() {
        let response = app()
            .oneshot(get_as("/api/navigation", None))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn expiration_is_forwarded_to_the_browser() {
        let expires_at = Utc
            .with_ymd_and_hms(2024, 5, 8, 10, 0, 0)
            .single()
            .expect("date");
        let backend = StaticBackend::default()
            .with("session=admin", staff("admin").with_expires_at(expires_at));

        let response = app_with(Arc::new(backend))
            .oneshot(get_as("/api/session", Some("session=admin")))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[SESSION_EXPIRES_HEADER],
            "2024-05-08T10:00:00Z"
        );
        let body = body_json(response).await;
        assert_eq!(body["expiresAt"], "2024-05-08T10:00:00Z");
        assert_eq!(body["session"]["user"]["role"], "admin");
    }

    #[tokio::test]
    async fn logout_forwards_and_clears_cookie() {
        let backend = Arc::new(backend());
        let response = app_with(Arc::clone(&backend))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/logout")
                    .header(header::COOKIE, "session=admin")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let set_cookie = response.headers()[header::SET_COOKIE]
            .to_str()
            .expect("set-cookie");
        assert!(set_cookie.starts_with("session="));
        assert!(set_cookie.contains("Max-Age=0"));
        assert_eq!(
            *backend.logouts.lock().expect("lock"),
            vec!["session=admin".to_string()]
        );
    }

    #[tokio::test]
    async fn logout_clears_cookie_even_if_backend_fails() {
        let backend = StaticBackend {
            unreachable: true,
            ..backend()
        };
        let response = app_with(Arc::new(backend))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/logout")
                    .header(header::COOKIE, "session=admin")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().contains_key(header::SET_COOKIE));
    }

    #[tokio::test]
    async fn healthz_needs_no_session() {
        let response = app()
            .oneshot(get_as("/healthz", None))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
