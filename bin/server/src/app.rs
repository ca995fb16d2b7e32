//! HTTP routing for the hearthside server.

use crate::auth::{self, AppState};
use crate::pages;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Builds the application router.
///
/// Every request passes through the authorization gate; public paths are
/// let through untouched.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Pages
        .route("/", get(pages::home_page))
        .route("/login", get(pages::login_page))
        .route("/dashboard/resident", get(pages::resident_dashboard))
        .route("/admin", get(pages::admin_page))
        // Session endpoints
        .route(
            "/api/session",
            post(auth::create_session).delete(auth::delete_session),
        )
        .route("/api/session/verify", post(auth::verify_session))
        .layer(middleware::from_fn_with_state(state.clone(), auth::authorize))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GateConfig, SessionConfig};
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::Response,
    };
    use hearthside_bridge::{HttpSessionTransport, SessionTransport};
    use hearthside_core::{EventLogger, MemorySink, Severity};
    use hearthside_session::{
        MemoryRevocationStore, PlatformIssuer, ServiceSettings, SessionIssuer,
        testing::TestIdentityProvider,
    };
    use serde_json::Value as JsonValue;
    use tower::ServiceExt;

    fn app_for(issuer: Arc<dyn SessionIssuer>, session: SessionConfig) -> (Router, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let state = Arc::new(AppState::new(
            issuer,
            session,
            GateConfig::default(),
            EventLogger::with_sink("test", sink.clone()),
        ));
        (router(state), sink)
    }

    fn test_app(provider: &TestIdentityProvider) -> (Router, Arc<MemorySink>) {
        app_for(Arc::new(provider.issuer()), SessionConfig::default())
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.expect("infallible")
    }

    async fn json_body(response: Response) -> JsonValue {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn header_value<'a>(response: &'a Response, name: header::HeaderName) -> &'a str {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    fn create_request(token: &str) -> Request<Body> {
        Request::post("/api/session")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .expect("request")
    }

    fn page_request(path: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::get(path);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).expect("request")
    }

    /// Creates a session and returns the `name=value` cookie pair.
    async fn sign_in(app: &Router, provider: &TestIdentityProvider, uid: &str, admin: bool) -> String {
        let response = send(app, create_request(provider.mint(uid, admin).expose())).await;
        assert_eq!(response.status(), StatusCode::OK);
        header_value(&response, header::SET_COOKIE)
            .split(';')
            .next()
            .unwrap_or_default()
            .to_string()
    }

    #[tokio::test]
    async fn create_sets_http_only_session_cookie() {
        let provider = TestIdentityProvider::new("hearthside-dev");
        let (app, _) = test_app(&provider);

        let response = send(&app, create_request(provider.mint("u1", false).expose())).await;
        assert_eq!(response.status(), StatusCode::OK);

        let set_cookie = header_value(&response, header::SET_COOKIE).to_string();
        assert!(set_cookie.starts_with("__session="), "{set_cookie}");
        assert!(set_cookie.contains("HttpOnly"), "{set_cookie}");
        assert!(set_cookie.contains("SameSite=Lax"), "{set_cookie}");
        assert!(set_cookie.contains("Path=/"), "{set_cookie}");
        assert!(set_cookie.contains("Secure"), "{set_cookie}");
        assert!(set_cookie.contains("Max-Age="), "{set_cookie}");

        let body = json_body(response).await;
        assert_eq!(body["uid"], "u1");
        assert!(body["expires_at"].is_string());
    }

    #[tokio::test]
    async fn create_without_bearer_token_is_unauthorized() {
        let provider = TestIdentityProvider::new("hearthside-dev");
        let (app, _) = test_app(&provider);

        let request = Request::post("/api/session")
            .body(Body::empty())
            .expect("request");
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(json_body(response).await["code"], "invalid_credential");
    }

    #[tokio::test]
    async fn create_with_expired_token_is_unauthorized() {
        let provider = TestIdentityProvider::new("hearthside-dev");
        let (app, sink) = test_app(&provider);

        let response = send(&app, create_request(provider.expired("u1").expose())).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["code"], "invalid_credential");
        assert_eq!(sink.events("session_rejected").len(), 1);
    }

    #[tokio::test]
    async fn verify_endpoint_returns_principal() {
        let provider = TestIdentityProvider::new("hearthside-dev");
        let (app, _) = test_app(&provider);
        let cookie = sign_in(&app, &provider, "root", true).await;
        let artifact = cookie.trim_start_matches("__session=");

        let request = Request::post("/api/session/verify")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::json!({ "session": artifact }).to_string()))
            .expect("request");
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["uid"], "root");
        assert_eq!(body["admin"], true);
    }

    #[tokio::test]
    async fn verify_endpoint_rejects_bad_input() {
        let provider = TestIdentityProvider::new("hearthside-dev");
        let (app, _) = test_app(&provider);

        let garbage = Request::post("/api/session/verify")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"session":"not-a-session"}"#))
            .expect("request");
        let response = send(&app, garbage).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["code"], "invalid_session");

        let malformed = Request::post("/api/session/verify")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{"))
            .expect("request");
        let response = send(&app, malformed).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "bad_request");
    }

    #[tokio::test]
    async fn privileged_page_without_cookie_redirects_to_login() {
        let provider = TestIdentityProvider::new("hearthside-dev");
        let (app, _) = test_app(&provider);

        let response = send(&app, page_request("/dashboard/resident", None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            header_value(&response, header::LOCATION),
            "/login?next=%2Fdashboard%2Fresident"
        );

        let response = send(&app, page_request("/dashboard/resident?tab=events", None)).await;
        assert_eq!(
            header_value(&response, header::LOCATION),
            "/login?next=%2Fdashboard%2Fresident%3Ftab%3Devents"
        );
    }

    #[tokio::test]
    async fn public_pages_render_without_a_session() {
        let provider = TestIdentityProvider::new("hearthside-dev");
        let (app, _) = test_app(&provider);

        assert_eq!(send(&app, page_request("/", None)).await.status(), StatusCode::OK);

        let response = send(&app, page_request("/login?next=%2Fadmin", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let html = String::from_utf8_lossy(&bytes);
        assert!(html.contains("data-next=\"%2Fadmin\""), "{html}");
    }

    #[tokio::test]
    async fn admin_claim_decides_admin_access() {
        let provider = TestIdentityProvider::new("hearthside-dev");
        let (app, _) = test_app(&provider);
        let resident = sign_in(&app, &provider, "u1", false).await;
        let admin = sign_in(&app, &provider, "root", true).await;

        let response = send(&app, page_request("/admin", Some(&resident))).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(header_value(&response, header::LOCATION), "/");

        let response = send(&app, page_request("/dashboard/resident", Some(&resident))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, page_request("/admin", Some(&admin))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn logout_clears_cookie_and_revokes_session() {
        let provider = TestIdentityProvider::new("hearthside-dev");
        let (app, _) = test_app(&provider);
        let cookie = sign_in(&app, &provider, "u1", false).await;

        let request = Request::delete("/api/session")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .expect("request");
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = header_value(&response, header::SET_COOKIE).to_string();
        assert!(set_cookie.starts_with("__session="), "{set_cookie}");
        assert!(set_cookie.contains("Max-Age=0"), "{set_cookie}");
        assert_eq!(json_body(response).await["status"], "ok");

        let response = send(&app, page_request("/dashboard/resident", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(header_value(&response, header::LOCATION).starts_with("/login?next="));
    }

    #[tokio::test]
    async fn sign_in_again_after_logout_reaches_dashboard() {
        let provider = TestIdentityProvider::new("hearthside-dev");
        let (app, _) = test_app(&provider);

        for _ in 0..50 {
            let cookie = sign_in(&app, &provider, "u1", false).await;
            let logout = Request::delete("/api/session")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .expect("request");
            assert_eq!(send(&app, logout).await.status(), StatusCode::OK);

            let cookie = sign_in(&app, &provider, "u1", false).await;
            let response = send(&app, page_request("/dashboard/resident", Some(&cookie))).await;
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn logout_without_session_still_succeeds() {
        let provider = TestIdentityProvider::new("hearthside-dev");
        let (app, _) = test_app(&provider);

        for cookie in [None, Some("__session=garbage")] {
            let mut builder = Request::delete("/api/session");
            if let Some(cookie) = cookie {
                builder = builder.header(header::COOKIE, cookie);
            }
            let response = send(&app, builder.body(Body::empty()).expect("request")).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert!(header_value(&response, header::SET_COOKIE).contains("Max-Age=0"));
        }
    }

    #[tokio::test]
    async fn missing_configuration_is_critical() {
        let issuer = PlatformIssuer::new(
            ServiceSettings::new(None, None),
            Arc::new(MemoryRevocationStore::new()),
        );
        let (app, sink) = app_for(Arc::new(issuer), SessionConfig::default());

        let response = send(&app, create_request("header.payload.signature")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["code"], "configuration_missing");
        assert_eq!(body["error"], "session service is not configured");

        let records = sink.events("session_service_unavailable");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].severity, Severity::Critical);
    }

    #[tokio::test]
    async fn bridge_transport_round_trips_against_server() {
        let provider = TestIdentityProvider::new("hearthside-dev");
        let session = SessionConfig {
            secure_cookies: false,
            ..SessionConfig::default()
        };
        let (app, _) = app_for(Arc::new(provider.issuer()), session);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        let transport = HttpSessionTransport::new(&format!("http://{addr}")).expect("transport");
        transport
            .create_session(&provider.mint("u1", false))
            .await
            .expect("create");

        let rejected = transport
            .create_session(&provider.expired("u1"))
            .await
            .expect_err("expired token");
        assert_eq!(rejected.current_context().kind(), "session_rejected");

        transport.revoke_session().await.expect("revoke");
        server.abort();
    }
}
