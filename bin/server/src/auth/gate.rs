//! The authorization gate for privileged pages.
//!
//! Per request, the gate moves through:
//! 1. no cookie: redirect to login, carrying the requested path
//! 2. verify the cookie with revocation checking; failure redirects to login
//! 3. admin-scoped routes only: no administrator claim redirects home
//! 4. allow
//!
//! Nothing is cached between requests.

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use hearthside_core::{EventLogger, Principal, SessionError};
use hearthside_session::SessionIssuer;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use super::{AppState, SESSION_COOKIE};
use crate::config::GateConfig;

/// Protection level of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteScope {
    Public,
    /// Requires a verified session.
    Privileged,
    /// Requires a verified session carrying the administrator claim.
    Admin,
}

/// Outcome of evaluating a privileged request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationDecision {
    Allow(Principal),
    /// Send the visitor to log in, then back to `next`.
    RedirectToLogin { next: String },
    /// Send the visitor to the application root.
    RedirectHome,
}

/// Decides render or redirect for privileged routes.
pub struct AuthorizationGate {
    issuer: Arc<dyn SessionIssuer>,
    privileged_prefixes: Vec<String>,
    admin_prefixes: Vec<String>,
    login_path: String,
    verify_timeout: Duration,
    logger: EventLogger,
}

impl AuthorizationGate {
    pub fn new(
        issuer: Arc<dyn SessionIssuer>,
        config: GateConfig,
        verify_timeout: Duration,
        logger: EventLogger,
    ) -> Self {
        Self {
            issuer,
            privileged_prefixes: normalize(config.privileged_prefixes),
            admin_prefixes: normalize(config.admin_prefixes),
            login_path: config.login_path,
            verify_timeout,
            logger,
        }
    }

    /// Classifies a request path.
    ///
    /// Prefixes match whole path segments, so `/admin` covers `/admin` and
    /// `/admin/users` but not `/administrator`.
    #[must_use]
    pub fn scope_for(&self, path: &str) -> RouteScope {
        if self.admin_prefixes.iter().any(|p| covers(p, path)) {
            RouteScope::Admin
        } else if self.privileged_prefixes.iter().any(|p| covers(p, path)) {
            RouteScope::Privileged
        } else {
            RouteScope::Public
        }
    }

    /// Builds the login redirect target for a requested path and query.
    #[must_use]
    pub fn login_url(&self, next: &str) -> String {
        format!("{}?next={}", self.login_path, urlencoding::encode(next))
    }

    /// Evaluates a privileged request.
    ///
    /// `requested` is the original path and query, returned to after login.
    /// `Public` is treated like `Privileged`; callers skip the gate for
    /// public routes.
    pub async fn evaluate(
        &self,
        cookie: Option<&str>,
        requested: &str,
        scope: RouteScope,
    ) -> AuthorizationDecision {
        let to_login = || AuthorizationDecision::RedirectToLogin {
            next: requested.to_string(),
        };

        let Some(artifact) = cookie.filter(|c| !c.trim().is_empty()) else {
            return to_login();
        };

        let verified = tokio::time::timeout(
            self.verify_timeout,
            self.issuer.verify_session(artifact, true),
        )
        .await;

        let principal = match verified {
            Ok(Ok(principal)) => principal,
            Ok(Err(report)) => {
                let payload = json!({
                    "path": requested,
                    "code": report.current_context().kind(),
                });
                match report.current_context() {
                    SessionError::InvalidSession { .. } | SessionError::InvalidCredential { .. } => {
                        self.logger.debug("gate_session_rejected", payload);
                    }
                    SessionError::TransportFailure { .. } => {
                        self.logger.error("gate_verification_failed", &report, payload);
                    }
                    SessionError::ConfigurationMissing { .. } => {
                        self.logger.critical("gate_verification_failed", &report, payload);
                    }
                }
                return to_login();
            }
            Err(_) => {
                self.logger.warning(
                    "gate_verification_timeout",
                    json!({
                        "path": requested,
                        "timeout_ms": u64::try_from(self.verify_timeout.as_millis())
                            .unwrap_or(u64::MAX),
                    }),
                );
                return to_login();
            }
        };

        if scope == RouteScope::Admin && !principal.is_admin() {
            self.logger.info(
                "gate_admin_required",
                json!({ "path": requested, "uid": principal.uid().as_str() }),
            );
            return AuthorizationDecision::RedirectHome;
        }

        AuthorizationDecision::Allow(principal)
    }
}

fn normalize(prefixes: Vec<String>) -> Vec<String> {
    prefixes
        .into_iter()
        .map(|p| p.trim().trim_end_matches('/').to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn covers(prefix: &str, path: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Middleware applying the gate to every request.
///
/// On `Allow`, the verified principal is placed in the request extensions
/// for [`CurrentPrincipal`].
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let scope = state.gate.scope_for(request.uri().path());
    if scope == RouteScope::Public {
        return next.run(request).await;
    }

    let requested = request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path().to_string(), |pq| pq.as_str().to_string());
    let cookie = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());

    match state
        .gate
        .evaluate(cookie.as_deref(), &requested, scope)
        .await
    {
        AuthorizationDecision::Allow(principal) => {
            request.extensions_mut().insert(CurrentPrincipal(principal));
            next.run(request).await
        }
        AuthorizationDecision::RedirectToLogin { next } => {
            Redirect::to(&state.gate.login_url(&next)).into_response()
        }
        AuthorizationDecision::RedirectHome => Redirect::to("/").into_response(),
    }
}

/// Extractor for the principal verified by the gate.
///
/// Only available on privileged routes. Elsewhere the request is redirected
/// to login.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(principal) = parts.extensions.get::<CurrentPrincipal>() {
            return Ok(principal.clone());
        }
        let app_state = Arc::<AppState>::from_ref(state);
        let requested = parts
            .uri
            .path_and_query()
            .map_or("/", |pq| pq.as_str());
        Err(Redirect::to(&app_state.gate.login_url(requested)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hearthside_core::{IdentityToken, MemorySink, SessionArtifact, Severity, Uid};
    use hearthside_session::{IdentityClaims, SessionSigner, testing::TestIdentityProvider};
    use rootcause::Report;

    fn gate_with(
        issuer: Arc<dyn SessionIssuer>,
        timeout: Duration,
    ) -> (AuthorizationGate, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let gate = AuthorizationGate::new(
            issuer,
            GateConfig::default(),
            timeout,
            EventLogger::with_sink("test", sink.clone()),
        );
        (gate, sink)
    }

    async fn session_for(
        provider: &TestIdentityProvider,
        issuer: &dyn SessionIssuer,
        uid: &str,
        admin: bool,
    ) -> String {
        issuer
            .create_session(&provider.mint(uid, admin))
            .await
            .expect("create")
            .expose()
            .to_string()
    }

    /// Issuer whose verification never completes in time.
    struct StalledIssuer;

    #[async_trait]
    impl SessionIssuer for StalledIssuer {
        async fn create_session(
            &self,
            _: &IdentityToken,
        ) -> Result<SessionArtifact, Report<SessionError>> {
            Err(SessionError::transport("unused").into())
        }

        async fn verify_session(&self, _: &str, _: bool) -> Result<Principal, Report<SessionError>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Principal::new(Uid::new("u1").expect("uid")).with_admin(true))
        }

        async fn revoke_session(&self, _: &Uid) -> Result<(), Report<SessionError>> {
            Ok(())
        }
    }

    /// Issuer whose platform is unreachable.
    struct UnreachableIssuer;

    #[async_trait]
    impl SessionIssuer for UnreachableIssuer {
        async fn create_session(
            &self,
            _: &IdentityToken,
        ) -> Result<SessionArtifact, Report<SessionError>> {
            Err(SessionError::transport("connection refused").into())
        }

        async fn verify_session(&self, _: &str, _: bool) -> Result<Principal, Report<SessionError>> {
            Err(SessionError::transport("connection refused").into())
        }

        async fn revoke_session(&self, _: &Uid) -> Result<(), Report<SessionError>> {
            Err(SessionError::transport("connection refused").into())
        }
    }

    #[test]
    fn scope_matching_is_segment_aware() {
        let (gate, _) = gate_with(Arc::new(UnreachableIssuer), Duration::from_secs(1));
        assert_eq!(gate.scope_for("/"), RouteScope::Public);
        assert_eq!(gate.scope_for("/login"), RouteScope::Public);
        assert_eq!(gate.scope_for("/api/session"), RouteScope::Public);
        assert_eq!(gate.scope_for("/dashboard"), RouteScope::Privileged);
        assert_eq!(gate.scope_for("/dashboard/resident"), RouteScope::Privileged);
        assert_eq!(gate.scope_for("/dashboards"), RouteScope::Public);
        assert_eq!(gate.scope_for("/admin"), RouteScope::Admin);
        assert_eq!(gate.scope_for("/admin/users"), RouteScope::Admin);
        assert_eq!(gate.scope_for("/administrator"), RouteScope::Public);
    }

    #[test]
    fn trailing_slashes_in_config_are_ignored() {
        let gate = AuthorizationGate::new(
            Arc::new(UnreachableIssuer),
            GateConfig {
                privileged_prefixes: vec!["/members/".to_string(), " ".to_string()],
                admin_prefixes: vec![],
                login_path: "/signin".to_string(),
            },
            Duration::from_secs(1),
            EventLogger::new("test"),
        );
        assert_eq!(gate.scope_for("/members/roster"), RouteScope::Privileged);
        assert_eq!(gate.scope_for("/"), RouteScope::Public);
        assert_eq!(gate.login_url("/members"), "/signin?next=%2Fmembers");
    }

    #[test]
    fn login_url_encodes_path_and_query() {
        let (gate, _) = gate_with(Arc::new(UnreachableIssuer), Duration::from_secs(1));
        assert_eq!(
            gate.login_url("/dashboard/resident?tab=events&page=2"),
            "/login?next=%2Fdashboard%2Fresident%3Ftab%3Devents%26page%3D2"
        );
    }

    #[tokio::test]
    async fn missing_cookie_redirects_to_login() {
        let provider = TestIdentityProvider::new("hearthside-dev");
        let (gate, _) = gate_with(Arc::new(provider.issuer()), Duration::from_secs(5));

        for cookie in [None, Some(""), Some("   ")] {
            let decision = gate
                .evaluate(cookie, "/dashboard/resident", RouteScope::Privileged)
                .await;
            assert_eq!(
                decision,
                AuthorizationDecision::RedirectToLogin {
                    next: "/dashboard/resident".to_string()
                }
            );
        }
    }

    #[tokio::test]
    async fn non_admin_is_sent_home_from_admin_routes() {
        let provider = TestIdentityProvider::new("hearthside-dev");
        let issuer = Arc::new(provider.issuer());
        let cookie = session_for(&provider, issuer.as_ref(), "u1", false).await;
        let (gate, _) = gate_with(issuer, Duration::from_secs(5));

        assert_eq!(
            gate.evaluate(Some(&cookie), "/admin", RouteScope::Admin).await,
            AuthorizationDecision::RedirectHome
        );
        match gate
            .evaluate(Some(&cookie), "/dashboard/resident", RouteScope::Privileged)
            .await
        {
            AuthorizationDecision::Allow(principal) => {
                assert_eq!(principal.uid().as_str(), "u1");
                assert!(!principal.is_admin());
            }
            other => panic!("expected allow, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn admin_is_allowed_on_admin_routes() {
        let provider = TestIdentityProvider::new("hearthside-dev");
        let issuer = Arc::new(provider.issuer());
        let cookie = session_for(&provider, issuer.as_ref(), "root", true).await;
        let (gate, _) = gate_with(issuer, Duration::from_secs(5));

        let decision = gate.evaluate(Some(&cookie), "/admin", RouteScope::Admin).await;
        assert!(matches!(decision, AuthorizationDecision::Allow(p) if p.is_admin()));
    }

    #[tokio::test]
    async fn forged_and_revoked_cookies_redirect_to_login() {
        let provider = TestIdentityProvider::new("hearthside-dev");
        let issuer = Arc::new(provider.issuer());
        let cookie = session_for(&provider, issuer.as_ref(), "u1", true).await;
        let stranger = TestIdentityProvider::new("other-project");
        let forged = session_for(&stranger, &stranger.issuer(), "u1", true).await;
        let (gate, _) = gate_with(issuer.clone(), Duration::from_secs(5));

        assert!(matches!(
            gate.evaluate(Some(&forged), "/admin", RouteScope::Admin).await,
            AuthorizationDecision::RedirectToLogin { .. }
        ));
        assert!(matches!(
            gate.evaluate(Some("not-a-session"), "/admin", RouteScope::Admin).await,
            AuthorizationDecision::RedirectToLogin { .. }
        ));

        issuer
            .revoke_session(&Uid::new("u1").expect("uid"))
            .await
            .expect("revoke");
        assert!(matches!(
            gate.evaluate(Some(&cookie), "/admin", RouteScope::Admin).await,
            AuthorizationDecision::RedirectToLogin { .. }
        ));
    }

    #[tokio::test]
    async fn expired_cookie_redirects_to_login() {
        let provider = TestIdentityProvider::new("hearthside-dev");
        let issuer = Arc::new(provider.issuer());
        let services = issuer.services().expect("services");
        let stale = SessionSigner::from_account(services.account(), chrono::Duration::minutes(-10))
            .expect("signer");
        let now = chrono::Utc::now().timestamp();
        let identity = IdentityClaims {
            sub: "u1".to_string(),
            iat: now,
            exp: now + 600,
            auth_time: None,
            admin: true,
            email: None,
        };
        let expired = stale
            .issue(&Uid::new("u1").expect("uid"), &identity, None)
            .expect("issue");
        let (gate, sink) = gate_with(issuer, Duration::from_secs(5));

        for scope in [RouteScope::Privileged, RouteScope::Admin] {
            assert_eq!(
                gate.evaluate(Some(expired.expose()), "/dashboard/resident", scope)
                    .await,
                AuthorizationDecision::RedirectToLogin {
                    next: "/dashboard/resident".to_string()
                }
            );
        }
        assert_eq!(sink.events("gate_session_rejected").len(), 2);
    }

    #[tokio::test]
    async fn stalled_verification_fails_closed() {
        let (gate, sink) = gate_with(Arc::new(StalledIssuer), Duration::from_millis(20));

        let decision = gate
            .evaluate(Some("cookie"), "/admin?x=1", RouteScope::Admin)
            .await;
        assert_eq!(
            decision,
            AuthorizationDecision::RedirectToLogin {
                next: "/admin?x=1".to_string()
            }
        );
        assert_eq!(sink.events("gate_verification_timeout").len(), 1);
    }

    #[tokio::test]
    async fn transport_failure_fails_closed_and_is_logged() {
        let (gate, sink) = gate_with(Arc::new(UnreachableIssuer), Duration::from_secs(5));

        let decision = gate
            .evaluate(Some("cookie"), "/dashboard", RouteScope::Privileged)
            .await;
        assert!(matches!(decision, AuthorizationDecision::RedirectToLogin { .. }));

        let records = sink.events("gate_verification_failed");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].severity, Severity::Error);
        assert!(records[0].error.is_some());
    }
}
