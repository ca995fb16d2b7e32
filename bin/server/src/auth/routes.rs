//! Session routes: create, verify, and delete.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, header::AUTHORIZATION},
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use hearthside_core::{IdentityToken, Principal, SessionError};
use rootcause::Report;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use time::Duration as TimeDuration;

use super::{AppState, SESSION_COOKIE};
use crate::error::ApiError;

/// Response body of a successful create.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionCreated {
    pub uid: String,
    pub expires_at: DateTime<Utc>,
}

/// Request body of the verify endpoint.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    session: String,
}

/// Exchanges a bearer identity token for the `__session` cookie.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let Some(token) = bearer_token(&headers) else {
        let report: Report<SessionError> =
            SessionError::invalid_credential("missing bearer token").into();
        return Err(state.reject("create_session", &report));
    };

    let artifact = state
        .issuer
        .create_session(&token)
        .await
        .map_err(|report| state.reject("create_session", &report))?;

    let session_cookie = Cookie::build((SESSION_COOKIE, artifact.expose().to_string()))
        .path("/")
        .http_only(true)
        .secure(state.session_config.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::seconds(artifact.max_age().num_seconds()));

    let body = SessionCreated {
        uid: artifact.uid().to_string(),
        expires_at: artifact.expires_at(),
    };
    Ok((jar.add(session_cookie), Json(body)))
}

/// Verifies a session artifact passed in the request body.
pub async fn verify_session(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<Principal>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        let err = ApiError::BadRequest {
            reason: rejection.body_text(),
        };
        state.logger.info(
            "session_rejected",
            json!({ "operation": "verify_session", "code": err.code() }),
        );
        err
    })?;

    let principal = state
        .issuer
        .verify_session(&request.session, true)
        .await
        .map_err(|report| state.reject("verify_session", &report))?;
    Ok(Json(principal))
}

/// Revokes the caller's sessions and clears the cookie. Always succeeds.
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> impl IntoResponse {
    if let Some(session_cookie) = jar.get(SESSION_COOKIE) {
        match state
            .issuer
            .verify_session(session_cookie.value(), false)
            .await
        {
            Ok(principal) => {
                if let Err(report) = state.issuer.revoke_session(principal.uid()).await {
                    state.logger.error(
                        "session_revoke_failed",
                        &report,
                        json!({ "uid": principal.uid().as_str() }),
                    );
                }
            }
            Err(report) => {
                // Nothing to revoke; the cookie is cleared below either way.
                state.logger.debug(
                    "session_revoke_skipped",
                    json!({ "code": report.current_context().kind() }),
                );
            }
        }
    }

    let remove_session = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .max_age(TimeDuration::ZERO);

    (jar.add(remove_session), Json(json!({ "status": "ok" })))
}

fn bearer_token(headers: &HeaderMap) -> Option<IdentityToken> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = IdentityToken::new(token.trim());
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).expect("header"));
        headers
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(
            bearer_token(&headers("Bearer abc.def.ghi")).map(|t| t.expose().to_string()),
            Some("abc.def.ghi".to_string())
        );
        assert!(bearer_token(&headers("bearer abc")).is_some());
        assert!(bearer_token(&headers("Basic dXNlcjpwYXNz")).is_none());
        assert!(bearer_token(&headers("Bearer ")).is_none());
        assert!(bearer_token(&headers("Bearer")).is_none());
        assert!(bearer_token(&HeaderMap::new()).is_none());
    }
}
