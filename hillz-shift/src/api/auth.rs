//! Admin login, session status and logout.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};

use crate::gate::SESSION_COOKIE;
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    #[serde(default)]
    id_token: Option<String>,
}

/// Pull a non-blank `idToken` out of a login body. Anything unparsable
/// counts as missing.
fn parse_id_token(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<LoginRequest>(body)
        .ok()?
        .id_token
        .filter(|t| !t.trim().is_empty())
}

/// `POST /api/auth`: exchange an identity token for a session cookie.
pub async fn login(State(state): State<Arc<AppState>>, jar: CookieJar, body: Bytes) -> Response {
    let Some(id_token) = parse_id_token(&body) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "Missing idToken" })),
        )
            .into_response();
    };

    let identity = match state.identity.verify_id_token(&id_token).await {
        Ok(identity) => identity,
        Err(e) => {
            warn!("Admin login rejected: {:#}", e);
            return (
                StatusCode::UNAUTHORIZED,
                state.without_session(jar),
                Json(json!({ "success": false, "error": e.to_string() })),
            )
                .into_response();
        }
    };

    if !state.gate.is_admin_eligible(&identity) {
        warn!(uid = %identity.uid, email = ?identity.email, "Admin login forbidden");
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "success": false, "error": "Forbidden" })),
        )
            .into_response();
    }

    let token = match state.gate.signer().sign(
        &identity.uid,
        identity.email.as_deref(),
        state.session_ttl_secs,
    ) {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };

    info!(uid = %identity.uid, email = ?identity.email, "Admin session issued");

    (
        state.with_session(jar, token),
        Json(json!({
            "success": true,
            "user": { "uid": identity.uid, "email": identity.email },
        })),
    )
        .into_response()
}

/// `GET /api/auth`: report whether the caller holds a usable admin session.
pub async fn session_status(State(state): State<Arc<AppState>>, jar: CookieJar) -> Json<Value> {
    let user = jar
        .get(SESSION_COOKIE)
        .and_then(|c| state.gate.signer().verify(c.value()));

    let Some(user) = user else {
        return Json(json!({ "authenticated": false, "reason": "NO_OR_INVALID_COOKIE" }));
    };

    if !state.gate.allow_list().permits(user.email.as_deref()) {
        return Json(json!({
            "authenticated": false,
            "reason": "FORBIDDEN",
            "email": user.email,
        }));
    }

    Json(json!({
        "authenticated": true,
        "user": { "uid": user.uid, "email": user.email },
    }))
}

/// `DELETE /api/auth`: clear the session cookie. Always succeeds.
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    (state.without_session(jar), Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_token() {
        assert_eq!(parse_id_token(br#"{"idToken":"abc"}"#).as_deref(), Some("abc"));
        assert_eq!(parse_id_token(br#"{"idToken":""}"#), None);
        assert_eq!(parse_id_token(br#"{"idToken":"   "}"#), None);
        assert_eq!(parse_id_token(br#"{"idToken":null}"#), None);
        assert_eq!(parse_id_token(br#"{}"#), None);
        assert_eq!(parse_id_token(b""), None);
        assert_eq!(parse_id_token(b"not json"), None);
    }
}
