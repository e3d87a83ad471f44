//! HTTP server: shared state, router and listener.

use anyhow::{Context, Result};
use axum::Router;
use axum_extra::extract::CookieJar;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::admin::LoginMethod;
use crate::error::AdminAuthError;
use crate::gate::{SESSION_COOKIE, SessionGate, cleared_session_cookie, session_cookie};
use crate::identity::IdentityProvider;
use crate::session::AdminCookieUser;
use crate::store::EventStore;

/// State shared by every HTTP handler.
///
/// Built once at startup; nothing in it is mutated per request.
pub struct AppState {
    pub gate: SessionGate,
    pub identity: Arc<dyn IdentityProvider>,
    pub store: EventStore,
    pub session_ttl_secs: u64,
    pub secure_cookies: bool,
    /// Base URL for links handed out to invitees (no trailing slash)
    pub public_url: String,
    pub login_method: LoginMethod,
}

impl AppState {
    /// Run the admin gate against the session cookie in `jar`.
    pub fn require_admin(&self, jar: &CookieJar) -> Result<AdminCookieUser, AdminAuthError> {
        self.gate
            .require_admin_session(jar.get(SESSION_COOKIE).map(|c| c.value()))
    }

    /// Add a freshly signed session cookie to `jar`.
    pub fn with_session(&self, jar: CookieJar, token: String) -> CookieJar {
        jar.add(session_cookie(token, self.session_ttl_secs, self.secure_cookies))
    }

    /// Overwrite the session cookie in `jar` with an expired, empty one.
    pub fn without_session(&self, jar: CookieJar) -> CookieJar {
        jar.add(cleared_session_cookie(self.secure_cookies))
    }

    pub fn registration_link(&self, invitation_id: &str) -> String {
        format!(
            "{}/register?ref={}",
            self.public_url.trim_end_matches('/'),
            invitation_id
        )
    }
}

/// Build the combined HTTP router with the JSON API and the admin UI.
pub fn http_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", crate::api::api_router())
        .merge(crate::admin::admin_router())
        .with_state(state)
}

/// Bind `listen_addr` and serve until the process is stopped.
pub async fn run_server(listen_addr: SocketAddr, state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("Failed to bind HTTP listener on {listen_addr}"))?;

    info!(addr = %listen_addr, "Starting HTTP server");

    axum::serve(listener, http_router(state))
        .await
        .context("HTTP server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::AllowList;
    use crate::identity::MockIdentityProvider;
    use crate::session::SessionSigner;

    async fn state(public_url: &str) -> AppState {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        AppState {
            gate: SessionGate::new(
                SessionSigner::new(Some("server-test")).unwrap(),
                AllowList::default(),
            ),
            identity: Arc::new(MockIdentityProvider),
            store: EventStore::new(pool),
            session_ttl_secs: 60,
            secure_cookies: false,
            public_url: public_url.to_string(),
            login_method: LoginMethod::Token,
        }
    }

    #[tokio::test]
    async fn test_registration_link() {
        let s = state("https://shift.example.org/").await;
        assert_eq!(
            s.registration_link("abc"),
            "https://shift.example.org/register?ref=abc"
        );
    }

    #[tokio::test]
    async fn test_require_admin_reads_session_cookie() {
        let s = state("http://localhost:3000").await;
        let jar = CookieJar::new();
        assert_eq!(s.require_admin(&jar), Err(AdminAuthError::Unauthenticated));

        let token = s.gate.signer().sign("uid-1", Some("a@x.com"), 60).unwrap();
        let jar = s.with_session(jar, token);
        let user = s.require_admin(&jar).unwrap();
        assert_eq!(user.uid, "uid-1");

        let jar = s.without_session(jar);
        assert_eq!(s.require_admin(&jar), Err(AdminAuthError::Unauthenticated));
    }
}
