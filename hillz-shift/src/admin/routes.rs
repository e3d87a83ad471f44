//! Admin route handlers.
//!
//! Provides HTTP handlers for the admin UI: login page, logout and the
//! shell pages.

use crate::admin::templates::{AdminSection, LoginTemplate, NavItem, ShellTemplate};
use crate::analytics::{self, DEFAULT_RANGE_DAYS, DashboardStats};
use crate::server::AppState;
use askama::Template;
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error};

const LOGIN_PATH: &str = "/admin/login";

/// Build the admin router.
pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin", get(dashboard))
        .route("/admin/login", get(login_page))
        .route("/admin/logout", post(logout))
        .route("/admin/{section}", get(section_page))
}

/// Login page handler.
async fn login_page(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    // If already logged in, go straight to the shell
    if state.require_admin(&jar).is_ok() {
        return Redirect::to("/admin").into_response();
    }

    let template = LoginTemplate::new(&state.login_method, None);
    Html(
        template
            .render()
            .unwrap_or_else(|e| format!("Template error: {e}")),
    )
    .into_response()
}

/// Logout handler.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    (state.without_session(jar), Redirect::to(LOGIN_PATH)).into_response()
}

/// `/admin` shows the dashboard.
async fn dashboard(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    render_shell(&state, &jar, AdminSection::Dashboard).await
}

async fn section_page(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(section): Path<String>,
) -> Response {
    if let Err(e) = state.require_admin(&jar) {
        debug!("Admin page {} denied: {}", section, e);
        return Redirect::to(LOGIN_PATH).into_response();
    }

    match section.parse::<AdminSection>() {
        Ok(section) => render_shell(&state, &jar, section).await,
        Err(()) => (StatusCode::NOT_FOUND, "Page not found").into_response(),
    }
}

async fn render_shell(state: &AppState, jar: &CookieJar, section: AdminSection) -> Response {
    let user = match state.require_admin(jar) {
        Ok(user) => user,
        Err(e) => {
            debug!("Admin page {} denied: {}", section.slug(), e);
            return Redirect::to(LOGIN_PATH).into_response();
        }
    };

    let loaded = tokio::try_join!(
        state.store.list_registrations(),
        state.store.list_invitations(),
    );
    let (registrations, invitations) = match loaded {
        Ok(lists) => lists,
        Err(e) => {
            error!("Failed to load admin data: {:#}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load admin data")
                .into_response();
        }
    };

    let report = (section == AdminSection::Analytics).then(|| {
        let registration_times: Vec<_> = registrations.iter().map(|r| r.created_at).collect();
        let invitation_times: Vec<_> = invitations.iter().map(|i| i.created_at).collect();
        analytics::build_report(
            Utc::now().date_naive(),
            DEFAULT_RANGE_DAYS,
            &registration_times,
            &invitation_times,
        )
    });

    let template = ShellTemplate {
        email: user.email.unwrap_or(user.uid),
        title: section.title(),
        slug: section.slug(),
        nav: NavItem::for_sections(section),
        stats: DashboardStats::build(registrations, invitations),
        report,
    };

    Html(
        template
            .render()
            .unwrap_or_else(|e| format!("Template error: {e}")),
    )
    .into_response()
}
