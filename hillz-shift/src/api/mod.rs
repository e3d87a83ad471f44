//! JSON API served under `/api`.
//!
//! Login and session status live in [`auth`]. Attendee-facing writes and the
//! participant picker are in [`public`]. Everything in [`admin`] goes through
//! the session gate first.

pub mod admin;
pub mod auth;
pub mod public;

use axum::{Router, routing::get};
use std::sync::Arc;

use crate::server::AppState;

/// Routes relative to `/api`.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/auth",
            get(auth::session_status)
                .post(auth::login)
                .delete(auth::logout),
        )
        .route(
            "/registrations",
            get(admin::list_registrations).post(public::create_registration),
        )
        .route(
            "/invitations",
            get(admin::list_invitations).post(public::create_invitation),
        )
        .route("/participants", get(public::search_participants))
        .route("/dashboard", get(admin::dashboard))
        .route("/analytics", get(admin::analytics))
}
