//! Admin data endpoints. Each handler passes the session gate before it
//! touches the store.

use axum::{
    Json,
    extract::{Query, State},
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::analytics::{self, AnalyticsReport, DashboardStats};
use crate::error::ApiError;
use crate::server::AppState;
use crate::store::{Invitation, Registration};

/// `GET /api/registrations`
pub async fn list_registrations(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Json<Vec<Registration>>, ApiError> {
    state.require_admin(&jar)?;
    Ok(Json(state.store.list_registrations().await?))
}

/// `GET /api/invitations`
pub async fn list_invitations(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Json<Vec<Invitation>>, ApiError> {
    state.require_admin(&jar)?;
    Ok(Json(state.store.list_invitations().await?))
}

/// `GET /api/dashboard`
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Json<DashboardStats>, ApiError> {
    state.require_admin(&jar)?;

    let registrations = state.store.list_registrations().await?;
    let invitations = state.store.list_invitations().await?;

    Ok(Json(DashboardStats::build(registrations, invitations)))
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    #[serde(default)]
    pub days: Option<String>,
}

/// `GET /api/analytics?days=`
pub async fn analytics(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<AnalyticsReport>, ApiError> {
    state.require_admin(&jar)?;

    let days = analytics::parse_range_days(query.days.as_deref());
    let today = Utc::now().date_naive();
    let start = analytics::range_start_time(today, days);
    debug!(days, start = %start, "Building analytics report");

    let (registration_times, invitation_times) = tokio::try_join!(
        state.store.registration_times_since(start),
        state.store.invitation_times_since(start),
    )?;

    Ok(Json(analytics::build_report(
        today,
        days,
        &registration_times,
        &invitation_times,
    )))
}
