//! Attendee-facing endpoints. No session required.

use axum::{
    Json,
    extract::{Query, State},
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::server::AppState;
use crate::store::{NewInvitation, NewRegistration, PARTICIPANT_SEARCH_LIMIT, Participant, filter_participants};

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub success: bool,
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationCreatedResponse {
    pub success: bool,
    pub id: String,
    pub registration_link: String,
    pub has_email: bool,
}

#[derive(Debug, Serialize)]
pub struct ParticipantsResponse {
    pub success: bool,
    pub participants: Vec<Participant>,
    pub total: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct ParticipantQuery {
    #[serde(default)]
    pub search: Option<String>,
}

fn require_field(value: &str, name: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("Missing {name}")));
    }
    Ok(())
}

/// `POST /api/registrations`
pub async fn create_registration(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(form), _): WithRejection<Json<NewRegistration>, ApiError>,
) -> Result<Json<CreatedResponse>, ApiError> {
    require_field(&form.name, "name")?;
    require_field(&form.email, "email")?;

    let registration = state.store.add_registration(&form).await?;
    info!(id = %registration.id, "New registration");

    Ok(Json(CreatedResponse {
        success: true,
        id: registration.id,
    }))
}

/// `POST /api/invitations`
pub async fn create_invitation(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(form), _): WithRejection<Json<NewInvitation>, ApiError>,
) -> Result<Json<InvitationCreatedResponse>, ApiError> {
    require_field(&form.inviter_name, "inviterName")?;
    require_field(&form.invitee_name, "inviteeName")?;
    require_field(&form.invitee_phone, "inviteePhone")?;

    let invitation = state.store.add_invitation(&form).await?;
    info!(id = %invitation.id, inviter = %invitation.inviter_name, "New invitation");

    Ok(Json(InvitationCreatedResponse {
        success: true,
        registration_link: state.registration_link(&invitation.id),
        has_email: invitation.invitee_email.is_some(),
        id: invitation.id,
    }))
}

/// `GET /api/participants?search=`
pub async fn search_participants(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ParticipantQuery>,
) -> Result<Json<ParticipantsResponse>, ApiError> {
    let all = state.store.list_participants().await?;
    let participants = filter_participants(
        all,
        query.search.as_deref().unwrap_or_default(),
        PARTICIPANT_SEARCH_LIMIT,
    );

    Ok(Json(ParticipantsResponse {
        success: true,
        total: participants.len(),
        participants,
    }))
}
