//! Persistent store for registrations and invitations.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::{DbPool, DbRow};
use crate::sql;

/// Maximum number of participants returned by a search.
pub const PARTICIPANT_SEARCH_LIMIT: usize = 20;

/// Format a timestamp the way it is stored: millisecond precision, `Z` suffix.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// A stored event registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub who_invited: String,
    pub heard_from: String,
    pub created_at: DateTime<Utc>,
}

/// Registration form submitted by an attendee.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewRegistration {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub who_invited: String,
    pub heard_from: String,
}

/// Delivery status of an invitation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    #[default]
    Sent,
    Pending,
    Registered,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Sent => "sent",
            InvitationStatus::Pending => "pending",
            InvitationStatus::Registered => "registered",
        }
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvitationStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(InvitationStatus::Sent),
            "pending" => Ok(InvitationStatus::Pending),
            "registered" => Ok(InvitationStatus::Registered),
            _ => Err(anyhow!("Unknown invitation status: {s}")),
        }
    }
}

/// A stored invitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub id: String,
    pub inviter_name: String,
    pub invitee_name: String,
    pub invitee_phone: String,
    pub invitee_email: Option<String>,
    pub location: String,
    pub custom_message: String,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
}

/// Invitation form submitted by an inviter.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewInvitation {
    pub inviter_name: String,
    pub invitee_name: String,
    pub invitee_phone: String,
    pub invitee_email: Option<String>,
    pub location: String,
    pub custom_message: String,
}

/// Registered attendee as shown in the inviter's participant picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl Participant {
    fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.email.to_lowercase().contains(needle)
            || self.phone.to_lowercase().contains(needle)
    }
}

/// Filter participants by a case-insensitive substring of name, email or
/// phone, keeping at most `limit` results in their original order.
///
/// A blank search matches everyone.
pub fn filter_participants(
    participants: Vec<Participant>,
    search: &str,
    limit: usize,
) -> Vec<Participant> {
    let needle = search.trim().to_lowercase();
    participants
        .into_iter()
        .filter(|p| needle.is_empty() || p.matches(&needle))
        .take(limit)
        .collect()
}

/// Database-backed storage for registrations and invitations.
pub struct EventStore {
    pool: DbPool,
}

impl EventStore {
    /// Create a new EventStore using the given database pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Store a registration received now.
    pub async fn add_registration(&self, form: &NewRegistration) -> Result<Registration> {
        self.add_registration_at(form, Utc::now()).await
    }

    /// Store a registration with an explicit creation time.
    pub async fn add_registration_at(
        &self,
        form: &NewRegistration,
        created_at: DateTime<Utc>,
    ) -> Result<Registration> {
        let created_at = created_at.trunc_subsecs(3);
        let registration = Registration {
            id: Uuid::new_v4().to_string(),
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            phone: form.phone.trim().to_string(),
            address: form.address.trim().to_string(),
            who_invited: form.who_invited.trim().to_string(),
            heard_from: form.heard_from.trim().to_string(),
            created_at,
        };

        sqlx::query(sql::INSERT_REGISTRATION)
            .bind(&registration.id)
            .bind(&registration.name)
            .bind(&registration.email)
            .bind(&registration.phone)
            .bind(&registration.address)
            .bind(&registration.who_invited)
            .bind(&registration.heard_from)
            .bind(format_timestamp(created_at))
            .execute(&self.pool)
            .await
            .context("Failed to store registration")?;

        debug!("Stored registration {}", registration.id);
        Ok(registration)
    }

    /// All registrations, newest first.
    pub async fn list_registrations(&self) -> Result<Vec<Registration>> {
        let rows = sqlx::query(sql::SELECT_ALL_REGISTRATIONS)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list registrations")?;

        rows.iter().map(row_to_registration).collect()
    }

    /// Store an invitation received now. New invitations start as `sent`.
    pub async fn add_invitation(&self, form: &NewInvitation) -> Result<Invitation> {
        self.add_invitation_at(form, Utc::now()).await
    }

    /// Store an invitation with an explicit creation time.
    pub async fn add_invitation_at(
        &self,
        form: &NewInvitation,
        created_at: DateTime<Utc>,
    ) -> Result<Invitation> {
        let created_at = created_at.trunc_subsecs(3);
        let invitation = Invitation {
            id: Uuid::new_v4().to_string(),
            inviter_name: form.inviter_name.trim().to_string(),
            invitee_name: form.invitee_name.trim().to_string(),
            invitee_phone: form.invitee_phone.trim().to_string(),
            invitee_email: form
                .invitee_email
                .as_deref()
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string),
            location: form.location.trim().to_string(),
            custom_message: form.custom_message.clone(),
            status: InvitationStatus::Sent,
            created_at,
        };

        sqlx::query(sql::INSERT_INVITATION)
            .bind(&invitation.id)
            .bind(&invitation.inviter_name)
            .bind(&invitation.invitee_name)
            .bind(&invitation.invitee_phone)
            .bind(&invitation.invitee_email)
            .bind(&invitation.location)
            .bind(&invitation.custom_message)
            .bind(invitation.status.as_str())
            .bind(format_timestamp(created_at))
            .execute(&self.pool)
            .await
            .context("Failed to store invitation")?;

        debug!("Stored invitation {}", invitation.id);
        Ok(invitation)
    }

    /// All invitations, newest first.
    pub async fn list_invitations(&self) -> Result<Vec<Invitation>> {
        let rows = sqlx::query(sql::SELECT_ALL_INVITATIONS)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list invitations")?;

        rows.iter().map(row_to_invitation).collect()
    }

    /// Registered attendees, newest first.
    pub async fn list_participants(&self) -> Result<Vec<Participant>> {
        let rows = sqlx::query(sql::SELECT_PARTICIPANTS)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list participants")?;

        rows.iter()
            .map(|row| -> Result<Participant> {
                Ok(Participant {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    email: row.try_get("email")?,
                    phone: row.try_get("phone")?,
                })
            })
            .collect()
    }

    /// Creation times of registrations at or after `start`.
    pub async fn registration_times_since(&self, start: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>> {
        self.times_since(sql::SELECT_REGISTRATION_TIMES_SINCE, start)
            .await
            .context("Failed to query registration times")
    }

    /// Creation times of invitations at or after `start`.
    pub async fn invitation_times_since(&self, start: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>> {
        self.times_since(sql::SELECT_INVITATION_TIMES_SINCE, start)
            .await
            .context("Failed to query invitation times")
    }

    async fn times_since(&self, query: &str, start: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>> {
        let rows = sqlx::query(query)
            .bind(format_timestamp(start))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let raw: String = row.try_get("created_at").ok()?;
                let parsed = parse_timestamp(&raw);
                if parsed.is_none() {
                    warn!("Skipping record with unparsable created_at: {}", raw);
                }
                parsed
            })
            .collect())
    }
}

fn row_created_at(row: &DbRow) -> Result<DateTime<Utc>> {
    let raw: String = row.try_get("created_at")?;
    parse_timestamp(&raw).ok_or_else(|| anyhow!("Invalid created_at timestamp: {raw}"))
}

fn row_to_registration(row: &DbRow) -> Result<Registration> {
    Ok(Registration {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        who_invited: row.try_get("who_invited")?,
        heard_from: row.try_get("heard_from")?,
        created_at: row_created_at(row)?,
    })
}

fn row_to_invitation(row: &DbRow) -> Result<Invitation> {
    let status: String = row.try_get("status")?;
    Ok(Invitation {
        id: row.try_get("id")?,
        inviter_name: row.try_get("inviter_name")?,
        invitee_name: row.try_get("invitee_name")?,
        invitee_phone: row.try_get("invitee_phone")?,
        invitee_email: row.try_get("invitee_email")?,
        location: row.try_get("location")?,
        custom_message: row.try_get("custom_message")?,
        status: status.parse()?,
        created_at: row_created_at(row)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn participant(name: &str, email: &str, phone: &str) -> Participant {
        Participant {
            id: name.to_lowercase(),
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
        }
    }

    #[test]
    fn test_timestamp_format_is_sortable() {
        let a = Utc.with_ymd_and_hms(2026, 1, 9, 23, 59, 59).unwrap();
        let b = Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap();
        assert_eq!(format_timestamp(b), "2026-01-10T00:00:00.000Z");
        assert!(format_timestamp(a) < format_timestamp(b));
        assert_eq!(parse_timestamp(&format_timestamp(a)), Some(a));
    }

    #[test]
    fn test_invitation_status_strings() {
        for status in [
            InvitationStatus::Sent,
            InvitationStatus::Pending,
            InvitationStatus::Registered,
        ] {
            assert_eq!(status.as_str().parse::<InvitationStatus>().unwrap(), status);
        }
        assert!("bogus".parse::<InvitationStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&InvitationStatus::Registered).unwrap(),
            "\"registered\""
        );
    }

    #[test]
    fn test_filter_participants() {
        let all = vec![
            participant("Ada Obi", "ada@example.com", "+2348011112222"),
            participant("Bola Ade", "bola@example.com", "+2348033334444"),
            participant("Chidi", "CHIDI@Mail.com", "0803"),
        ];

        let hits = filter_participants(all.clone(), "  ADE ", 20);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Bola Ade");

        let hits = filter_participants(all.clone(), "mail.com", 20);
        assert_eq!(hits[0].name, "Chidi");

        let hits = filter_participants(all.clone(), "3333", 20);
        assert_eq!(hits[0].name, "Bola Ade");

        assert_eq!(filter_participants(all.clone(), "", 20).len(), 3);
        assert_eq!(filter_participants(all.clone(), "example", 1).len(), 1);
        assert!(filter_participants(all, "zzz", 20).is_empty());
    }

    #[test]
    fn test_registration_json_field_names() {
        let reg = Registration {
            id: "r1".into(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            phone: String::new(),
            address: String::new(),
            who_invited: "Bola".into(),
            heard_from: "Friend".into(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap(),
        };
        let json = serde_json::to_value(&reg).unwrap();
        assert_eq!(json["whoInvited"], "Bola");
        assert_eq!(json["heardFrom"], "Friend");
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_new_invitation_accepts_partial_json() {
        let form: NewInvitation = serde_json::from_str(
            r#"{"inviterName":"Ada","inviteeName":"Bola","inviteePhone":"0801"}"#,
        )
        .unwrap();
        assert_eq!(form.inviter_name, "Ada");
        assert_eq!(form.invitee_email, None);
        assert!(form.location.is_empty());
    }
}
