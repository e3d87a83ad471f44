//! Authorization gate for admin-only operations.
//!
//! Every handler that returns admin data, and the admin UI shell, goes
//! through [`SessionGate::require_admin_session`] before doing any work.

use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::Utc;
use std::collections::HashSet;
use time::Duration as CookieDuration;

use crate::error::AdminAuthError;
use crate::identity::VerifiedIdentity;
use crate::session::{AdminCookieUser, SessionSigner};

/// Cookie carrying the signed admin session.
pub const SESSION_COOKIE: &str = "hs_admin_user";

/// Admin email allow-list.
///
/// An empty list permits every verified identity. Set `admin.emails` to
/// restrict access.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    emails: HashSet<String>,
}

impl AllowList {
    /// Parse a comma-separated list, trimming and lowercasing entries.
    pub fn parse(raw: &str) -> Self {
        let emails = raw
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        Self { emails }
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    /// Whether `email` may access admin data.
    pub fn permits(&self, email: Option<&str>) -> bool {
        if self.emails.is_empty() {
            return true;
        }
        match email.map(|e| e.trim().to_lowercase()) {
            Some(e) if !e.is_empty() => self.emails.contains(&e),
            _ => false,
        }
    }
}

/// Signer plus allow-list: everything needed to authorize an admin request.
#[derive(Debug, Clone)]
pub struct SessionGate {
    signer: SessionSigner,
    allow_list: AllowList,
}

impl SessionGate {
    pub fn new(signer: SessionSigner, allow_list: AllowList) -> Self {
        Self { signer, allow_list }
    }

    pub fn signer(&self) -> &SessionSigner {
        &self.signer
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    /// Verify the session cookie value and check the allow-list.
    pub fn require_admin_session(
        &self,
        cookie: Option<&str>,
    ) -> Result<AdminCookieUser, AdminAuthError> {
        self.require_admin_session_at(cookie, Utc::now().timestamp())
    }

    pub fn require_admin_session_at(
        &self,
        cookie: Option<&str>,
        now: i64,
    ) -> Result<AdminCookieUser, AdminAuthError> {
        let user = cookie
            .and_then(|raw| self.signer.verify_at(raw, now))
            .ok_or(AdminAuthError::Unauthenticated)?;

        if !self.allow_list.permits(user.email.as_deref()) {
            return Err(AdminAuthError::Forbidden);
        }
        Ok(user)
    }

    /// Login-time eligibility: admin custom claim OR allow-list membership.
    pub fn is_admin_eligible(&self, identity: &VerifiedIdentity) -> bool {
        identity.admin || self.allow_list.permits(identity.email.as_deref())
    }
}

/// Build the cookie set on successful login.
pub fn session_cookie(value: String, ttl_secs: u64, secure: bool) -> Cookie<'static> {
    let max_age = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
    Cookie::build((SESSION_COOKIE, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(secure)
        .max_age(CookieDuration::seconds(max_age))
        .build()
}

/// Build the cookie that overwrites the session on logout.
pub fn cleared_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(secure)
        .max_age(CookieDuration::ZERO)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_767_225_600;

    fn gate(emails: &str) -> SessionGate {
        let signer = SessionSigner::new(Some("gate-test-secret")).unwrap();
        SessionGate::new(signer, AllowList::parse(emails))
    }

    fn token(gate: &SessionGate, email: Option<&str>) -> String {
        gate.signer().sign_at("uid-1", email, 3600, NOW).unwrap()
    }

    #[test]
    fn test_allow_list_parse() {
        let list = AllowList::parse(" a@x.com, B@Y.com ,, ");
        assert_eq!(list.len(), 2);
        assert!(list.permits(Some("a@x.com")));
        assert!(list.permits(Some("b@y.com")));
        assert!(!list.permits(Some("c@z.com")));
        assert!(!list.permits(None));
        assert!(!list.permits(Some("")));
    }

    #[test]
    fn test_empty_allow_list_is_fail_open() {
        let list = AllowList::parse("");
        assert!(list.is_empty());
        assert!(list.permits(Some("anyone@anywhere.com")));
        assert!(list.permits(None));

        let list = AllowList::parse(" , ,");
        assert!(list.is_empty());
    }

    #[test]
    fn test_gate_case_insensitive_match() {
        let g = gate("a@x.com");
        let t = token(&g, Some("A@X.com"));
        let user = g.require_admin_session_at(Some(&t), NOW).unwrap();
        assert_eq!(user.email.as_deref(), Some("A@X.com"));
    }

    #[test]
    fn test_gate_forbids_unlisted_email() {
        let g = gate("a@x.com");
        let t = token(&g, Some("b@x.com"));
        assert_eq!(
            g.require_admin_session_at(Some(&t), NOW),
            Err(AdminAuthError::Forbidden)
        );

        let t = token(&g, None);
        assert_eq!(
            g.require_admin_session_at(Some(&t), NOW),
            Err(AdminAuthError::Forbidden)
        );
    }

    #[test]
    fn test_gate_with_empty_allow_list_admits_any_verified_token() {
        let g = gate("");
        for email in [Some("b@x.com"), Some("whoever@example.org"), None] {
            let t = token(&g, email);
            assert!(g.require_admin_session_at(Some(&t), NOW).is_ok());
        }
    }

    #[test]
    fn test_gate_unauthenticated() {
        let g = gate("a@x.com");
        assert_eq!(
            g.require_admin_session_at(None, NOW),
            Err(AdminAuthError::Unauthenticated)
        );
        assert_eq!(
            g.require_admin_session_at(Some("garbage"), NOW),
            Err(AdminAuthError::Unauthenticated)
        );

        let t = token(&g, Some("a@x.com"));
        assert_eq!(
            g.require_admin_session_at(Some(&t), NOW + 3600),
            Err(AdminAuthError::Unauthenticated)
        );
    }

    #[test]
    fn test_login_eligibility() {
        let g = gate("a@x.com");
        let listed = VerifiedIdentity {
            uid: "u1".into(),
            email: Some("A@x.com".into()),
            admin: false,
        };
        let claimed = VerifiedIdentity {
            uid: "u2".into(),
            email: Some("other@x.com".into()),
            admin: true,
        };
        let neither = VerifiedIdentity {
            uid: "u3".into(),
            email: Some("other@x.com".into()),
            admin: false,
        };
        assert!(g.is_admin_eligible(&listed));
        assert!(g.is_admin_eligible(&claimed));
        assert!(!g.is_admin_eligible(&neither));
    }

    #[test]
    fn test_session_cookie_attributes() {
        let c = session_cookie("tok".into(), 604_800, true);
        assert_eq!(c.name(), SESSION_COOKIE);
        assert_eq!(c.value(), "tok");
        assert_eq!(c.http_only(), Some(true));
        assert_eq!(c.same_site(), Some(SameSite::Lax));
        assert_eq!(c.path(), Some("/"));
        assert_eq!(c.secure(), Some(true));
        assert_eq!(c.max_age(), Some(CookieDuration::seconds(604_800)));
    }

    #[test]
    fn test_cleared_cookie_attributes() {
        let c = cleared_session_cookie(false);
        assert_eq!(c.value(), "");
        assert_eq!(c.max_age(), Some(CookieDuration::ZERO));
        assert_eq!(c.secure(), Some(false));
        assert_eq!(c.http_only(), Some(true));
    }
}
