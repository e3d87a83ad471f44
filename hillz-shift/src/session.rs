//! Stateless admin session tokens.
//!
//! A token is `base64url(payload) + "." + base64url(hmac_sha256(encoded_payload))`
//! where the payload is the JSON encoding of [`AdminCookieUser`]. Nothing is
//! persisted server-side: validity is re-derived from the signature and the
//! `exp` field on every request.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;

use crate::error::AdminAuthError;

type HmacSha256 = Hmac<Sha256>;

/// Default session lifetime: 7 days.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Signed contents of an admin session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCookieUser {
    /// Subject id from the identity provider.
    pub uid: String,
    /// Email used for the allow-list check.
    pub email: Option<String>,
    /// Issued-at, seconds since epoch.
    pub iat: i64,
    /// Expiry, seconds since epoch. Always greater than `iat`.
    pub exp: i64,
}

/// Signs and verifies admin session tokens with a server-held secret.
#[derive(Clone)]
pub struct SessionSigner {
    mac: HmacSha256,
}

impl fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSigner")
            .field("mac", &"<redacted>")
            .finish()
    }
}

impl SessionSigner {
    /// Build a signer from the configured secret.
    ///
    /// A missing or blank secret is a configuration error; there is no
    /// fallback that would issue unsigned sessions.
    pub fn new(secret: Option<&str>) -> Result<Self, AdminAuthError> {
        match secret {
            Some(s) if !s.trim().is_empty() => {
                let mac = HmacSha256::new_from_slice(s.as_bytes())
                    .map_err(|e| AdminAuthError::Config(format!("bad cookie secret: {e}")))?;
                Ok(Self { mac })
            }
            _ => Err(AdminAuthError::Config(
                "admin cookie secret is not set (admin.cookie_secret / HILLZ_ADMIN__COOKIE_SECRET)"
                    .to_string(),
            )),
        }
    }

    fn mac(&self) -> HmacSha256 {
        self.mac.clone()
    }

    /// Sign a new session for `uid` valid for `ttl_secs` from now.
    pub fn sign(
        &self,
        uid: &str,
        email: Option<&str>,
        ttl_secs: u64,
    ) -> Result<String, AdminAuthError> {
        self.sign_at(uid, email, ttl_secs, Utc::now().timestamp())
    }

    /// Sign a new session using `now` as the issue time.
    pub fn sign_at(
        &self,
        uid: &str,
        email: Option<&str>,
        ttl_secs: u64,
        now: i64,
    ) -> Result<String, AdminAuthError> {
        if uid.is_empty() {
            return Err(AdminAuthError::Unauthenticated);
        }
        let ttl = i64::try_from(ttl_secs)
            .ok()
            .filter(|t| *t > 0)
            .ok_or_else(|| AdminAuthError::Config(format!("invalid session ttl: {ttl_secs}")))?;

        let user = AdminCookieUser {
            uid: uid.to_string(),
            email: email.map(str::to_string),
            iat: now,
            exp: now.saturating_add(ttl),
        };
        self.encode(&user)
    }

    /// Serialize and sign an already-built record.
    pub fn encode(&self, user: &AdminCookieUser) -> Result<String, AdminAuthError> {
        let json = serde_json::to_vec(user)
            .map_err(|e| AdminAuthError::Config(format!("session encode: {e}")))?;
        let payload = URL_SAFE_NO_PAD.encode(json);

        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{payload}.{sig}"))
    }

    /// Verify a token against the current time.
    pub fn verify(&self, token: &str) -> Option<AdminCookieUser> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verify a token as of `now`.
    ///
    /// Every failure (malformed, forged, unparsable, expired) collapses to
    /// `None` so callers cannot tell them apart.
    pub fn verify_at(&self, token: &str, now: i64) -> Option<AdminCookieUser> {
        let (payload, sig) = token.split_once('.')?;
        if payload.is_empty() || sig.is_empty() || sig.contains('.') {
            return None;
        }

        let sig_bytes = URL_SAFE_NO_PAD.decode(sig).ok()?;
        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        mac.verify_slice(&sig_bytes).ok()?;

        let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
        let user: AdminCookieUser = serde_json::from_slice(&json).ok()?;

        if user.uid.is_empty() || user.exp <= user.iat || user.exp <= now {
            return None;
        }
        Some(user)
    }
}
