//! Identity provider client.
//!
//! Verifies the opaque identity token a client presents at login and
//! returns the subject id, email and admin flag. The rest of the service
//! only ever sees [`VerifiedIdentity`].

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use reqwest::{Client, Url};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Google's public JWK set for Firebase ID tokens.
pub const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Firebase Auth REST endpoint for email/password sign-in.
pub const FIREBASE_SIGN_IN_URL: &str =
    "https://identitytoolkit.googleapis.com/v1/accounts:signInWithPassword";

/// Keys are not refetched more often than this for an unknown key id.
const MIN_REFETCH_INTERVAL_SECS: i64 = 60;

/// Email/password sign-in URL for the project owning `api_key`.
pub fn password_sign_in_url(api_key: &str) -> Result<String> {
    let url = Url::parse_with_params(FIREBASE_SIGN_IN_URL, &[("key", api_key)])
        .context("Invalid sign-in URL")?;
    Ok(url.into())
}

/// Identity returned by a successful token verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: Option<String>,
    /// Custom `admin` claim.
    pub admin: bool,
}

/// Verifies client-supplied identity tokens.
///
/// Implemented by the Firebase client (production) and a mock (dry-run
/// and tests).
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify_id_token(&self, id_token: &str) -> Result<VerifiedIdentity>;
}

/// Mock provider for dry-run/testing mode.
///
/// Accepts `uid`, `uid:email` or `uid:email:admin` as the token.
pub struct MockIdentityProvider;

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn verify_id_token(&self, id_token: &str) -> Result<VerifiedIdentity> {
        let mut parts = id_token.splitn(3, ':');
        let uid = parts.next().unwrap_or_default().trim();
        if uid.is_empty() {
            bail!("Mock identity token has no subject");
        }
        let email = parts
            .next()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string);
        let admin = parts.next().is_some_and(|flag| flag.trim() == "admin");

        info!("DRY-RUN: accepted mock identity token for {}", uid);
        Ok(VerifiedIdentity {
            uid: uid.to_string(),
            email,
            admin,
        })
    }
}

/// Claims we read from a Firebase ID token.
#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    admin: Option<bool>,
}

/// Fetched key set with its fetch time.
struct CachedKeys {
    keys: JwkSet,
    fetched_at: DateTime<Utc>,
}

impl CachedKeys {
    fn is_fresh(&self) -> bool {
        self.fetched_at + Duration::hours(1) > Utc::now()
    }

    fn fetched_recently(&self) -> bool {
        self.fetched_at + Duration::seconds(MIN_REFETCH_INTERVAL_SECS) > Utc::now()
    }
}

/// Verifies Firebase Authentication ID tokens (RS256) against Google's
/// published signing keys.
pub struct FirebaseIdentityProvider {
    client: Client,
    project_id: String,
    jwks_url: String,
    keys: RwLock<Option<CachedKeys>>,
}

impl FirebaseIdentityProvider {
    pub fn new(project_id: impl Into<String>, jwks_url: impl Into<String>) -> Result<Self> {
        let project_id = project_id.into();
        if project_id.trim().is_empty() {
            bail!("identity.project_id must be set to verify Firebase ID tokens");
        }

        let client = Client::builder()
            .user_agent("hillz-shift")
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            project_id,
            jwks_url: jwks_url.into(),
            keys: RwLock::new(None),
        })
    }

    fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }

    async fn fetch_keys(&self) -> Result<JwkSet> {
        debug!("Fetching identity provider keys from {}", self.jwks_url);
        let keys = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .context("Failed to fetch identity provider keys")?
            .error_for_status()
            .context("Identity provider key endpoint returned an error")?
            .json::<JwkSet>()
            .await
            .context("Failed to parse identity provider key set")?;
        Ok(keys)
    }

    /// Look up the key for `kid`, refreshing the cache when it is stale or
    /// the key is unknown (Google rotates keys regularly). Unknown ids do
    /// not trigger a refetch within a minute of the last one.
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey> {
        {
            let cache = self.keys.read().await;
            if let Some(cached) = cache.as_ref()
                && cached.is_fresh()
            {
                if let Some(jwk) = cached.keys.find(kid) {
                    return DecodingKey::from_jwk(jwk).context("Invalid signing key");
                }
                if cached.fetched_recently() {
                    debug!("Key id {} not in recently fetched key set", kid);
                    bail!("Unknown signing key id: {kid}");
                }
            }
        }

        let keys = self.fetch_keys().await?;
        let key = keys
            .find(kid)
            .map(DecodingKey::from_jwk)
            .transpose()
            .context("Invalid signing key")?;

        *self.keys.write().await = Some(CachedKeys {
            keys,
            fetched_at: Utc::now(),
        });

        key.ok_or_else(|| anyhow!("Unknown signing key id: {kid}"))
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityProvider {
    async fn verify_id_token(&self, id_token: &str) -> Result<VerifiedIdentity> {
        let header = jsonwebtoken::decode_header(id_token).context("Malformed ID token")?;
        if header.alg != Algorithm::RS256 {
            bail!("Unexpected ID token algorithm: {:?}", header.alg);
        }
        let kid = header.kid.ok_or_else(|| anyhow!("ID token has no key id"))?;
        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[self.issuer()]);
        validation.set_required_spec_claims(&["exp", "iat", "sub", "aud", "iss"]);

        let claims = jsonwebtoken::decode::<FirebaseClaims>(id_token, &key, &validation)
            .context("ID token verification failed")?
            .claims;

        if claims.sub.is_empty() {
            bail!("ID token has an empty subject");
        }

        Ok(VerifiedIdentity {
            uid: claims.sub,
            email: claims.email.filter(|e| !e.is_empty()),
            admin: claims.admin == Some(true),
        })
    }
}
