//! Configuration loading.
//!
//! Loads configuration from a TOML file and/or environment variables using
//! figment, so the service runs equally well from a config file or inside a
//! container.
//!
//! # Configuration Sources (in order of priority, lowest to highest)
//!
//! 1. Default values (from `#[serde(default)]` attributes)
//! 2. TOML config file (if it exists)
//! 3. Environment variables (prefix: `HILLZ_`, nested with `__`)
//!
//! # Environment Variable Naming
//!
//! - `HILLZ_ADMIN__COOKIE_SECRET` → `admin.cookie_secret`
//! - `HILLZ_ADMIN__EMAILS` → `admin.emails` (comma-separated)
//! - `HILLZ_HTTP__LISTEN_ADDR` → `http.listen_addr`
//! - `HILLZ_IDENTITY__PROJECT_ID` → `identity.project_id`
//! - `HILLZ_IDENTITY__API_KEY` → `identity.api_key`

use anyhow::{Context, Result, bail};
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::gate::AllowList;
use crate::identity::FIREBASE_JWKS_URL;
use crate::session::DEFAULT_SESSION_TTL_SECS;

/// Main configuration for the service.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub database: DatabaseConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    /// Address to listen on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Public base URL, used to build registration links in invitations
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            public_url: default_public_url(),
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_public_url() -> String {
    "http://localhost:3000".to_string()
}

/// Admin session settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdminConfig {
    /// HMAC secret for session cookies. Required to serve.
    #[serde(default)]
    pub cookie_secret: Option<String>,

    /// Comma-separated admin email allow-list. Empty admits any verified
    /// identity.
    #[serde(default)]
    pub emails: String,

    /// Session lifetime in seconds (default: 7 days)
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Set the `Secure` attribute on session cookies
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            cookie_secret: None,
            emails: String::new(),
            session_ttl_secs: default_session_ttl(),
            secure_cookies: default_secure_cookies(),
        }
    }
}

impl AdminConfig {
    pub fn allow_list(&self) -> AllowList {
        AllowList::parse(&self.emails)
    }

    /// Session lifetime, checked so that signing can never fail on it.
    pub fn session_ttl(&self) -> Result<u64> {
        if self.session_ttl_secs == 0 {
            bail!("admin.session_ttl_secs must be greater than zero");
        }
        if i64::try_from(self.session_ttl_secs).is_err() {
            bail!(
                "admin.session_ttl_secs is too large: {} (max {})",
                self.session_ttl_secs,
                i64::MAX
            );
        }
        Ok(self.session_ttl_secs)
    }
}

fn default_session_ttl() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

fn default_secure_cookies() -> bool {
    true
}

/// Identity provider settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentityConfig {
    /// Firebase project id the ID tokens are issued for
    #[serde(default)]
    pub project_id: String,

    /// JWK set used to verify ID token signatures
    #[serde(default = "default_jwks_url")]
    pub jwks_url: String,

    /// Firebase Web API key. The login page uses it for email/password
    /// sign-in; required unless serving with `--dry-run`.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl IdentityConfig {
    /// The Web API key, if one is set and not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            jwks_url: default_jwks_url(),
            api_key: None,
        }
    }
}

fn default_jwks_url() -> String {
    FIREBASE_JWKS_URL.to_string()
}

/// SQLite database configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    /// If not specified, defaults to `hillz.db` in the data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from TOML file and environment variables.
    pub fn load(path: &Path) -> Result<Self> {
        Self::figment(path)
            .extract()
            .with_context(|| format!("Failed to load config from {} and environment", path.display()))
    }

    fn figment(path: &Path) -> Figment {
        let mut figment = Figment::new();

        if path.exists() {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed("HILLZ_").split("__"))
    }

    /// Get the default config file path
    /// - macOS: ~/Library/Application Support/hillz-shift/config.toml
    /// - Linux: ~/.config/hillz-shift/config.toml
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hillz-shift")
            .join("config.toml")
    }

    /// Get the default data directory (database, logs)
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hillz-shift")
    }
}

/// Generate a random alphanumeric cookie secret.
pub fn generate_secret() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// Create a default configuration template with a fresh cookie secret.
pub fn default_config_template() -> String {
    let data_dir = Config::default_data_dir();
    let data_dir_str = data_dir.display();
    let secret = generate_secret();

    format!(
        r#"# Hillz Shift Configuration
# Data directory: {data_dir_str}

[http]
listen_addr = "0.0.0.0:3000"
# Base URL used in invitation registration links
public_url = "http://localhost:3000"

[admin]
# HMAC secret for admin session cookies. Keep it private; changing it
# signs every admin out.
cookie_secret = "{secret}"

# Comma-separated admin allow-list. When empty, ANY identity the provider
# verifies gets admin access.
emails = ""

# Session lifetime in seconds (7 days)
session_ttl_secs = 604800

# Disable only for local development over plain HTTP
secure_cookies = true

[identity]
# Firebase project whose ID tokens are accepted at login
project_id = ""
# Web API key of the same project, used by the admin login page
api_key = ""

[database]
# path = "{data_dir_str}/hillz.db"  # Optional, defaults to data_dir/hillz.db
"#
    )
}
