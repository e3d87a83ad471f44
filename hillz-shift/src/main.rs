//! Hillz Shift - Main entry point
//!
//! Serves the event registration and invitation API together with the
//! admin area, and offers a few operator commands for admin sessions.

use anyhow::{Context, Result, anyhow};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use hillz_shift::admin::LoginMethod;
use hillz_shift::config::{self, Config};
use hillz_shift::db::Database;
use hillz_shift::gate::SessionGate;
use hillz_shift::identity::{FirebaseIdentityProvider, IdentityProvider, MockIdentityProvider};
use hillz_shift::server::{AppState, run_server};
use hillz_shift::session::SessionSigner;
use hillz_shift::store::EventStore;

/// Hillz Shift - event registrations, invitations and admin area
#[derive(Parser)]
#[command(name = "hillz-shift")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value_os_t = Config::default_path())]
    config: PathBuf,

    /// Data directory for the database and logs
    #[arg(short, long, default_value_os_t = Config::default_data_dir())]
    data_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to listen on (overrides config)
        #[arg(long)]
        listen: Option<SocketAddr>,

        /// Dry-run mode: accept mock identity tokens instead of verifying
        /// them with the identity provider
        #[arg(long)]
        dry_run: bool,
    },

    /// Admin session tools
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// Generate a default configuration file
    InitConfig {
        /// Output path (defaults to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Sign a session cookie value for an admin
    Issue {
        /// Subject id of the admin
        #[arg(long)]
        uid: String,

        /// Email recorded in the session
        #[arg(long)]
        email: Option<String>,

        /// Session lifetime (e.g., "12h", "7d")
        #[arg(long, default_value = "7d")]
        ttl: String,
    },

    /// Check a session cookie value and print its contents
    Verify {
        /// Cookie value (`payload.signature`)
        token: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on command type
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    match cli.command {
        Commands::Serve { listen, dry_run } => {
            // For daemon mode: log to both stdout and file with rotation
            init_daemon_logging(&cli.data_dir, filter)?;
            serve(&cli.config, &cli.data_dir, listen, dry_run).await
        }
        Commands::Session { command } => {
            init_cli_logging(filter);
            handle_session_command(command, &cli.config)
        }
        Commands::InitConfig { output } => {
            init_cli_logging(filter);
            generate_config(output)
        }
    }
}

/// Initialize logging for CLI commands (stdout only).
fn init_cli_logging(filter: EnvFilter) {
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

/// Initialize logging for daemon mode (stdout + rotating file).
fn init_daemon_logging(data_dir: &Path, filter: EnvFilter) -> Result<()> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    // Daily rotating file, e.g. hillz-shift.2026-01-15.log
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("hillz-shift")
        .filename_suffix("log")
        .build(&log_dir)
        .with_context(|| "Failed to create log file appender")?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The writer must outlive every log call; the server runs until exit.
    std::mem::forget(guard);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false)) // stdout
        .with(fmt::layer().with_target(true).with_ansi(false).with_writer(non_blocking)) // file
        .init();

    info!("Logging to: {}", log_dir.display());
    Ok(())
}

/// Run the HTTP server
async fn serve(
    config_path: &Path,
    data_dir: &Path,
    listen_override: Option<SocketAddr>,
    dry_run: bool,
) -> Result<()> {
    ensure_data_dir(data_dir)?;

    let config = Config::load(config_path)?;

    let listen_addr: SocketAddr = match listen_override {
        Some(addr) => addr,
        None => config.http.listen_addr.parse().with_context(|| {
            format!("Invalid listen address in config: {}", config.http.listen_addr)
        })?,
    };

    let signer = SessionSigner::new(config.admin.cookie_secret.as_deref())
        .context("Cannot sign admin sessions")?;
    let session_ttl_secs = config.admin.session_ttl()?;

    let allow_list = config.admin.allow_list();
    if allow_list.is_empty() {
        warn!("admin.emails is empty: every verified identity is granted admin access");
    } else {
        info!("Admin allow-list has {} address(es)", allow_list.len());
    }

    let (identity, login_method): (Arc<dyn IdentityProvider>, LoginMethod) = if dry_run {
        warn!("DRY-RUN: identity tokens are NOT verified (format: uid[:email[:admin]])");
        (Arc::new(MockIdentityProvider), LoginMethod::Token)
    } else {
        let api_key = config
            .identity
            .api_key()
            .context("identity.api_key must be set for the admin login page")?;
        (
            Arc::new(FirebaseIdentityProvider::new(
                config.identity.project_id.clone(),
                config.identity.jwks_url.clone(),
            )?),
            LoginMethod::password(api_key)?,
        )
    };

    let database = Database::new(&config.database, data_dir).await?;

    let state = Arc::new(AppState {
        gate: SessionGate::new(signer, allow_list),
        identity,
        store: EventStore::new(database.pool()),
        session_ttl_secs,
        secure_cookies: config.admin.secure_cookies,
        public_url: config.http.public_url.clone(),
        login_method,
    });

    if !config.admin.secure_cookies {
        warn!("admin.secure_cookies is off: session cookies will be sent over plain HTTP");
    }

    run_server(listen_addr, state).await
}

/// Ensure data directory exists
fn ensure_data_dir(data_dir: &Path) -> Result<()> {
    if !data_dir.exists() {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
        info!("Created data directory: {}", data_dir.display());
    }
    Ok(())
}

/// Handle admin session commands
fn handle_session_command(command: SessionCommands, config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let signer = SessionSigner::new(config.admin.cookie_secret.as_deref())
        .context("Cannot sign admin sessions")?;

    match command {
        SessionCommands::Issue { uid, email, ttl } => {
            let ttl = parse_duration(&ttl)?;
            let ttl_secs = u64::try_from(ttl.num_seconds())
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| anyhow!("Session lifetime must be positive"))?;

            let expires_at = Utc::now()
                .checked_add_signed(ttl)
                .ok_or_else(|| anyhow!("Session lifetime is too long"))?;
            let token = signer.sign(&uid, email.as_deref(), ttl_secs)?;
            println!("{token}");
            println!("Expires: {}", expires_at.to_rfc3339());
            Ok(())
        }
        SessionCommands::Verify { token } => {
            let Some(user) = signer.verify(token.trim()) else {
                println!("invalid");
                return Err(anyhow!("Session is invalid or expired"));
            };

            let permitted = config.admin.allow_list().permits(user.email.as_deref());
            println!("{}", serde_json::to_string_pretty(&user)?);
            if !permitted {
                println!("Note: this email is not on the admin allow-list.");
            }
            Ok(())
        }
    }
}

/// Generate a default configuration file
fn generate_config(output: Option<PathBuf>) -> Result<()> {
    let config = config::default_config_template();

    match output {
        Some(path) => {
            std::fs::write(&path, &config)
                .with_context(|| format!("Failed to write config: {}", path.display()))?;
            println!("Configuration written to: {}", path.display());
        }
        None => {
            print!("{config}");
        }
    }

    Ok(())
}

/// Parse a duration string like "1h", "30m", "7d"
fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let Some((unit_start, _)) = s.char_indices().last() else {
        return Err(anyhow!("Empty duration string"));
    };

    let (num_str, unit) = s.split_at(unit_start);
    let num: i64 = num_str.parse().context("Invalid duration number")?;

    let duration = match unit {
        "s" => Duration::try_seconds(num),
        "m" => Duration::try_minutes(num),
        "h" => Duration::try_hours(num),
        "d" => Duration::try_days(num),
        _ => return Err(anyhow!("Unknown duration unit: {}. Use s, m, h, or d", unit)),
    };
    duration.ok_or_else(|| anyhow!("Duration out of range: {s}"))
}
