// ============================
// crates/backend-bin/src/main.rs
// ============================
//! Entry point of the `gatekeeper` authentication service.
use anyhow::{Context, Result};
use clap::Parser;
use gatekeeper_common::{CreateUserInput, ADMIN_ROLE};
use gatekeeper_lib::{
    auth::SessionManager,
    config::{BootstrapSettings, Settings, DEFAULT_CONFIG_FILE},
    error::AuthError,
    router::create_router,
    storage::{MemorySessionStore, MemoryUserStore},
    tasks::{spawn_lockout_sweeper, spawn_session_sweeper},
    AppState,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "gatekeeper", version, about = "Session, lockout and rate limiting service")]
struct Cli {
    /// Path of the TOML configuration file
    #[arg(short, long, env = "GATEKEEPER_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, env = "GATEKEEPER_JSON_LOGS")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load_from(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;

    init_tracing(&settings.log_level, cli.json_logs);

    let users = Arc::new(MemoryUserStore::new());
    let sessions = Arc::new(MemorySessionStore::new());
    let state = Arc::new(AppState::new(users, sessions.clone(), settings));

    bootstrap_admin(&state.sessions, &state.settings.bootstrap).await?;

    if let Some(every) = state.settings.auth.session_sweep_interval() {
        spawn_session_sweeper(sessions, every);
    }
    if let Some(every) = state.settings.auth.lockout_sweep_interval() {
        spawn_lockout_sweeper(Arc::clone(&state.sessions), every);
    }

    let addr = state.settings.bind_addr()?;
    let app = create_router(Arc::clone(&state));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn init_tracing(log_level: &str, json: bool) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Seed the configured admin account. An existing account is left alone.
async fn bootstrap_admin(manager: &SessionManager, bootstrap: &BootstrapSettings) -> Result<()> {
    let (Some(identifier), Some(password)) =
        (&bootstrap.admin_identifier, &bootstrap.admin_password)
    else {
        return Ok(());
    };

    let input = CreateUserInput {
        identifier: identifier.clone(),
        email: bootstrap.admin_email.clone().unwrap_or_default(),
        password: password.clone(),
        display_name: "Administrator".to_string(),
        role: Some(ADMIN_ROLE.to_string()),
        ..CreateUserInput::default()
    };

    match manager.register(input).await {
        Ok(user) => {
            info!(user_id = %user.id, identifier = %user.identifier, "admin account created")
        }
        Err(AuthError::IdentifierTaken) => {
            warn!(identifier = %identifier, "admin account already exists")
        }
        Err(err) => return Err(err).context("failed to create admin account"),
    }

    Ok(())
}
