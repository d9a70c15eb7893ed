//! ual-session - pick an authenticator from the terminal and keep the session.
//!
//! Runs the session coordinator against demo authenticators so the autologin,
//! resume and selection paths can be tried without a wallet.

mod console;
mod demo;

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ual_session_core::{
    CoordinatorConfig, InitOutcome, RenderConfig, ResumeOutcome, SessionCoordinator,
    SessionStore, StorageKind, StoredSession, UiRenderer, User,
};

use console::ConsoleRenderer;

/// Container name used when the config file has no render section
const DEFAULT_CONTAINER: &str = "terminal";

/// Environment variable overriding the configured storage backend
const STORAGE_ENV: &str = "UAL_SESSION_STORAGE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Login { auto: bool },
    Status,
    Logout,
    Help,
}

fn parse_args(args: &[String]) -> Result<Command> {
    let mut auto = false;
    let mut command = None;
    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--auto" => auto = true,
            "--status" => command = Some(Command::Status),
            "--logout" => command = Some(Command::Logout),
            "-h" | "--help" => command = Some(Command::Help),
            other => return Err(anyhow::anyhow!("Unknown argument: {}", other)),
        }
    }
    Ok(command.unwrap_or(Command::Login { auto }))
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn load_config() -> Result<CoordinatorConfig> {
    let mut config = match CoordinatorConfig::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            CoordinatorConfig::default()
        }
    };

    if let Ok(kind) = std::env::var(STORAGE_ENV) {
        config.storage = kind
            .parse::<StorageKind>()
            .with_context(|| format!("Invalid {}", STORAGE_ENV))?;
    }
    Ok(config)
}

fn print_users(users: &[Arc<dyn User>]) {
    for user in users {
        println!("Logged in as {} on {}", user.account_name(), user.chain_id());
    }
}

fn build_coordinator(config: &CoordinatorConfig, auto: bool) -> Result<SessionCoordinator> {
    let storage = config.open_storage()?;
    let registry = demo::registry(auto)?;
    let render = config.render.clone().unwrap_or_else(|| RenderConfig {
        container_element: DEFAULT_CONTAINER.to_string(),
        button_style_override: false,
    });

    Ok(SessionCoordinator::new(registry, storage, print_users)
        .with_config(config)
        .with_render_config(render)
        .with_renderer_factory(|ctx| Box::new(ConsoleRenderer::new(ctx)) as Box<dyn UiRenderer>))
}

async fn login(config: &CoordinatorConfig, auto: bool) -> Result<()> {
    let mut coordinator = build_coordinator(config, auto)?;

    match coordinator.init().await? {
        InitOutcome::AutoLogin(_) => return Ok(()),
        InitOutcome::SelectionRendered { resume } => match resume {
            Ok(ResumeOutcome::Resumed(_)) => return Ok(()),
            Ok(ResumeOutcome::Skipped { authenticator }) => {
                eprintln!("Stored session uses unavailable authenticator {}", authenticator);
            }
            Ok(ResumeOutcome::Expired) => eprintln!("Previous session expired"),
            Ok(ResumeOutcome::NoSession) => {}
            Err(e) => eprintln!("Could not resume session: {}", e),
        },
    }

    if coordinator.run_selections().await.is_none() {
        eprintln!("No authenticator selected");
    }
    Ok(())
}

async fn logout(config: &CoordinatorConfig) -> Result<()> {
    let mut coordinator = build_coordinator(config, false)?;

    match coordinator.restore_active_authenticator()? {
        Some(authenticator) => {
            coordinator.logout_user().await?;
            println!("Logged out of {}", authenticator.name());
        }
        None => {
            coordinator.clear_storage_keys()?;
            println!("No active session");
        }
    }
    Ok(())
}

fn status(config: &CoordinatorConfig) -> Result<()> {
    let store = SessionStore::new(config.open_storage()?);
    let now = Utc::now();
    match store.load(now)? {
        StoredSession::Active(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            eprintln!("Expires in {} minutes", record.minutes_until_expiry(now));
        }
        StoredSession::Expired => println!("Session expired"),
        StoredSession::None => println!("No session"),
    }
    Ok(())
}

fn print_help() {
    println!("Usage: ual-session [--auto] [--status | --logout]");
    println!();
    println!("  --auto     register an auto-login authenticator");
    println!("  --status   show the stored session");
    println!("  --logout   log out and clear the stored session");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let command = parse_args(&args)?;
    let config = load_config()?;
    info!(?command, storage = ?config.storage, "ual-session starting");

    match command {
        Command::Login { auto } => login(&config, auto).await,
        Command::Logout => logout(&config).await,
        Command::Status => status(&config),
        Command::Help => {
            print_help();
            Ok(())
        }
    }
}
