mod analysis;
mod api;
mod auth;
mod config;
mod db;
mod error;
mod models;
mod seed;
mod validation;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::api::{AppState, RateLimitConfig, RateLimiter};
use crate::auth::JwtService;
use crate::config::Config;

#[derive(Parser)]
#[command(name = "project_tracker")]
#[command(about = "Project, resource and financial tracking API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Listen address, overrides BIND_ADDR
    #[arg(long, global = true)]
    bind: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Apply migrations and run the HTTP server (default)
    Serve,

    /// Apply pending migrations and exit
    Migrate,

    /// Apply migrations and load demo data
    Seed,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = config::init()?;
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }

    // Initialize database connection
    let db = db::init(&config).await?;
    db.migrate().await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, db).await,
        Command::Migrate => Ok(()),
        Command::Seed => {
            seed::run(&db).await?;
            tracing::info!("demo logins: admin@demo.com / pm@demo.com, password \"{}\"", seed::DEMO_PASSWORD);
            Ok(())
        }
    }
}

async fn serve(config: Config, db: db::Database) -> Result<()> {
    let state = AppState {
        db,
        jwt: JwtService::new(&config.jwt_secret, config.jwt_expire_secs),
        limiter: Arc::new(RateLimiter::new(RateLimitConfig::from_config(&config))),
    };
    let app = api::router(state, &config.allowed_origins);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    // Peer addresses key the rate limiter
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("received SIGINT"),
        _ = sigterm() => tracing::info!("received SIGTERM"),
    }
}

#[cfg(unix)]
async fn sigterm() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::error!("failed to register SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn sigterm() {
    std::future::pending::<()>().await;
}
