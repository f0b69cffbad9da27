use anyhow::Result;
use axum::Router;
use clap::Parser;
use std::{path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::{
    auth::{InMemoryBlocklist, TokenAuthority},
    config::AppSettings,
    repository::Repository,
    routes::build_router,
    shutdown::shutdown_signal,
    state::init_state_with_sqlite,
    tracing::{init_sentry, init_tracing},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub enum Commands {
    /// Start the web server
    Server {
        #[arg(short, long, default_value = "config.toml")]
        config: String,
    },
    /// Issue a fresh access token and a refresh token for a subject
    Issue {
        #[arg(short, long, default_value = "config.toml")]
        config: String,
        /// Subject (account identifier) the tokens are bound to
        #[arg(short, long)]
        subject: String,
    },
    /// Show version information
    Version,
}

/// Build the application: connect the database, run migrations and wire
/// routes, docs and middleware around the token authority.
pub async fn create_app(config: &AppSettings) -> Result<Router> {
    let state = init_state_with_sqlite(config).await?;
    state.repository.migrate().await?;
    Ok(build_router(state, &config.cors))
}

async fn start(config: &AppSettings) -> Result<()> {
    let listener = TcpListener::bind(config.server.full_url()).await?;
    info!("Server is running on {}", config.server.full_url());
    let router = create_app(config).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Web server has gracefully shutdown");
    Ok(())
}

/// Signing needs only the secret, so no database connection is opened.
fn issue(config: &AppSettings, subject: &str) -> Result<()> {
    let authority = TokenAuthority::new(&config.jwt, Arc::new(InMemoryBlocklist::new()));
    let pair = authority.issue_pair(subject)?;
    println!("{}", serde_json::to_string_pretty(&pair)?);
    Ok(())
}

pub async fn run() -> Result<()> {
    let cli = Commands::parse();
    match cli {
        Commands::Server { config } => {
            let config = AppSettings::new(Path::new(&config))?;

            init_tracing(&config.logger);
            let _sentry_guard = config.sentry.as_ref().map(init_sentry).transpose()?;
            start(&config).await?;
            Ok(())
        }
        Commands::Issue { config, subject } => {
            let config = AppSettings::new(Path::new(&config))?;
            issue(&config, &subject)
        }
        Commands::Version => {
            println!(
                "{} ({})",
                env!("CARGO_PKG_VERSION"),
                option_env!("BUILD_SHA")
                    .or(option_env!("GITHUB_SHA"))
                    .unwrap_or("dev")
            );
            Ok(())
        }
    }
}
