// Wedding Site - Web Server

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use wedding_site::server::{build_router, AppState};
use wedding_site::{import_seed, load_config, load_seed, logging, open_database};

#[derive(Parser)]
#[command(name = "wedding-server")]
#[command(about = "Serve the wedding site and its registry API")]
struct Args {
    /// Path to wedding.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed file imported before serving (existing entries are kept)
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Overrides [server].bind
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init("wedding_site=info,wedding_server=info,tower_http=info");
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    let conn = open_database(&config.database.path)?;
    info!(path = %config.database.path.display(), "database opened");

    if let Some(seed_path) = args.seed {
        let seed = load_seed(&seed_path)?;
        let (items, members) = import_seed(&conn, &seed)?;
        info!(items, members, "seed imported");
    }

    if !config.admin_enabled() {
        info!("no admin password configured; registry edits are disabled");
    }

    let addr = config.server.bind.clone();
    let couple = config.event.couple.clone();
    let state = AppState::new(conn, config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(%addr, %couple, "wedding site listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
}
