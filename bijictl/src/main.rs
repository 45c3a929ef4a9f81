//! This is a command-line tool to share locations on a map via [libbiji]
use crate::{
    cli::*,
    config::{Config, ENV_BACKEND_PRINCIPAL, ENV_BACKEND_URL, ENV_MAP_TOKEN},
};
use anyhow::Result;
use clap::{CommandFactory, Parser};
use libbiji::backend::SqliteBackend;
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::filter::EnvFilter;

mod cli;
mod commands;
mod config;
mod output;
mod prompt;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("BIJI_LOG"))
        .init();
    let args = Cli::parse();

    // commands that don't need any configuration
    match args.command {
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                env!("CARGO_PKG_NAME"),
                &mut std::io::stdout(),
            );
            return Ok(());
        }
        Commands::Color { ref names } => return commands::locations::colors(names),
        _ => (),
    };

    let cfg = Config::load(args.config.as_deref()).await?;
    debug!(?cfg.path, %cfg.backend_url, %cfg.principal, "loaded config");

    if let Commands::Status = args.command {
        println!("Using config file '{}'", cfg.path.display());
        println!("Using backend '{}' (${ENV_BACKEND_URL})", cfg.backend_url);
        println!("Acting as '{}' (${ENV_BACKEND_PRINCIPAL})", cfg.principal);
        let token = match cfg.map.access_token.expose_secret().is_empty() {
            true => "missing",
            false => "configured",
        };
        println!("Map access token is {token} (${ENV_MAP_TOKEN})");
        println!(
            "Map style '{}', centered on [{}, {}] at zoom {}",
            cfg.map.style_url, cfg.map.center.longitude, cfg.map.center.latitude, cfg.map.zoom
        );
        return Ok(());
    }

    // only a long-running session needs to hear about other processes' changes
    let poll_interval = match args.command {
        Commands::Map => Some(cfg.poll_interval),
        _ => None,
    };
    let backend =
        SqliteBackend::connect(&cfg.backend_url, cfg.principal.clone(), poll_interval).await?;

    match args.command {
        // already handled above
        Commands::Completions { .. } | Commands::Color { .. } | Commands::Status => Ok(()),
        Commands::List { filter, output } => {
            commands::locations::list(&backend, filter, output).await
        }
        Commands::Add {
            name,
            description,
            latitude,
            longitude,
        } => commands::locations::add(&backend, name, description, latitude, longitude).await,
        Commands::Modify {
            id,
            name,
            description,
            latitude,
            longitude,
        } => {
            commands::locations::modify(&backend, id, name, description, latitude, longitude)
                .await
        }
        Commands::Remove { id } => commands::locations::remove(&backend, id).await,
        Commands::Geojson => commands::locations::geojson(&backend, &cfg).await,
        Commands::Map => commands::session::run(Arc::new(backend), &cfg.map).await,
    }
}
