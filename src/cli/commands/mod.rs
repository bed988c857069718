//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod precios;
mod profiles;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::browser::WaitUntil;
use crate::config::ServiceConfig;
use crate::stores::MatchMode;

#[derive(Parser)]
#[command(name = "storefront")]
#[command(about = "Headless-browser scraping service with store-aware price extraction")]
#[command(version)]
pub struct Cli {
    /// Config file path (TOML)
    #[arg(short, long, global = true, env = "SCRAPER_CONFIG")]
    config: Option<PathBuf>,

    /// Extra store profiles file (TOML, `[[store]]` tables)
    #[arg(long, global = true)]
    profiles: Option<PathBuf>,

    /// How URLs are matched to store profiles (host or substring)
    #[arg(long, global = true)]
    router_match: Option<MatchMode>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Bind address: port, host, or host:port (default: 127.0.0.1:8000)
        #[arg(long)]
        bind: Option<String>,
    },

    /// List the configured store profiles
    Profiles,

    /// Extract store prices for one or more URLs and print JSON
    Precios {
        /// Product page URLs
        #[arg(required = true)]
        urls: Vec<String>,
        /// Load condition (load, domcontentloaded, networkidle)
        #[arg(short, long)]
        wait_until: Option<WaitUntil>,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ServiceConfig::load(cli.config.as_deref())?;
    if let Some(profiles) = cli.profiles {
        config.profiles_file = Some(profiles);
    }
    if let Some(mode) = cli.router_match {
        config.router_match = mode;
    }

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind = bind;
            }
            serve::cmd_serve(&config).await
        }
        Commands::Profiles => profiles::cmd_profiles(&config),
        Commands::Precios { urls, wait_until } => {
            precios::cmd_precios(&config, &urls, wait_until).await
        }
    }
}
