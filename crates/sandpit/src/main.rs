//! Sandpit CLI - live component preview sandbox.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "sandpit")]
#[command(about = "Preview generated React components in an isolated sandbox")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to sandpit.toml config file
    #[arg(short, long, default_value = "sandpit.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create sandpit.toml and an example component
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },

    /// Start the live preview server
    Dev {
        /// Port to listen on (defaults to config or 7777)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory holding component sources
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,
    },

    /// Export every component to a standalone sandbox page
    Build {
        /// Output directory (defaults to config or "dist")
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip minification
        #[arg(long)]
        no_minify: bool,
    },

    /// Classify and transform every source without writing anything
    Check {
        /// Directory holding component sources
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Serve an exported gallery
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// Directory to serve (defaults to config or "dist")
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    if let Commands::Init { yes } = cli.command {
        return commands::init::run(&cli.config, yes).await;
    }

    let config = config::load(&cli.config)?;

    match cli.command {
        Commands::Init { .. } => {}
        Commands::Dev { port, dir, no_open } => {
            commands::dev::run(&config, port, dir, !no_open).await?;
        }
        Commands::Build { output, no_minify } => {
            let minify = if no_minify { Some(false) } else { None };
            commands::build::run(&config, output, minify).await?;
        }
        Commands::Check { dir } => {
            commands::check::run(&config, dir).await?;
        }
        Commands::Serve { port, dir } => {
            let dir = dir.unwrap_or_else(|| PathBuf::from(&config.export.output));
            commands::serve::run(port, dir).await?;
        }
    }

    Ok(())
}
