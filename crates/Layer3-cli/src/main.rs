//! Hangar CLI - Main entry point

mod plugins;
mod runner;

use clap::{Parser, Subcommand};
use hangar_foundation::{HostConfig, JsonStore, Memory};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Hangar - extension host for chat bots
#[derive(Parser, Debug)]
#[command(name = "hangar")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Load config and memory from this directory only
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List discovered and configured plugins
    List,
    /// Load configured plugins and run until Ctrl-C
    Run {
        /// Unload everything right after startup
        #[arg(long)]
        once: bool,

        /// Command line to run after loading (e.g. "hello world")
        #[arg(short, long)]
        command: Option<String>,

        /// Run the command as this user
        #[arg(short, long, default_value = "console")]
        user: String,

        /// Run the command with admin rights
        #[arg(long)]
        admin: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let config = match &args.config_dir {
        Some(dir) => HostConfig::load_from(dir)?,
        None => HostConfig::load().unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config: {}", e);
            HostConfig::default()
        }),
    };

    let memory = match &args.config_dir {
        Some(dir) => Memory::open(JsonStore::new(dir))?,
        None => Memory::open(JsonStore::current_project()?)?,
    };

    match args.command.unwrap_or(Command::List) {
        Command::List => runner::list(&config),
        Command::Run {
            once,
            command,
            user,
            admin,
        } => {
            let options = runner::RunOptions {
                once,
                command,
                user,
                admin,
            };
            runner::run(config, memory, options).await
        }
    }
}
