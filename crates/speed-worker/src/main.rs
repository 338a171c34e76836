use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

mod app;
mod config;
mod signal;

use config::SpeedConfig;

#[derive(Parser)]
#[command(
    name = "speed-worker",
    about = "speed-rpc report worker: answers report requests from the RPC queue"
)]
struct Cli {
    /// Path to speed.toml (default: ./speed.toml, then ~/.config/speed/speed.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Consume the RPC queue until SIGINT/SIGTERM (default)
    Serve,
    /// Inspect stored report files
    Disk {
        #[command(subcommand)]
        action: DiskCommand,
    },
}

#[derive(Subcommand)]
enum DiskCommand {
    /// List files in the storage base directory
    List,
    /// Download a stored file
    Download {
        name: String,
        /// Where to write it (default: the file name in the current directory)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Remove a stored file
    Remove { name: String },
}

fn init_logging(json: bool) {
    // stdout is reserved for command output
    let filter = EnvFilter::try_from_env("SPEED_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let (config, path) = SpeedConfig::load(cli.config.as_deref())?;
    tracing::info!(config = %path.display(), "Loaded configuration");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => app::serve(config).await,
        Command::Disk { action } => match action {
            DiskCommand::List => app::list_files(&config).await,
            DiskCommand::Download { name, output } => {
                app::download_file(&config, &name, output.as_deref()).await
            }
            DiskCommand::Remove { name } => app::remove_file(&config, &name).await,
        },
    }
}
