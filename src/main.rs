use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "taskcanvas")]
#[command(version, about = "AI-assisted task management backend")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the AI-actions HTTP endpoint
    Serve {
        /// Port to serve on (overrides TASKCANVAS_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Show the resolved configuration with secrets redacted
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port } => cmd::cmd_serve(port).await?,
        Commands::Config => cmd::cmd_config()?,
    }

    Ok(())
}
