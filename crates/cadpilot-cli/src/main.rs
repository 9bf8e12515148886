mod config;
mod plan_cmds;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use config::CadpilotConfig;

#[derive(Parser)]
#[command(name = "cadpilot", about = "CAD plan sanitizer and transactional executor")]
struct Cli {
    /// Config file path (overrides CADPILOT_CONFIG env var)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file with the default machine profile and limits
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Validate and normalize a raw plan JSON file
    Sanitize {
        /// Path to the plan JSON file
        file: PathBuf,
        /// Treat warnings as failures
        #[arg(long)]
        strict: bool,
    },
    /// Sanitize a plan and preview it in a disposable sandbox
    Preview {
        /// Path to the plan JSON file
        file: PathBuf,
        /// Treat warnings as failures
        #[arg(long)]
        strict: bool,
    },
    /// Sanitize a plan and execute it inside a transaction
    Execute {
        /// Path to the plan JSON file
        file: PathBuf,
        /// Treat warnings as failures
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => config::cmd_init(cli.config.as_deref(), force),
        Commands::Sanitize { file, strict } => {
            let resolved = CadpilotConfig::resolve(cli.config.as_deref())?;
            plan_cmds::cmd_sanitize(&resolved, &file, strict)
        }
        Commands::Preview { file, strict } => {
            let resolved = CadpilotConfig::resolve(cli.config.as_deref())?;
            plan_cmds::cmd_preview(&resolved, &file, strict)
        }
        Commands::Execute { file, strict } => {
            let resolved = CadpilotConfig::resolve(cli.config.as_deref())?;
            plan_cmds::cmd_execute(&resolved, &file, strict)
        }
    }
}
