mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lab")]
#[command(about = "Cloud lab automation: Vault dev server bootstrap and GCP geo-routing DNS", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a Vault dev server and populate it with demo data
    Vault {
        /// Accept defaults instead of prompting
        #[arg(short, long)]
        yes: bool,
    },
    /// Provision the geo-routing DNS lab, or tear it down
    Geo {
        /// Omit to provision; `cleanup` deletes everything provisioning created
        #[arg(value_enum)]
        action: Option<GeoAction>,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
        /// Print the planned actions without running them
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the resolved configuration
    Config,
    /// Show version information
    Version,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum GeoAction {
    Cleanup,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; console output of the flows goes to stdout
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            commands::report_fatal(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // version needs no configuration
    if matches!(cli.command, Commands::Version) {
        println!("cloudlab {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let (config, source) = cloudlab_config::load()?;

    match cli.command {
        Commands::Vault { yes } => commands::vault::handle(config, yes).await,
        Commands::Geo {
            action,
            yes,
            dry_run,
        } => {
            let cleanup = action == Some(GeoAction::Cleanup);
            commands::geo::handle(config, cleanup, yes, dry_run).await
        }
        Commands::Config => commands::config::handle(&config, source.as_deref()),
        Commands::Version => unreachable!("Version is handled before config loading"),
    }
}
