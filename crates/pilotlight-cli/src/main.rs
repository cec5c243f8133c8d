use clap::{Parser, Subcommand};

mod commands;
mod context;

use context::Context;

#[derive(Parser)]
#[command(
    name = "pilot",
    about = "PilotLight — cross-region disaster-recovery control plane",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap the failover state singleton
    Init,
    /// Print the current failover state
    Status,
    /// Run a health check against one region
    Health {
        /// Region to evaluate (default: the primary)
        #[arg(short, long)]
        region: Option<String>,
    },
    /// Run one periodic health evaluation tick against the state machine
    Evaluate,
    /// Fail traffic over to a region
    Failover {
        /// Region that should become active
        target: String,
        /// Skip the health preconditions
        #[arg(short, long)]
        force: bool,
    },
    /// Fail traffic back to a region
    Failback {
        /// Region that should become active
        target: String,
        /// Skip the health and data-sync preconditions
        #[arg(short, long)]
        force: bool,
    },
    /// Back up application tables to the artifact store
    Backup {
        /// Table to back up (default: every configured table)
        #[arg(short, long)]
        table: Option<String>,
        /// Export only records newer than the last succeeded backup
        #[arg(short, long)]
        incremental: bool,
    },
    /// Compare the two regions' data sets
    Validate {
        /// Table to validate (default: every configured table)
        #[arg(short, long)]
        table: Option<String>,
        /// Scan everything instead of a bounded sample
        #[arg(long)]
        full: bool,
        /// Copy missing or differing records to the target
        #[arg(long)]
        sync: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pilot=info".parse()?)
                .add_directive("pilotlight=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let ctx = Context::from_env()?;

    match cli.command {
        Commands::Init => commands::state::init(&ctx).await,
        Commands::Status => commands::state::status(&ctx).await,
        Commands::Health { region } => commands::health::run(&ctx, region.as_deref()).await,
        Commands::Evaluate => commands::failover::evaluate(&ctx).await,
        Commands::Failover { target, force } => {
            commands::failover::failover(&ctx, &target, force).await
        }
        Commands::Failback { target, force } => {
            commands::failover::failback(&ctx, &target, force).await
        }
        Commands::Backup { table, incremental } => {
            commands::backup::run(&ctx, table.as_deref(), incremental).await
        }
        Commands::Validate { table, full, sync } => {
            commands::validate::run(&ctx, table.as_deref(), full, sync).await
        }
    }
}
