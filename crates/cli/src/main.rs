//! Defer CLI - inspect and manage executions on the Defer backend.

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use defer::{ClientConfig, Defer, ExecutionId, TimeSpec};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "defer")]
#[command(about = "Inspect and manage Defer executions", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the state and result of an execution
    Get {
        /// Execution ID
        id: ExecutionId,
    },
    /// List the attempts of an execution
    Tries {
        /// Execution ID
        id: ExecutionId,
    },
    /// Cancel an execution
    Cancel {
        /// Execution ID
        id: ExecutionId,
        /// Abort the execution even if it is running
        #[arg(long)]
        force: bool,
    },
    /// Move an execution to a new start time
    Reschedule {
        /// Execution ID
        id: ExecutionId,
        #[command(flatten)]
        when: When,
    },
}

#[derive(Args)]
#[group(multiple = false)]
struct When {
    /// Absolute start time (RFC 3339)
    #[arg(long)]
    at: Option<chrono::DateTime<chrono::Utc>>,
    /// Start after this delay (e.g. "10m", "1h30m")
    #[arg(long = "in", value_name = "DURATION")]
    after: Option<String>,
}

impl When {
    /// `None` reschedules to now.
    fn into_time_spec(self) -> Option<TimeSpec> {
        match (self.at, self.after) {
            (Some(at), _) => Some(TimeSpec::At(at)),
            (None, Some(after)) => Some(TimeSpec::Relative(after)),
            (None, None) => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env()?;
    if !config.has_token() {
        // local executions live in the memory of the process that ran them
        bail!("DEFER_TOKEN is not set; there is no backend to query");
    }
    debug!(endpoint = %config.endpoint, "Connecting to Defer");
    let defer = Defer::from_config(config)?;

    match cli.command {
        Commands::Get { id } => {
            print_json(&defer.get_execution(&id).await?)?;
        }
        Commands::Tries { id } => {
            print_json(&defer.get_execution_tries(&id).await?)?;
        }
        Commands::Cancel { id, force } => {
            defer.cancel_execution(&id, force).await?;
            println!("Cancelled execution: {}", id);
        }
        Commands::Reschedule { id, when } => {
            let when = when.into_time_spec();
            defer.reschedule_execution(&id, when.clone()).await?;
            match when {
                Some(when) => println!("Rescheduled execution {} ({})", id, when),
                None => println!("Rescheduled execution {} (now)", id),
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
