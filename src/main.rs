//! Operator commands for a shelf catalog database.

mod commands;
mod error;

use crate::error::{ErrorKind, Result};
use clap::{ArgAction, Parser, Subcommand};
use exn::ResultExt;
use shelf_config::Config;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Parser)]
#[command(name = "shelf", author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, global = true, env = "SHELF_CONFIG")]
    config: Option<PathBuf>,
    /// More logging; repeat for more detail
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve every license pool to its work, repairing the grouping
    Repair {
        /// Report what would change without writing it
        #[arg(long)]
        dry_run: bool,
    },
    /// Rebuild the counters of license-tracked pools from their licenses
    Recompute {
        #[arg(long)]
        dry_run: bool,
    },
    /// Show a license pool, its work and its hold estimates
    Show { pool: u64 },
    /// List the circulation events recorded for a license pool
    Events { pool: u64 },
}

impl Cli {
    fn level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        }
        .or_raise(|| ErrorKind::Config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    // RUST_LOG wins over -v.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.level()));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: could not start runtime: {e}");
            return ExitCode::FAILURE;
        },
    };
    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.load_config()?;
    let db = commands::open(&config).await?;
    let result = match cli.command {
        Command::Repair { dry_run } => commands::repair(&db, &config, dry_run).await,
        Command::Recompute { dry_run } => commands::recompute(&db, dry_run).await,
        Command::Show { pool } => commands::show(&db, &config, pool).await,
        Command::Events { pool } => commands::events(&db, pool).await,
    };
    db.close().await;
    result
}
