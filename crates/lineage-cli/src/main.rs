//! lineage-walk binary
//!
//! Walks the descendants of one person version in a fixture-backed relation
//! store and prints the resulting tree.
//!
//! # Usage
//!
//! ```bash
//! # With a fixture and defaults
//! lineage-walk --fixture family.json 0x<64 hex digits>
//!
//! # With a config file, breadth-first, first two levels expanded
//! lineage-walk --config walk.yaml --traversal bfs --expand-depth 2 0x<hash> 3
//!
//! # With environment variables only
//! LINEAGE_STORE__FIXTURE=family.json LINEAGE_WALK__MAX_DEPTH=5 lineage-walk 0x<hash>
//! ```

use clap::{Parser, ValueEnum};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use lineage_cli::observability::{init_logging, LoggingConfig};
use lineage_cli::{run_walk, CliConfig, WalkRequest};
use lineage_domain::walker::Traversal;

/// Traversal order flag.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum TraversalArg {
    Dfs,
    Bfs,
}

impl From<TraversalArg> for Traversal {
    fn from(arg: TraversalArg) -> Self {
        match arg {
            TraversalArg::Dfs => Traversal::Dfs,
            TraversalArg::Bfs => Traversal::Bfs,
        }
    }
}

/// Incremental lineage walker
#[derive(Parser, Debug)]
#[command(name = "lineage-walk")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<String>,

    /// JSON fixture with the relation data (overrides store.fixture)
    #[arg(short, long)]
    fixture: Option<String>,

    /// Traversal order (overrides walk.traversal)
    #[arg(short, long, value_enum)]
    traversal: Option<TraversalArg>,

    /// Expand rows down to this depth; everything is expanded when omitted
    #[arg(long)]
    expand_depth: Option<usize>,

    /// Emit logs as JSON (overrides logging.json)
    #[arg(long)]
    json_logs: bool,

    /// Log span enter/exit events (overrides logging.spans)
    #[arg(long)]
    log_spans: bool,

    /// Root person hash
    root_hash: String,

    /// Root version index
    #[arg(default_value_t = 1)]
    version: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = if let Some(config_path) = &args.config {
        CliConfig::load(config_path)?
    } else {
        CliConfig::from_env()?
    };
    if let Some(fixture) = args.fixture {
        config.store.fixture = Some(fixture);
    }
    if let Some(traversal) = args.traversal {
        config.walk.traversal = traversal.into();
    }
    if args.json_logs {
        config.logging.json = true;
    }
    if args.log_spans {
        config.logging.spans = true;
    }

    init_logging(LoggingConfig::from_settings(&config.logging));
    info!(version = env!("CARGO_PKG_VERSION"), "Starting lineage walk");

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, cancelling walk");
                signal_token.cancel();
            }
            Err(e) => error!(error = %e, "Failed to install Ctrl+C handler"),
        }
    });

    let request = WalkRequest {
        root_hash: args.root_hash,
        version: args.version,
        expand_depth: args.expand_depth,
    };
    let output = run_walk(&config, &request, cancel).await?;
    print!("{}", output);

    Ok(())
}
