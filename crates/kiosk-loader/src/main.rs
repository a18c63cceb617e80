//! Flavormix bulk loader - uploads a file of combinations to the flavors API.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use combination_outbox::{
    Combination, HttpTransport, Publisher, PublisherConfig, PublisherState,
};
use kiosk_config::{init_logging, Config, Paths};
use kiosk_storage::{FileStorage, KeyValueStorage, MemoryStorage};
use tracing::info;

/// Flavormix bulk loader command-line interface.
#[derive(Parser)]
#[command(name = "kiosk-loader")]
#[command(about = "Bulk-uploads flavor combination ratings to the flavors API")]
#[command(version)]
struct Cli {
    /// JSON file containing an array of combinations
    input: PathBuf,

    /// Submit endpoint URL (defaults to the configured API)
    #[arg(long)]
    api_url: Option<String>,

    /// Retry failed uploads forever instead of skipping them. Uses the
    /// durable queue file, so an interrupted upload resumes on the next run.
    #[arg(long)]
    retry: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Base directory for config and queue files. Defaults to ~/.flavormix
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_logging(&cli.log_level);

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let config = Config::load(&paths)?;
    let submit_url = cli.api_url.unwrap_or_else(|| config.submit_url());

    let raw = std::fs::read_to_string(&cli.input)?;
    let combinations: Vec<Combination> = serde_json::from_str(&raw)?;
    let total = combinations.len();
    info!(total, submit_url = %submit_url, retry = cli.retry, "Starting bulk upload");

    // Default mode is the one-shot sequential upload: failed items are
    // skipped and logged, nothing is persisted. --retry switches to the
    // kiosk delivery policy (durable queue, same head retried forever).
    let storage: Arc<dyn KeyValueStorage> = if cli.retry {
        Arc::new(FileStorage::open(paths.queue_file())?)
    } else {
        Arc::new(MemoryStorage::new())
    };

    let publisher = Publisher::new(
        PublisherConfig {
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            retry_on_failure: cli.retry,
        },
        storage,
        Arc::new(HttpTransport::new(submit_url)),
    );

    publisher.start();
    for combination in combinations {
        publisher.add(combination).await;
    }

    // Wait for the queue to drain.
    let mut state = publisher.subscribe_state();
    loop {
        if publisher.pending_count().await == 0
            && *state.borrow_and_update() == PublisherState::Idle
        {
            break;
        }
        state.changed().await?;
    }

    let stats = publisher.stats();
    info!(
        delivered = stats.delivered,
        skipped = stats.skipped,
        "Bulk upload finished"
    );

    Ok(())
}
