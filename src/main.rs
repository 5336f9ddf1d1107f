use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::thread;
use tracing::{info, warn};

use mediapress::broadcast::Broadcaster;
use mediapress::config::AppConfig;
use mediapress::queue::{admit_folder, run_cycle, run_worker};
use mediapress::store::JobStore;
use mediapress::utils;

/// Compress media folders with external tools, tracking every file through
/// a durable job queue.
#[derive(Parser, Debug)]
#[command(name = "mediapress", version, about)]
struct Args {
    /// Folder to scan for media files
    #[arg(long, requires = "output")]
    input: Option<PathBuf>,

    /// Folder that receives compressed output, mirroring the input layout
    #[arg(long, requires = "input")]
    output: Option<PathBuf>,

    /// Path of the job database
    #[arg(long, default_value = "mediapress.db")]
    db: PathBuf,

    /// Use a specific config file instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Drain the queue and exit instead of polling forever
    #[arg(long)]
    once: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _log_guard = utils::init_logging();

    let config = match &args.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load(),
    };
    config.validate()?;

    // Missing tools abort startup; a queue that cannot compress anything
    // must not accept work.
    utils::check_tools(&config)?;

    let store = JobStore::open(&args.db)
        .with_context(|| format!("opening job database {}", args.db.display()))?;

    let cleared = store.clear_completed()?;
    if cleared > 0 {
        info!("Cleaned up {} completed jobs from previous session", cleared);
    }

    let broadcaster = Broadcaster::new();
    spawn_event_logger(&broadcaster);
    broadcaster.publish_counts(store.counts()?);

    if let (Some(input), Some(output)) = (&args.input, &args.output) {
        let report = admit_folder(&store, &broadcaster, input, output)?;
        info!(
            "{} files queued for compression ({} skipped)",
            report.queued, report.skipped
        );
    }

    if args.once {
        drain(&store, &config, &broadcaster)?;
        Ok(())
    } else {
        info!("Starting compression worker");
        run_worker(&store, &config, &broadcaster)
    }
}

/// Forward every queue event as a JSON line; stands in for the real-time
/// transport, which subscribes the same way.
fn spawn_event_logger(broadcaster: &Broadcaster) {
    let events = broadcaster.subscribe();
    thread::spawn(move || {
        for event in events {
            match serde_json::to_string(&event) {
                Ok(json) => info!(target: "mediapress::events", "{}", json),
                Err(e) => warn!("Failed to serialize event: {}", e),
            }
        }
    });
}

/// Run cycles until nothing is pending, then report the outcome
fn drain(store: &JobStore, config: &AppConfig, broadcaster: &Broadcaster) -> anyhow::Result<()> {
    loop {
        run_cycle(store, config, broadcaster)?;
        if store.counts()?.pending == 0 {
            break;
        }
    }
    let counts = store.counts()?;
    info!(
        "Queue drained: {} completed, {} failed",
        counts.completed, counts.errors
    );
    Ok(())
}
