use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use log::{error, info, warn};
use tokio::sync::broadcast::{self, error::RecvError};

use trackmend::catalog::http_catalog::{HttpArtworkFetcher, HttpCatalogClient};
use trackmend::config::{default_config_path, load_or_create_config};
use trackmend::enrichment::BatchController;
use trackmend::metadata::tag_store::{read_file_record, LoftyTagStore};
use trackmend::metadata::SharedFileRecord;
use trackmend::protocol::{EnrichmentMessage, Message};

/// Fills in missing or unreliable tags on audio files from an online catalog.
#[derive(Parser)]
#[command(name = "trackmend", version)]
struct Args {
    /// Config file to use instead of the platform default.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Look up every file, even ones whose tags look complete.
    #[arg(long)]
    force: bool,

    /// Audio files to enrich, in playlist order.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn spawn_progress_listener(mut bus_receiver: broadcast::Receiver<Message>) -> thread::JoinHandle<()> {
    thread::spawn(move || loop {
        match bus_receiver.blocking_recv() {
            Ok(Message::Enrichment(EnrichmentMessage::BatchStarted { total, .. })) => {
                println!("Enriching {total} file(s)");
            }
            Ok(Message::Enrichment(EnrichmentMessage::RecordEnriched {
                index,
                path,
                fields,
                persist_error,
                ..
            })) => match persist_error {
                Some(persist_error) => println!(
                    "[{}] {}: {} - {} (not saved: {persist_error})",
                    index + 1,
                    path.display(),
                    fields.artist,
                    fields.title
                ),
                None => println!(
                    "[{}] {}: {} - {}",
                    index + 1,
                    path.display(),
                    fields.artist,
                    fields.title
                ),
            },
            Ok(Message::Enrichment(EnrichmentMessage::RecordSkipped {
                index, path, reason, ..
            })) => {
                println!("[{}] {}: skipped ({reason})", index + 1, path.display());
            }
            Ok(Message::Enrichment(EnrichmentMessage::BatchCancelled { .. })) => {}
            Ok(Message::Enrichment(EnrichmentMessage::BatchFinished { summary, .. })) => {
                println!(
                    "Done: {} enriched, {} skipped, {} failed",
                    summary.enriched, summary.skipped, summary.failed
                );
                break;
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Progress listener lagged, skipped {} message(s)", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Trace);
    clog.init();

    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{}': {}", thread_name, panic_info);
    }));

    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let mut config = load_or_create_config(&config_path)?;
    log::set_max_level(config.logging.level_filter());
    if args.force {
        config.enrichment.force_lookup = true;
    }
    info!("Using config {}", config_path.display());

    let mut records: Vec<SharedFileRecord> = Vec::with_capacity(args.files.len());
    for path in &args.files {
        match read_file_record(path) {
            Ok(record) => records.push(record.into_shared()),
            Err(read_error) => error!("Skipping {}: {}", path.display(), read_error),
        }
    }
    if records.is_empty() {
        return Err("no readable audio files".into());
    }

    let (bus_sender, bus_receiver) = broadcast::channel(1024);
    let listener = spawn_progress_listener(bus_receiver);

    let controller = BatchController::new(
        Arc::new(HttpCatalogClient::new(&config.catalog)),
        Arc::new(HttpArtworkFetcher::new(&config.catalog)),
        Arc::new(LoftyTagStore),
        config.enrichment.clone(),
        bus_sender,
    );
    let summary = controller.start(records).join();
    drop(controller);
    let _ = listener.join();

    match summary {
        Some(summary) if summary.failed == 0 => Ok(()),
        Some(summary) => Err(format!("{} file(s) failed", summary.failed).into()),
        None => Err("enrichment worker did not complete".into()),
    }
}
