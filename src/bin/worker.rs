//! Standalone worker process.
//!
//! Shares the database and blob directory with the API server and runs the
//! thumbnail and welcome workers until interrupted.

use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};

use filebox::file::BlobStore;
use filebox::queue::JobQueue;
use filebox::{jobs, Config, Database, LocalBlobStore, SqliteJobQueue};

#[tokio::main]
async fn main() -> ExitCode {
    let config_path =
        std::env::var("FILEBOX_CONFIG").unwrap_or_else(|_| "config.toml".to_string());

    let mut config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    if let Err(e) = filebox::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        filebox::logging::init_console_only(&config.logging.level);
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Worker error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> filebox::Result<()> {
    config.validate()?;

    let db = Database::open(&config.database.path).await?;
    let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(&config.files.storage_path)?);
    let queue: Arc<dyn JobQueue> = Arc::new(SqliteJobQueue::new(db.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let workers = jobs::spawn_workers(&config.worker, db, blobs, queue, shutdown_rx);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, waiting for workers");
    let _ = shutdown_tx.send(true);

    for worker in workers {
        let _ = worker.await;
    }
    Ok(())
}
