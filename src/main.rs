use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};

use filebox::file::BlobStore;
use filebox::queue::JobQueue;
use filebox::{
    jobs, kv, AppState, Config, Database, LocalBlobStore, SqliteJobQueue, WebServer,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config_path =
        std::env::var("FILEBOX_CONFIG").unwrap_or_else(|_| "config.toml".to_string());

    // Load configuration
    let mut config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    // Initialize logging
    if let Err(e) = filebox::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        filebox::logging::init_console_only(&config.logging.level);
    }

    info!("filebox - file storage service");

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> filebox::Result<()> {
    config.validate()?;

    let db = Database::open(&config.database.path).await?;
    let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(&config.files.storage_path)?);
    let queue: Arc<dyn JobQueue> = Arc::new(SqliteJobQueue::new(db.clone()));
    let sessions = kv::open(config.session.backend, &db);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    let workers = if config.worker.embedded {
        jobs::spawn_workers(
            &config.worker,
            db.clone(),
            blobs.clone(),
            queue.clone(),
            shutdown_rx.clone(),
        )
    } else {
        info!("Embedded workers disabled; run filebox-worker separately");
        Vec::new()
    };

    let state = AppState::from_config(&config, db, sessions, blobs, queue);
    let server = WebServer::new(&config.server, state)?;
    info!(
        "Server configured on {}:{}",
        config.server.host, config.server.port
    );

    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
        }
        let _ = signal_tx.send(true);
    });

    let served = server.run(shutdown_rx).await;

    let _ = shutdown_tx.send(true);
    for worker in workers {
        let _ = worker.await;
    }

    served?;
    info!("Server stopped");
    Ok(())
}
