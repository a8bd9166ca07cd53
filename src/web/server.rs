//! Web server for filebox.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::config::ServerConfig;
use crate::{FileboxError, Result};

use super::handlers::AppState;
use super::router::create_router;

/// Interval between maintenance passes (1 hour).
const CLEANUP_INTERVAL_SECS: u64 = 3600;

/// Completed jobs are kept this long for inspection (1 day).
const COMPLETED_JOB_RETENTION_SECS: u64 = 24 * 60 * 60;

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &ServerConfig, app_state: AppState) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| {
                FileboxError::Config(format!(
                    "invalid listen address {}:{}: {e}",
                    config.host, config.port
                ))
            })?;

        Ok(Self {
            addr,
            app_state: Arc::new(app_state),
        })
    }

    /// Get the configured server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start the maintenance background task.
    ///
    /// This task runs every hour and removes:
    /// - Expired session entries
    /// - Completed jobs older than a day
    fn start_cleanup_task(state: Arc<AppState>, mut shutdown: watch::Receiver<bool>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));

            // Skip the first immediate tick
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = shutdown.changed() => break,
                }

                match state.sessions.store().purge_expired().await {
                    Ok(count) if count > 0 => {
                        tracing::info!(deleted_count = count, "Cleaned up expired sessions");
                    }
                    Ok(_) => tracing::debug!("No expired sessions to clean up"),
                    Err(e) => tracing::warn!(error = %e, "Failed to clean up sessions"),
                }

                let retention = Duration::from_secs(COMPLETED_JOB_RETENTION_SECS);
                match state.jobs.purge_completed(retention).await {
                    Ok(count) if count > 0 => {
                        tracing::info!(deleted_count = count, "Cleaned up completed jobs");
                    }
                    Ok(_) => tracing::debug!("No completed jobs to clean up"),
                    Err(e) => tracing::warn!(error = %e, "Failed to clean up jobs"),
                }
            }
        });
    }

    /// Run the web server until `shutdown` turns true.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> std::io::Result<()> {
        let router = create_router(self.app_state.clone());

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        Self::start_cleanup_task(self.app_state, shutdown.clone());
        tracing::info!("Cleanup task started (runs every hour)");

        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(wait_for(shutdown))
            .await
    }

    /// Run the server in the background and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self, shutdown: watch::Receiver<bool>) -> std::io::Result<SocketAddr> {
        let router = create_router(self.app_state.clone());

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        Self::start_cleanup_task(self.app_state, shutdown.clone());

        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(wait_for(shutdown))
                .await
            {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}

/// Resolve once the flag turns true or its sender is gone.
async fn wait_for(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::file::LocalBlobStore;
    use crate::kv::MemoryKvStore;
    use crate::queue::SqliteJobQueue;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn create_state(dir: &std::path::Path) -> AppState {
        let db = Database::open_in_memory().await.unwrap();
        AppState::new(
            db.clone(),
            Arc::new(MemoryKvStore::new()),
            Arc::new(LocalBlobStore::new(dir).unwrap()),
            Arc::new(SqliteJobQueue::new(db)),
        )
    }

    fn create_test_config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Use random port
        }
    }

    #[tokio::test]
    async fn test_web_server_new() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let server = WebServer::new(&create_test_config(), create_state(temp_dir.path()).await)
            .unwrap();
        assert_eq!(server.addr().ip().to_string(), "127.0.0.1");
    }

    #[tokio::test]
    async fn test_web_server_rejects_bad_host() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = ServerConfig {
            host: "not a host".to_string(),
            port: 5000,
        };
        let result = WebServer::new(&config, create_state(temp_dir.path()).await);
        assert!(matches!(result, Err(FileboxError::Config(_))));
    }

    #[tokio::test]
    async fn test_web_server_run_and_shutdown() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let server = WebServer::new(&create_test_config(), create_state(temp_dir.path()).await)
            .unwrap();
        let (tx, rx) = watch::channel(false);
        let addr = server.run_with_addr(rx).await.unwrap();

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /status HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains(r#"{"db":true,"sessions":true}"#));

        tx.send(true).unwrap();
    }
}
