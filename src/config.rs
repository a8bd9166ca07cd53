//! Configuration module for filebox.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::{FileboxError, Result};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/files_manager.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Blob storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Base directory for uploaded payloads and thumbnails.
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    /// Maximum decoded upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
}

fn default_storage_path() -> String {
    "/tmp/files_manager".to_string()
}

fn default_max_upload_size() -> u64 {
    10
}

impl FilesConfig {
    /// Maximum upload size in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_size_mb * 1024 * 1024
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            max_upload_size_mb: default_max_upload_size(),
        }
    }
}

/// Which key-value backend holds session tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    /// Durable `kv_entries` table in the main database.
    #[default]
    Sqlite,
    /// Process-local map, lost on restart.
    Memory,
}

/// Session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Backend used for the token store.
    #[serde(default)]
    pub backend: SessionBackend,
    /// Session lifetime in seconds.
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,
}

fn default_session_ttl() -> u64 {
    24 * 60 * 60
}

impl SessionConfig {
    /// Session lifetime as a duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::default(),
            ttl_secs: default_session_ttl(),
        }
    }
}

/// Background worker configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Run workers inside the API server process.
    #[serde(default = "default_embedded")]
    pub embedded: bool,
    /// Number of concurrent thumbnail workers.
    #[serde(default = "default_thumbnail_concurrency")]
    pub thumbnail_concurrency: usize,
    /// Sleep between polls when the queue is empty, in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Attempts before a job is dead-lettered.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay for exponential backoff, in milliseconds.
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,
    /// Upper bound on a single handler invocation, in seconds.
    #[serde(default = "default_job_timeout")]
    pub job_timeout_secs: u64,
    /// Claimed jobs older than this are redelivered, in seconds.
    #[serde(default = "default_claim_timeout")]
    pub claim_timeout_secs: u64,
}

fn default_embedded() -> bool {
    true
}

fn default_thumbnail_concurrency() -> usize {
    2
}

fn default_poll_interval() -> u64 {
    500
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base() -> u64 {
    2000
}

fn default_job_timeout() -> u64 {
    60
}

fn default_claim_timeout() -> u64 {
    300 // 5 minutes
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            embedded: default_embedded(),
            thumbnail_concurrency: default_thumbnail_concurrency(),
            poll_interval_ms: default_poll_interval(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base(),
            job_timeout_secs: default_job_timeout(),
            claim_timeout_secs: default_claim_timeout(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/filebox.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Blob storage configuration.
    #[serde(default)]
    pub files: FilesConfig,
    /// Session configuration.
    #[serde(default)]
    pub session: SessionConfig,
    /// Worker configuration.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FileboxError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FileboxError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `HOST`, `PORT`: listen address
    /// - `DB_DATABASE`: SQLite database path
    /// - `FOLDER_PATH`: blob storage base directory
    /// - `LOG_LEVEL`: log level
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid PORT"),
            }
        }
        if let Some(path) = get("DB_DATABASE") {
            self.database.path = path;
        }
        if let Some(path) = get("FOLDER_PATH") {
            self.files.storage_path = path;
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.session.ttl_secs == 0 {
            return Err(FileboxError::Config(
                "session.ttl_secs must be greater than zero".to_string(),
            ));
        }
        if self.worker.max_attempts == 0 {
            return Err(FileboxError::Config(
                "worker.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.worker.claim_timeout_secs <= self.worker.job_timeout_secs {
            return Err(FileboxError::Config(format!(
                "worker.claim_timeout_secs ({}) must exceed worker.job_timeout_secs ({})",
                self.worker.claim_timeout_secs, self.worker.job_timeout_secs
            )));
        }
        if self.files.storage_path.is_empty() {
            return Err(FileboxError::Config(
                "files.storage_path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);

        assert_eq!(config.database.path, "data/files_manager.db");

        assert_eq!(config.files.storage_path, "/tmp/files_manager");
        assert_eq!(config.files.max_upload_size_mb, 10);
        assert_eq!(config.files.max_upload_bytes(), 10 * 1024 * 1024);

        assert_eq!(config.session.backend, SessionBackend::Sqlite);
        assert_eq!(config.session.ttl_secs, 86400);

        assert!(config.worker.embedded);
        assert_eq!(config.worker.max_attempts, 3);
        assert_eq!(config.worker.job_timeout_secs, 60);

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/filebox.log");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 8080

[database]
path = "custom/db.sqlite"

[files]
storage_path = "custom/files"
max_upload_size_mb = 20

[session]
backend = "memory"
ttl_secs = 3600

[worker]
embedded = false
thumbnail_concurrency = 4
poll_interval_ms = 100
max_attempts = 5
backoff_base_ms = 250
job_timeout_secs = 30
claim_timeout_secs = 120

[logging]
level = "debug"
file = "custom/logs/app.log"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.path, "custom/db.sqlite");
        assert_eq!(config.files.storage_path, "custom/files");
        assert_eq!(config.files.max_upload_size_mb, 20);
        assert_eq!(config.session.backend, SessionBackend::Memory);
        assert_eq!(config.session.ttl(), Duration::from_secs(3600));
        assert!(!config.worker.embedded);
        assert_eq!(config.worker.thumbnail_concurrency, 4);
        assert_eq!(config.worker.poll_interval_ms, 100);
        assert_eq!(config.worker.max_attempts, 5);
        assert_eq!(config.worker.backoff_base_ms, 250);
        assert_eq!(config.worker.job_timeout_secs, 30);
        assert_eq!(config.worker.claim_timeout_secs, 120);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, "custom/logs/app.log");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[server]
port = 3000
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.path, "data/files_manager.db");
        assert_eq!(config.session.ttl_secs, 86400);
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("this is not valid toml [[[");

        assert!(result.is_err());
        if let Err(FileboxError::Config(msg)) = result {
            assert!(msg.contains("config parse error"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_parse_unknown_session_backend() {
        let result = Config::parse("[session]\nbackend = \"redis\"\n");
        assert!(matches!(result, Err(FileboxError::Config(_))));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent.toml");
        assert!(matches!(result, Err(FileboxError::Io(_))));
    }

    #[test]
    fn test_apply_overrides() {
        let env: HashMap<&str, &str> = [
            ("HOST", "127.0.0.1"),
            ("PORT", "6000"),
            ("DB_DATABASE", "/var/lib/filebox.db"),
            ("FOLDER_PATH", "/srv/files"),
            ("LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides_from(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 6000);
        assert_eq!(config.database.path, "/var/lib/filebox.db");
        assert_eq!(config.files.storage_path, "/srv/files");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_apply_overrides_ignores_empty_and_invalid() {
        let mut config = Config::default();
        config.apply_overrides_from(|k| match k {
            "FOLDER_PATH" => Some(String::new()),
            "PORT" => Some("not-a-port".to_string()),
            _ => None,
        });

        assert_eq!(config.files.storage_path, "/tmp/files_manager");
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.session.ttl_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.worker.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_claim_timeout_must_exceed_job_timeout() {
        let mut config = Config::default();
        config.worker.job_timeout_secs = 600;
        config.worker.claim_timeout_secs = 10;
        assert!(matches!(config.validate(), Err(FileboxError::Config(_))));

        config.worker.claim_timeout_secs = 600;
        assert!(config.validate().is_err());

        config.worker.claim_timeout_secs = 601;
        assert!(config.validate().is_ok());
    }
}
