use std::path::PathBuf;
use std::time::Duration;

use hrhub_pipeline::{CommitScope, PipelineConfig};

/// A configuration variable is missing or unparseable.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} must be {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// PostgreSQL connection string (required).
    pub database_url: String,
    /// Directory job `file_path`s are resolved against (default: `./uploads`).
    pub document_root: PathBuf,
    /// Maximum number of jobs executing at once (default: `4`).
    pub concurrency: usize,
    /// Dispatcher poll interval (default: 1s).
    pub poll_interval: Duration,
    /// Age after which a claimed job that never started may be claimed
    /// again (default: 5 min).
    pub claim_lease: Duration,
    /// How long in-flight jobs may keep running after shutdown is requested
    /// (default: 30s).
    pub shutdown_grace: Duration,
    /// Timeout and commit scope handed to the pipeline.
    pub pipeline: PipelineConfig,
    pub log_format: LogFormat,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default     |
    /// |-----------------------|-------------|
    /// | `DATABASE_URL`        | (required)  |
    /// | `DOCUMENT_ROOT`       | `./uploads` |
    /// | `WORKER_CONCURRENCY`  | `4`         |
    /// | `POLL_INTERVAL_MS`    | `1000`      |
    /// | `CLAIM_LEASE_SECS`    | `300`       |
    /// | `SHUTDOWN_GRACE_SECS` | `30`        |
    /// | `STORE_TIMEOUT_SECS`  | `30`        |
    /// | `COMMIT_SCOPE`        | `job`       |
    /// | `LOG_FORMAT`          | `plain`     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let document_root =
            PathBuf::from(lookup("DOCUMENT_ROOT").unwrap_or_else(|| "./uploads".into()));

        let concurrency: usize = parse(&lookup, "WORKER_CONCURRENCY", "4", "a positive integer")?;
        if concurrency == 0 {
            return Err(ConfigError::Invalid {
                name: "WORKER_CONCURRENCY",
                expected: "a positive integer",
                value: "0".into(),
            });
        }

        let poll_interval_ms: u64 = parse(&lookup, "POLL_INTERVAL_MS", "1000", "a valid u64")?;
        let claim_lease_secs: u64 = parse(&lookup, "CLAIM_LEASE_SECS", "300", "a valid u64")?;
        let shutdown_grace_secs: u64 =
            parse(&lookup, "SHUTDOWN_GRACE_SECS", "30", "a valid u64")?;
        let store_timeout_secs: u64 = parse(&lookup, "STORE_TIMEOUT_SECS", "30", "a valid u64")?;

        let commit_scope_raw = lookup("COMMIT_SCOPE").unwrap_or_else(|| "job".into());
        let commit_scope =
            CommitScope::from_str(commit_scope_raw.trim()).ok_or(ConfigError::Invalid {
                name: "COMMIT_SCOPE",
                expected: "'job' or 'record'",
                value: commit_scope_raw.clone(),
            })?;

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("plain") => LogFormat::Plain,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "LOG_FORMAT",
                    expected: "'plain' or 'json'",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            database_url,
            document_root,
            concurrency,
            poll_interval: Duration::from_millis(poll_interval_ms),
            claim_lease: Duration::from_secs(claim_lease_secs),
            shutdown_grace: Duration::from_secs(shutdown_grace_secs),
            pipeline: PipelineConfig {
                call_timeout: Duration::from_secs(store_timeout_secs),
                commit_scope,
            },
            log_format,
        })
    }
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    let value = lookup(name).unwrap_or_else(|| default.to_string());
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        expected,
        value,
    })
}
