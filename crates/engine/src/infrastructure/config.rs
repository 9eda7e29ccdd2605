//! Application configuration

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bind address
    pub server_host: String,
    /// HTTP server port
    pub server_port: u16,

    /// CORS allowed origins (comma-separated, or "*" for any)
    pub cors_allowed_origins: Vec<String>,

    /// Storage configuration
    pub store: StoreConfig,

    /// Long-poll bounds
    pub poll: PollConfig,

    /// Background message retention
    pub retention: RetentionConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => bail!("unknown store backend '{other}', expected 'sqlite' or 'memory'"),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// SQLite database path (if using sqlite backend)
    pub sqlite_path: String,
}

/// Clamps applied to every receive request
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Smallest accepted sleep between polls
    pub min_interval: Duration,
    /// Longest accepted total wait
    pub max_wait: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(50),
            max_wait: Duration::from_secs(60),
        }
    }
}

impl PollConfig {
    /// Upper bound for `POLL_MAX_WAIT_SECONDS`.
    pub const MAX_WAIT_CEILING: Duration = Duration::from_secs(3600);

    pub fn new(min_interval: Duration, max_wait: Duration) -> Result<Self> {
        if min_interval.is_zero() {
            bail!("POLL_MIN_INTERVAL_MS must be greater than zero");
        }
        if max_wait > Self::MAX_WAIT_CEILING {
            bail!(
                "POLL_MAX_WAIT_SECONDS must be at most {}",
                Self::MAX_WAIT_CEILING.as_secs()
            );
        }
        Ok(Self {
            min_interval,
            max_wait,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetentionConfig {
    /// Messages older than this are swept. `None` disables the sweeper.
    pub max_age: Option<Duration>,
    pub interval: Duration,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let retention_hours: u64 = parse_var("MESSAGE_RETENTION_HOURS", 0)?;
        let retention_interval: u64 = parse_var("RETENTION_INTERVAL_SECONDS", 3600)?;
        if retention_interval == 0 {
            bail!("RETENTION_INTERVAL_SECONDS must be greater than zero");
        }

        Ok(Self {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: parse_var("SERVER_PORT", 3000)
                .context("SERVER_PORT must be a valid port number")?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),

            store: StoreConfig {
                backend: env::var("STORE_BACKEND")
                    .unwrap_or_else(|_| "sqlite".to_string())
                    .parse()?,
                sqlite_path: env::var("STORE_SQLITE_PATH")
                    .unwrap_or_else(|_| "./data/realmhub.db".to_string()),
            },

            poll: PollConfig::new(
                Duration::from_millis(parse_var("POLL_MIN_INTERVAL_MS", 50)?),
                Duration::from_secs(parse_var("POLL_MAX_WAIT_SECONDS", 60)?),
            )?,

            retention: RetentionConfig {
                max_age: (retention_hours > 0)
                    .then(|| Duration::from_secs(retention_hours * 3600)),
                interval: Duration::from_secs(retention_interval),
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names_parse_case_insensitively() {
        assert_eq!("SQLite".parse::<StoreBackend>().expect("sqlite"), StoreBackend::Sqlite);
        assert_eq!(" memory ".parse::<StoreBackend>().expect("memory"), StoreBackend::Memory);
        assert!("neo4j".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn poll_defaults_match_documented_clamps() {
        let poll = PollConfig::default();
        assert_eq!(poll.min_interval, Duration::from_millis(50));
        assert_eq!(poll.max_wait, Duration::from_secs(60));
    }

    #[test]
    fn poll_bounds_reject_busy_loops_and_unbounded_waits() {
        assert!(PollConfig::new(Duration::ZERO, Duration::from_secs(60)).is_err());
        assert!(PollConfig::new(Duration::from_millis(50), Duration::from_secs(u64::MAX)).is_err());

        let ceiling = PollConfig::new(Duration::from_millis(1), PollConfig::MAX_WAIT_CEILING)
            .expect("ceiling is accepted");
        assert_eq!(ceiling.max_wait, Duration::from_secs(3600));
    }
}
