use crate::domains::core::batch::{BatchOptions, DEFAULT_MAX_CONCURRENCY};
use crate::errors::{DbError, DbResult};
use sqlx::sqlite::SqliteConnectOptions;
use std::str::FromStr;
use std::time::Duration;

pub const DB_PATH_VAR: &str = "LIFECYCLE_DB_PATH";
pub const MAX_CONCURRENCY_VAR: &str = "LIFECYCLE_MAX_CONCURRENCY";
pub const DEADLINE_MS_VAR: &str = "LIFECYCLE_DEADLINE_MS";

pub const DEFAULT_DB_PATH: &str = "lifecycle.db";

/// Settings for a lifecycle process, usually read from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// A filesystem path or a `sqlite:` URL
    pub db_path: String,
    pub max_concurrency: usize,
    pub deadline_ms: Option<u64>,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            deadline_ms: None,
        }
    }
}

impl LifecycleConfig {
    /// Load from process environment, picking up a `.env` file if one exists
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let db_path = lookup(DB_PATH_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.db_path);

        let max_concurrency = match lookup(MAX_CONCURRENCY_VAR) {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    log::warn!("Ignoring invalid {}={:?}", MAX_CONCURRENCY_VAR, raw);
                    defaults.max_concurrency
                }
            },
            None => defaults.max_concurrency,
        };

        let deadline_ms = lookup(DEADLINE_MS_VAR).and_then(|raw| match raw.trim().parse::<u64>() {
            Ok(ms) => Some(ms),
            Err(_) => {
                log::warn!("Ignoring invalid {}={:?}", DEADLINE_MS_VAR, raw);
                None
            }
        });

        Self {
            db_path,
            max_concurrency,
            deadline_ms,
        }
    }

    pub fn with_db_path(mut self, db_path: &str) -> Self {
        self.db_path = db_path.to_string();
        self
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            max_concurrency: self.max_concurrency,
            deadline: self.deadline_ms.map(Duration::from_millis),
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.db_path.contains(":memory:")
    }

    /// Connection options; file databases are created on first use
    pub fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.db_path.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(&self.db_path).map_err(DbError::from)?
        } else {
            SqliteConnectOptions::new().filename(&self.db_path)
        };
        Ok(options.create_if_missing(true).busy_timeout(Duration::from_secs(5)))
    }
}
