//! Store configuration: where the database lives and how SQLite is tuned.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// `PRAGMA synchronous` level for the writer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Synchronous {
    Off,
    Normal,
    Full,
}

impl Synchronous {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Normal => "NORMAL",
            Self::Full => "FULL",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "normal" => Ok(Self::Normal),
            "full" => Ok(Self::Full),
            _ => Err(ConfigError::InvalidSynchronous(s.to_string())),
        }
    }
}

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database file. `None` keeps everything in memory.
    pub path: Option<PathBuf>,
    /// How long a connection waits on a locked database before failing.
    pub busy_timeout: Duration,
    pub synchronous: Synchronous,
    /// Page cache size in KiB.
    pub cache_size_kib: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout: Duration::from_millis(5000),
            synchronous: Synchronous::Normal,
            cache_size_kib: 32000,
        }
    }
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn at(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn with_synchronous(mut self, synchronous: Synchronous) -> Self {
        self.synchronous = synchronous;
        self
    }

    pub fn with_cache_size_kib(mut self, kib: u32) -> Self {
        self.cache_size_kib = kib;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// `HERDLOG_DB_PATH` selects the database file (in-memory when unset),
    /// `HERDLOG_BUSY_TIMEOUT_MS` and `HERDLOG_SYNCHRONOUS` override tuning.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("HERDLOG_DB_PATH").filter(|p| !p.is_empty()) {
            config.path = Some(PathBuf::from(path));
        }

        if let Some(raw) = lookup("HERDLOG_BUSY_TIMEOUT_MS") {
            let ms: u64 = raw
                .parse()
                .map_err(|_| ConfigError::InvalidBusyTimeout(raw.clone()))?;
            config.busy_timeout = Duration::from_millis(ms);
        }

        if let Some(raw) = lookup("HERDLOG_SYNCHRONOUS") {
            config.synchronous = Synchronous::parse(&raw)?;
        }

        Ok(config)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid HERDLOG_BUSY_TIMEOUT_MS value: {0}")]
    InvalidBusyTimeout(String),

    #[error("invalid HERDLOG_SYNCHRONOUS value: {0} (expected off, normal or full)")]
    InvalidSynchronous(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = StoreConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.path.is_none());
        assert_eq!(config.busy_timeout, Duration::from_secs(5));
        assert_eq!(config.synchronous, Synchronous::Normal);
    }

    #[test]
    fn reads_overrides() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("HERDLOG_DB_PATH", "/data/herd.db"),
            ("HERDLOG_BUSY_TIMEOUT_MS", "250"),
            ("HERDLOG_SYNCHRONOUS", "Full"),
        ]))
        .unwrap();
        assert_eq!(config.path, Some(PathBuf::from("/data/herd.db")));
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert_eq!(config.synchronous, Synchronous::Full);
    }

    #[test]
    fn rejects_bad_values() {
        let err = StoreConfig::from_lookup(lookup(&[("HERDLOG_BUSY_TIMEOUT_MS", "soon")]));
        assert!(matches!(err, Err(ConfigError::InvalidBusyTimeout(_))));

        let err = StoreConfig::from_lookup(lookup(&[("HERDLOG_SYNCHRONOUS", "extra")]));
        assert!(matches!(err, Err(ConfigError::InvalidSynchronous(_))));
    }
}
