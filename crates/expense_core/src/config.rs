//! Store configuration.
//!
//! The schema version is deliberately absent: it is derived from the
//! migration registry so code and on-disk schema cannot drift apart.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_STORE_NAME: &str = "expenses";
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Where and how to open the expense store.
///
/// - `path` set → file-backed database
/// - `path` unset → private in-memory database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Logical store name, used in log events and worker thread names.
    pub name: String,
    /// Database file location.
    pub path: Option<PathBuf>,
    /// How long to wait on locks held by other connections.
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_STORE_NAME.to_string(),
            path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl StoreConfig {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    /// File store named after the default store name, e.g. `<dir>/expenses.db`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::file(dir.as_ref().join(format!("{DEFAULT_STORE_NAME}.db")))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// `file` or `memory`, as used in log lines.
    pub fn mode(&self) -> &'static str {
        if self.path.is_some() {
            "file"
        } else {
            "memory"
        }
    }
}
