//! Status file for external monitoring.
//!
//! Writes a JSON status file that external tools can poll to follow the
//! running agent: the latest cycle, the treasury balance, live workers and
//! whether the halt switch is latched.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::agent::CycleSummary;
use crate::domain::Amount;
use crate::error::Result;

/// Current status file format version.
const STATUS_VERSION: &str = "1";

/// Top-level status file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusFile {
    /// Schema version for forward compatibility.
    pub version: String,
    /// When the process started.
    pub started_at: DateTime<Utc>,
    pub pid: u32,
    /// Static configuration snapshot.
    pub config: StatusConfig,
    pub runtime: StatusRuntime,
    /// Most recent cycle, if any has run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_cycle: Option<CycleSummary>,
    /// When this file was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Static configuration snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Enabled strategy ids.
    pub strategies: Vec<String>,
    /// `passive` or `audit` at startup.
    pub audit_mode: String,
    pub dry_run: bool,
}

/// Live agent state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusRuntime {
    pub balance: Amount,
    pub cycles: u64,
    pub active_workers: usize,
    pub halted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halt_reason: Option<String>,
}

/// Writer for the status file.
///
/// Thread-safe wrapper that manages atomic updates to the status file.
pub struct StatusWriter {
    path: PathBuf,
    status: Mutex<StatusFile>,
}

impl StatusWriter {
    #[must_use]
    pub fn new(path: PathBuf, config: StatusConfig) -> Self {
        let now = Utc::now();
        let status = StatusFile {
            version: STATUS_VERSION.to_string(),
            started_at: now,
            pid: std::process::id(),
            config,
            runtime: StatusRuntime::default(),
            last_cycle: None,
            updated_at: now,
        };

        Self {
            path,
            status: Mutex::new(status),
        }
    }

    /// Write the current status to the file atomically.
    ///
    /// Uses write-to-temp-then-rename. Creates the parent directory if it
    /// doesn't exist.
    #[allow(clippy::result_large_err)]
    pub fn write(&self) -> Result<()> {
        let json = {
            let mut status = self.status.lock();
            status.updated_at = Utc::now();
            serde_json::to_string_pretty(&*status)?
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)?;

        let cleanup_and_err = |e| {
            let _ = fs::remove_file(&temp_path);
            e
        };

        file.write_all(json.as_bytes()).map_err(cleanup_and_err)?;
        file.sync_all().map_err(cleanup_and_err)?;
        fs::rename(&temp_path, &self.path).map_err(cleanup_and_err)?;

        Ok(())
    }

    /// Record a finished cycle together with the live runtime state.
    pub fn record_cycle(&self, summary: &CycleSummary, runtime: StatusRuntime) {
        let mut status = self.status.lock();
        status.runtime = runtime;
        status.last_cycle = Some(summary.clone());
    }

    #[must_use]
    pub fn snapshot(&self) -> StatusFile {
        self.status.lock().clone()
    }
}
