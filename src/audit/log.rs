//! Append-only JSON-lines audit log.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::action::{ActionKind, AuditAction, AuditDecision, RiskLevel};
use crate::error::{Error, Result};

/// One line of the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub kind: ActionKind,
    pub title: String,
    pub risk: RiskLevel,
    pub details: BTreeMap<String, String>,
    pub decision: AuditDecision,
}

/// Writer for the audit log file.
pub struct AuditLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl AuditLog {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one decision. Creates the parent directory if needed.
    pub fn append(&self, action: &AuditAction, decision: AuditDecision) -> Result<()> {
        let record = AuditRecord {
            timestamp: Utc::now(),
            kind: action.kind,
            title: action.title.clone(),
            risk: action.risk,
            details: action.details.clone(),
            decision,
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.lock.lock();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Read every record back (for review tooling and tests).
    pub fn read_all(&self) -> Result<Vec<AuditRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str::<AuditRecord>(line).map_err(Error::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_one_line_per_decision() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("nested/audit.log"));

        log.append(&AuditAction::worker("Spawn worker"), AuditDecision::Approved)
            .unwrap();
        log.append(
            &AuditAction::transaction("Book expense").detail("amount", "1.00"),
            AuditDecision::Timeout,
        )
        .unwrap();

        let records = log.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].decision, AuditDecision::Approved);
        assert_eq!(records[1].kind, ActionKind::Transaction);
        assert_eq!(records[1].details.get("amount").map(String::as_str), Some("1.00"));
    }

    #[test]
    fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("audit.log"));
        assert!(log.read_all().unwrap().is_empty());
    }
}
