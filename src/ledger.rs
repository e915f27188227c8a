use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::collector::TestOutcome;
use crate::feedback;

/// Cumulative failure counts across every submission ever graded.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct FailureLog {
    pub failures: BTreeMap<String, FailureEntry>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct FailureEntry {
    pub count: u64,
    #[serde(alias = "last_message")]
    pub last_feedback: String,
}

/// Persistent failure ledger backed by a flat JSON document.
///
/// State is re-read on every access and the whole document is rewritten on
/// every update; nothing is cached across requests.
pub struct FailureLedger {
    path: PathBuf,
}

impl FailureLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted ledger. An absent or malformed backing file
    /// degrades to an empty ledger; grading never blocks on ledger state.
    pub fn load(&self) -> FailureLog {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return FailureLog::default(),
        };
        match serde_json::from_str(&raw) {
            Ok(log) => log,
            Err(e) => {
                log::warn!(
                    "Malformed failure log at {}, treating as empty: {e}",
                    self.path.display()
                );
                FailureLog::default()
            }
        }
    }

    /// Folds every non-passed outcome into the ledger, overwriting each
    /// entry's feedback with the current advisory string, and rewrites the
    /// whole document. Returns the updated snapshot.
    ///
    /// Concurrent grading cycles race on this read-modify-write and the last
    /// writer wins; accepted for low-volume advisory data.
    pub fn record_failures(&self, outcomes: &[TestOutcome]) -> Result<FailureLog> {
        let mut log = self.load();
        for outcome in outcomes.iter().filter(|o| !o.passed()) {
            let entry = log.failures.entry(outcome.nodeid.clone()).or_default();
            entry.count += 1;
            entry.last_feedback = feedback::advice_for(&outcome.nodeid).to_string();
        }
        self.persist(&log)?;
        Ok(log)
    }

    fn persist(&self, log: &FailureLog) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        let body = serde_json::to_string_pretty(log)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, body).with_context(|| format!("writing {}", staging.display()))?;
        fs::rename(&staging, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{Phase, Status};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn outcome(nodeid: &str, status: Status) -> TestOutcome {
        TestOutcome {
            nodeid: nodeid.to_string(),
            status,
            phase: Phase::Call,
            diagnostic: None,
        }
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let ledger = FailureLedger::new(dir.path().join("failure_log.json"));
        assert_eq!(ledger.load(), FailureLog::default());
    }

    #[test]
    fn test_malformed_file_loads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("failure_log.json");
        fs::write(&path, "{not json").unwrap();
        let ledger = FailureLedger::new(&path);
        assert_eq!(ledger.load(), FailureLog::default());
    }

    #[test]
    fn test_load_is_idempotent() {
        let dir = tempdir().unwrap();
        let ledger = FailureLedger::new(dir.path().join("failure_log.json"));
        ledger
            .record_failures(&[outcome("tests/t.py::test_a", Status::Failed)])
            .unwrap();
        assert_eq!(ledger.load(), ledger.load());
    }

    #[test]
    fn test_record_increments_and_overwrites_feedback() {
        let dir = tempdir().unwrap();
        let ledger = FailureLedger::new(dir.path().join("failure_log.json"));
        let nodeid = "tests/test_bookbyte_products.py::test_imponible_iva";

        let first = ledger
            .record_failures(&[outcome(nodeid, Status::Failed)])
            .unwrap();
        assert_eq!(first.failures[nodeid].count, 1);
        assert!(first.failures[nodeid].last_feedback.contains("1.21"));

        let second = ledger
            .record_failures(&[outcome(nodeid, Status::Errored)])
            .unwrap();
        assert_eq!(second.failures[nodeid].count, 2);
        assert_eq!(
            second.failures[nodeid].last_feedback,
            first.failures[nodeid].last_feedback
        );
    }

    #[test]
    fn test_passed_outcomes_are_ignored() {
        let dir = tempdir().unwrap();
        let ledger = FailureLedger::new(dir.path().join("failure_log.json"));
        let log = ledger
            .record_failures(&[
                outcome("tests/t.py::test_a", Status::Passed),
                outcome("tests/t.py::test_b", Status::Failed),
            ])
            .unwrap();
        assert_eq!(log.failures.len(), 1);
        assert!(log.failures.contains_key("tests/t.py::test_b"));
    }

    #[test]
    fn test_empty_outcomes_are_a_noop_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("failure_log.json");
        let ledger = FailureLedger::new(&path);
        let log = ledger.record_failures(&[]).unwrap();
        assert!(log.failures.is_empty());
        assert!(path.exists());
    }

    #[test]
    fn test_unknown_identifier_gets_empty_feedback() {
        let dir = tempdir().unwrap();
        let ledger = FailureLedger::new(dir.path().join("failure_log.json"));
        let log = ledger
            .record_failures(&[outcome("tests/t.py::test_unmapped", Status::Failed)])
            .unwrap();
        assert_eq!(log.failures["tests/t.py::test_unmapped"].last_feedback, "");
    }

    #[test]
    fn test_legacy_last_message_key_is_accepted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("failure_log.json");
        fs::write(
            &path,
            r#"{"failures": {"tests/t.py::test_a": {"count": 3, "last_message": "old advice"}}}"#,
        )
        .unwrap();
        let log = FailureLedger::new(&path).load();
        assert_eq!(log.failures["tests/t.py::test_a"].count, 3);
        assert_eq!(log.failures["tests/t.py::test_a"].last_feedback, "old advice");
    }

    #[test]
    fn test_corrupt_ledger_is_reset_on_next_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("failure_log.json");
        fs::write(&path, "garbage").unwrap();
        let ledger = FailureLedger::new(&path);
        ledger
            .record_failures(&[outcome("tests/t.py::test_a", Status::Failed)])
            .unwrap();
        let log = ledger.load();
        assert_eq!(log.failures.len(), 1);
        assert_eq!(log.failures["tests/t.py::test_a"].count, 1);
    }
}
