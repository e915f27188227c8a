use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

/// Final status of one recorded outcome.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    Failed,
    Errored,
}

impl Status {
    fn from_report(outcome: &str) -> Self {
        match outcome {
            "passed" => Status::Passed,
            other if other.starts_with("error") => Status::Errored,
            _ => Status::Failed,
        }
    }
}

/// Phase an outcome was reported from. Only the call phase (and the collect
/// phase, which has no call) enters the pass/fail ratio.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Setup,
    Call,
    Teardown,
    Collect,
}

/// One recorded test result, in execution order.
#[derive(Debug, Clone)]
pub struct TestOutcome {
    pub nodeid: String,
    pub status: Status,
    pub phase: Phase,
    pub diagnostic: Option<String>,
}

impl TestOutcome {
    pub fn passed(&self) -> bool {
        self.status == Status::Passed
    }

    pub fn counts_toward_score(&self) -> bool {
        matches!(self.phase, Phase::Call | Phase::Collect)
    }
}

/// Observer over the executor's report stream.
///
/// The test runner writes one JSON record per line, discriminated by
/// `$report_type`. Per-test records that passed outside the call phase carry
/// no signal and are suppressed; a failed collection is recorded as a
/// synthetic failure so a submission that cannot even be imported still
/// surfaces at least one visible outcome instead of silently reporting zero
/// tests. Lines the collector does not understand are skipped.
#[derive(Debug, Default)]
pub struct ResultCollector {
    outcomes: Vec<TestOutcome>,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a whole report log, one JSON record per line.
    /// Returns how many records were understood.
    pub fn ingest_report_log(&mut self, path: &Path) -> Result<usize> {
        let file = File::open(path)
            .with_context(|| format!("opening report log {}", path.display()))?;
        let mut seen = 0;
        for line in BufReader::new(file).lines() {
            if self.observe_line(&line?) {
                seen += 1;
            }
        }
        Ok(seen)
    }

    /// Dispatches one report record. Returns false for lines that are not
    /// test or collect reports.
    pub fn observe_line(&mut self, line: &str) -> bool {
        let Ok(record) = serde_json::from_str::<Value>(line) else {
            return false;
        };
        match record.get("$report_type").and_then(Value::as_str) {
            Some("TestReport") => {
                self.observe_test_report(&record);
                true
            }
            Some("CollectReport") => {
                self.observe_collect_report(&record);
                true
            }
            _ => false,
        }
    }

    fn observe_test_report(&mut self, record: &Value) {
        let status = record
            .get("outcome")
            .and_then(Value::as_str)
            .map(Status::from_report)
            .unwrap_or(Status::Failed);
        let phase = match record.get("when").and_then(Value::as_str) {
            Some("setup") => Phase::Setup,
            Some("teardown") => Phase::Teardown,
            _ => Phase::Call,
        };
        if phase != Phase::Call && status == Status::Passed {
            return;
        }
        let diagnostic = match status {
            Status::Passed => None,
            _ => longrepr_text(record),
        };
        self.push(nodeid_of(record), status, phase, diagnostic);
    }

    fn observe_collect_report(&mut self, record: &Value) {
        let outcome = record.get("outcome").and_then(Value::as_str).unwrap_or("passed");
        if Status::from_report(outcome) == Status::Passed {
            return;
        }
        self.push(
            nodeid_of(record),
            Status::Failed,
            Phase::Collect,
            longrepr_text(record),
        );
    }

    /// Records a failure the executor could not report itself, e.g. a
    /// missing report stream or a run that had to be killed.
    pub fn record_execution_failure(&mut self, nodeid: &str, diagnostic: String) {
        self.push(
            nodeid.to_string(),
            Status::Errored,
            Phase::Collect,
            Some(diagnostic),
        );
    }

    fn push(&mut self, nodeid: String, status: Status, phase: Phase, diagnostic: Option<String>) {
        self.outcomes.push(TestOutcome {
            nodeid,
            status,
            phase,
            diagnostic,
        });
    }

    pub fn outcomes(&self) -> &[TestOutcome] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<TestOutcome> {
        self.outcomes
    }
}

/// Best available identifier: the nodeid when present, the reported file
/// path for file-level collect errors, a fixed fallback otherwise.
fn nodeid_of(record: &Value) -> String {
    match record.get("nodeid").and_then(Value::as_str) {
        Some(nodeid) if !nodeid.is_empty() => nodeid.to_string(),
        _ => record
            .get("fspath")
            .and_then(Value::as_str)
            .unwrap_or("tests")
            .to_string(),
    }
}

/// Raw failure text out of a report record. `longrepr` is either a plain
/// string or a structured traceback whose crash summary is the useful part.
fn longrepr_text(record: &Value) -> Option<String> {
    match record.get("longrepr") {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text.clone()),
        Some(other) => other
            .pointer("/reprcrash/message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(other.to_string())),
    }
}
