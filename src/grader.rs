use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use thiserror::Error;

use crate::collector::{Phase, ResultCollector, Status, TestOutcome};
use crate::config::GradingConfig;
use crate::feedback;
use crate::ledger::{FailureLedger, FailureLog};
use crate::runner::{self, ExecutorConfig};
use crate::workspace::{TESTS_DIR_NAME, Workspace};

/// Grading failures that map to HTTP errors. Submission defects never land
/// here; they become recorded outcomes instead.
#[derive(Error, Debug)]
pub enum GradeError {
    #[error("only .{0} submissions are accepted")]
    UnsupportedExtension(String),
    #[error("test suite not found on server")]
    TestSuiteMissing,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize, Debug)]
pub struct GradingResponse {
    pub student: String,
    pub stored_file: String,
    pub score: f64,
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<ResultEntry>,
    pub failure_log: FailureLog,
    pub exit_code: i32,
}

/// One outcome as exposed on the wire: the phase only when it is not the
/// call phase, feedback only for non-passed outcomes with a table entry.
#[derive(Serialize, Debug)]
pub struct ResultEntry {
    pub nodeid: String,
    pub outcome: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl ResultEntry {
    fn from_outcome(outcome: TestOutcome) -> Self {
        let phase = (outcome.phase != Phase::Call).then_some(outcome.phase);
        let feedback = if outcome.passed() {
            None
        } else {
            let advice = feedback::advice_for(&outcome.nodeid);
            (!advice.is_empty()).then(|| advice.to_string())
        };
        Self {
            nodeid: outcome.nodeid,
            outcome: outcome.status,
            phase,
            feedback,
        }
    }
}

/// Drives one full grading cycle: workspace setup, suite execution, result
/// collection, score computation, ledger update, response assembly.
pub struct Grader {
    tests_dir: PathBuf,
    submissions_dir: PathBuf,
    module_file: String,
    required_extension: String,
    executor: ExecutorConfig,
    ledger: FailureLedger,
}

impl Grader {
    pub fn new(config: GradingConfig) -> Self {
        Self {
            executor: ExecutorConfig {
                command: config.command,
                timeout: Duration::from_secs(config.timeout_secs),
            },
            ledger: FailureLedger::new(config.failure_log),
            tests_dir: config.tests_dir,
            submissions_dir: config.submissions_dir,
            module_file: config.module_file,
            required_extension: config.required_extension,
        }
    }

    pub fn ledger(&self) -> &FailureLedger {
        &self.ledger
    }

    /// Grades one submission. Both rejection paths fire before any file is
    /// stored or any workspace is created.
    pub async fn grade(
        &self,
        student_name: &str,
        file_name: &str,
        content: &[u8],
    ) -> Result<GradingResponse, GradeError> {
        if !self.tests_dir.is_dir() {
            log::error!("Fixed test suite missing at {}", self.tests_dir.display());
            return Err(GradeError::TestSuiteMissing);
        }

        let extension = Path::new(file_name).extension().and_then(|e| e.to_str());
        if extension != Some(self.required_extension.as_str()) {
            return Err(GradeError::UnsupportedExtension(
                self.required_extension.clone(),
            ));
        }

        // Audit copy, kept regardless of how grading turns out
        let stored_file = format!(
            "{}_{}.{}",
            crate::unix_timestamp(),
            slugify(student_name),
            self.required_extension
        );
        fs::create_dir_all(&self.submissions_dir)
            .context("creating submissions directory")?;
        fs::write(self.submissions_dir.join(&stored_file), content)
            .with_context(|| format!("storing submission {stored_file}"))?;
        log::info!("Stored submission {stored_file}");

        let workspace = Workspace::build(&self.tests_dir, &self.module_file, content)?;
        let report_path = workspace.report_path();
        let run = runner::run_suite(&self.executor, workspace.path(), TESTS_DIR_NAME, &report_path)
            .await?;

        let mut collector = ResultCollector::new();
        if report_path.is_file() {
            let seen = collector.ingest_report_log(&report_path)?;
            log::debug!("Ingested {seen} report records");
        }
        if run.timed_out {
            collector.record_execution_failure(
                TESTS_DIR_NAME,
                format!(
                    "suite execution timed out after {}s",
                    self.executor.timeout.as_secs()
                ),
            );
        } else if collector.outcomes().is_empty() {
            // An empty run must still surface as a visible failure
            collector.record_execution_failure(
                TESTS_DIR_NAME,
                format!("test executor produced no report (exit code {})", run.exit_code),
            );
        }
        drop(workspace);

        let outcomes = collector.into_outcomes();
        let (passed, total) = score_counts(&outcomes);
        let failed = total - passed;
        let score = score_percent(passed, total);

        let failure_log = self.ledger.record_failures(&outcomes)?;
        log::info!(
            "Graded submission from '{student_name}': {passed}/{total} passed, score {score}"
        );

        Ok(GradingResponse {
            student: student_name.to_string(),
            stored_file,
            score,
            total_tests: total,
            passed,
            failed,
            results: outcomes.into_iter().map(ResultEntry::from_outcome).collect(),
            failure_log,
            exit_code: run.exit_code,
        })
    }
}

/// Counted outcomes are call-phase and collect-phase records only; other
/// phases are diagnostic-only. Returns (passed, total).
fn score_counts(outcomes: &[TestOutcome]) -> (usize, usize) {
    let mut total = 0;
    let mut passed = 0;
    for outcome in outcomes.iter().filter(|o| o.counts_toward_score()) {
        total += 1;
        if outcome.passed() {
            passed += 1;
        }
    }
    (passed, total)
}

/// Percentage of counted tests passed, rounded to two decimals; zero when
/// nothing was counted.
fn score_percent(passed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = 100.0 * passed as f64 / total as f64;
    (raw * 100.0).round() / 100.0
}

/// Lowercases, maps every non-alphanumeric character to a hyphen, trims
/// leading and trailing hyphens, and falls back to a placeholder for
/// all-symbol names.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "student".to_string()
    } else {
        slug.to_string()
    }
}
