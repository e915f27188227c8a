use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::time::timeout;

/// Name of the structured report the executor leaves in the workspace.
pub const REPORT_FILE: &str = "report.jsonl";
/// Combined stdout/stderr of the suite run, kept next to the report.
const OUTPUT_FILE: &str = "suite_output.txt";

/// How one suite execution ended. A non-zero exit is a normal result, not an
/// error: the suite reports failures through the report log.
#[derive(Debug)]
pub struct SuiteRun {
    /// Raw exit status of the executor; -1 when killed by a signal or by
    /// the wall-clock limit.
    pub exit_code: i32,
    pub timed_out: bool,
}

#[derive(Debug)]
pub struct ExecutorConfig {
    pub command: Vec<String>,
    pub timeout: Duration,
}

/// Runs the configured test command with the workspace as its working
/// directory, continuing past failures and capturing the exit status.
pub async fn run_suite(
    config: &ExecutorConfig,
    workspace: &Path,
    tests_dir_name: &str,
    report_path: &Path,
) -> Result<SuiteRun> {
    let command = render_command(&config.command, tests_dir_name, report_path)?;
    let output_file = fs::File::create(workspace.join(OUTPUT_FILE))?;

    let mut cmd = tokio::process::Command::new(&command[0]);
    cmd.args(&command[1..])
        .stdout(Stdio::from(output_file.try_clone()?))
        .stderr(Stdio::from(output_file))
        .current_dir(workspace);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning test executor {}", command[0]))?;

    match timeout(config.timeout, child.wait()).await {
        Ok(status) => {
            let status = status?;
            log::debug!("Suite executor finished with {status}");
            Ok(SuiteRun {
                exit_code: status.code().unwrap_or(-1),
                timed_out: false,
            })
        }
        Err(_) => {
            if let Err(e) = child.kill().await {
                log::error!("Failed to kill timed-out suite executor: {e}");
            }
            log::warn!(
                "Suite execution exceeded {}s and was killed",
                config.timeout.as_secs()
            );
            Ok(SuiteRun {
                exit_code: -1,
                timed_out: true,
            })
        }
    }
}

/// Applies the %TESTS% / %REPORT% substitutions to the command template.
fn render_command(template: &[String], tests: &str, report: &Path) -> Result<Vec<String>> {
    if template.is_empty() {
        bail!("Empty executor command");
    }

    let report = report.to_string_lossy();
    let mut mapping = HashMap::<&str, &str>::new();
    mapping.insert("%TESTS%", tests);
    mapping.insert("%REPORT%", &report);

    Ok(template
        .iter()
        .map(|s| {
            let mut t = s.clone();
            for (k, v) in mapping.iter() {
                t = t.replace(k, v);
            }
            t
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_render_command_substitutions() {
        let template = vec![
            "python3".to_string(),
            "-m".to_string(),
            "pytest".to_string(),
            "%TESTS%".to_string(),
            "--report-log=%REPORT%".to_string(),
        ];
        let rendered =
            render_command(&template, "tests", &PathBuf::from("/tmp/ws/report.jsonl")).unwrap();
        assert_eq!(rendered[3], "tests");
        assert_eq!(rendered[4], "--report-log=/tmp/ws/report.jsonl");
    }

    #[test]
    fn test_empty_command_is_rejected() {
        assert!(render_command(&[], "tests", Path::new("r.jsonl")).is_err());
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_captured_not_raised() {
        let workspace = tempdir().unwrap();
        let config = ExecutorConfig {
            command: vec!["sh".to_string(), "-c".to_string(), "exit 3".to_string()],
            timeout: Duration::from_secs(5),
        };
        let run = run_suite(
            &config,
            workspace.path(),
            "tests",
            &workspace.path().join(REPORT_FILE),
        )
        .await
        .unwrap();
        assert_eq!(run.exit_code, 3);
        assert!(!run.timed_out);
    }

    #[tokio::test]
    async fn test_hung_executor_is_killed() {
        let workspace = tempdir().unwrap();
        let config = ExecutorConfig {
            command: vec!["sleep".to_string(), "30".to_string()],
            timeout: Duration::from_millis(100),
        };
        let run = run_suite(
            &config,
            workspace.path(),
            "tests",
            &workspace.path().join(REPORT_FILE),
        )
        .await
        .unwrap();
        assert!(run.timed_out);
        assert_eq!(run.exit_code, -1);
    }

    #[tokio::test]
    async fn test_executor_runs_in_workspace_and_output_is_kept() {
        let workspace = tempdir().unwrap();
        let config = ExecutorConfig {
            command: vec!["sh".to_string(), "-c".to_string(), "pwd".to_string()],
            timeout: Duration::from_secs(5),
        };
        run_suite(
            &config,
            workspace.path(),
            "tests",
            &workspace.path().join(REPORT_FILE),
        )
        .await
        .unwrap();
        let output = fs::read_to_string(workspace.path().join(OUTPUT_FILE)).unwrap();
        let cwd = PathBuf::from(output.trim());
        assert_eq!(
            cwd.canonicalize().unwrap(),
            workspace.path().canonicalize().unwrap()
        );
    }
}
