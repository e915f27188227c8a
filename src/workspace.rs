use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

/// Directory name the suite is copied under inside the workspace; also the
/// test target handed to the executor.
pub const TESTS_DIR_NAME: &str = "tests";

/// Self-contained execution directory for one grading cycle.
///
/// Holds a private copy of the fixed test suite and the submission under the
/// module name the suite imports. Every cycle gets a fresh directory and the
/// suite runs in a freshly spawned interpreter process with this directory
/// as its working directory, so definitions from an earlier submission can
/// never be observed by a later one. The directory is removed when the
/// workspace drops, on every exit path.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn build(tests_dir: &Path, module_file: &str, submission: &[u8]) -> Result<Self> {
        let dir = TempDir::with_prefix("grader-")?;
        copy_dir_all(tests_dir, &dir.path().join(TESTS_DIR_NAME))
            .with_context(|| format!("copying test suite from {}", tests_dir.display()))?;
        fs::write(dir.path().join(module_file), submission)
            .with_context(|| format!("placing submission as {module_file}"))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn report_path(&self) -> PathBuf {
        self.dir.path().join(crate::runner::REPORT_FILE)
    }
}

fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
