use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

#[derive(Parser)]
#[command(name = "grader", version = "1.0", about, long_about = None)]
pub struct CliArgs {
    /// Path to the configuration file
    #[arg(long = "config", short = 'c')]
    pub config_path: Option<String>,

    /// Whether to flush the existing failure log
    #[arg(long = "flush-log", short = 'f', default_value_t = false)]
    pub flush_log: bool,
}

impl CliArgs {
    /// Load the configuration from the specified file, or fall back to the
    /// built-in defaults when no file was given
    pub fn to_config(&self) -> std::io::Result<Config> {
        match &self.config_path {
            Some(path) => {
                let file = std::fs::File::open(path)?;
                let reader = std::io::BufReader::new(file);
                serde_json::from_reader(reader).map_err(|e| e.into())
            }
            None => Ok(Config::default()),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub grading: GradingConfig,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: Option<String>,
    pub bind_port: Option<u16>,
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct GradingConfig {
    /// Directory holding the fixed test suite shipped with the deployment
    pub tests_dir: PathBuf,
    /// Where accepted uploads are kept for audit
    pub submissions_dir: PathBuf,
    /// Backing file of the cumulative failure ledger
    pub failure_log: PathBuf,
    /// File name the test suite imports the submission under
    pub module_file: String,
    /// Upload extension accepted by the submit endpoint, without the dot
    pub required_extension: String,
    /// Test executor command; %TESTS% and %REPORT% are substituted per run
    pub command: Vec<String>,
    /// Wall-clock limit for one suite execution, in seconds
    pub timeout_secs: u64,
}

impl Default for GradingConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            tests_dir: data_dir.join("tests"),
            submissions_dir: data_dir.join("submissions"),
            failure_log: data_dir.join("failure_log.json"),
            module_file: "bookbyte.py".to_string(),
            required_extension: "py".to_string(),
            command: default_command(),
            timeout_secs: 120,
        }
    }
}

fn default_command() -> Vec<String> {
    [
        "python3",
        "-m",
        "pytest",
        "-q",
        "%TESTS%",
        "--maxfail=0",
        "-p",
        "no:cacheprovider",
        "--report-log=%REPORT%",
    ]
    .map(String::from)
    .to_vec()
}

fn default_data_dir() -> PathBuf {
    use directories::ProjectDirs;

    match ProjectDirs::from("", "", "grader") {
        Some(proj_dirs) => proj_dirs.data_local_dir().to_path_buf(),
        None => PathBuf::from("data"),
    }
}
