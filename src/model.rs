use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable carrying the comma-joined run id selection.
pub const FIXED_RUN_IDS_ENV: &str = "FIXED_RUN_IDS";
/// Environment variable carrying the comma-joined step ids.
pub const ONLY_STEPS_ENV: &str = "ONLY_STEPS";

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub run_ids_file: PathBuf,
    pub step_ids: Vec<String>,
    pub test_type: TestType,
    pub make_path: PathBuf,
    pub make_program: String,
    pub num_run_ids: usize,
    pub random_seed: u64,
    pub extra_run_ids: Vec<String>,
    pub out_file: Option<PathBuf>,
    pub dry_run: bool,
}

/// Which make target to invoke. The target name is the kebab-case form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TestType {
    RunLocal,
    DeployTestInCloud,
}

impl TestType {
    /// Name of the make target for this test type.
    pub fn as_target(self) -> &'static str {
        match self {
            TestType::RunLocal => "run-local",
            TestType::DeployTestInCloud => "deploy-test-in-cloud",
        }
    }

    /// Only local runs stream output through this process, so only they can be teed.
    pub fn supports_tee(self) -> bool {
        matches!(self, TestType::RunLocal)
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_target())
    }
}

/// How the delegated process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failed { code: i32 },
    Signaled,
    NotStarted,
}

impl Outcome {
    pub fn from_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => Outcome::Success,
            Some(code) => Outcome::Failed { code },
            None => Outcome::Signaled,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Success)
    }

    pub fn exit_code(self) -> Option<i32> {
        match self {
            Outcome::Success => Some(0),
            Outcome::Failed { code } => Some(code),
            Outcome::Signaled | Outcome::NotStarted => None,
        }
    }
}

/// Everything known about one invocation, for the text summary or `--json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationReport {
    pub started_at: String,
    pub command: String,
    pub test_type: TestType,
    pub step_ids: Vec<String>,
    pub run_ids: Vec<String>,
    #[serde(default)]
    pub out_file: Option<PathBuf>,
    #[serde(default)]
    pub pid: Option<u32>,
    pub outcome: Outcome,
    #[serde(default)]
    pub exit_code: Option<i32>,
    pub success: bool,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
    pub dry_run: bool,
}
