use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use bsh_core::errors::{BshError, ErrorInfo};
use serde::{Deserialize, Serialize};

use crate::serde::from_yaml_str;
use crate::space::SweepSpace;

/// How the result artifact travels from the benchmarked program to the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactChannel {
    /// Each run executes in its own directory under `work_dir`, so every
    /// artifact path is unique.
    #[default]
    Isolated,
    /// Every run writes the same path in the harness working directory.
    /// Requires strictly sequential runs.
    Shared,
}

/// Whether the exit status of the benchmarked program decides run success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitPolicy {
    /// Only the artifact decides. The exit code is still recorded.
    #[default]
    Ignore,
    /// A non-zero exit fails the run even when an artifact was written.
    Require,
}

/// Treatment of results whose field set differs from the first result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaPolicy {
    /// Output columns are the union of all fields in order of first
    /// appearance; absent values are written as the missing marker.
    #[default]
    Union,
    /// Results that do not match the first result's fields are rejected.
    Strict,
}

/// Complete description of one sweep.
///
/// Every field has a default, so an empty YAML document is a valid plan that
/// reproduces the historical sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPlan {
    #[serde(default)]
    pub space: SweepSpace,
    #[serde(default = "SweepPlan::default_executable")]
    pub executable: PathBuf,
    /// File name of the artifact the benchmarked program writes.
    #[serde(default = "SweepPlan::default_artifact")]
    pub artifact: String,
    /// Master dataset path.
    #[serde(default = "SweepPlan::default_output")]
    pub output: PathBuf,
    /// Parent of the per-run directories in the isolated channel.
    #[serde(default = "SweepPlan::default_work_dir")]
    pub work_dir: PathBuf,
    #[serde(default)]
    pub channel: ArtifactChannel,
    /// Pause after the child exits before the artifact is read.
    #[serde(default = "SweepPlan::default_grace_ms")]
    pub grace_ms: u64,
    /// Per-run wall clock budget. `None` waits forever.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub exit_policy: ExitPolicy,
    #[serde(default)]
    pub schema_policy: SchemaPolicy,
    /// Cell value written for fields a row does not carry.
    #[serde(default)]
    pub missing_marker: String,
}

impl SweepPlan {
    pub const DEFAULT_GRACE_MS: u64 = 200;

    fn default_executable() -> PathBuf {
        PathBuf::from("./bench.out")
    }

    fn default_artifact() -> String {
        "summary_metrics.csv".to_string()
    }

    fn default_output() -> PathBuf {
        PathBuf::from("all_results.csv")
    }

    fn default_work_dir() -> PathBuf {
        PathBuf::from("runs")
    }

    const fn default_grace_ms() -> u64 {
        Self::DEFAULT_GRACE_MS
    }

    /// Loads and validates a YAML plan file.
    pub fn load(path: &Path) -> Result<Self, BshError> {
        let text = fs::read_to_string(path).map_err(|err| {
            BshError::Config(
                ErrorInfo::new("plan-read", "failed to read sweep plan")
                    .with_context("path", path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
        let plan: SweepPlan = if text.trim().is_empty() {
            SweepPlan::default()
        } else {
            from_yaml_str(&text)?
        };
        plan.validate()?;
        Ok(plan)
    }

    /// Rejects plans that cannot drive a sweep.
    pub fn validate(&self) -> Result<(), BshError> {
        if self.executable.as_os_str().is_empty() {
            return Err(BshError::Config(ErrorInfo::new(
                "plan-executable",
                "executable path must not be empty",
            )));
        }
        if self.artifact.trim().is_empty() {
            return Err(BshError::Config(ErrorInfo::new(
                "plan-artifact",
                "artifact file name must not be empty",
            )));
        }
        let mut components = Path::new(&self.artifact).components();
        let bare = matches!(components.next(), Some(Component::Normal(_)))
            && components.next().is_none();
        if !bare {
            return Err(BshError::Config(
                ErrorInfo::new("plan-artifact", "artifact must be a bare file name")
                    .with_context("artifact", self.artifact.clone()),
            ));
        }
        if self.output.as_os_str().is_empty() {
            return Err(BshError::Config(ErrorInfo::new(
                "plan-output",
                "output path must not be empty",
            )));
        }
        if self.timeout_ms == Some(0) {
            return Err(BshError::Config(
                ErrorInfo::new("plan-timeout", "timeout must be positive")
                    .with_hint("omit timeout_ms to wait without a bound"),
            ));
        }
        Ok(())
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Incremental journal written next to the master dataset.
    pub fn journal_path(&self) -> PathBuf {
        let mut name = self
            .output
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".journal.jsonl");
        self.output.with_file_name(name)
    }

    /// Sweep report written next to the master dataset.
    pub fn report_path(&self) -> PathBuf {
        self.output.with_file_name("sweep_report.json")
    }
}

impl Default for SweepPlan {
    fn default() -> Self {
        Self {
            space: SweepSpace::default(),
            executable: Self::default_executable(),
            artifact: Self::default_artifact(),
            output: Self::default_output(),
            work_dir: Self::default_work_dir(),
            channel: ArtifactChannel::default(),
            grace_ms: Self::default_grace_ms(),
            timeout_ms: None,
            exit_policy: ExitPolicy::default(),
            schema_policy: SchemaPolicy::default(),
            missing_marker: String::new(),
        }
    }
}
