use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use bsh_exp::{
    run_sweep, ArtifactChannel, DatasetOutcome, ExitPolicy, ProcessRunner, SchemaPolicy,
    SweepPlan,
};
use clap::{Args, ValueEnum};

use super::PlanArgs;

/// Exit status when the sweep finished but collected nothing.
pub const NO_RESULTS_EXIT: u8 = 2;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ChannelArg {
    Isolated,
    Shared,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum SchemaArg {
    Union,
    Strict,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub plan: PlanArgs,
    /// Benchmark executable fed the four-line stdin protocol.
    #[arg(long)]
    pub executable: Option<PathBuf>,
    /// File name of the artifact written by the benchmark.
    #[arg(long)]
    pub artifact: Option<String>,
    /// Master dataset path.
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Parent directory for per-run working directories.
    #[arg(long)]
    pub work_dir: Option<PathBuf>,
    #[arg(long, value_enum)]
    pub channel: Option<ChannelArg>,
    /// Milliseconds to wait after the benchmark exits before reading its artifact.
    #[arg(long)]
    pub grace_ms: Option<u64>,
    /// Kill a benchmark run after this many milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,
    /// Treat a non-zero exit status as a failed run.
    #[arg(long)]
    pub require_exit_zero: bool,
    #[arg(long, value_enum)]
    pub schema: Option<SchemaArg>,
    /// Value written for fields a row does not carry.
    #[arg(long)]
    pub missing_marker: Option<String>,
}

impl RunArgs {
    fn resolve(&self) -> Result<SweepPlan, Box<dyn Error>> {
        let mut plan = self.plan.resolve()?;
        if let Some(executable) = &self.executable {
            plan.executable = executable.clone();
        }
        if let Some(artifact) = &self.artifact {
            plan.artifact = artifact.clone();
        }
        if let Some(output) = &self.output {
            plan.output = output.clone();
        }
        if let Some(work_dir) = &self.work_dir {
            plan.work_dir = work_dir.clone();
        }
        if let Some(channel) = self.channel {
            plan.channel = match channel {
                ChannelArg::Isolated => ArtifactChannel::Isolated,
                ChannelArg::Shared => ArtifactChannel::Shared,
            };
        }
        if let Some(grace_ms) = self.grace_ms {
            plan.grace_ms = grace_ms;
        }
        if self.timeout_ms.is_some() {
            plan.timeout_ms = self.timeout_ms;
        }
        if self.require_exit_zero {
            plan.exit_policy = ExitPolicy::Require;
        }
        if let Some(schema) = self.schema {
            plan.schema_policy = match schema {
                SchemaArg::Union => SchemaPolicy::Union,
                SchemaArg::Strict => SchemaPolicy::Strict,
            };
        }
        if let Some(marker) = &self.missing_marker {
            plan.missing_marker = marker.clone();
        }
        plan.validate()?;
        Ok(plan)
    }
}

pub fn run(args: &RunArgs) -> Result<ExitCode, Box<dyn Error>> {
    let plan = args.resolve()?;
    let mut runner = ProcessRunner::from_plan(&plan)?;
    let report = run_sweep(&plan, &mut runner)?;
    report.persist(&plan.report_path())?;

    println!("Completed {} runs.", report.attempted);
    println!("Collected {} result rows.", report.collected);
    for (kind, count) in report.failure_counts() {
        println!("  {kind}: {count}");
    }
    match &report.dataset {
        DatasetOutcome::Written { path, .. } => {
            println!("Master CSV written: {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        DatasetOutcome::NoResults => {
            println!("No results collected!");
            Ok(ExitCode::from(NO_RESULTS_EXIT))
        }
    }
}
