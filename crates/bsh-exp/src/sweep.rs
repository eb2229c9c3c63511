use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use bsh_core::errors::BshError;
use bsh_core::ConfigurationPoint;
use tracing::{error, info, warn};

use crate::collect::{clear_artifact, collect_artifact, CollectionFailure};
use crate::dataset::{Accumulator, Admission, Journal};
use crate::hash::stable_hash_string;
use crate::invoke::{Invocation, InvocationOutcome, Runner};
use crate::plan::{ArtifactChannel, ExitPolicy, SweepPlan};
use crate::report::{RunRecord, SweepReport};

/// Executes every point of `plan.space` in order and persists the master
/// dataset.
///
/// Runs are strictly sequential: each invocation, its grace interval and its
/// artifact read finish before the next point starts. Per-run failures are
/// recorded in the report and never stop the sweep. A launch failure aborts
/// immediately with `BshError::Launch`; the master dataset is then not
/// written, while rows accepted so far remain in the journal.
pub fn run_sweep<R: Runner>(plan: &SweepPlan, runner: &mut R) -> Result<SweepReport, BshError> {
    plan.validate()?;
    let plan_hash = stable_hash_string(plan)?;
    let cwd = env::current_dir().map_err(|err| BshError::io("cwd", Path::new("."), &err))?;
    info!(
        points = plan.space.len(),
        channel = ?plan.channel,
        plan_hash = %plan_hash,
        "starting sweep"
    );

    let journal = Journal::create(plan.journal_path())?;
    let mut accumulator = Accumulator::new(plan.schema_policy).with_journal(journal);
    let mut runs = Vec::with_capacity(plan.space.len());

    for (index, point) in plan.space.points().enumerate() {
        let (working_dir, artifact_path) = prepare_run(plan, &cwd, index)?;
        clear_artifact(&artifact_path)?;
        info!(run = index, %point, "running benchmark");

        let invocation = Invocation {
            index,
            point,
            working_dir: &working_dir,
            artifact_path: &artifact_path,
        };
        let outcome = runner.run(&invocation).map_err(|err| {
            error!(run = index, %point, error = %err, "aborting sweep");
            err
        })?;
        if plan.channel == ArtifactChannel::Isolated {
            save_streams(&working_dir, &outcome);
        }

        let failure = match judge(plan, &outcome, &artifact_path) {
            Ok(result) => match accumulator.accept(index, point, result)? {
                Admission::Accepted => None,
                Admission::Rejected(failure) => Some(failure),
            },
            Err(failure) => Some(failure),
        };
        if let Some(failure) = &failure {
            warn!(run = index, %point, kind = failure.kind(), "{failure}");
        }
        runs.push(record(index, point, &outcome, failure));
    }

    let attempted = runs.len();
    let collected = accumulator.len();
    info!(attempted, collected, "sweep completed");

    let dataset = accumulator.finalize(&plan.output, &plan.missing_marker)?;
    let report = SweepReport {
        plan_hash,
        attempted,
        collected,
        runs,
        dataset,
    };
    if report.no_results() {
        warn!(attempted, "no results collected");
    }
    Ok(report)
}

fn prepare_run(plan: &SweepPlan, cwd: &Path, index: usize) -> Result<(PathBuf, PathBuf), BshError> {
    match plan.channel {
        ArtifactChannel::Shared => Ok((cwd.to_path_buf(), cwd.join(&plan.artifact))),
        ArtifactChannel::Isolated => {
            let dir = cwd.join(&plan.work_dir).join(format!("run_{:05}", index));
            fs::create_dir_all(&dir).map_err(|err| BshError::io("run-dir", &dir, &err))?;
            let artifact = dir.join(&plan.artifact);
            Ok((dir, artifact))
        }
    }
}

fn judge(
    plan: &SweepPlan,
    outcome: &InvocationOutcome,
    artifact: &Path,
) -> Result<bsh_core::RunResult, CollectionFailure> {
    if outcome.timed_out {
        return Err(CollectionFailure::TimeoutFailure);
    }
    if plan.exit_policy == ExitPolicy::Require && !outcome.success() {
        return Err(CollectionFailure::NonZeroExit {
            code: outcome.exit_code,
        });
    }
    collect_artifact(artifact)
}

fn save_streams(dir: &Path, outcome: &InvocationOutcome) {
    for (name, bytes) in [("stdout.log", &outcome.stdout), ("stderr.log", &outcome.stderr)] {
        let path = dir.join(name);
        if let Err(err) = fs::write(&path, bytes) {
            warn!(path = %path.display(), error = %err, "failed to save captured output");
        }
    }
}

fn record(
    index: usize,
    point: ConfigurationPoint,
    outcome: &InvocationOutcome,
    failure: Option<CollectionFailure>,
) -> RunRecord {
    RunRecord {
        index,
        point,
        collected: failure.is_none(),
        failure,
        exit_code: outcome.exit_code,
        elapsed_ms: u64::try_from(outcome.elapsed.as_millis()).unwrap_or(u64::MAX),
    }
}
