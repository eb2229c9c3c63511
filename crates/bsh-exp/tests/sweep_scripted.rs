use std::fs;
use std::path::Path;
use std::time::Duration;

use bsh_core::errors::{BshError, ErrorInfo};
use bsh_core::ConfigurationPoint;
use bsh_exp::{
    run_sweep, CollectionFailure, DatasetOutcome, ExitPolicy, Invocation, InvocationOutcome,
    Journal, Runner, SchemaPolicy, SweepPlan, SweepSpace,
};
use tempfile::{tempdir, TempDir};

/// What the scripted benchmark does on a given attempt.
#[derive(Clone)]
enum Step {
    Write(&'static str),
    WriteAndExit(&'static str, i32),
    Skip,
    Hang,
    FailLaunch,
}

struct ScriptedRunner {
    steps: Vec<Step>,
    seen: Vec<ConfigurationPoint>,
}

impl ScriptedRunner {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            seen: Vec::new(),
        }
    }
}

impl Runner for ScriptedRunner {
    fn run(&mut self, invocation: &Invocation<'_>) -> Result<InvocationOutcome, BshError> {
        self.seen.push(invocation.point);
        match self.steps[invocation.index].clone() {
            Step::Write(body) => {
                fs::write(invocation.artifact_path, body).expect("write artifact");
                Ok(InvocationOutcome::exited(0, Duration::ZERO))
            }
            Step::WriteAndExit(body, code) => {
                fs::write(invocation.artifact_path, body).expect("write artifact");
                Ok(InvocationOutcome::exited(code, Duration::ZERO))
            }
            Step::Skip => Ok(InvocationOutcome::exited(0, Duration::ZERO)),
            Step::Hang => Ok(InvocationOutcome::timed_out(Duration::from_millis(50))),
            Step::FailLaunch => Err(BshError::Launch(ErrorInfo::new(
                "launch-spawn",
                "No such file or directory",
            ))),
        }
    }
}

fn two_point_plan(dir: &TempDir) -> SweepPlan {
    SweepPlan {
        space: SweepSpace::new(vec![12], vec![1024], vec![2, 4], vec![50_000]),
        output: dir.path().join("all_results.csv"),
        work_dir: dir.path().join("runs"),
        grace_ms: 0,
        ..SweepPlan::default()
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).expect("read dataset")
}

#[test]
fn every_run_collected_in_order() {
    let dir = tempdir().expect("tempdir");
    let plan = two_point_plan(&dir);
    let mut runner = ScriptedRunner::new(vec![
        Step::Write("latency_us\n100.0\n"),
        Step::Write("latency_us\n100.0\n"),
    ]);
    let report = run_sweep(&plan, &mut runner).expect("sweep");

    assert_eq!(
        runner.seen,
        vec![
            ConfigurationPoint::new(12, 1024, 2, 50_000),
            ConfigurationPoint::new(12, 1024, 4, 50_000),
        ]
    );
    assert_eq!(report.attempted, 2);
    assert_eq!(report.collected, 2);
    assert!(!report.no_results());
    assert_eq!(read(&plan.output), "latency_us\n100.0\n100.0\n");
    assert!(!plan.journal_path().exists());
}

#[test]
fn missing_second_artifact_drops_one_row() {
    let dir = tempdir().expect("tempdir");
    let plan = two_point_plan(&dir);
    let mut runner = ScriptedRunner::new(vec![Step::Write("latency_us\n100.0\n"), Step::Skip]);
    let report = run_sweep(&plan, &mut runner).expect("sweep");

    assert_eq!(report.attempted, 2);
    assert_eq!(report.collected, 1);
    assert!(report.runs[0].collected);
    assert_eq!(report.runs[1].failure, Some(CollectionFailure::MissingArtifact));
    assert_eq!(read(&plan.output), "latency_us\n100.0\n");
}

#[test]
fn strict_schema_rejects_changed_header() {
    let dir = tempdir().expect("tempdir");
    let plan = SweepPlan {
        schema_policy: SchemaPolicy::Strict,
        ..two_point_plan(&dir)
    };
    let mut runner = ScriptedRunner::new(vec![
        Step::Write("latency_us\n1\n"),
        Step::Write("throughput\n2\n"),
    ]);
    let report = run_sweep(&plan, &mut runner).expect("sweep");

    assert_eq!(report.attempted, 2);
    assert_eq!(report.collected, 1);
    assert!(report.runs[0].collected);
    assert!(!report.runs[1].collected);
    assert_eq!(report.runs[1].failure, Some(CollectionFailure::SchemaMismatch));
    assert_eq!(report.failure_counts().get("schema_mismatch"), Some(&1));
    assert_eq!(read(&plan.output), "latency_us\n1\n");
}

#[test]
fn nothing_collected_signals_no_results() {
    let dir = tempdir().expect("tempdir");
    let plan = two_point_plan(&dir);
    let mut runner = ScriptedRunner::new(vec![Step::Skip, Step::Write("latency_us\n")]);
    let report = run_sweep(&plan, &mut runner).expect("sweep");

    assert!(report.no_results());
    assert_eq!(report.dataset, DatasetOutcome::NoResults);
    assert_eq!(report.collected, 0);
    assert!(!plan.output.exists());
    let counts = report.failure_counts();
    assert_eq!(counts.get("missing_artifact"), Some(&1));
    assert_eq!(counts.get("empty_artifact"), Some(&1));
}

#[test]
fn empty_space_completes_without_attempts() {
    let dir = tempdir().expect("tempdir");
    let mut plan = two_point_plan(&dir);
    plan.space.thread_counts.clear();
    let mut runner = ScriptedRunner::new(Vec::new());
    let report = run_sweep(&plan, &mut runner).expect("sweep");
    assert_eq!(report.attempted, 0);
    assert!(report.no_results());
    assert!(runner.seen.is_empty());
}

#[test]
fn launch_failure_aborts_before_later_points() {
    let dir = tempdir().expect("tempdir");
    let plan = two_point_plan(&dir);
    let mut runner = ScriptedRunner::new(vec![Step::FailLaunch, Step::Write("latency_us\n1\n")]);
    let err = run_sweep(&plan, &mut runner).unwrap_err();

    assert!(err.is_launch());
    assert_eq!(runner.seen.len(), 1);
    assert!(!plan.output.exists());
}

#[test]
fn launch_failure_mid_sweep_keeps_journaled_rows() {
    let dir = tempdir().expect("tempdir");
    let plan = two_point_plan(&dir);
    let mut runner = ScriptedRunner::new(vec![Step::Write("latency_us\n7\n"), Step::FailLaunch]);
    run_sweep(&plan, &mut runner).unwrap_err();

    assert!(!plan.output.exists());
    let entries = Journal::read(&plan.journal_path()).expect("journal");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].result.get("latency_us"), Some("7"));
}

#[test]
fn timed_out_run_is_skipped_and_sweep_continues() {
    let dir = tempdir().expect("tempdir");
    let plan = two_point_plan(&dir);
    let mut runner = ScriptedRunner::new(vec![Step::Hang, Step::Write("latency_us\n5\n")]);
    let report = run_sweep(&plan, &mut runner).expect("sweep");

    assert_eq!(report.runs[0].failure, Some(CollectionFailure::TimeoutFailure));
    assert_eq!(report.runs[0].exit_code, None);
    assert_eq!(report.collected, 1);
    assert_eq!(read(&plan.output), "latency_us\n5\n");
}

#[test]
fn exit_code_is_recorded_but_ignored_by_default() {
    let dir = tempdir().expect("tempdir");
    let plan = two_point_plan(&dir);
    let mut runner = ScriptedRunner::new(vec![
        Step::WriteAndExit("latency_us\n1\n", 3),
        Step::Write("latency_us\n2\n"),
    ]);
    let report = run_sweep(&plan, &mut runner).expect("sweep");
    assert_eq!(report.collected, 2);
    assert_eq!(report.runs[0].exit_code, Some(3));
}

#[test]
fn require_exit_policy_rejects_failed_process() {
    let dir = tempdir().expect("tempdir");
    let plan = SweepPlan {
        exit_policy: ExitPolicy::Require,
        ..two_point_plan(&dir)
    };
    let mut runner = ScriptedRunner::new(vec![
        Step::WriteAndExit("latency_us\n1\n", 3),
        Step::Write("latency_us\n2\n"),
    ]);
    let report = run_sweep(&plan, &mut runner).expect("sweep");
    assert_eq!(
        report.runs[0].failure,
        Some(CollectionFailure::NonZeroExit { code: Some(3) })
    );
    assert_eq!(read(&plan.output), "latency_us\n2\n");
}

#[test]
fn isolated_runs_use_distinct_artifact_paths() {
    let dir = tempdir().expect("tempdir");
    let plan = two_point_plan(&dir);
    let mut runner = ScriptedRunner::new(vec![
        Step::Write("latency_us\n1\n"),
        Step::Write("latency_us\n2\n"),
    ]);
    run_sweep(&plan, &mut runner).expect("sweep");

    let first = plan.work_dir.join("run_00000").join("summary_metrics.csv");
    let second = plan.work_dir.join("run_00001").join("summary_metrics.csv");
    assert_eq!(read(&first), "latency_us\n1\n");
    assert_eq!(read(&second), "latency_us\n2\n");
    assert!(plan.work_dir.join("run_00001").join("stdout.log").exists());
}

#[test]
fn report_hash_is_stable_for_identical_plans() {
    let dir = tempdir().expect("tempdir");
    let plan = two_point_plan(&dir);
    let steps = vec![Step::Write("latency_us\n1\n"), Step::Write("latency_us\n1\n")];
    let first = run_sweep(&plan, &mut ScriptedRunner::new(steps.clone())).expect("sweep");
    let second = run_sweep(&plan, &mut ScriptedRunner::new(steps)).expect("sweep");
    assert_eq!(first.plan_hash, second.plan_hash);
    assert_eq!(first.plan_hash.len(), 64);

    let report_path = plan.report_path();
    first.persist(&report_path).expect("persist");
    let restored: bsh_exp::SweepReport =
        bsh_exp::from_json_slice(&fs::read(&report_path).expect("read report")).expect("decode");
    assert_eq!(restored, first);
}
