//! Launching the benchmarked program for one configuration point.
//!
//! The child receives the four-line stdin protocol, runs to completion (or
//! until the optional timeout kills it), and has its output streams captured
//! without interpretation.

use std::env;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use bsh_core::errors::{BshError, ErrorInfo};
use bsh_core::ConfigurationPoint;
use tracing::{debug, warn};

use crate::plan::SweepPlan;

/// Environment variable carrying the absolute artifact path to the child.
pub const ARTIFACT_PATH_ENV: &str = "BSH_ARTIFACT_PATH";
/// Environment variable carrying the zero-based attempt index to the child.
pub const RUN_INDEX_ENV: &str = "BSH_RUN_INDEX";

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const DRAIN_CHUNK: usize = 8 * 1024;

/// Everything a runner needs to execute one attempt.
#[derive(Debug, Clone)]
pub struct Invocation<'a> {
    pub index: usize,
    pub point: ConfigurationPoint,
    /// Working directory for the child.
    pub working_dir: &'a Path,
    /// Where the collector will look for the artifact after the run.
    pub artifact_path: &'a Path,
}

/// What was observed about one finished (or killed) child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationOutcome {
    /// `None` when the child was killed by a signal or by the timeout.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub elapsed: Duration,
}

impl InvocationOutcome {
    /// Outcome of a child that exited normally with `code`.
    pub fn exited(code: i32, elapsed: Duration) -> Self {
        Self {
            exit_code: Some(code),
            timed_out: false,
            stdout: Vec::new(),
            stderr: Vec::new(),
            elapsed,
        }
    }

    /// Outcome of a run that exceeded its budget, either because the child
    /// was killed or because its output pipes stayed open past the deadline.
    pub fn timed_out(elapsed: Duration) -> Self {
        Self {
            exit_code: None,
            timed_out: true,
            stdout: Vec::new(),
            stderr: Vec::new(),
            elapsed,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Executes one benchmark attempt.
///
/// An `Err` is fatal for the whole sweep and is reserved for launch
/// failures. Anything that happens after the child started is reported
/// through [`InvocationOutcome`].
pub trait Runner {
    fn run(&mut self, invocation: &Invocation<'_>) -> Result<InvocationOutcome, BshError>;
}

/// Runs the benchmarked program as a child process.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    timeout: Option<Duration>,
    grace: Duration,
}

impl ProcessRunner {
    /// Creates a runner for `program`.
    ///
    /// A relative path with more than one component is anchored at the
    /// current directory so that per-run working directories still launch
    /// the same file. Bare names are left for `PATH` lookup.
    pub fn new(program: impl Into<PathBuf>) -> Result<Self, BshError> {
        let program = program.into();
        let program = if program.is_relative() && program.components().count() > 1 {
            let cwd = env::current_dir().map_err(|err| BshError::io("cwd", Path::new("."), &err))?;
            cwd.join(program)
        } else {
            program
        };
        Ok(Self {
            program,
            timeout: None,
            grace: Duration::from_millis(SweepPlan::DEFAULT_GRACE_MS),
        })
    }

    /// Creates a runner configured with the plan's executable, timeout and
    /// grace interval.
    pub fn from_plan(plan: &SweepPlan) -> Result<Self, BshError> {
        Ok(Self::new(plan.executable.clone())?
            .with_timeout(plan.timeout())
            .with_grace(plan.grace()))
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn spawn(&self, invocation: &Invocation<'_>) -> Result<Child, BshError> {
        Command::new(&self.program)
            .current_dir(invocation.working_dir)
            .env(ARTIFACT_PATH_ENV, invocation.artifact_path)
            .env(RUN_INDEX_ENV, invocation.index.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| launch_error(&self.program, invocation, &err))
    }
}

impl Runner for ProcessRunner {
    fn run(&mut self, invocation: &Invocation<'_>) -> Result<InvocationOutcome, BshError> {
        let started = Instant::now();
        let mut child = self.spawn(invocation)?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        if let Some(mut stdin) = child.stdin.take() {
            let payload = invocation.point.stdin_payload();
            if let Err(err) = stdin.write_all(payload.as_bytes()) {
                // A child that exits without reading its input is not a launch failure.
                warn!(run = invocation.index, error = %err, "failed to write benchmark input");
            }
        }

        let deadline = self.timeout.map(|limit| started + limit);
        let status = match self.timeout {
            Some(limit) => child.wait_timeout(limit),
            None => child.wait().map(Some),
        };
        let status = match status {
            Ok(status) => status,
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(BshError::Io(
                    ErrorInfo::new("run-wait", "failed to wait for benchmark process")
                        .with_context("run", invocation.index.to_string())
                        .with_hint(err.to_string()),
                ));
            }
        };

        let outcome = match status {
            Some(status) => {
                // Background processes forked by the child inherit the pipes,
                // so EOF is bounded by the same deadline as the child itself.
                let drained = [&stdout, &stderr]
                    .into_iter()
                    .flatten()
                    .fold(true, |drained, pipe| pipe.finish(deadline) && drained);
                if !drained {
                    warn!(
                        run = invocation.index,
                        "benchmark output still open at the deadline"
                    );
                }
                InvocationOutcome {
                    exit_code: status.code(),
                    timed_out: !drained,
                    stdout: snapshot(&stdout),
                    stderr: snapshot(&stderr),
                    elapsed: started.elapsed(),
                }
            }
            None => {
                let _ = child.kill();
                let _ = child.wait();
                InvocationOutcome {
                    stdout: snapshot(&stdout),
                    stderr: snapshot(&stderr),
                    ..InvocationOutcome::timed_out(started.elapsed())
                }
            }
        };
        debug!(
            run = invocation.index,
            exit_code = ?outcome.exit_code,
            timed_out = outcome.timed_out,
            stdout_bytes = outcome.stdout.len(),
            stderr_bytes = outcome.stderr.len(),
            "benchmark process finished"
        );
        if !outcome.timed_out && !self.grace.is_zero() {
            thread::sleep(self.grace);
        }
        Ok(outcome)
    }
}

fn launch_error(program: &Path, invocation: &Invocation<'_>, err: &io::Error) -> BshError {
    let hint = match err.kind() {
        io::ErrorKind::NotFound => "check that the benchmark executable exists",
        io::ErrorKind::PermissionDenied => "check that the benchmark executable is executable",
        _ => "the benchmark executable could not be started",
    };
    BshError::Launch(
        ErrorInfo::new("launch-spawn", err.to_string())
            .with_context("program", program.display().to_string())
            .with_context("run", invocation.index.to_string())
            .with_context("point", invocation.point.to_string())
            .with_hint(hint),
    )
}

/// Output of one child pipe, read on a background thread.
///
/// The buffer grows as chunks arrive, so whatever was read before a deadline
/// can be taken even if the pipe never reaches EOF.
struct Drain {
    buf: Arc<Mutex<Vec<u8>>>,
    done: Receiver<()>,
}

impl Drain {
    /// Waits for EOF, up to `deadline` when one is set. Returns `false` if
    /// the pipe was still open at the deadline.
    fn finish(&self, deadline: Option<Instant>) -> bool {
        match deadline {
            None => {
                let _ = self.done.recv();
                true
            }
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                !matches!(self.done.recv_timeout(remaining), Err(RecvTimeoutError::Timeout))
            }
        }
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Drain {
    let buf = Arc::new(Mutex::new(Vec::new()));
    let (tx, done) = mpsc::channel();
    let sink = Arc::clone(&buf);
    thread::spawn(move || {
        let mut chunk = [0u8; DRAIN_CHUNK];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => sink
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        let _ = tx.send(());
    });
    Drain { buf, done }
}

fn snapshot(pipe: &Option<Drain>) -> Vec<u8> {
    pipe.as_ref()
        .map(|pipe| pipe.buf.lock().unwrap_or_else(PoisonError::into_inner).clone())
        .unwrap_or_default()
}

trait ChildExt {
    fn wait_timeout(&mut self, timeout: Duration) -> io::Result<Option<ExitStatus>>;
}

impl ChildExt for Child {
    fn wait_timeout(&mut self, timeout: Duration) -> io::Result<Option<ExitStatus>> {
        let start = Instant::now();
        loop {
            if let Some(status) = self.try_wait()? {
                return Ok(Some(status));
            }
            if start.elapsed() >= timeout {
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}
