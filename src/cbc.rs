//! File-based interface to the CBC MILP solver.
//!
//! The problem is written as an MPS file, `cbc` is run as a child process
//! and its solution file is parsed back. Decision variables of interest are
//! named `T<index>`; the index refers to the caller's candidate list.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use crate::assignment::SolutionStatus;
use crate::error::DispatchError;

/// Banner printed by every CBC build when started.
const WELCOME_MESSAGE: &str = "Welcome to the CBC MILP Solver";

/// Extra wall-clock time granted beyond the solver's own time limit.
const GRACE_PERIOD: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Handle on the CBC executable and the directory its files go to.
///
/// Problem and solution files have fixed names per problem kind, so every
/// solver that may run concurrently needs a directory of its own.
#[derive(Debug, Clone)]
pub struct CbcSolver {
    executable: PathBuf,
    working_directory: PathBuf,
    /// Keeps a private directory alive for as long as any clone exists.
    _scratch: Option<Arc<TempDir>>,
}

impl CbcSolver {
    /// Fails if the executable does not identify itself as CBC.
    pub fn new(
        executable: impl Into<PathBuf>,
        working_directory: impl Into<PathBuf>,
    ) -> Result<Self, DispatchError> {
        let executable = Self::checked(executable.into())?;

        let working_directory = working_directory.into();
        fs::create_dir_all(&working_directory)?;

        Ok(Self {
            executable,
            working_directory,
            _scratch: None,
        })
    }

    /// Like [`CbcSolver::new`], writing into a fresh directory under the
    /// system temp dir that is removed with the last clone.
    pub fn in_temp_dir(executable: impl Into<PathBuf>) -> Result<Self, DispatchError> {
        let executable = Self::checked(executable.into())?;
        let scratch = tempfile::Builder::new().prefix("cbc").tempdir()?;

        tracing::debug!("Cbc files go to {}", scratch.path().display());

        Ok(Self {
            executable,
            working_directory: scratch.path().to_path_buf(),
            _scratch: Some(Arc::new(scratch)),
        })
    }

    fn checked(executable: PathBuf) -> Result<PathBuf, DispatchError> {
        if Self::check_availability(&executable) {
            return Ok(executable);
        }

        tracing::error!(
            "Cbc MILP solver was not found at '{}'. Make sure the executable can be called from the command line.",
            executable.display()
        );
        Err(DispatchError::SolverUnavailable(format!(
            "cbc ({})",
            executable.display()
        )))
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn check_availability(executable: &Path) -> bool {
        Command::new(executable)
            .arg("unknown_file")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map(|output| String::from_utf8_lossy(&output.stdout).contains(WELCOME_MESSAGE))
            .unwrap_or(false)
    }

    pub fn problem_path(&self, name: &str) -> PathBuf {
        self.working_directory.join(format!("{}_problem.mps", name))
    }

    pub fn solution_path(&self, name: &str) -> PathBuf {
        self.working_directory.join(format!("{}_solution.txt", name))
    }

    /// Solves a problem file and returns the raw solution text. `options` go
    /// between the problem path and the trailing `-solve -solution <path>`.
    pub fn run(
        &self,
        problem: &Path,
        solution: &Path,
        options: &[String],
        time_limit: Duration,
    ) -> Result<String, DispatchError> {
        if solution.exists() {
            fs::remove_file(solution)?;
        }

        let mut child = Command::new(&self.executable)
            .arg(problem)
            .args(options)
            .arg("-solve")
            .arg("-solution")
            .arg(solution)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let deadline = Instant::now() + time_limit + GRACE_PERIOD;

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }

            if Instant::now() >= deadline {
                child.kill()?;
                child.wait()?;
                return Err(DispatchError::ProcessFailure(format!(
                    "cbc did not finish within {:?}",
                    time_limit + GRACE_PERIOD
                )));
            }

            thread::sleep(POLL_INTERVAL);
        };

        if !status.success() {
            tracing::warn!("Cbc exited with status {}", status);
        }

        if !solution.exists() {
            return Err(DispatchError::ProcessFailure(
                "cbc did not write a solution file".to_string(),
            ));
        }

        Ok(fs::read_to_string(solution)?)
    }
}

/// Reads a CBC solution file.
///
/// The first line carries the status. `Optimal` and `Stopped` (time limit
/// hit with an incumbent) keep the selection; anything else is a failure.
/// Every later line looks like `<row> T<index> <value> <reduced cost>`.
pub fn parse_solution(text: &str) -> (SolutionStatus, Vec<usize>) {
    let mut lines = text.lines();

    let status = match lines.next().map(str::trim_start) {
        Some(line) if line.starts_with("Optimal") => SolutionStatus::Optimal,
        Some(line) if line.starts_with("Stopped") => SolutionStatus::Feasible,
        _ => return (SolutionStatus::Failure, Vec::new()),
    };

    let selected = lines
        .filter(|line| line.contains('T'))
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            let index = parts.get(1)?.strip_prefix('T')?.parse::<usize>().ok()?;
            let value = parts.get(2)?.parse::<f64>().ok()?;
            (value > 0.5).then_some(index)
        })
        .collect();

    (status, selected)
}
