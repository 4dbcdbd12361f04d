//! Runs submitted code in a subprocess.
//!
//! The source is written into a fresh temporary directory and handed to the
//! configured interpreter with piped output. A wall-clock limit bounds the
//! run; the temp directory is removed on every path, success or not.
//!
//! There is no sandboxing of filesystem or network access beyond the time
//! limit. A non-zero exit is a normal outcome reported back verbatim.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::ExecutionConfig;
use crate::errors::ExecError;
use crate::models::ExecutionReport;

/// File name the submitted source is staged under.
const SUBMISSION_FILE: &str = "submission.py";

/// Executes submitted code with a wall-clock limit.
pub struct CodeRunner {
    interpreter: String,
    timeout_secs: u64,
}

impl CodeRunner {
    pub fn new(config: &ExecutionConfig) -> Self {
        Self {
            interpreter: config.interpreter.clone(),
            timeout_secs: config.timeout_secs,
        }
    }

    /// Run `source` and capture its output.
    ///
    /// Returns [`ExecError::Timeout`] when the child outlives the limit; it
    /// is killed rather than left behind. All other completions, including
    /// crashes of the submitted program, come back as an
    /// [`ExecutionReport`].
    pub async fn run(&self, source: &str) -> Result<ExecutionReport, ExecError> {
        let started = Instant::now();

        // The TempDir guard removes the staged source on every return path.
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(SUBMISSION_FILE);
        tokio::fs::write(&path, source).await?;

        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(interpreter = %self.interpreter, bytes = source.len(), "running submitted code");

        let output = match timeout(Duration::from_secs(self.timeout_secs), cmd.output()).await {
            Ok(result) => result.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ExecError::InterpreterNotFound(self.interpreter.clone())
                } else {
                    ExecError::Io(e)
                }
            })?,
            Err(_) => {
                warn!(limit_secs = self.timeout_secs, "submitted code hit the time limit");
                return Err(ExecError::Timeout {
                    limit_secs: self.timeout_secs,
                });
            }
        };

        let report = ExecutionReport {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
            duration_ms: started.elapsed().as_millis() as u64,
        };
        debug!(
            exit_code = ?report.exit_code,
            duration_ms = report.duration_ms,
            "submitted code finished"
        );
        Ok(report)
    }
}
