//! External process invocation.
//!
//! Providers never spawn their VCS client directly; they go through the
//! [`ProcessExecutor`] trait so tests can substitute an in-memory fake.
//! The executor enforces the per-invocation timeout — a timed-out client
//! surfaces as an error to the provider, never as a hang in the poll.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::HarnessError;

/// One external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInvocation {
    pub executable: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Timeout in milliseconds. `None` waits indefinitely.
    pub timeout_ms: Option<u64>,
}

impl ProcessInvocation {
    pub fn new(executable: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            executable: executable.into(),
            args,
            working_dir: None,
            timeout_ms: None,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }
}

/// Captured output of a completed invocation.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

/// Narrow process-spawning interface injected into providers.
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    /// Run the invocation to completion and capture its output.
    ///
    /// A spawn failure or timeout is a [`HarnessError::SourceControl`].
    /// A non-zero exit is *not* an error at this layer — the output is
    /// returned with `success = false` and the provider decides.
    async fn execute(&self, invocation: &ProcessInvocation) -> Result<ProcessOutput, HarnessError>;
}

/// Executor backed by `tokio::process`.
pub struct SystemExecutor;

#[async_trait]
impl ProcessExecutor for SystemExecutor {
    async fn execute(&self, invocation: &ProcessInvocation) -> Result<ProcessOutput, HarnessError> {
        debug!(
            executable = %invocation.executable,
            args = ?invocation.args,
            "spawning external tool"
        );

        let mut cmd = tokio::process::Command::new(&invocation.executable);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the wait future on timeout must take the child with it.
            .kill_on_drop(true);
        if let Some(dir) = &invocation.working_dir {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|e| {
            HarnessError::source_control(format!(
                "failed to run '{}': {}. Is it installed and on PATH?",
                invocation.executable, e
            ))
        })?;

        let wait = child.wait_with_output();
        let output = match invocation.timeout_ms {
            Some(ms) => tokio::time::timeout(Duration::from_millis(ms), wait)
                .await
                .map_err(|_| {
                    HarnessError::source_control(format!(
                        "'{}' timed out after {}ms",
                        invocation.executable, ms
                    ))
                })?,
            None => wait.await,
        }
        .map_err(|e| {
            HarnessError::source_control(format!(
                "failed waiting for '{}': {}",
                invocation.executable, e
            ))
        })?;

        Ok(ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory executor double shared by provider tests.

    use std::sync::Mutex;

    use super::*;

    /// Records invocations and replays one canned response.
    pub struct FakeExecutor {
        invocations: Mutex<Vec<ProcessInvocation>>,
        response: Response,
    }

    enum Response {
        Output(ProcessOutput),
        /// Executor-level failure (spawn error, timeout).
        Error(String),
    }

    impl FakeExecutor {
        pub fn returning_stdout(stdout: &str) -> Self {
            Self::new(Response::Output(ProcessOutput {
                stdout: stdout.to_string(),
                stderr: String::new(),
                success: true,
            }))
        }

        pub fn failing(stderr: &str) -> Self {
            Self::new(Response::Output(ProcessOutput {
                stdout: String::new(),
                stderr: stderr.to_string(),
                success: false,
            }))
        }

        pub fn erroring(message: &str) -> Self {
            Self::new(Response::Error(message.to_string()))
        }

        fn new(response: Response) -> Self {
            Self {
                invocations: Mutex::new(Vec::new()),
                response,
            }
        }

        pub fn invocations(&self) -> Vec<ProcessInvocation> {
            self.invocations.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProcessExecutor for FakeExecutor {
        async fn execute(
            &self,
            invocation: &ProcessInvocation,
        ) -> Result<ProcessOutput, HarnessError> {
            self.invocations.lock().unwrap().push(invocation.clone());
            match &self.response {
                Response::Output(output) => Ok(output.clone()),
                Response::Error(message) => Err(HarnessError::source_control(message)),
            }
        }
    }
}
