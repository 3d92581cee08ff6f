use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use crate::docker::DockerError;

/// Abstraction over docker CLI execution for testability.
///
/// Production code uses [`RealExecutor`]. The futures are `Send` so the
/// server can call through this trait from request handlers.
pub trait CommandExecutor: Send + Sync {
    /// Run to completion, capturing stdout followed by stderr.
    fn exec(
        &self,
        args: &[String],
        timeout: Duration,
    ) -> impl Future<Output = Result<String, DockerError>> + Send;

    /// Run with output streamed to this process's terminal.
    fn exec_streaming(
        &self,
        args: &[String],
        timeout: Duration,
    ) -> impl Future<Output = Result<(), DockerError>> + Send;
}

/// Runs a real binary (normally `docker`).
///
/// Children are killed if the call times out or its future is dropped.
#[derive(Debug, Clone)]
pub struct RealExecutor {
    program: String,
}

impl RealExecutor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, args: &[String]) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }

    fn timed_out(&self, args: &[String], after: Duration) -> DockerError {
        DockerError::Timeout {
            program: self.program.clone(),
            args: args.to_vec(),
            after,
        }
    }
}

impl Default for RealExecutor {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl CommandExecutor for RealExecutor {
    async fn exec(&self, args: &[String], timeout: Duration) -> Result<String, DockerError> {
        tracing::debug!(program = %self.program, ?args, "exec");

        let child = self
            .command(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DockerError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| self.timed_out(args, timeout))?
            .map_err(|e| DockerError::Wait {
                program: self.program.clone(),
                source: e,
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if output.status.success() {
            Ok(combined)
        } else {
            Err(DockerError::CommandFailed {
                program: self.program.clone(),
                args: args.to_vec(),
                status: output.status.to_string(),
                output: combined,
            })
        }
    }

    async fn exec_streaming(&self, args: &[String], timeout: Duration) -> Result<(), DockerError> {
        tracing::debug!(program = %self.program, ?args, "exec (streaming)");

        let mut child = self
            .command(args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| DockerError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        let status = tokio::time::timeout(timeout, child.wait())
            .await
            .map_err(|_| self.timed_out(args, timeout))?
            .map_err(|e| DockerError::Wait {
                program: self.program.clone(),
                source: e,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(DockerError::CommandFailed {
                program: self.program.clone(),
                args: args.to_vec(),
                status: status.to_string(),
                output: String::new(),
            })
        }
    }
}

pub(crate) fn args<const N: usize>(a: [&str; N]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}
