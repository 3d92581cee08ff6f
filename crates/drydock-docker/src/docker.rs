use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum DockerError {
    #[error("failed to start {program}: is it installed and on PATH?")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} {args:?} failed ({status})\n{output}")]
    CommandFailed {
        program: String,
        args: Vec<String>,
        status: String,
        output: String,
    },

    #[error("{program} {args:?} timed out after {after:?}")]
    Timeout {
        program: String,
        args: Vec<String>,
        after: Duration,
    },

    #[error("failed waiting for {program}")]
    Wait {
        program: String,
        source: std::io::Error,
    },
}

impl DockerError {
    /// Text to hand back to whoever asked for the command: the tool's own
    /// output when it ran and failed, otherwise this error's message.
    pub fn diagnostic(&self) -> String {
        match self {
            DockerError::CommandFailed { output, .. } if !output.trim().is_empty() => {
                output.clone()
            }
            other => other.to_string(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, DockerError::Timeout { .. })
    }
}
