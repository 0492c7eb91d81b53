//! Subprocess execution with timeout and output capture.

use shopforge_core::error::{Error, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Captured output of a finished command
#[derive(Debug)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// stderr if non-empty, otherwise stdout; for error reporting
    pub fn failure_message(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Run a command to completion, killing it at `timeout`. A non-zero exit
/// is not an error here; callers decide what exit codes mean.
pub async fn run(program: &str, args: &[String], timeout: Duration) -> Result<CommandOutput> {
    tracing::debug!(command = %program, args = ?args, "Executing command");

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(timeout, child)
        .await
        .map_err(|_| Error::CommandTimeout {
            command: program.to_string(),
            timeout_secs: timeout.as_secs(),
        })?
        .map_err(|e| Error::internal(format!("Failed to spawn {program}: {e}")))?;

    Ok(CommandOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout() {
        let output = run(
            "echo",
            &["hello".to_string()],
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert!(output.success);
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_not_an_error() {
        let output = run("false", &[], Duration::from_secs(5)).await.unwrap();
        assert!(!output.success);
    }

    #[tokio::test]
    async fn test_timeout_kills_command() {
        let err = run(
            "sleep",
            &["5".to_string()],
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::CommandTimeout { .. }));
    }

    #[test]
    fn test_failure_message_prefers_stderr() {
        let output = CommandOutput {
            success: false,
            stdout: "out".to_string(),
            stderr: "bad flag\n".to_string(),
        };
        assert_eq!(output.failure_message(), "bad flag");

        let output = CommandOutput {
            success: false,
            stdout: "only stdout\n".to_string(),
            stderr: String::new(),
        };
        assert_eq!(output.failure_message(), "only stdout");
    }
}
