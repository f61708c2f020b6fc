//! Shell command executor with a bounded timeout.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::warn;

/// Upper bound on how long a device command may run.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of running a host command.
///
/// Execution never fails past the executor: timeouts, spawn failures and
/// non-zero exits all collapse into `succeeded = false` with a diagnostic
/// in `output`.
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    pub succeeded: bool,
    pub output: String,
}

/// Runs opaque shell commands handed over from device records.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    timeout: Duration,
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self {
            timeout: COMMAND_TIMEOUT,
        }
    }

    /// Override the timeout. Tests use sub-second values.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run `command` through the host shell and capture its trimmed stdout.
    pub async fn execute(&self, command: &str) -> ExecOutcome {
        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // The child is killed and reaped if the timeout fires first.
            .kill_on_drop(true)
            .output();

        match timeout(self.timeout, child).await {
            Ok(Ok(output)) => ExecOutcome {
                succeeded: output.status.success(),
                output: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            },
            Ok(Err(e)) => {
                warn!("Failed to spawn command: {e}");
                ExecOutcome {
                    succeeded: false,
                    output: format!("spawn failed: {e}"),
                }
            }
            Err(_) => {
                warn!("Command timed out after {:?}: {command}", self.timeout);
                ExecOutcome {
                    succeeded: false,
                    output: format!("timed out after {:?}", self.timeout),
                }
            }
        }
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_command_trims_stdout() {
        let executor = CommandExecutor::new();
        let outcome = executor.execute("echo ' 1 '").await;
        assert!(outcome.succeeded);
        assert_eq!(outcome.output, "1");
    }

    #[tokio::test]
    async fn test_nonzero_exit_reports_failure() {
        let executor = CommandExecutor::new();
        let outcome = executor.execute("echo broken; exit 3").await;
        assert!(!outcome.succeeded);
        assert_eq!(outcome.output, "broken");
    }

    #[tokio::test]
    async fn test_timeout_reports_failure() {
        let executor = CommandExecutor::with_timeout(Duration::from_millis(50));
        let outcome = executor.execute("sleep 5").await;
        assert!(!outcome.succeeded);
        assert!(outcome.output.contains("timed out"));
    }

    #[tokio::test]
    async fn test_missing_binary_reports_failure() {
        let executor = CommandExecutor::new();
        let outcome = executor.execute("definitely-not-a-binary-1234").await;
        assert!(!outcome.succeeded);
    }
}
