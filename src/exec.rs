//! External process port
//!
//! Everything kedactl shells out for (`helm`, `kubectl version`, the Helm
//! install script) goes through [`CommandRunner`], so tests can script the
//! outcome of each invocation without touching the host.

use std::io::ErrorKind;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::process::Command;
use tracing::debug;

use crate::{Error, Result};

/// Captured result of a finished process
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (`None` when killed by a signal)
    pub code: Option<i32>,
    /// Captured stdout, lossily decoded
    pub stdout: String,
    /// Captured stderr, lossily decoded
    pub stderr: String,
}

impl CommandOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given exit code and stderr
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the process exited with status 0
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs external programs and captures their output.
///
/// A non-zero exit is NOT an error at this level: it comes back as an
/// `Ok(CommandOutput)` for the caller to inspect. `Err` means the process
/// could not be started at all ([`Error::ToolNotFound`] when the binary is
/// missing).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` to completion
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

/// Run a command and turn a non-zero exit into [`Error::CommandFailed`].
pub async fn run_checked(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[String],
) -> Result<CommandOutput> {
    let output = runner.run(program, args).await?;
    if !output.success() {
        let stderr = if output.stderr.trim().is_empty() {
            format!("exited with status {:?}", output.code)
        } else {
            output.stderr.trim().to_string()
        };
        return Err(Error::command_failed(command_line(program, args), stderr));
    }
    Ok(output)
}

/// Render a program and its arguments as one display string
pub fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Convert a slice of string literals into owned arguments
pub fn args<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// [`CommandRunner`] backed by `tokio::process`
#[derive(Clone, Debug, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Create a new runner
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        debug!(command = %command_line(program, args), "Running command");

        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => Error::ToolNotFound {
                    tool: program.to_string(),
                },
                _ => Error::Io(e),
            })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::*;

    #[test]
    fn command_line_joins_program_and_args() {
        let rendered = command_line("helm", &args(["repo", "add", "kedacore"]));
        assert_eq!(rendered, "helm repo add kedacore");
    }

    #[test]
    fn output_success_requires_zero_exit() {
        assert!(CommandOutput::ok("v3.14.0").success());
        assert!(!CommandOutput::failed(1, "boom").success());
        assert!(!CommandOutput {
            code: None,
            ..Default::default()
        }
        .success());
    }

    // ==========================================================================
    // Story: Non-zero exits become CommandFailed with stderr
    // ==========================================================================

    #[tokio::test]
    async fn run_checked_passes_successful_output_through() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .with(eq("helm"), always())
            .times(1)
            .returning(|_, _| Ok(CommandOutput::ok("v3.14.0")));

        let out = run_checked(&runner, "helm", &args(["version", "--short"]))
            .await
            .unwrap();
        assert_eq!(out.stdout, "v3.14.0");
    }

    #[tokio::test]
    async fn run_checked_surfaces_stderr_on_failure() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(|_, _| Ok(CommandOutput::failed(1, "Error: chart not found\n")));

        let err = run_checked(&runner, "helm", &args(["install", "x", "./chart"]))
            .await
            .unwrap_err();
        match err {
            Error::CommandFailed { command, stderr } => {
                assert_eq!(command, "helm install x ./chart");
                assert_eq!(stderr, "Error: chart not found");
            }
            other => panic!("Expected CommandFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_checked_describes_silent_failures() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(|_, _| Ok(CommandOutput::failed(2, "")));

        let err = run_checked(&runner, "kubectl", &args(["version"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exited with status Some(2)"));
    }

    #[tokio::test]
    async fn process_runner_reports_missing_binary() {
        let err = ProcessRunner::new()
            .run("kedactl-definitely-not-a-real-binary", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { .. }));
    }
}
