//! Tool runner trait and the process-backed implementation.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{ToolError, ToolResult};

/// One command line to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
    /// Capture stdout instead of passing it through to the terminal.
    pub capture: bool,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            capture: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn captured(mut self) -> Self {
        self.capture = true;
        self
    }

    /// Shell-like rendering for logs and dry runs.
    pub fn command_line(&self) -> String {
        let mut cmd = self.program.clone();
        for arg in &self.args {
            if arg.is_empty() || arg.contains(' ') || arg.contains('=') {
                cmd.push_str(&format!(" '{}'", arg));
            } else {
                cmd.push(' ');
                cmd.push_str(arg);
            }
        }
        cmd
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// What a finished tool left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub exit_code: i32,
    /// Empty unless the invocation asked for capture.
    pub stdout: String,
}

impl ToolOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
        }
    }

    pub fn failure(exit_code: i32) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// Turn a non-zero exit into [`ToolError::Failed`].
    pub fn check(self, invocation: &Invocation) -> ToolResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ToolError::Failed {
                command: invocation.command_line(),
                exit_code: self.exit_code,
            })
        }
    }
}

/// Executes external tools.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Whether the probe command can be started and exits successfully.
    async fn is_available(&self, probe: &Invocation) -> bool;

    /// Run a command to completion. A non-zero exit is not an error here.
    async fn run(&self, invocation: &Invocation) -> ToolResult<ToolOutput>;
}

/// Runs tools as child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    dry_run: bool,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print command lines instead of executing them.
    ///
    /// A dry-run runner reports every tool as available.
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn command(invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        if let Some(dir) = &invocation.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn is_available(&self, probe: &Invocation) -> bool {
        if self.dry_run {
            return true;
        }
        Self::command(probe)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    async fn run(&self, invocation: &Invocation) -> ToolResult<ToolOutput> {
        if self.dry_run {
            info!("[DRY-RUN] Would execute: {}", invocation);
            println!("{}", invocation);
            return Ok(ToolOutput::success(""));
        }

        debug!("Executing: {}", invocation);
        let spawn_error = |source| ToolError::Spawn {
            program: invocation.program.clone(),
            source,
        };

        let mut cmd = Self::command(invocation);
        let output = if invocation.capture {
            let output = cmd
                .stdout(Stdio::piped())
                .stderr(Stdio::inherit())
                .output()
                .await
                .map_err(spawn_error)?;
            ToolOutput {
                exit_code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            }
        } else {
            let status = cmd.status().await.map_err(spawn_error)?;
            ToolOutput {
                exit_code: status.code().unwrap_or(-1),
                stdout: String::new(),
            }
        };

        debug!("`{}` exited with {}", invocation.program, output.exit_code);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_quotes_arguments() {
        let invocation = Invocation::new("docker")
            .args(["build", "-t", "reg.example.com/web:1.0"])
            .arg("--build-arg=A B")
            .arg("");
        assert_eq!(
            invocation.command_line(),
            "docker build -t reg.example.com/web:1.0 '--build-arg=A B' ''"
        );
    }

    #[test]
    fn test_check_maps_exit_code() {
        let invocation = Invocation::new("docker").arg("push");
        assert!(ToolOutput::success("").check(&invocation).is_ok());

        let err = ToolOutput::failure(125).check(&invocation).unwrap_err();
        assert_eq!(err.exit_code(), Some(125));
    }

    #[tokio::test]
    async fn test_dry_run_does_not_execute() {
        let runner = ProcessRunner::new().dry_run(true);
        let invocation = Invocation::new("definitely-not-a-real-tool").arg("build");

        assert!(runner.is_available(&invocation).await);
        let output = runner.run(&invocation).await.unwrap();
        assert!(output.is_success());
    }

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let runner = ProcessRunner::new();
        let probe = Invocation::new("definitely-not-a-real-tool").arg("version");

        assert!(!runner.is_available(&probe).await);
        let err = runner.run(&probe).await.unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }
}
