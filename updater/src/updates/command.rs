//! External command execution

use std::process::Stdio;

use async_trait::async_trait;
use colored::Colorize;
use tokio::process::Command;
use tracing::debug;

use crate::errors::UpdateError;

/// Exit status of an external command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    /// Exit code; `None` when the process was killed by a signal
    pub code: Option<i32>,
}

impl CommandStatus {
    pub fn success() -> Self {
        Self { code: Some(0) }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for CommandStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

/// Runs external programs on behalf of the update sequence
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a program attached to the terminal
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandStatus, UpdateError>;

    /// Run a read-only probe with its output discarded
    async fn probe(&self, program: &str, args: &[String]) -> Result<CommandStatus, UpdateError>;

    /// Whether the program can be found on `PATH`
    fn is_available(&self, program: &str) -> bool;
}

/// Runs commands for real
#[derive(Debug, Default, Clone)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandStatus, UpdateError> {
        debug!("Running: {} {}", program, args.join(" "));
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| UpdateError::SpawnError {
                program: program.to_string(),
                reason: e.to_string(),
            })?;
        debug!("{} exited with {:?}", program, status.code());
        Ok(status.into())
    }

    async fn probe(&self, program: &str, args: &[String]) -> Result<CommandStatus, UpdateError> {
        debug!("Probing: {} {}", program, args.join(" "));
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| UpdateError::SpawnError {
                program: program.to_string(),
                reason: e.to_string(),
            })?;
        Ok(status.into())
    }

    fn is_available(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// Prints mutating commands instead of running them.
///
/// Probes are read-only and still execute so the printed plan matches the host.
#[derive(Debug, Default, Clone)]
pub struct DryRunRunner {
    inner: SystemRunner,
}

#[async_trait]
impl CommandRunner for DryRunRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandStatus, UpdateError> {
        println!("{} {} {}", "[DRY ]".blue().bold(), program, args.join(" "));
        Ok(CommandStatus::success())
    }

    async fn probe(&self, program: &str, args: &[String]) -> Result<CommandStatus, UpdateError> {
        self.inner.probe(program, args).await
    }

    fn is_available(&self, program: &str) -> bool {
        self.inner.is_available(program)
    }
}
