//! External command execution
//!
//! Every CLI the flows drive (`gcloud`, `vault`, package managers) goes
//! through [`CommandRunner`], which keeps the flows testable without the tools
//! installed.

use crate::error::{LabError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` to completion and capture its output.
    ///
    /// Only a failure to start the program is an error; a non-zero exit is
    /// reported through [`CommandOutput::status`].
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;

    /// Start `program` in the background with stdout/stderr sent to `log_path`.
    ///
    /// The child is not supervised; it keeps running after this process exits.
    async fn spawn_detached(&self, program: &str, args: &[String], log_path: &Path)
    -> Result<u32>;

    /// Resolve `program` on PATH
    async fn locate(&self, program: &str) -> Result<Option<PathBuf>>;

    /// Like [`CommandRunner::run`], but a non-zero exit becomes
    /// [`LabError::CommandFailed`]. Returns stdout.
    async fn run_checked(&self, program: &str, args: &[String]) -> Result<String> {
        let output = self.run(program, args).await?;
        if !output.success() {
            return Err(LabError::CommandFailed {
                program: program.to_string(),
                status: output.status,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

/// Runs real processes via `tokio::process`
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

fn spawn_error(program: &str, err: std::io::Error) -> LabError {
    if err.kind() == std::io::ErrorKind::NotFound {
        LabError::ToolNotFound(program.to_string())
    } else {
        LabError::Io(err)
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        tracing::debug!("Running: {} {}", program, args.join(" "));

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| spawn_error(program, e))?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    async fn spawn_detached(
        &self,
        program: &str,
        args: &[String],
        log_path: &Path,
    ) -> Result<u32> {
        if let Some(parent) = log_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let log = std::fs::File::create(log_path)?;
        let log_err = log.try_clone()?;

        // args may carry credentials
        tracing::debug!("Spawning: {} (log: {})", program, log_path.display());

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .kill_on_drop(false)
            .spawn()
            .map_err(|e| spawn_error(program, e))?;

        child
            .id()
            .ok_or_else(|| LabError::Api(format!("{} exited immediately", program)))
    }

    async fn locate(&self, program: &str) -> Result<Option<PathBuf>> {
        let which = Command::new("which").arg(program).output().await?;
        if !which.status.success() {
            return Ok(None);
        }
        let path = String::from_utf8_lossy(&which.stdout).trim().to_string();
        Ok((!path.is_empty()).then(|| PathBuf::from(path)))
    }
}

/// Convert a list of `&str` into owned command arguments
pub fn args<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}
