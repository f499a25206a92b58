use std::io;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::errors::{classify_git_stderr, WorkspaceError};

/// Per-stream capture cap. Pathological subprocess output (a runaway hook, a
/// binary diff dumped to stderr) is truncated instead of ballooning memory.
pub const MAX_CAPTURED_OUTPUT: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.unwrap_or_default() == 0
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        current_dir: Option<&Path>,
    ) -> io::Result<CommandOutput>;
}

/// Spawns the real binary through the tokio process API. The pipeline runs on
/// a current-thread runtime, so awaiting a subprocess suspends only the
/// provisioning task, never unrelated ones.
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        current_dir: Option<&Path>,
    ) -> io::Result<CommandOutput> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = current_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn()?;

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        let (stdout_buf, stderr_buf, status) = tokio::join!(
            read_capped(stdout_pipe),
            read_capped(stderr_pipe),
            child.wait()
        );
        let status = status?;

        Ok(CommandOutput {
            status: status.code(),
            stdout: String::from_utf8_lossy(&stdout_buf?).to_string(),
            stderr: String::from_utf8_lossy(&stderr_buf?).to_string(),
        })
    }
}

/// Read a pipe to EOF, keeping at most `MAX_CAPTURED_OUTPUT` bytes. The pipe
/// is drained past the cap so a chatty child never blocks on a full buffer.
async fn read_capped<P: tokio::io::AsyncRead + Unpin>(pipe: Option<P>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let Some(mut pipe) = pipe else {
        return Ok(buf);
    };
    let mut chunk = [0u8; 8192];
    loop {
        let n = pipe.read(&mut chunk).await?;
        if n == 0 {
            return Ok(buf);
        }
        let room = (MAX_CAPTURED_OUTPUT as usize).saturating_sub(buf.len());
        buf.extend_from_slice(&chunk[..n.min(room)]);
    }
}

/// Run a git subcommand, returning trimmed stdout on success and a classified
/// error otherwise. `fallback` becomes the message when stderr matches
/// nothing the classifier knows.
pub async fn run_git<R: CommandRunner + ?Sized>(
    runner: &R,
    cwd: &Path,
    args: &[&str],
    fallback: &str,
) -> Result<String, WorkspaceError> {
    let output = runner
        .run("git", args, Some(cwd))
        .await
        .map_err(|e| WorkspaceError::message(format!("Failed to run git: {e}")))?;

    if output.success() {
        Ok(output.stdout.trim().to_string())
    } else {
        log::debug!(
            "git {:?} exited with {:?}: {}",
            args,
            output.status,
            output.stderr.trim()
        );
        Err(classify_git_stderr(&output.stderr, fallback))
    }
}

/// Probe variant for expected "not found" conditions: `None` on nonzero exit,
/// an error only when the process could not be run at all.
pub async fn probe_git<R: CommandRunner + ?Sized>(
    runner: &R,
    cwd: &Path,
    args: &[&str],
) -> Result<Option<String>, WorkspaceError> {
    let output = runner
        .run("git", args, Some(cwd))
        .await
        .map_err(|e| WorkspaceError::message(format!("Failed to run git: {e}")))?;

    if output.success() {
        Ok(Some(output.stdout.trim().to_string()))
    } else {
        Ok(None)
    }
}
