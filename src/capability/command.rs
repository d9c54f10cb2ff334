// src/capability/command.rs

//! External-command engine: pipe input through a shell command.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use futures::future::BoxFuture;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::capability::{
    CapResult, Compiler, Copier, ImageFormat, Lang, LintFinding, LintRules, Linter, Minifier,
    Optimizer, OutputStyle,
};
use crate::errors::CapabilityError;

/// Runs `command` through the platform shell, feeding input on stdin and
/// reading the result from stdout.
///
/// Extra context is passed through environment variables:
/// `ASSETPIPE_LANG`, `ASSETPIPE_STYLE`, `ASSETPIPE_FILE`, `ASSETPIPE_SRC` and
/// `ASSETPIPE_DEST`.
#[derive(Debug, Clone)]
pub struct CommandFilter {
    command: String,
    cwd: PathBuf,
}

/// Captured output of a finished command.
#[derive(Debug)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Build a shell command appropriate for the platform.
pub fn shell_command(command: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    }
}

impl CommandFilter {
    pub fn new(command: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            cwd: cwd.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Run the command to completion without interpreting the exit code.
    pub async fn run_raw(
        &self,
        input: &[u8],
        env: &[(&str, String)],
    ) -> Result<CommandOutput, CapabilityError> {
        debug!(command = %self.command, input_len = input.len(), "spawning filter command");

        let mut cmd = shell_command(&self.command);
        cmd.current_dir(&self.cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn()?;

        // stdin is fed from its own task while stdout is drained below.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = input.to_vec();
            tokio::spawn(async move {
                let _ = stdin.write_all(&input).await;
                let _ = stdin.shutdown().await;
            })
        });

        let output = child.wait_with_output().await?;
        if let Some(writer) = writer {
            let _ = writer.await;
        }

        let code = output.status.code().unwrap_or(-1);
        info!(command = %self.command, exit_code = code, "filter command exited");

        Ok(CommandOutput {
            code,
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    /// Run the command and return stdout, failing on a non-zero exit.
    pub async fn run(&self, input: &[u8], env: &[(&str, String)]) -> CapResult<Vec<u8>> {
        let output = self.run_raw(input, env).await?;
        if !output.success() {
            return Err(CapabilityError::CommandFailed {
                command: self.command.clone(),
                code: output.code,
                stderr: output.stderr,
            });
        }
        Ok(output.stdout)
    }

    async fn run_text(&self, input: &str, env: &[(&str, String)]) -> CapResult<String> {
        let bytes = self.run(input.as_bytes(), env).await?;
        String::from_utf8(bytes)
            .map_err(|e| CapabilityError::Invalid(format!("command output is not UTF-8: {e}")))
    }
}

impl Minifier for CommandFilter {
    fn minify<'a>(&'a self, input: &'a str, lang: Lang) -> BoxFuture<'a, CapResult<String>> {
        Box::pin(async move {
            self.run_text(input, &[("ASSETPIPE_LANG", lang.as_str().to_string())])
                .await
        })
    }
}

impl Compiler for CommandFilter {
    fn compile<'a>(
        &'a self,
        input: &'a str,
        style: OutputStyle,
    ) -> BoxFuture<'a, CapResult<String>> {
        Box::pin(async move {
            self.run_text(input, &[("ASSETPIPE_STYLE", style.as_str().to_string())])
                .await
        })
    }
}

impl Optimizer for CommandFilter {
    fn optimize<'a>(
        &'a self,
        bytes: &'a [u8],
        format: ImageFormat,
    ) -> BoxFuture<'a, CapResult<Vec<u8>>> {
        Box::pin(async move {
            self.run(bytes, &[("ASSETPIPE_FORMAT", format.as_str().to_string())])
                .await
        })
    }
}

impl Copier for CommandFilter {
    fn copy<'a>(&'a self, from: &'a Path, to: &'a Path) -> BoxFuture<'a, CapResult<()>> {
        Box::pin(async move {
            if let Some(parent) = to.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            self.run(
                &[],
                &[
                    ("ASSETPIPE_SRC", from.display().to_string()),
                    ("ASSETPIPE_DEST", to.display().to_string()),
                ],
            )
            .await?;
            Ok(())
        })
    }
}

impl Linter for CommandFilter {
    /// A non-zero exit is a lint finding carrying the command's output; only
    /// a failure to spawn is a capability error.
    fn lint<'a>(
        &'a self,
        path: &'a Path,
        source: &'a str,
        _rules: &'a LintRules,
    ) -> BoxFuture<'a, CapResult<Vec<LintFinding>>> {
        Box::pin(async move {
            let output = self
                .run_raw(
                    source.as_bytes(),
                    &[("ASSETPIPE_FILE", path.display().to_string())],
                )
                .await?;
            if output.success() {
                return Ok(Vec::new());
            }

            let mut message = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !output.stderr.is_empty() {
                if !message.is_empty() {
                    message.push('\n');
                }
                message.push_str(&output.stderr);
            }
            Ok(vec![LintFinding {
                path: path.to_path_buf(),
                line: 0,
                message: format!("`{}` exited with code {}: {}", self.command, output.code, message),
            }])
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pipes_stdin_to_stdout() {
        let filter = CommandFilter::new("tr a-z A-Z", ".");
        let out = filter.minify("body{}", Lang::Css).await.unwrap();
        assert_eq!(out, "BODY{}");
    }

    #[tokio::test]
    async fn non_zero_exit_carries_stderr() {
        let filter = CommandFilter::new("echo boom >&2; exit 3", ".");
        match filter.run(b"", &[]).await {
            Err(CapabilityError::CommandFailed { code, stderr, .. }) => {
                assert_eq!(code, 3);
                assert_eq!(stderr, "boom");
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn lint_failure_is_a_finding() {
        let filter = CommandFilter::new("echo 'bad style'; exit 1", ".");
        let findings = filter
            .lint(Path::new("a.js"), "var x", &LintRules::default())
            .await
            .unwrap();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("bad style"));
    }
}
