// src/tasks/builtin/shell.rs

use std::process::Stdio;

use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::{debug, info};

use crate::capability::shell_command;
use crate::errors::{TaskError, TaskResult};
use crate::tasks::{TaskContext, TaskHandler, TaskKind, TaskTarget};

#[derive(Debug, Clone, Deserialize)]
struct ShellOptions {
    command: String,
}

/// Runs `command` through the platform shell in the project root.
///
/// stdout/stderr are inherited, so the command's output shows up as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellHandler;

impl TaskHandler for ShellHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Shell
    }

    fn check(&self, target: &TaskTarget) -> TaskResult<()> {
        let opts: ShellOptions = target.options_as()?;
        if opts.command.trim().is_empty() {
            return Err(TaskError::InvalidOptions("`command` must not be empty".to_string()));
        }
        Ok(())
    }

    fn run<'a>(&'a self, target: &'a TaskTarget, ctx: &'a TaskContext) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            let opts: ShellOptions = target.options_as()?;
            info!(task = %target.task_ref, cmd = %opts.command, "starting shell command");

            let status = shell_command(&opts.command)
                .current_dir(ctx.root())
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .status()
                .await?;

            let code = status.code().unwrap_or(-1);
            debug!(task = %target.task_ref, exit_code = code, "shell command exited");
            if !status.success() {
                return Err(TaskError::Failed(format!(
                    "`{}` exited with code {code}",
                    opts.command
                )));
            }
            Ok(())
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use crate::config::{ConfigFile, RawConfigFile};
    use crate::errors::TaskError;
    use crate::tasks::{Pipeline, TaskRunner};

    async fn run_in(dir: &std::path::Path, command: &str) -> crate::tasks::RunResult {
        let mut raw: RawConfigFile = toml::from_str(&format!(
            "[task.shell]\nkind = \"shell\"\n[task.shell.targets.run]\ncommand = {command:?}\n"
        ))
        .unwrap();
        raw.root = PathBuf::from(dir);
        let pipeline = Pipeline::new(ConfigFile::try_from(raw).unwrap()).unwrap();
        let queue = pipeline.resolve_queue("shell:run").unwrap();
        TaskRunner::new(Arc::clone(&pipeline)).run(&queue).await
    }

    #[tokio::test]
    async fn runs_in_project_root() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_in(dir.path(), "echo hi > out.txt").await;
        assert!(result.ok);
        assert_eq!(std::fs::read_to_string(dir.path().join("out.txt")).unwrap(), "hi\n");
    }

    #[tokio::test]
    async fn non_zero_exit_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_in(dir.path(), "exit 4").await;
        assert!(matches!(result.cause, Some(TaskError::Failed(msg)) if msg.contains("code 4")));
    }
}
