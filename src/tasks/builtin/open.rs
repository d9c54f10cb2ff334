// src/tasks/builtin/open.rs

use std::process::Stdio;

use futures::future::BoxFuture;
use serde::Deserialize;
use tokio::process::Command;
use tracing::info;

use crate::capability::shell_command;
use crate::errors::{TaskError, TaskResult};
use crate::tasks::{TaskContext, TaskHandler, TaskKind, TaskTarget};

#[derive(Debug, Clone, Deserialize)]
struct OpenOptions {
    #[serde(alias = "path")]
    url: String,

    /// Shell command used instead of the platform opener; the URL is
    /// appended as its last argument.
    #[serde(default)]
    opener: Option<String>,
}

/// Opens a URL with the system's default handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenHandler;

fn platform_opener(url: &str) -> Command {
    if cfg!(target_os = "macos") {
        let mut c = Command::new("open");
        c.arg(url);
        c
    } else if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", "", url]);
        c
    } else {
        let mut c = Command::new("xdg-open");
        c.arg(url);
        c
    }
}

impl TaskHandler for OpenHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Open
    }

    fn check(&self, target: &TaskTarget) -> TaskResult<()> {
        let opts: OpenOptions = target.options_as()?;
        if opts.url.trim().is_empty() {
            return Err(TaskError::InvalidOptions("`url` must not be empty".to_string()));
        }
        Ok(())
    }

    fn run<'a>(&'a self, target: &'a TaskTarget, ctx: &'a TaskContext) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            let opts: OpenOptions = target.options_as()?;
            info!(task = %target.task_ref, url = %opts.url, "opening");

            let mut cmd = match opts.opener.as_deref() {
                Some(opener) => shell_command(&format!("{opener} '{}'", opts.url.replace('\'', "%27"))),
                None => platform_opener(&opts.url),
            };
            let status = cmd
                .current_dir(ctx.root())
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .status()
                .await
                .map_err(|e| TaskError::Failed(format!("cannot launch opener for {}: {e}", opts.url)))?;

            if !status.success() {
                return Err(TaskError::Failed(format!(
                    "opener exited with code {} for {}",
                    status.code().unwrap_or(-1),
                    opts.url
                )));
            }
            Ok(())
        })
    }
}
