// src/tasks/builtin/serve.rs

use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::info;

use crate::errors::{TaskError, TaskResult};
use crate::server::preview::{self, PreviewConfig};
use crate::server::LiveReloadSetting;
use crate::tasks::{TaskContext, TaskHandler, TaskKind, TaskTarget};

#[derive(Debug, Clone, Deserialize)]
struct ServeOptions {
    #[serde(default = "default_hostname")]
    hostname: String,

    #[serde(default = "default_port")]
    port: u16,

    /// Directory to serve, relative to the project root.
    #[serde(default = "default_base")]
    base: String,

    #[serde(default)]
    livereload: LiveReloadSetting,

    /// Block until Ctrl-C instead of returning once the server is up.
    #[serde(default)]
    keepalive: bool,
}

fn default_hostname() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9000
}

fn default_base() -> String {
    "app".to_string()
}

/// Starts the preview server (and the live-reload channel when asked to)
/// in the background.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServeHandler;

impl TaskHandler for ServeHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Serve
    }

    fn check(&self, target: &TaskTarget) -> TaskResult<()> {
        let opts: ServeOptions = target.options_as()?;
        if opts.hostname.trim().is_empty() {
            return Err(TaskError::InvalidOptions("`hostname` must not be empty".to_string()));
        }
        Ok(())
    }

    fn is_persistent(&self, target: &TaskTarget) -> bool {
        target
            .options_as::<ServeOptions>()
            .map(|o| o.keepalive)
            .unwrap_or(false)
    }

    fn run<'a>(&'a self, target: &'a TaskTarget, ctx: &'a TaskContext) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            let opts: ServeOptions = target.options_as()?;
            let lr_port = opts.livereload.port();

            if let Some(port) = lr_port {
                let addr = format!("{}:{port}", opts.hostname);
                ctx.livereload().listen(&addr).await.map_err(|e| {
                    TaskError::Failed(format!("cannot start live-reload server on {addr}: {e}"))
                })?;
            }

            let base = ctx.path(&opts.base);
            let addr = format!("{}:{}", opts.hostname, opts.port);
            let config = PreviewConfig {
                base,
                livereload_port: lr_port,
            };
            let bound = preview::start(&addr, config)
                .await
                .map_err(|e| TaskError::Failed(format!("cannot bind preview server on {addr}: {e}")))?;

            info!(task = %target.task_ref, url = %format!("http://{bound}"), "serving");

            if opts.keepalive {
                info!("keepalive set; press Ctrl-C to stop");
                tokio::signal::ctrl_c().await?;
            }
            Ok(())
        })
    }
}
