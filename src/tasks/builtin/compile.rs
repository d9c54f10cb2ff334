// src/tasks/builtin/compile.rs

use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::info;

use crate::capability::OutputStyle;
use crate::errors::TaskResult;
use crate::tasks::builtin::{dest_groups, engine_options, read_joined, with_banner, write_text};
use crate::tasks::{TaskContext, TaskHandler, TaskKind, TaskTarget};

#[derive(Debug, Clone, Default, Deserialize)]
struct CompileOptions {
    #[serde(default)]
    style: OutputStyle,

    #[serde(default)]
    banner: Option<String>,
}

/// Compiles stylesheet sources into each destination.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileHandler;

impl TaskHandler for CompileHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Compile
    }

    fn check(&self, target: &TaskTarget) -> TaskResult<()> {
        engine_options(target)?;
        target.options_as::<CompileOptions>().map(|_| ())
    }

    fn run<'a>(&'a self, target: &'a TaskTarget, ctx: &'a TaskContext) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            let opts: CompileOptions = target.options_as()?;
            let compiler = engine_options(target)?.compiler(ctx.root())?;

            for (dest, sources) in dest_groups(ctx, target)? {
                let input = read_joined(ctx, &sources, "\n")?;
                let css = compiler.compile(&input, opts.style).await?;
                write_text(ctx, &dest, &with_banner(opts.banner.as_deref(), &css))?;
                info!(
                    task = %target.task_ref,
                    dest = ?dest,
                    style = opts.style.as_str(),
                    "compiled"
                );
            }
            Ok(())
        })
    }
}
