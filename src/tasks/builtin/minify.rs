// src/tasks/builtin/minify.rs

use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::info;

use crate::capability::Lang;
use crate::errors::{TaskError, TaskResult};
use crate::tasks::builtin::{dest_groups, engine_options, read_joined, with_banner, write_text};
use crate::tasks::{TaskContext, TaskHandler, TaskKind, TaskTarget};

#[derive(Debug, Clone, Default, Deserialize)]
struct MinifyOptions {
    /// Source language; guessed from the destination extension otherwise.
    #[serde(default)]
    lang: Option<Lang>,

    #[serde(default)]
    banner: Option<String>,
}

/// Minifies each destination group (sources are joined first).
#[derive(Debug, Clone, Copy, Default)]
pub struct MinifyHandler;

impl TaskHandler for MinifyHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Minify
    }

    fn check(&self, target: &TaskTarget) -> TaskResult<()> {
        engine_options(target)?;
        target.options_as::<MinifyOptions>().map(|_| ())
    }

    fn run<'a>(&'a self, target: &'a TaskTarget, ctx: &'a TaskContext) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            let opts: MinifyOptions = target.options_as()?;
            let minifier = engine_options(target)?.minifier(ctx.root())?;

            for (dest, sources) in dest_groups(ctx, target)? {
                let lang = opts
                    .lang
                    .or_else(|| Lang::from_path(&dest))
                    .or_else(|| sources.first().and_then(|s| Lang::from_path(s)))
                    .ok_or_else(|| {
                        TaskError::InvalidOptions(format!(
                            "{}: cannot tell whether {:?} is js or css; set `lang`",
                            target.task_ref, dest
                        ))
                    })?;

                let input = read_joined(ctx, &sources, "\n")?;
                let minified = minifier.minify(&input, lang).await?;
                let out = with_banner(opts.banner.as_deref(), &minified);
                write_text(ctx, &dest, &out)?;

                info!(
                    task = %target.task_ref,
                    dest = ?dest,
                    before = input.len(),
                    after = out.len(),
                    "minified"
                );
            }
            Ok(())
        })
    }
}
