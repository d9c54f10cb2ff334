// src/tasks/builtin/watch.rs

use std::time::Duration;

use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::{info, warn};

use crate::errors::{TaskError, TaskResult};
use crate::files::mapping::one_or_many;
use crate::server::LiveReloadSetting;
use crate::tasks::{TaskContext, TaskHandler, TaskKind, TaskQueue, TaskRunner, TaskTarget};
use crate::types::parse_duration;
use crate::watch::{spawn_watcher, FileCache, WatchCore, WatchEvent, WatchRule, WatchRuntime};

#[derive(Debug, Clone, Deserialize)]
struct WatchOptions {
    /// Queue names or `task[:target]` entries re-run on change.
    #[serde(default, deserialize_with = "one_or_many")]
    tasks: Vec<String>,

    #[serde(default)]
    livereload: LiveReloadSetting,

    /// Overrides `[config] debounce` for this rule.
    #[serde(default)]
    debounce: Option<String>,
}

/// Re-runs queues when watched files change. A whole-task entry watches
/// every target at once; `watch:<target>` watches only that one.
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchHandler;

/// Root-relative patterns of a target, with `cwd` folded in.
fn target_patterns(target: &TaskTarget) -> Vec<String> {
    target
        .files
        .iter()
        .flat_map(|mapping| {
            let cwd = mapping.cwd.clone();
            mapping.src.iter().map(move |pattern| match &cwd {
                None => pattern.clone(),
                Some(cwd) => {
                    let (negate, body) = match pattern.strip_prefix('!') {
                        Some(rest) => ("!", rest),
                        None => ("", pattern.as_str()),
                    };
                    format!("{negate}{}/{body}", cwd.trim_end_matches('/'))
                }
            })
        })
        .collect()
}

fn debounce_for(opts: &WatchOptions, default: Duration) -> TaskResult<Duration> {
    match &opts.debounce {
        Some(s) => parse_duration(s).map_err(TaskError::InvalidOptions),
        None => Ok(default),
    }
}

/// Build one rule per target; a rule's queue is the concatenation of the
/// queues its `tasks` name.
pub(crate) fn build_rules(targets: &[&TaskTarget], ctx: &TaskContext) -> TaskResult<Vec<WatchRule>> {
    targets
        .iter()
        .map(|target| {
            let opts: WatchOptions = target.options_as()?;

            let mut entries = Vec::new();
            for name in &opts.tasks {
                let queue = ctx.resolve_queue(name).map_err(|e| {
                    TaskError::InvalidOptions(format!("{}: {e}", target.task_ref))
                })?;
                entries.extend(queue.entries);
            }

            let debounce = debounce_for(&opts, ctx.settings().debounce)?;
            let queue = TaskQueue::new(target.task_ref.to_string(), entries);
            let rule = WatchRule::new(target.task_ref.to_string(), target_patterns(target), queue, debounce)
                .map_err(|e| TaskError::InvalidOptions(format!("{}: {e}", target.task_ref)))?;
            Ok(rule.with_livereload(opts.livereload.port()))
        })
        .collect()
}

impl WatchHandler {
    async fn watch(&self, targets: &[&TaskTarget], ctx: &TaskContext) -> TaskResult {
        let rules = build_rules(targets, ctx)?;

        let lr_port = rules.iter().find_map(|r| r.livereload());
        if let Some(port) = lr_port {
            let addr = format!("0.0.0.0:{port}");
            ctx.livereload().listen(&addr).await.map_err(|e| {
                TaskError::Failed(format!("cannot start live-reload server on {addr}: {e}"))
            })?;
        }

        for rule in &rules {
            let queue: Vec<String> = rule.queue().entries.iter().map(|e| e.to_string()).collect();
            info!(rule = %rule.name(), patterns = ?rule.patterns(), ?queue, "watch rule");
        }

        let runner = TaskRunner::new(ctx.pipeline().clone());
        let mut runtime = WatchRuntime::new(WatchCore::new(rules), runner);
        if lr_port.is_some() {
            runtime = runtime.with_livereload(ctx.livereload().clone());
        }
        if ctx.settings().skip_unchanged {
            let mut cache = FileCache::new(ctx.fs().clone());
            prime_cache(&mut cache, targets, ctx);
            runtime = runtime.with_change_filter(cache, ctx.root().to_path_buf());
        }

        let events = runtime.sender();
        let _watcher = spawn_watcher(ctx.root().to_path_buf(), events.clone())?;

        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = events.send(WatchEvent::ShutdownRequested);
            }
        });

        runtime.run().await;
        Ok(())
    }
}

/// Hash every file the rules currently match, so the first save without
/// edits is recognised.
fn prime_cache(cache: &mut FileCache, targets: &[&TaskTarget], ctx: &TaskContext) {
    let includes: Vec<_> = targets
        .iter()
        .flat_map(|t| t.files.iter())
        .cloned()
        .collect();
    match ctx.expander().sources(&includes) {
        Ok(paths) => {
            for path in &paths {
                cache.prime(path);
            }
        }
        Err(e) => warn!(error = %e, "cannot list watched files"),
    }
}

impl TaskHandler for WatchHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Watch
    }

    fn check(&self, target: &TaskTarget) -> TaskResult<()> {
        let opts: WatchOptions = target.options_as()?;
        debounce_for(&opts, Duration::ZERO)?;
        if target_patterns(target).iter().all(|p| p.starts_with('!')) {
            return Err(TaskError::InvalidOptions(format!(
                "{}: `files` needs at least one pattern to watch",
                target.task_ref
            )));
        }
        Ok(())
    }

    fn runs_targets_together(&self) -> bool {
        true
    }

    fn is_persistent(&self, _target: &TaskTarget) -> bool {
        true
    }

    fn run<'a>(&'a self, target: &'a TaskTarget, ctx: &'a TaskContext) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move { self.watch(&[target], ctx).await })
    }

    fn run_together<'a>(
        &'a self,
        targets: &'a [&'a TaskTarget],
        ctx: &'a TaskContext,
    ) -> BoxFuture<'a, TaskResult> {
        Box::pin(self.watch(targets, ctx))
    }
}
