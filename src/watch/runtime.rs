// src/watch/runtime.rs

use std::fmt;
use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::fs::path_utils::join_slash;
use crate::server::LiveReloadHub;
use crate::tasks::QueueExecutor;
use crate::watch::cache::FileCache;
use crate::watch::core::WatchCore;
use crate::watch::{WatchCommand, WatchEvent};

/// Counters reported when the loop ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WatchStats {
    pub runs: usize,
    pub failed: usize,
}

/// Async shell around [`WatchCore`]: feeds it events, arms debounce timers
/// and runs queues through a [`QueueExecutor`].
///
/// Runs are awaited inline, so a run is never interrupted; events that
/// arrive meanwhile are handled once it finishes.
pub struct WatchRuntime<E: QueueExecutor> {
    core: WatchCore,
    events_tx: mpsc::UnboundedSender<WatchEvent>,
    events_rx: mpsc::UnboundedReceiver<WatchEvent>,
    executor: E,
    livereload: Option<LiveReloadHub>,
    change_filter: Option<(FileCache, PathBuf)>,
}

impl<E: QueueExecutor> fmt::Debug for WatchRuntime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRuntime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: QueueExecutor> WatchRuntime<E> {
    pub fn new(core: WatchCore, executor: E) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            core,
            events_tx,
            events_rx,
            executor,
            livereload: None,
            change_filter: None,
        }
    }

    /// Where the watcher, signal handler and tests send events.
    pub fn sender(&self) -> mpsc::UnboundedSender<WatchEvent> {
        self.events_tx.clone()
    }

    pub fn with_livereload(mut self, hub: LiveReloadHub) -> Self {
        self.livereload = Some(hub);
        self
    }

    /// Drop change events whose file content hash is unchanged; `root` turns
    /// event paths back into filesystem paths.
    pub fn with_change_filter(mut self, cache: FileCache, root: PathBuf) -> Self {
        self.change_filter = Some((cache, root));
        self
    }

    /// Process events until shutdown is requested.
    pub async fn run(mut self) -> WatchStats {
        let mut stats = WatchStats::default();
        info!(rules = self.core.rules().len(), "watching for changes");

        while let Some(event) = self.events_rx.recv().await {
            if let WatchEvent::FileChanged { path } = &event {
                if !self.content_changed(path) {
                    continue;
                }
                debug!(%path, "file changed");
            }

            let step = self.core.step(event);
            for command in step.commands {
                self.execute(command, &mut stats).await;
            }
            if !step.keep_running {
                break;
            }
        }

        info!(runs = stats.runs, failed = stats.failed, "watch loop stopped");
        stats
    }

    fn content_changed(&mut self, rel: &str) -> bool {
        match &mut self.change_filter {
            Some((cache, root)) => cache.refresh(&join_slash(root, rel)),
            None => true,
        }
    }

    async fn execute(&mut self, command: WatchCommand, stats: &mut WatchStats) {
        match command {
            WatchCommand::ArmDebounce {
                rule,
                generation,
                delay,
            } => {
                let tx = self.events_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(WatchEvent::DebounceElapsed { rule, generation });
                });
            }
            WatchCommand::RunRule { rule, changed } => {
                let Some(rule) = self.core.rule(rule).cloned() else {
                    return;
                };
                info!(rule = %rule.name(), changed = ?changed, "change detected");

                let result = self.executor.execute(rule.queue()).await;
                stats.runs += 1;

                if !result.ok {
                    stats.failed += 1;
                    let task = result
                        .failed_task
                        .map(|t| t.to_string())
                        .unwrap_or_default();
                    let cause = result.cause.map(|c| c.to_string()).unwrap_or_default();
                    error!(rule = %rule.name(), %task, error = %cause, "watch run failed; still watching");
                    return;
                }

                if let (Some(_), Some(hub)) = (rule.livereload(), &self.livereload) {
                    let kind = hub.reload_paths(&changed);
                    debug!(rule = %rule.name(), ?kind, "live reload published");
                }
            }
            WatchCommand::Exit => info!("shutdown requested"),
        }
    }
}
