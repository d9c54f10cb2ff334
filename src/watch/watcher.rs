// src/watch/watcher.rs

use std::path::PathBuf;

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::fs::path_utils::relative_str;
use crate::watch::WatchEvent;

/// Keeps the `notify` watcher alive; dropping it stops watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    root: PathBuf,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl WatcherHandle {
    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

/// Watch `root` recursively and forward every content-related change as a
/// [`WatchEvent::FileChanged`] carrying the root-relative path.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    events: mpsc::UnboundedSender<WatchEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);

    let callback_root = root.clone();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => forward(&callback_root, event, &events),
            Err(err) => warn!(error = %err, "file watch error"),
        },
        Config::default(),
    )
    .context("creating file watcher")?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("watching {root:?}"))?;

    info!(root = %root.display(), "file watcher started");
    Ok(WatcherHandle {
        _inner: watcher,
        root,
    })
}

fn forward(root: &PathBuf, event: Event, events: &mpsc::UnboundedSender<WatchEvent>) {
    if matches!(event.kind, EventKind::Access(_)) {
        return;
    }
    for path in event.paths {
        let Some(rel) = relative_str(root, &path) else {
            debug!(path = %path.display(), "event outside the watch root");
            continue;
        };
        if rel.is_empty() {
            continue;
        }
        if events.send(WatchEvent::FileChanged { path: rel }).is_err() {
            debug!("watch loop gone; dropping file event");
            return;
        }
    }
}
