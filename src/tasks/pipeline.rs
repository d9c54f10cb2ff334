// src/tasks/pipeline.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{ConfigFile, ConfigStore, Settings};
use crate::errors::{PipelineError, Result};
use crate::files::FileExpander;
use crate::fs::{FileSystem, RealFileSystem};
use crate::server::LiveReloadHub;
use crate::tasks::{HandlerSet, TaskQueue, TaskRegistry, TaskSpec};

/// A loaded project, ready to run queues: validated config, handlers,
/// filesystem and the live-reload hub shared by `serve` and `watch`.
#[derive(Debug)]
pub struct Pipeline {
    config: ConfigFile,
    handlers: HandlerSet,
    fs: Arc<dyn FileSystem>,
    livereload: LiveReloadHub,
}

impl Pipeline {
    /// Built-in handlers on the real filesystem.
    pub fn new(config: ConfigFile) -> Result<Arc<Self>> {
        Self::with_handlers(config, HandlerSet::builtin(), Arc::new(RealFileSystem))
    }

    pub fn with_handlers(
        config: ConfigFile,
        handlers: HandlerSet,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Arc<Self>> {
        handlers.check(config.registry())?;
        Ok(Arc::new(Self {
            config,
            handlers,
            fs,
            livereload: LiveReloadHub::new(),
        }))
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn root(&self) -> &Path {
        self.config.root()
    }

    pub fn settings(&self) -> &Settings {
        self.config.settings()
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        self.config.store()
    }

    pub fn registry(&self) -> &TaskRegistry {
        self.config.registry()
    }

    pub fn handlers(&self) -> &HandlerSet {
        &self.handlers
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    pub fn livereload(&self) -> &LiveReloadHub {
        &self.livereload
    }

    pub fn expander(&self) -> FileExpander {
        FileExpander::new(
            self.fs.clone(),
            self.root().to_path_buf(),
            self.settings().empty_match,
        )
    }

    /// Resolve a path from the config against the project root.
    pub fn path(&self, rel: &str) -> PathBuf {
        crate::fs::path_utils::join_slash(self.root(), rel)
    }

    /// A declared queue, or a single `task[:target]` when no queue has
    /// that name.
    pub fn resolve_queue(&self, name: &str) -> Result<TaskQueue> {
        if let Some(queue) = self.config.queue(name) {
            return Ok(queue.clone());
        }

        let spec: TaskSpec = name
            .parse()
            .map_err(|_| PipelineError::UnknownQueue(name.to_string()))?;
        if self.registry().targets_for(&spec).is_err() {
            return Err(PipelineError::UnknownQueue(name.to_string()));
        }
        Ok(TaskQueue::single(spec))
    }
}
