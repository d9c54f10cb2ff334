// src/tasks/handler.rs

//! The seam between the runner and the per-kind task bodies.

use std::collections::HashMap;
use std::fmt::Debug;
use std::ops::Deref;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::errors::{PipelineError, Result, TaskResult};
use crate::tasks::{Pipeline, TaskKind, TaskRegistry, TaskTarget};

/// Executes targets of one [`TaskKind`].
///
/// Production handlers live in [`crate::tasks::builtin`]; tests can register
/// their own through [`HandlerSet::register`].
pub trait TaskHandler: Send + Sync + Debug {
    fn kind(&self) -> TaskKind;

    /// Validate a target's options at load time.
    fn check(&self, _target: &TaskTarget) -> TaskResult<()> {
        Ok(())
    }

    fn run<'a>(&'a self, target: &'a TaskTarget, ctx: &'a TaskContext)
        -> BoxFuture<'a, TaskResult>;

    /// Whether a whole-task queue entry hands every target to
    /// [`run_together`](Self::run_together) in one call instead of running
    /// them one after another.
    fn runs_targets_together(&self) -> bool {
        false
    }

    fn run_together<'a>(
        &'a self,
        targets: &'a [&'a TaskTarget],
        ctx: &'a TaskContext,
    ) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            for target in targets {
                self.run(target, ctx).await?;
            }
            Ok(())
        })
    }

    /// Targets that run until shutdown are exempt from the task timeout.
    fn is_persistent(&self, _target: &TaskTarget) -> bool {
        false
    }
}

/// What a handler can reach while it runs.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pipeline: Arc<Pipeline>,
}

impl TaskContext {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }
}

impl Deref for TaskContext {
    type Target = Pipeline;

    fn deref(&self) -> &Self::Target {
        &self.pipeline
    }
}

/// Handler per task kind.
#[derive(Debug, Clone, Default)]
pub struct HandlerSet {
    handlers: HashMap<TaskKind, Arc<dyn TaskHandler>>,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in handler.
    pub fn builtin() -> Self {
        crate::tasks::builtin::all()
            .into_iter()
            .fold(Self::new(), |set, h| set.with(h))
    }

    /// Register `handler` for its kind, replacing any previous one.
    pub fn register(&mut self, handler: Arc<dyn TaskHandler>) {
        self.handlers.insert(handler.kind(), handler);
    }

    pub fn with(mut self, handler: Arc<dyn TaskHandler>) -> Self {
        self.register(handler);
        self
    }

    pub fn get(&self, kind: TaskKind) -> Option<&Arc<dyn TaskHandler>> {
        self.handlers.get(&kind)
    }

    /// Every declared task must have a handler, and every target must pass
    /// its handler's option check.
    pub fn check(&self, registry: &TaskRegistry) -> Result<()> {
        for task in registry.iter() {
            let handler = self.get(task.kind).ok_or_else(|| {
                PipelineError::ConfigError(format!(
                    "task '{}' has kind '{}' but no handler is registered for it",
                    task.name, task.kind
                ))
            })?;
            for target in task.targets.values() {
                handler.check(target).map_err(|e| {
                    PipelineError::ConfigError(format!("task '{}': {e}", target.task_ref))
                })?;
            }
        }
        Ok(())
    }
}
