// src/tasks/runner.rs

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use tracing::{error, info, warn};

use crate::errors::{TaskError, TaskResult};
use crate::tasks::{Pipeline, TaskContext, TaskHandler, TaskKind, TaskQueue, TaskRef, TaskTarget};

/// Outcome of one queue run.
#[derive(Debug, Default)]
pub struct RunResult {
    pub ok: bool,
    /// Targets that finished successfully, in run order.
    pub completed: Vec<TaskRef>,
    /// First target that failed.
    pub failed_task: Option<TaskRef>,
    pub cause: Option<TaskError>,
}

impl RunResult {
    fn success(completed: Vec<TaskRef>) -> Self {
        Self {
            ok: true,
            completed,
            failed_task: None,
            cause: None,
        }
    }
}

/// Something that can run a queue to completion.
///
/// The watch loop is written against this trait so tests can substitute a
/// fake that records which queues were requested.
pub trait QueueExecutor: Send + Sync {
    fn execute<'a>(&'a self, queue: &'a TaskQueue) -> BoxFuture<'a, RunResult>;
}

/// Runs queues strictly in order, one target at a time.
#[derive(Debug, Clone)]
pub struct TaskRunner {
    ctx: TaskContext,
    force: bool,
}

impl TaskRunner {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            ctx: TaskContext::new(pipeline),
            force: false,
        }
    }

    /// Keep going after a failure; the result still reports the first one.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub async fn run(&self, queue: &TaskQueue) -> RunResult {
        info!(queue = %queue.name, entries = queue.entries.len(), "running queue");
        let started = Instant::now();

        let mut completed = Vec::new();
        let mut first_failure: Option<(TaskRef, TaskError)> = None;

        for spec in &queue.entries {
            let targets = match self.ctx.registry().targets_for(spec) {
                Ok(targets) => targets,
                Err(msg) => {
                    let task_ref = TaskRef::new(
                        spec.task.clone(),
                        spec.target.clone().unwrap_or_else(|| "*".to_string()),
                    );
                    error!(task = %task_ref, error = %msg, "cannot resolve queue entry");
                    if first_failure.is_none() {
                        first_failure = Some((task_ref, TaskError::Failed(msg)));
                    }
                    if self.force {
                        continue;
                    }
                    break;
                }
            };

            let mut stop = false;
            for unit in self.units(spec.target.is_none(), targets) {
                match self.run_unit(&unit).await {
                    Ok(()) => completed.extend(unit.iter().map(|t| t.task_ref.clone())),
                    Err(cause) => {
                        let failed = unit_ref(&unit);
                        if self.force {
                            warn!(task = %failed, error = %cause, "task failed; continuing (--force)");
                        }
                        if first_failure.is_none() {
                            first_failure = Some((failed, cause));
                        }
                        if !self.force {
                            stop = true;
                            break;
                        }
                    }
                }
            }
            if stop {
                break;
            }
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match first_failure {
            None => {
                info!(queue = %queue.name, elapsed_ms, "queue finished");
                RunResult::success(completed)
            }
            Some((task, cause)) => {
                error!(queue = %queue.name, task = %task, elapsed_ms, "queue aborted");
                RunResult {
                    ok: false,
                    completed,
                    failed_task: Some(task),
                    cause: Some(cause),
                }
            }
        }
    }

    /// Split a queue entry's targets into run units: one unit per target,
    /// unless the kind's handler takes a whole task at once.
    fn units<'t>(&self, whole_task: bool, targets: Vec<&'t TaskTarget>) -> Vec<Vec<&'t TaskTarget>> {
        let together = whole_task
            && targets.len() > 1
            && targets
                .first()
                .and_then(|t| self.ctx.handlers().get(t.kind))
                .is_some_and(|h| h.runs_targets_together());
        if together {
            vec![targets]
        } else {
            targets.into_iter().map(|t| vec![t]).collect()
        }
    }

    async fn run_unit(&self, unit: &[&TaskTarget]) -> TaskResult {
        match unit {
            [target] => self.run_target(target).await,
            _ => self.run_group(unit).await,
        }
    }

    /// Run one target through its kind's handler, honoring the configured
    /// timeout.
    pub async fn run_target(&self, target: &TaskTarget) -> TaskResult {
        let handler = self.handler_for(target)?;
        let label = target.task_ref.clone();
        let timeout = (!handler.is_persistent(target))
            .then_some(self.ctx.settings().task_timeout)
            .flatten();
        self.timed(&label, target.kind, timeout, handler.run(target, &self.ctx))
            .await
    }

    async fn run_group(&self, unit: &[&TaskTarget]) -> TaskResult {
        let first = unit
            .first()
            .ok_or_else(|| TaskError::Failed("empty task group".to_string()))?;
        let handler = self.handler_for(first)?;
        let label = unit_ref(unit);
        let timeout = (!unit.iter().any(|t| handler.is_persistent(t)))
            .then_some(self.ctx.settings().task_timeout)
            .flatten();
        self.timed(&label, first.kind, timeout, handler.run_together(unit, &self.ctx))
            .await
    }

    fn handler_for(&self, target: &TaskTarget) -> TaskResult<Arc<dyn TaskHandler>> {
        self.ctx.handlers().get(target.kind).cloned().ok_or_else(|| {
            TaskError::Failed(format!("no handler registered for kind '{}'", target.kind))
        })
    }

    async fn timed(
        &self,
        label: &TaskRef,
        kind: TaskKind,
        timeout: Option<Duration>,
        fut: BoxFuture<'_, TaskResult>,
    ) -> TaskResult {
        info!(task = %label.task, target = %label.target, %kind, "running task");
        let started = Instant::now();

        let result = match timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(res) => res,
                Err(_) => Err(TaskError::TimedOut(limit)),
            },
            None => fut.await,
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => info!(
                task = %label.task,
                target = %label.target,
                elapsed_ms,
                "task finished"
            ),
            Err(e) => error!(
                task = %label.task,
                target = %label.target,
                elapsed_ms,
                error = %e,
                "task failed"
            ),
        }
        result
    }
}

/// Reference reported for a unit: the target itself, or `task:*` for a
/// whole task run together.
fn unit_ref(unit: &[&TaskTarget]) -> TaskRef {
    match unit {
        [target] => target.task_ref.clone(),
        [first, ..] => TaskRef::new(first.task_ref.task.clone(), "*"),
        [] => TaskRef::new("?", "?"),
    }
}

impl QueueExecutor for TaskRunner {
    fn execute<'a>(&'a self, queue: &'a TaskQueue) -> BoxFuture<'a, RunResult> {
        Box::pin(self.run(queue))
    }
}
