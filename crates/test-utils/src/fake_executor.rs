use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assetpipe::errors::TaskError;
use assetpipe::tasks::{QueueExecutor, RunResult, TaskQueue, TaskRef};
use futures::future::BoxFuture;
use tracing::debug;

/// A fake queue executor that:
/// - records the name of every queue it is asked to run
/// - optionally takes some (virtual) time per run
/// - fails the queues it was told to fail
#[derive(Debug, Clone, Default)]
pub struct FakeQueueExecutor {
    executed: Arc<Mutex<Vec<String>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    delay: Duration,
}

impl FakeQueueExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(self, queue: &str) -> Self {
        self.failing.lock().unwrap().insert(queue.to_string());
        self
    }

    /// Queue names run so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

impl QueueExecutor for FakeQueueExecutor {
    fn execute<'a>(&'a self, queue: &'a TaskQueue) -> BoxFuture<'a, RunResult> {
        Box::pin(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.executed.lock().unwrap().push(queue.name.clone());
            debug!(queue = %queue.name, "fake executor ran queue");

            if self.failing.lock().unwrap().contains(&queue.name) {
                return RunResult {
                    ok: false,
                    completed: Vec::new(),
                    failed_task: Some(TaskRef::new(queue.name.clone(), "*")),
                    cause: Some(TaskError::Failed("fake failure".to_string())),
                };
            }

            RunResult {
                ok: true,
                ..RunResult::default()
            }
        })
    }
}
