// src/tasks/builtin/copy.rs

use futures::future::BoxFuture;
use tracing::{debug, info};

use crate::errors::{TaskError, TaskResult};
use crate::tasks::builtin::engine_options;
use crate::tasks::{TaskContext, TaskHandler, TaskKind, TaskTarget};

/// Copies every matched file to its destination.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyHandler;

impl TaskHandler for CopyHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Copy
    }

    fn check(&self, target: &TaskTarget) -> TaskResult<()> {
        engine_options(target).map(|_| ())
    }

    fn run<'a>(&'a self, target: &'a TaskTarget, ctx: &'a TaskContext) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            let copier = engine_options(target)?.copier(ctx.root(), ctx.fs().clone())?;

            let pairs = ctx.expander().expand_all(&target.files)?;
            for pair in &pairs {
                let dest = pair.dest.as_ref().ok_or_else(|| {
                    TaskError::InvalidOptions(format!(
                        "{}: copying {:?} needs a `dest`",
                        target.task_ref, pair.src
                    ))
                })?;
                if !ctx.fs().is_file(&pair.src) {
                    return Err(TaskError::MissingSource(pair.src.clone()));
                }
                copier.copy(&pair.src, dest).await?;
                debug!(task = %target.task_ref, src = ?pair.src, dest = ?dest, "copied");
            }

            info!(task = %target.task_ref, files = pairs.len(), "copy finished");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::fs::mock::MockFileSystem;
    use crate::tasks::builtin::testing::{pipeline, run};

    #[tokio::test]
    async fn flatten_keeps_only_file_names() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/font/a/x.woff", b"x".to_vec());
        fs.add_file("./src/font/y.ttf", b"y".to_vec());

        let p = pipeline(
            r#"
            [vars.project]
            font = ["src/font"]

            [task.copy]
            kind = "copy"
            [task.copy.targets.font]
            files = [{ expand = true, flatten = true, src = "<%= project.font %>/**/*", dest = "build/fonts" }]
            "#,
            &fs,
        );
        assert!(run(&p, "copy:font").await.ok);
        assert!(fs.file_paths().contains(&PathBuf::from("./build/fonts/x.woff")));
        assert!(fs.file_paths().contains(&PathBuf::from("./build/fonts/y.ttf")));
    }
}
