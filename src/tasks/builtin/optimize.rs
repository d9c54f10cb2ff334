// src/tasks/builtin/optimize.rs

use futures::future::BoxFuture;
use tracing::{debug, info};

use crate::capability::ImageFormat;
use crate::errors::TaskResult;
use crate::tasks::builtin::{engine_options, read_bytes};
use crate::tasks::{TaskContext, TaskHandler, TaskKind, TaskTarget};

/// Optimizes images, writing to `dest` or back over the source.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptimizeHandler;

impl TaskHandler for OptimizeHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Optimize
    }

    fn check(&self, target: &TaskTarget) -> TaskResult<()> {
        engine_options(target).map(|_| ())
    }

    fn run<'a>(&'a self, target: &'a TaskTarget, ctx: &'a TaskContext) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            let optimizer = engine_options(target)?.optimizer(ctx.root())?;

            let mut saved = 0usize;
            let pairs = ctx.expander().expand_all(&target.files)?;
            for pair in &pairs {
                let bytes = read_bytes(ctx, &pair.src)?;
                let format = ImageFormat::sniff(&bytes);
                let optimized = optimizer.optimize(&bytes, format).await?;

                let dest = pair.dest.as_ref().unwrap_or(&pair.src);
                if optimized.len() < bytes.len() || dest != &pair.src {
                    ctx.fs().write(dest, &optimized)?;
                }
                saved += bytes.len().saturating_sub(optimized.len());
                debug!(
                    task = %target.task_ref,
                    src = ?pair.src,
                    format = format.as_str(),
                    before = bytes.len(),
                    after = optimized.len(),
                    "optimized image"
                );
            }

            info!(task = %target.task_ref, images = pairs.len(), saved_bytes = saved, "optimize finished");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::fs::mock::MockFileSystem;
    use crate::fs::FileSystem;
    use crate::tasks::builtin::testing::{pipeline, run};

    #[tokio::test]
    async fn jpeg_comments_are_stripped_in_place() {
        let jpeg: Vec<u8> = [
            &[0xFF, 0xD8][..],
            &[0xFF, 0xFE, 0x00, 0x06, b'n', b'o', b't', b'e'],
            &[0xFF, 0xDA, 0x00, 0x02, 0x42, 0xFF, 0xD9],
        ]
        .concat();
        let fs = MockFileSystem::new();
        fs.add_file("./build/assets/img/a.jpg", jpeg);

        let p = pipeline(
            r#"
            [task.imagemin]
            kind = "optimize"
            [task.imagemin.targets.dist]
            files = [{ expand = true, cwd = "build/assets/", src = ["**/*.jpg"], dest = "build/assets/", ext = ".jpg" }]
            "#,
            &fs,
        );
        assert!(run(&p, "imagemin:dist").await.ok);
        assert_eq!(
            fs.read(Path::new("./build/assets/img/a.jpg")).unwrap(),
            vec![0xFF, 0xD8, 0xFF, 0xDA, 0x00, 0x02, 0x42, 0xFF, 0xD9]
        );
    }
}
