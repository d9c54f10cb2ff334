// src/tasks/builtin/clean.rs

use std::path::{Component, Path};

use futures::future::BoxFuture;
use tracing::{debug, info};

use crate::errors::{TaskError, TaskResult};
use crate::files::expander::has_glob_meta;
use crate::files::FileMapping;
use crate::fs::path_utils::{confined_join, relative_str};
use crate::tasks::{TaskContext, TaskHandler, TaskKind, TaskTarget};

/// Deletes every `src` path: literal paths as whole trees, globs file by
/// file. Paths outside the project root, and the root itself, are refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanHandler;

impl TaskHandler for CleanHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Clean
    }

    fn run<'a>(&'a self, target: &'a TaskTarget, ctx: &'a TaskContext) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            let mut removed = 0usize;

            for mapping in &target.files {
                if let Some(pattern) = mapping.src.iter().find(|p| has_parent_segment(p)) {
                    return Err(outside_root(pattern));
                }

                let (literals, globs): (Vec<&String>, Vec<&String>) = mapping
                    .src
                    .iter()
                    .partition(|p| !p.starts_with('!') && !has_glob_meta(p));

                let base = match mapping.cwd.as_deref() {
                    Some(cwd) => confined_join(ctx.root(), cwd).ok_or_else(|| outside_root(cwd))?,
                    None => ctx.root().to_path_buf(),
                };

                for literal in literals {
                    let path = confined_join(&base, literal)
                        .filter(|p| p.as_path() != ctx.root())
                        .ok_or_else(|| outside_root(literal))?;
                    if ctx.fs().exists(&path) {
                        ctx.fs().remove_all(&path)?;
                        info!(task = %target.task_ref, path = ?path, "removed");
                        removed += 1;
                    } else {
                        debug!(task = %target.task_ref, path = ?path, "nothing to remove");
                    }
                }

                if globs.iter().any(|p| !p.starts_with('!')) {
                    let glob_mapping = FileMapping {
                        src: globs.into_iter().cloned().collect(),
                        cwd: relative_str(ctx.root(), &base).filter(|c| !c.is_empty()),
                        ..FileMapping::default()
                    };
                    for path in ctx.expander().sources(std::slice::from_ref(&glob_mapping))? {
                        if !is_below(ctx.root(), &path) {
                            return Err(outside_root(&path.to_string_lossy()));
                        }
                        ctx.fs().remove_all(&path)?;
                        removed += 1;
                    }
                }
            }

            info!(task = %target.task_ref, removed, "clean finished");
            Ok(())
        })
    }
}

fn outside_root(path: &str) -> TaskError {
    TaskError::Failed(format!("refusing to delete '{path}' outside the project root"))
}

fn has_parent_segment(pattern: &str) -> bool {
    pattern
        .trim_start_matches('!')
        .split(['/', '\\'])
        .any(|segment| segment == "..")
}

/// Strictly below `root`, with no `..` components.
fn is_below(root: &Path, path: &Path) -> bool {
    path != root
        && path.starts_with(root)
        && !path.components().any(|c| matches!(c, Component::ParentDir))
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use crate::fs::mock::MockFileSystem;
    use crate::fs::FileSystem;
    use crate::tasks::builtin::testing::{pipeline, run};

    #[tokio::test]
    async fn removes_literal_trees_and_globbed_files() {
        let fs = MockFileSystem::new();
        fs.add_file("./build/assets/app.js", b"x".to_vec());
        fs.add_file("./tmp/a.log", b"x".to_vec());
        fs.add_file("./tmp/keep.txt", b"x".to_vec());
        fs.add_file("./src/app.js", b"x".to_vec());

        let p = pipeline(
            r#"
            [task.clean]
            kind = "clean"
            [task.clean.targets]
            build = ["build", "missing"]
            logs = ["tmp/*.log"]
            "#,
            &fs,
        );
        let result = run(&p, "clean").await;

        assert!(result.ok, "{:?}", result.cause);
        assert!(!fs.exists(Path::new("./build")));
        assert_eq!(
            fs.file_paths(),
            vec![PathBuf::from("./src/app.js"), PathBuf::from("./tmp/keep.txt")]
        );
    }

    #[tokio::test]
    async fn refuses_to_leave_the_project() {
        let fs = MockFileSystem::new();
        let p = pipeline(
            r#"
            [task.clean]
            kind = "clean"
            targets = { bad = ["../elsewhere"] }
            "#,
            &fs,
        );
        let result = run(&p, "clean").await;
        assert!(!result.ok);
        assert!(result.cause.unwrap().to_string().contains("refusing"));
    }

    mod on_disk {
        use std::path::{Path, PathBuf};

        use crate::config::{ConfigFile, RawConfigFile};
        use crate::tasks::{Pipeline, RunResult, TaskRunner};

        async fn clean_in(root: &Path, targets: &str) -> RunResult {
            let mut raw: RawConfigFile = toml::from_str(&format!(
                "[task.clean]\nkind = \"clean\"\n[task.clean.targets]\n{targets}\n"
            ))
            .unwrap();
            raw.root = PathBuf::from(root);
            let pipeline = Pipeline::new(ConfigFile::try_from(raw).unwrap()).unwrap();
            let queue = pipeline.resolve_queue("clean").unwrap();
            TaskRunner::new(pipeline).run(&queue).await
        }

        #[tokio::test]
        async fn globs_never_reach_above_the_root() {
            let outer = tempfile::tempdir().unwrap();
            let root = outer.path().join("proj");
            std::fs::create_dir_all(&root).unwrap();
            std::fs::write(outer.path().join("victim.txt"), "x").unwrap();

            let result = clean_in(&root, r#"bad = ["../*.txt"]"#).await;

            assert!(!result.ok);
            assert!(result.cause.unwrap().to_string().contains("refusing"));
            assert!(outer.path().join("victim.txt").exists());
        }

        #[tokio::test]
        async fn cwd_resolving_to_the_root_is_refused() {
            let dir = tempfile::tempdir().unwrap();
            std::fs::create_dir_all(dir.path().join("src")).unwrap();
            std::fs::write(dir.path().join("keep.txt"), "x").unwrap();

            let result = clean_in(dir.path(), r#"bad = { cwd = "src/..", src = ["."] }"#).await;

            assert!(!result.ok);
            assert!(dir.path().join("keep.txt").exists());
        }

        #[tokio::test]
        async fn cwd_above_the_root_is_refused() {
            let outer = tempfile::tempdir().unwrap();
            let root = outer.path().join("proj");
            std::fs::create_dir_all(&root).unwrap();
            std::fs::write(outer.path().join("victim.txt"), "x").unwrap();

            let result = clean_in(&root, r#"bad = { cwd = "..", src = ["*.txt"] }"#).await;

            assert!(!result.ok);
            assert!(outer.path().join("victim.txt").exists());
        }

        #[tokio::test]
        async fn cwd_inside_the_root_still_cleans() {
            let dir = tempfile::tempdir().unwrap();
            std::fs::create_dir_all(dir.path().join("build/css")).unwrap();
            std::fs::write(dir.path().join("build/css/a.css"), "x").unwrap();
            std::fs::write(dir.path().join("build/keep.txt"), "x").unwrap();

            let result = clean_in(dir.path(), r#"css = { cwd = "./build", src = ["css/*.css"] }"#).await;

            assert!(result.ok, "{:?}", result.cause);
            assert!(!dir.path().join("build/css/a.css").exists());
            assert!(dir.path().join("build/keep.txt").exists());
        }
    }
}
