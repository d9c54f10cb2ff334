// src/tasks/builtin/lint.rs

use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::{info, warn};

use crate::capability::LintRules;
use crate::config::ConfigNode;
use crate::errors::{TaskError, TaskResult};
use crate::tasks::builtin::{engine_options, read_text};
use crate::tasks::{TaskContext, TaskHandler, TaskKind, TaskTarget};

#[derive(Debug, Clone, Default, Deserialize)]
struct LintOptions {
    /// JSON rules file (relative to the project root) merged under the
    /// target's own options.
    #[serde(default)]
    jshintrc: Option<String>,
}

/// Lints every matched file; any finding fails the target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LintHandler;

impl LintHandler {
    fn rules(&self, target: &TaskTarget, ctx: &TaskContext) -> TaskResult<LintRules> {
        let opts: LintOptions = target.options_as()?;

        let merged = match opts.jshintrc.as_deref() {
            Some(rc) => {
                let text = read_text(ctx, &ctx.path(rc))?;
                let json: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
                    TaskError::InvalidOptions(format!("{rc} is not valid JSON: {e}"))
                })?;
                ConfigNode::from(json).merged_with(&target.options)
            }
            None => target.options.clone(),
        };

        merged
            .deserialize()
            .map_err(|e| TaskError::InvalidOptions(format!("{}: {e}", target.task_ref)))
    }
}

impl TaskHandler for LintHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Lint
    }

    fn check(&self, target: &TaskTarget) -> TaskResult<()> {
        engine_options(target)?;
        target.options_as::<LintOptions>()?;
        Ok(())
    }

    fn run<'a>(&'a self, target: &'a TaskTarget, ctx: &'a TaskContext) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            let rules = self.rules(target, ctx)?;
            let linter = engine_options(target)?.linter(ctx.root())?;

            let mut findings = Vec::new();
            let sources = ctx.expander().sources(&target.files)?;
            for src in &sources {
                let text = read_text(ctx, src)?;
                findings.extend(linter.lint(src, &text, &rules).await?);
            }

            if findings.is_empty() {
                info!(task = %target.task_ref, files = sources.len(), "lint passed");
                return Ok(());
            }

            for finding in &findings {
                warn!(task = %target.task_ref, "{finding}");
            }
            Err(TaskError::Lint {
                count: findings.len(),
                report: findings
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n"),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::TaskError;
    use crate::fs::mock::MockFileSystem;
    use crate::tasks::builtin::testing::{pipeline, run};

    const CONFIG: &str = r#"
        [vars.project]
        js = ["src/js/*.js"]

        [task.jshint]
        kind = "lint"
        options = { jshintrc = ".jshintrc" }
        files = ["<%= project.js %>"]
    "#;

    #[tokio::test]
    async fn jshintrc_rules_apply() {
        let fs = MockFileSystem::new();
        fs.add_file("./.jshintrc", r#"{ "maxlen": 10, "curly": true }"#);
        fs.add_file("./src/js/ok.js", "var a;\n");
        fs.add_file("./src/js/long.js", "var abcdefghijk = 1;\n");

        let p = pipeline(CONFIG, &fs);
        let result = run(&p, "jshint").await;

        assert!(!result.ok);
        match result.cause {
            Some(TaskError::Lint { count, report }) => {
                assert_eq!(count, 1);
                assert!(report.contains("long.js:1"), "{report}");
            }
            other => panic!("expected lint failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn clean_files_pass() {
        let fs = MockFileSystem::new();
        fs.add_file("./.jshintrc", "{}");
        fs.add_file("./src/js/ok.js", "var a = 1;\n");

        let p = pipeline(CONFIG, &fs);
        assert!(run(&p, "jshint").await.ok);
    }
}
