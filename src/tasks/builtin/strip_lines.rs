// src/tasks/builtin/strip_lines.rs

use futures::future::BoxFuture;
use regex::Regex;
use serde::Deserialize;
use tracing::info;

use crate::errors::{TaskError, TaskResult};
use crate::tasks::builtin::{read_text, with_banner, write_text};
use crate::tasks::{TaskContext, TaskHandler, TaskKind, TaskTarget};

#[derive(Debug, Clone, Default, Deserialize)]
struct StripLinesOptions {
    /// Lines matching this regex are dropped as well.
    #[serde(default, alias = "exclusionPattern")]
    exclusion_pattern: Option<String>,

    #[serde(default)]
    banner: Option<String>,
}

impl StripLinesOptions {
    fn pattern(&self) -> TaskResult<Option<Regex>> {
        self.exclusion_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| TaskError::InvalidOptions(format!("exclusion_pattern: {e}")))
    }
}

/// Removes blank lines (and lines matching `exclusion_pattern`).
#[derive(Debug, Clone, Copy, Default)]
pub struct StripLinesHandler;

impl TaskHandler for StripLinesHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::StripLines
    }

    fn check(&self, target: &TaskTarget) -> TaskResult<()> {
        target.options_as::<StripLinesOptions>()?.pattern().map(|_| ())
    }

    fn run<'a>(&'a self, target: &'a TaskTarget, ctx: &'a TaskContext) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            let opts: StripLinesOptions = target.options_as()?;
            let pattern = opts.pattern()?;

            let pairs = ctx.expander().expand_all(&target.files)?;
            for pair in &pairs {
                let text = read_text(ctx, &pair.src)?;
                let stripped = strip_lines(&text, pattern.as_ref());
                let dest = pair.dest.as_ref().unwrap_or(&pair.src);
                write_text(ctx, dest, &with_banner(opts.banner.as_deref(), &stripped))?;
            }

            info!(task = %target.task_ref, files = pairs.len(), "stripped lines");
            Ok(())
        })
    }
}

pub fn strip_lines(text: &str, exclude: Option<&Regex>) -> String {
    let mut out: String = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !exclude.is_some_and(|re| re.is_match(line)))
        .collect::<Vec<_>>()
        .join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::fs::FileSystem;
    use crate::tasks::builtin::testing::{pipeline, run};

    #[test]
    fn drops_blank_and_excluded_lines() {
        let re = Regex::new("livereload").unwrap();
        assert_eq!(
            strip_lines("<html>\n\n  \n<script src=\"livereload.js\"></script>\n</html>", Some(&re)),
            "<html>\n</html>\n"
        );
        assert_eq!(strip_lines("\n\n", None), "");
    }

    #[tokio::test]
    async fn html_is_rewritten_in_place() {
        let fs = MockFileSystem::new();
        fs.add_file("./build/index.html", "<p>\n\n</p>\n");

        let p = pipeline(
            r#"
            [task.lineremover]
            kind = "strip-lines"
            [task.lineremover.targets.html]
            files = [{ expand = true, cwd = "build/", src = ["**/*.html"], dest = "build/", ext = ".html" }]
            "#,
            &fs,
        );
        assert!(run(&p, "lineremover").await.ok);
        assert_eq!(fs.read_to_string(Path::new("./build/index.html")).unwrap(), "<p>\n</p>\n");
    }

    #[test]
    fn invalid_pattern_fails_the_check() {
        let fs = MockFileSystem::new();
        let mut raw: crate::config::RawConfigFile = toml::from_str(
            r#"
            [task.strip]
            kind = "strip-lines"
            options = { exclusion_pattern = "(" }
            files = ["*.html"]
            "#,
        )
        .unwrap();
        raw.root = ".".into();
        let config = crate::config::ConfigFile::try_from(raw).unwrap();
        let err = crate::tasks::Pipeline::with_handlers(
            config,
            crate::tasks::HandlerSet::builtin(),
            std::sync::Arc::new(fs),
        )
        .unwrap_err();
        assert!(err.to_string().contains("exclusion_pattern"));
    }
}
