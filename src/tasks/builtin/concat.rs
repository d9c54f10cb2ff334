// src/tasks/builtin/concat.rs

use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::info;

use crate::errors::TaskResult;
use crate::tasks::builtin::{dest_groups, read_text, with_banner, write_text};
use crate::tasks::{TaskContext, TaskHandler, TaskKind, TaskTarget};

#[derive(Debug, Clone, Deserialize)]
struct ConcatOptions {
    #[serde(default = "default_separator")]
    separator: String,

    /// Drop a leading `/* ... */` block comment from each source (but keep
    /// `/*! ... */`).
    #[serde(default, alias = "stripBanners")]
    strip_banners: bool,

    #[serde(default)]
    banner: Option<String>,

    #[serde(default)]
    footer: Option<String>,
}

fn default_separator() -> String {
    "\n".to_string()
}

/// Concatenates every source group into its destination.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcatHandler;

impl TaskHandler for ConcatHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Concat
    }

    fn check(&self, target: &TaskTarget) -> TaskResult<()> {
        target.options_as::<ConcatOptions>().map(|_| ())
    }

    fn run<'a>(&'a self, target: &'a TaskTarget, ctx: &'a TaskContext) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            let opts: ConcatOptions = target.options_as()?;

            for (dest, sources) in dest_groups(ctx, target)? {
                let mut parts = Vec::with_capacity(sources.len());
                for src in &sources {
                    let text = read_text(ctx, src)?;
                    parts.push(if opts.strip_banners {
                        strip_banner(&text).to_string()
                    } else {
                        text
                    });
                }

                let mut out = with_banner(opts.banner.as_deref(), &parts.join(&opts.separator));
                if let Some(footer) = opts.footer.as_deref() {
                    out.push_str(footer);
                }
                write_text(ctx, &dest, &out)?;
                info!(task = %target.task_ref, dest = ?dest, sources = sources.len(), "concatenated");
            }
            Ok(())
        })
    }
}

/// Source without its leading non-`/*!` block comment.
pub fn strip_banner(text: &str) -> &str {
    let trimmed = text.trim_start();
    if trimmed.starts_with("/*") && !trimmed.starts_with("/*!") {
        if let Some(end) = trimmed.find("*/") {
            return trimmed[end + 2..].trim_start_matches(['\r', '\n']);
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::errors::TaskError;
    use crate::fs::mock::MockFileSystem;
    use crate::fs::FileSystem;
    use crate::tasks::builtin::testing::{pipeline, run};

    #[test]
    fn strip_banner_keeps_license_comments() {
        assert_eq!(strip_banner("/* old */\nvar a;"), "var a;");
        assert_eq!(strip_banner("/*! keep */\nvar a;"), "/*! keep */\nvar a;");
        assert_eq!(strip_banner("var a; /* x */"), "var a; /* x */");
    }

    #[tokio::test]
    async fn concatenates_in_pattern_order_with_banner() {
        let fs = MockFileSystem::new();
        fs.add_file("./package.json", "{}");
        fs.add_file("./src/js/b.js", "/* b */\nvar b;");
        fs.add_file("./src/js/a.js", "var a;");

        let p = pipeline(
            r#"
            [vars]
            banner = "/*! demo */"

            [task.concat]
            kind = "concat"
            options = { strip_banners = true, banner = "<%= banner %>" }
            [task.concat.targets.dev]
            files = [{ src = ["src/js/*.js"], dest = "app/js/script.js" }]
            "#,
            &fs,
        );
        assert!(run(&p, "concat").await.ok);

        let out = fs.read_to_string(Path::new("./app/js/script.js")).unwrap();
        assert_eq!(out, "/*! demo */\nvar a;\nvar b;");
    }

    #[tokio::test]
    async fn nonull_surfaces_missing_sources() {
        let fs = MockFileSystem::new();
        let p = pipeline(
            r#"
            [task.concat]
            kind = "concat"
            [task.concat.targets.dev]
            files = [{ src = ["src/js/gone.js"], dest = "out.js", nonull = true }]
            "#,
            &fs,
        );
        let result = run(&p, "concat:dev").await;
        assert!(matches!(result.cause, Some(TaskError::MissingSource(p)) if p.ends_with("gone.js")));
    }
}
