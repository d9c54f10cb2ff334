// src/tasks/builtin/mod.rs

//! Built-in handlers, one per [`TaskKind`](crate::tasks::TaskKind).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::capability::EngineOptions;
use crate::errors::{TaskError, TaskResult};
use crate::files::{group_by_dest, DestGroup};
use crate::tasks::{TaskContext, TaskHandler, TaskTarget};

pub mod bump;
pub mod clean;
pub mod compile;
pub mod concat;
pub mod copy;
pub mod lint;
pub mod minify;
pub mod open;
pub mod optimize;
pub mod serve;
pub mod shell;
pub mod strip_lines;
pub mod watch;

pub use bump::BumpHandler;
pub use clean::CleanHandler;
pub use compile::CompileHandler;
pub use concat::ConcatHandler;
pub use copy::CopyHandler;
pub use lint::LintHandler;
pub use minify::MinifyHandler;
pub use open::OpenHandler;
pub use optimize::OptimizeHandler;
pub use serve::ServeHandler;
pub use shell::ShellHandler;
pub use strip_lines::StripLinesHandler;
pub use watch::WatchHandler;

pub fn all() -> Vec<Arc<dyn TaskHandler>> {
    vec![
        Arc::new(CleanHandler),
        Arc::new(LintHandler),
        Arc::new(ConcatHandler),
        Arc::new(MinifyHandler),
        Arc::new(CompileHandler),
        Arc::new(OptimizeHandler),
        Arc::new(StripLinesHandler),
        Arc::new(CopyHandler),
        Arc::new(ShellHandler),
        Arc::new(BumpHandler),
        Arc::new(ServeHandler),
        Arc::new(OpenHandler),
        Arc::new(WatchHandler),
    ]
}

/// Prepend `banner`, separated by a newline when it doesn't end with one.
pub(crate) fn with_banner(banner: Option<&str>, body: &str) -> String {
    match banner.filter(|b| !b.is_empty()) {
        None => body.to_string(),
        Some(b) if b.ends_with('\n') => format!("{b}{body}"),
        Some(b) => format!("{b}\n{body}"),
    }
}

pub(crate) fn read_text(ctx: &TaskContext, path: &Path) -> TaskResult<String> {
    if !ctx.fs().is_file(path) {
        return Err(TaskError::MissingSource(path.to_path_buf()));
    }
    Ok(ctx.fs().read_to_string(path)?)
}

pub(crate) fn read_bytes(ctx: &TaskContext, path: &Path) -> TaskResult<Vec<u8>> {
    if !ctx.fs().is_file(path) {
        return Err(TaskError::MissingSource(path.to_path_buf()));
    }
    Ok(ctx.fs().read(path)?)
}

pub(crate) fn write_text(ctx: &TaskContext, path: &Path, contents: &str) -> TaskResult<()> {
    ctx.fs().write(path, contents.as_bytes())?;
    Ok(())
}

pub(crate) fn engine_options(target: &TaskTarget) -> TaskResult<EngineOptions> {
    let opts: EngineOptions = target.options_as()?;
    opts.validate()?;
    Ok(opts)
}

/// Expand the target's files and group them by destination; every group
/// must have one.
pub(crate) fn dest_groups(ctx: &TaskContext, target: &TaskTarget) -> TaskResult<Vec<(PathBuf, Vec<PathBuf>)>> {
    let pairs = ctx.expander().expand_all(&target.files)?;
    group_by_dest(&pairs)
        .into_iter()
        .map(|DestGroup { dest, sources }| match dest {
            Some(dest) => Ok((dest, sources)),
            None => Err(TaskError::InvalidOptions(format!(
                "{}: file mapping for {:?} needs a `dest`",
                target.task_ref, sources
            ))),
        })
        .collect()
}

/// Read and join several sources with `separator`.
pub(crate) fn read_joined(ctx: &TaskContext, sources: &[PathBuf], separator: &str) -> TaskResult<String> {
    let parts = sources
        .iter()
        .map(|src| read_text(ctx, src))
        .collect::<TaskResult<Vec<_>>>()?;
    Ok(parts.join(separator))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_is_separated_by_newline() {
        assert_eq!(with_banner(Some("/*! x */"), "a{}"), "/*! x */\na{}");
        assert_eq!(with_banner(Some("/*! x */\n"), "a{}"), "/*! x */\na{}");
        assert_eq!(with_banner(Some(""), "a{}"), "a{}");
        assert_eq!(with_banner(None, "a{}"), "a{}");
    }
}
