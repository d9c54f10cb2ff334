// src/capability/mod.rs

//! Capability traits the content-transforming task kinds are written
//! against, with one built-in and one external-command engine each.
//!
//! A target picks its engine with
//!
//! ```toml
//! [task.uglify.targets.build]
//! engine = "command"
//! command = "npx terser --compress"
//! ```
//!
//! and gets the built-in engine otherwise.

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Deserialize;

use crate::errors::CapabilityError;
use crate::fs::FileSystem;

pub mod command;
pub mod compile;
pub mod copy;
pub mod lint;
pub mod minify;
pub mod optimize;

pub use command::{shell_command, CommandFilter};
pub use compile::StylesheetCompiler;
pub use copy::FsCopier;
pub use lint::{LintFinding, LintRules, ScriptLinter};
pub use minify::BuiltinMinifier;
pub use optimize::MetadataStripper;

pub type CapResult<T> = Result<T, CapabilityError>;

/// Source language of a minification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Js,
    Css,
}

impl Lang {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::Js => "js",
            Lang::Css => "css",
        }
    }

    /// Guess from a file extension (`.js`, `.min.css`, ...).
    pub fn from_path(path: &Path) -> Option<Lang> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "js" | "mjs" | "cjs" => Some(Lang::Js),
            "css" => Some(Lang::Css),
            _ => None,
        }
    }
}

/// Stylesheet output style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    #[default]
    Expanded,
    Compressed,
}

impl OutputStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputStyle::Expanded => "expanded",
            OutputStyle::Compressed => "compressed",
        }
    }
}

/// Image container formats the optimizer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Other,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            ImageFormat::Other => "other",
        }
    }

    /// Detect the format from magic bytes.
    pub fn sniff(bytes: &[u8]) -> ImageFormat {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            ImageFormat::Png
        } else if bytes.starts_with(&[0xFF, 0xD8]) {
            ImageFormat::Jpeg
        } else if bytes.starts_with(b"GIF8") {
            ImageFormat::Gif
        } else {
            ImageFormat::Other
        }
    }
}

pub trait Minifier: Send + Sync + Debug {
    fn minify<'a>(&'a self, input: &'a str, lang: Lang) -> BoxFuture<'a, CapResult<String>>;
}

pub trait Compiler: Send + Sync + Debug {
    fn compile<'a>(&'a self, input: &'a str, style: OutputStyle)
        -> BoxFuture<'a, CapResult<String>>;
}

/// Lossless, in-place image optimization.
pub trait Optimizer: Send + Sync + Debug {
    fn optimize<'a>(
        &'a self,
        bytes: &'a [u8],
        format: ImageFormat,
    ) -> BoxFuture<'a, CapResult<Vec<u8>>>;
}

pub trait Copier: Send + Sync + Debug {
    fn copy<'a>(&'a self, from: &'a Path, to: &'a Path) -> BoxFuture<'a, CapResult<()>>;
}

/// Returns findings; an empty list means the file is clean.
pub trait Linter: Send + Sync + Debug {
    fn lint<'a>(
        &'a self,
        path: &'a Path,
        source: &'a str,
        rules: &'a LintRules,
    ) -> BoxFuture<'a, CapResult<Vec<LintFinding>>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    Builtin,
    Command,
}

/// Engine selection keys shared by every capability-backed task kind.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineOptions {
    #[serde(default)]
    pub engine: Engine,
    #[serde(default)]
    pub command: Option<String>,
}

impl EngineOptions {
    fn command_filter(&self, cwd: &Path) -> CapResult<Option<CommandFilter>> {
        match self.engine {
            Engine::Builtin => Ok(None),
            Engine::Command => match self.command.as_deref().map(str::trim) {
                Some(cmd) if !cmd.is_empty() => Ok(Some(CommandFilter::new(cmd, cwd))),
                _ => Err(CapabilityError::Invalid(
                    "engine = \"command\" requires a non-empty `command`".to_string(),
                )),
            },
        }
    }

    pub fn minifier(&self, cwd: &Path) -> CapResult<Arc<dyn Minifier>> {
        Ok(match self.command_filter(cwd)? {
            Some(cmd) => Arc::new(cmd),
            None => Arc::new(BuiltinMinifier),
        })
    }

    pub fn compiler(&self, cwd: &Path) -> CapResult<Arc<dyn Compiler>> {
        Ok(match self.command_filter(cwd)? {
            Some(cmd) => Arc::new(cmd),
            None => Arc::new(StylesheetCompiler),
        })
    }

    pub fn optimizer(&self, cwd: &Path) -> CapResult<Arc<dyn Optimizer>> {
        Ok(match self.command_filter(cwd)? {
            Some(cmd) => Arc::new(cmd),
            None => Arc::new(MetadataStripper),
        })
    }

    pub fn copier(&self, cwd: &Path, fs: Arc<dyn FileSystem>) -> CapResult<Arc<dyn Copier>> {
        Ok(match self.command_filter(cwd)? {
            Some(cmd) => Arc::new(cmd),
            None => Arc::new(FsCopier::new(fs)),
        })
    }

    pub fn linter(&self, cwd: &Path) -> CapResult<Arc<dyn Linter>> {
        Ok(match self.command_filter(cwd)? {
            Some(cmd) => Arc::new(cmd),
            None => Arc::new(ScriptLinter),
        })
    }

    /// Check the selection without building anything.
    pub fn validate(&self) -> CapResult<()> {
        self.command_filter(&PathBuf::from(".")).map(|_| ())
    }
}
