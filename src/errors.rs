// src/errors.rs

//! Crate-wide error taxonomy.
//!
//! - [`PipelineError`] is what loading a config or running a queue returns.
//! - [`TemplateError`] comes out of placeholder expansion.
//! - [`TaskError`] is what a single task target reports when it fails.
//! - [`ExpandError`] and [`CapabilityError`] are the leaf errors of the file
//!   expander and the capability engines.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::tasks::TaskRef;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unknown queue: {0}")]
    UnknownQueue(String),

    #[error("Task '{task}' failed: {cause}")]
    TaskFailed { task: TaskRef, cause: TaskError },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("cyclic template reference: {}", chain.join(" -> "))]
    Cyclic { chain: Vec<String> },

    #[error("unresolved template reference '{path}'")]
    Unresolved { path: String },

    #[error("malformed template: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum ExpandError {
    #[error("no files matched {patterns:?} under {cwd:?}")]
    NoMatches { patterns: Vec<String>, cwd: PathBuf },

    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("file mapping with src {0:?} has no dest")]
    MissingDest(Vec<String>),

    #[error(transparent)]
    Fs(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("command `{command}` exited with code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("{0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("{0}")]
    Failed(String),

    #[error("source file not found: {0:?}")]
    MissingSource(PathBuf),

    #[error("{count} lint problem(s):\n{report}")]
    Lint { count: usize, report: String },

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error(transparent)]
    Expand(#[from] ExpandError),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
pub type TaskResult<T = ()> = std::result::Result<T, TaskError>;
