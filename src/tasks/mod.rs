// src/tasks/mod.rs

//! Task model: kinds, references, queues and resolved targets.
//!
//! - [`registry`] builds every [`TaskTarget`] once at load time.
//! - [`handler`] maps each [`TaskKind`] to the code that runs it.
//! - [`runner`] executes a [`TaskQueue`] strictly in order.
//! - [`pipeline`] bundles everything a handler can reach at run time.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::ConfigNode;
use crate::errors::{TaskError, TaskResult};
use crate::files::FileMapping;

pub mod builtin;
pub mod handler;
pub mod pipeline;
pub mod registry;
pub mod runner;

pub use handler::{HandlerSet, TaskContext, TaskHandler};
pub use pipeline::Pipeline;
pub use registry::{RegisteredTask, TaskRegistry};
pub use runner::{QueueExecutor, RunResult, TaskRunner};

/// Name of the synthetic target of a task that declares no targets.
pub const DEFAULT_TARGET: &str = "default";

/// The closed set of task kinds a config may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    Clean,
    Lint,
    Concat,
    Minify,
    Compile,
    Optimize,
    StripLines,
    Copy,
    Shell,
    Bump,
    Serve,
    Open,
    Watch,
}

impl TaskKind {
    pub const ALL: [TaskKind; 13] = [
        TaskKind::Clean,
        TaskKind::Lint,
        TaskKind::Concat,
        TaskKind::Minify,
        TaskKind::Compile,
        TaskKind::Optimize,
        TaskKind::StripLines,
        TaskKind::Copy,
        TaskKind::Shell,
        TaskKind::Bump,
        TaskKind::Serve,
        TaskKind::Open,
        TaskKind::Watch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Clean => "clean",
            TaskKind::Lint => "lint",
            TaskKind::Concat => "concat",
            TaskKind::Minify => "minify",
            TaskKind::Compile => "compile",
            TaskKind::Optimize => "optimize",
            TaskKind::StripLines => "strip-lines",
            TaskKind::Copy => "copy",
            TaskKind::Shell => "shell",
            TaskKind::Bump => "bump",
            TaskKind::Serve => "serve",
            TaskKind::Open => "open",
            TaskKind::Watch => "watch",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one task target: `task:target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskRef {
    pub task: String,
    pub target: String,
}

impl TaskRef {
    pub fn new(task: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            target: target.into(),
        }
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.task, self.target)
    }
}

/// One queue entry: a whole task (`"cssmin"`) or one of its targets
/// (`"sass:dev"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub task: String,
    pub target: Option<String>,
}

impl TaskSpec {
    pub fn all(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            target: None,
        }
    }

    pub fn one(task: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            target: Some(target.into()),
        }
    }
}

impl FromStr for TaskSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (task, target) = match s.split_once(':') {
            Some((task, target)) => (task.trim(), Some(target.trim())),
            None => (s, None),
        };

        if task.is_empty() {
            return Err(format!("invalid task spec '{s}': empty task name"));
        }
        match target {
            Some("") => Err(format!("invalid task spec '{s}': empty target name")),
            Some(t) if t.contains(':') => {
                Err(format!("invalid task spec '{s}': too many ':' separators"))
            }
            Some(t) => Ok(TaskSpec::one(task, t)),
            None => Ok(TaskSpec::all(task)),
        }
    }
}

impl fmt::Display for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(target) => write!(f, "{}:{}", self.task, target),
            None => f.write_str(&self.task),
        }
    }
}

/// Ordered list of task specs, with queue aliases already flattened.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskQueue {
    pub name: String,
    pub entries: Vec<TaskSpec>,
}

impl TaskQueue {
    pub fn new(name: impl Into<String>, entries: Vec<TaskSpec>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    /// Queue made of a single spec, used when the command line names a task
    /// rather than a queue.
    pub fn single(spec: TaskSpec) -> Self {
        Self {
            name: spec.to_string(),
            entries: vec![spec],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One fully resolved target of a task.
///
/// `options` holds the task's options, overlaid by the target's own keys
/// (other than `files`, `options` and the compact file-mapping keys) and
/// finally by the target's `options` table.
#[derive(Debug, Clone)]
pub struct TaskTarget {
    pub task_ref: TaskRef,
    pub kind: TaskKind,
    pub options: ConfigNode,
    pub data: ConfigNode,
    pub files: Vec<FileMapping>,
}

impl TaskTarget {
    /// Deserialize the merged options into a handler's typed option struct.
    pub fn options_as<T: DeserializeOwned>(&self) -> TaskResult<T> {
        self.options
            .deserialize::<T>()
            .map_err(|e| TaskError::InvalidOptions(format!("{}: {e}", self.task_ref)))
    }

    /// Raw option value by key.
    pub fn option(&self, key: &str) -> Option<&ConfigNode> {
        self.options.child(key)
    }
}
