// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::config::store::ConfigStore;
use crate::tasks::{TaskKind, TaskQueue, TaskRegistry};
use crate::types::EmptyMatchPolicy;

/// Top-level configuration as read from `Assetpipe.toml`.
///
/// ```toml
/// manifest = "package.json"
///
/// [config]
/// default_queue = "build"
/// debounce = "250ms"
///
/// [vars.project]
/// src = "src"
/// build = "build"
/// buildAssets = "<%= project.build %>/assets"
///
/// [task.uglify]
/// kind = "minify"
/// [task.uglify.targets.build]
/// src = ["<%= project.src %>/js/*.js"]
/// dest = "<%= project.buildAssets %>/js/script.min.js"
///
/// [queue]
/// build = ["uglify:build"]
/// ```
///
/// This is the unvalidated form; [`ConfigFile`] is built from it via
/// `TryFrom`, which resolves templates and checks queues.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Path of the project manifest (relative to the config file).
    #[serde(default)]
    pub manifest: Option<String>,

    /// Global behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Free-form project variables from `[vars]`, visible to templates at the
    /// top level (`<%= project.src %>`).
    #[serde(default)]
    pub vars: toml::Table,

    /// All tasks from `[task.<name>]`.
    #[serde(default)]
    pub task: BTreeMap<String, RawTask>,

    /// Named task queues from `[queue]`.
    #[serde(default)]
    pub queue: BTreeMap<String, Vec<String>>,

    /// Parsed manifest contents, filled in by the loader (exposed as `pkg`).
    #[serde(skip)]
    pub pkg: Option<serde_json::Value>,

    /// Project root all relative paths are evaluated against; filled in by
    /// the loader.
    #[serde(skip)]
    pub root: PathBuf,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Queue run when no queue is named on the command line.
    #[serde(default = "default_queue_name")]
    pub default_queue: String,

    /// Debounce window for watch rules, e.g. `"250ms"`.
    #[serde(default = "default_debounce")]
    pub debounce: String,

    /// Optional upper bound for a single task target, e.g. `"5m"`.
    #[serde(default)]
    pub task_timeout: Option<String>,

    /// Behaviour when a file mapping matches nothing.
    #[serde(default)]
    pub empty_match: EmptyMatchPolicy,

    /// Bound on nested template references.
    #[serde(default = "default_template_max_depth")]
    pub template_max_depth: usize,

    /// Ignore watch events for files whose content hash did not change.
    #[serde(default = "default_skip_unchanged")]
    pub skip_unchanged: bool,
}

fn default_queue_name() -> String {
    "default".to_string()
}

fn default_debounce() -> String {
    "250ms".to_string()
}

fn default_template_max_depth() -> usize {
    crate::template::DEFAULT_MAX_DEPTH
}

fn default_skip_unchanged() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            default_queue: default_queue_name(),
            debounce: default_debounce(),
            task_timeout: None,
            empty_match: EmptyMatchPolicy::default(),
            template_max_depth: default_template_max_depth(),
            skip_unchanged: default_skip_unchanged(),
        }
    }
}

/// `[task.<name>]` section.
///
/// ```toml
/// [task.sass]
/// kind = "compile"
/// options = { banner = "<%= tag.banner %>" }
///
/// [task.sass.targets.dist]
/// options = { style = "compressed" }
/// files = [{ src = ["<%= project.css %>"], dest = "build/css/style.min.css" }]
/// ```
///
/// A target may also be a bare array, which is shorthand for `{ src = [...] }`.
///
/// A task without `targets` is configured directly in its own table:
///
/// ```toml
/// [task.jshint]
/// kind = "lint"
/// files = ["<%= project.js %>"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawTask {
    pub kind: TaskKind,

    /// Options shared by every target; target options win on conflict.
    #[serde(default)]
    pub options: toml::Table,

    #[serde(default)]
    pub targets: BTreeMap<String, toml::Value>,

    /// Remaining keys; the data of the implicit `default` target when no
    /// `targets` are declared.
    #[serde(flatten)]
    pub data: toml::Table,
}

/// Validated `[config]` values.
#[derive(Debug, Clone)]
pub struct Settings {
    pub default_queue: String,
    pub debounce: Duration,
    pub task_timeout: Option<Duration>,
    pub empty_match: EmptyMatchPolicy,
    pub template_max_depth: usize,
    pub skip_unchanged: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_queue: default_queue_name(),
            debounce: Duration::from_millis(250),
            task_timeout: None,
            empty_match: EmptyMatchPolicy::default(),
            template_max_depth: default_template_max_depth(),
            skip_unchanged: default_skip_unchanged(),
        }
    }
}

/// Validated configuration.
///
/// Construct this via `ConfigFile::try_from(raw_config)` or the loader; the
/// constructor is private so every instance has passed validation.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    root: PathBuf,
    manifest: Option<PathBuf>,
    settings: Settings,
    store: Arc<ConfigStore>,
    registry: TaskRegistry,
    queues: BTreeMap<String, TaskQueue>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        root: PathBuf,
        manifest: Option<PathBuf>,
        settings: Settings,
        store: Arc<ConfigStore>,
        registry: TaskRegistry,
        queues: BTreeMap<String, TaskQueue>,
    ) -> Self {
        Self {
            root,
            manifest,
            settings,
            store,
            registry,
            queues,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute or root-relative path of the manifest, if one is declared.
    pub fn manifest_path(&self) -> Option<&Path> {
        self.manifest.as_deref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn queues(&self) -> &BTreeMap<String, TaskQueue> {
        &self.queues
    }

    /// Look up a queue by name, with aliases already flattened.
    pub fn queue(&self, name: &str) -> Option<&TaskQueue> {
        self.queues.get(name)
    }
}
