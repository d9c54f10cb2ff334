#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use assetpipe::config::{ConfigFile, RawConfigFile};
use assetpipe::errors::Result;
use assetpipe::tasks::{Pipeline, RunResult, TaskRunner};
use tempfile::TempDir;

/// Builder for `ConfigFile` from an inline TOML document.
pub struct ConfigBuilder {
    raw: RawConfigFile,
}

impl ConfigBuilder {
    pub fn from_toml(src: &str) -> Self {
        let raw: RawConfigFile = toml::from_str(src).expect("test config must be valid TOML");
        Self { raw }.root(".")
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.raw.root = root.into();
        self
    }

    /// Manifest contents exposed to templates as `pkg`.
    pub fn pkg(mut self, value: serde_json::Value) -> Self {
        self.raw.pkg = Some(value);
        self
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.raw)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

/// A throwaway project directory on the real filesystem.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp project dir"),
        }
    }

    /// Copy every file below `src` into the project.
    pub fn from_dir(src: &Path) -> Self {
        let project = Self::new();
        copy_tree(src, project.root());
        project
    }

    pub fn file(self, rel: &str, contents: impl AsRef<[u8]>) -> Self {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&path, contents).expect("write project file");
        self
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path(rel))
            .unwrap_or_else(|e| panic!("reading {rel}: {e}"))
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    /// Load `Assetpipe.toml` from the project root.
    pub fn config(&self) -> Result<ConfigFile> {
        assetpipe::config::load_and_validate(self.path("Assetpipe.toml"))
    }

    pub fn pipeline(&self) -> Arc<Pipeline> {
        let config = self.config().expect("project config must load");
        Pipeline::new(config).expect("project handlers must accept config")
    }

    /// Run a queue (or `task[:target]`) with the built-in handlers.
    pub async fn run(&self, queue: &str) -> RunResult {
        let pipeline = self.pipeline();
        let queue = pipeline.resolve_queue(queue).expect("queue must resolve");
        TaskRunner::new(pipeline).run(&queue).await
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}

fn copy_tree(src: &Path, dest: &Path) {
    for entry in std::fs::read_dir(src).expect("read source dir") {
        let entry = entry.expect("dir entry");
        let target = dest.join(entry.file_name());
        if entry.path().is_dir() {
            std::fs::create_dir_all(&target).expect("create dir");
            copy_tree(&entry.path(), &target);
        } else {
            std::fs::copy(entry.path(), &target).expect("copy file");
        }
    }
}
