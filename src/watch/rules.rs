// src/watch/rules.rs

use std::fmt;
use std::time::Duration;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::tasks::TaskQueue;

/// One watch target: the patterns it listens to and the queue it re-runs.
///
/// Patterns are relative to the project root; a leading `!` excludes.
#[derive(Clone)]
pub struct WatchRule {
    name: String,
    patterns: Vec<String>,
    include: GlobSet,
    exclude: Option<GlobSet>,
    queue: TaskQueue,
    debounce: Duration,
    livereload: Option<u16>,
}

impl fmt::Debug for WatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRule")
            .field("name", &self.name)
            .field("patterns", &self.patterns)
            .field("queue", &self.queue.name)
            .field("debounce", &self.debounce)
            .finish_non_exhaustive()
    }
}

impl WatchRule {
    pub fn new(
        name: impl Into<String>,
        patterns: Vec<String>,
        queue: TaskQueue,
        debounce: Duration,
    ) -> Result<Self, globset::Error> {
        let (excludes, includes): (Vec<&String>, Vec<&String>) =
            patterns.iter().partition(|p| p.starts_with('!'));

        let include = build_globset(includes.iter().map(|p| p.as_str()))?;
        let exclude = if excludes.is_empty() {
            None
        } else {
            Some(build_globset(excludes.iter().map(|p| &p[1..]))?)
        };

        Ok(Self {
            name: name.into(),
            patterns,
            include,
            exclude,
            queue,
            debounce,
            livereload: None,
        })
    }

    /// Publish a reload on this port after each successful run.
    pub fn with_livereload(mut self, port: Option<u16>) -> Self {
        self.livereload = port;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn livereload(&self) -> Option<u16> {
        self.livereload
    }

    /// Whether a root-relative, slash-separated path concerns this rule.
    pub fn matches(&self, rel_path: &str) -> bool {
        let rel_path = rel_path.trim_start_matches("./");
        if !self.include.is_match(rel_path) {
            return false;
        }
        match &self.exclude {
            Some(exclude) => !exclude.is_match(rel_path),
            None => true,
        }
    }
}

fn build_globset<'a>(patterns: impl Iterator<Item = &'a str>) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let pat = pat.trim_start_matches("./");
        builder.add(GlobBuilder::new(pat).literal_separator(true).build()?);
    }
    builder.build()
}
