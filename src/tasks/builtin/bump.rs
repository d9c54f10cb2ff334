// src/tasks/builtin/bump.rs

use std::fmt;

use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::info;

use crate::errors::{TaskError, TaskResult};
use crate::tasks::builtin::{read_text, write_text};
use crate::tasks::{TaskContext, TaskHandler, TaskKind, TaskTarget};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpPart {
    #[default]
    Patch,
    Minor,
    Major,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct BumpOptions {
    #[serde(default)]
    part: BumpPart,

    /// Manifest to rewrite; defaults to the one named in the config.
    #[serde(default)]
    manifest: Option<String>,
}

/// `major.minor.patch` with an optional pre-release suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Option<String>,
}

impl Version {
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim().trim_start_matches('v');
        let (core, pre) = match s.split_once('-') {
            Some((core, pre)) => (core, Some(pre.to_string())),
            None => (s, None),
        };
        let core = core.split('+').next().unwrap_or(core);
        let nums = core
            .split('.')
            .map(|n| n.parse::<u64>().map_err(|e| format!("invalid version '{s}': {e}")))
            .collect::<Result<Vec<_>, _>>()?;
        match nums.as_slice() {
            [major, minor, patch] => Ok(Self {
                major: *major,
                minor: *minor,
                patch: *patch,
                pre,
            }),
            _ => Err(format!("invalid version '{s}': expected major.minor.patch")),
        }
    }

    /// Next version, following `npm version`: a pre-release of the target
    /// version is promoted rather than skipped.
    pub fn bump(&self, part: BumpPart) -> Self {
        let promote = self.pre.is_some();
        let (major, minor, patch) = match part {
            BumpPart::Patch if promote => (self.major, self.minor, self.patch),
            BumpPart::Patch => (self.major, self.minor, self.patch + 1),
            BumpPart::Minor if promote && self.patch == 0 => (self.major, self.minor, 0),
            BumpPart::Minor => (self.major, self.minor + 1, 0),
            BumpPart::Major if promote && self.minor == 0 && self.patch == 0 => (self.major, 0, 0),
            BumpPart::Major => (self.major + 1, 0, 0),
        };
        Self {
            major,
            minor,
            patch,
            pre: None,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{pre}")?;
        }
        Ok(())
    }
}

/// Bumps `version` in the project manifest and writes it back with its key
/// order intact. The in-memory `pkg` seen by templates is not changed.
#[derive(Debug, Clone, Copy, Default)]
pub struct BumpHandler;

impl TaskHandler for BumpHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Bump
    }

    fn check(&self, target: &TaskTarget) -> TaskResult<()> {
        target.options_as::<BumpOptions>().map(|_| ())
    }

    fn run<'a>(&'a self, target: &'a TaskTarget, ctx: &'a TaskContext) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            let opts: BumpOptions = target.options_as()?;
            let path = match opts.manifest.as_deref() {
                Some(m) => ctx.path(m),
                None => ctx
                    .config()
                    .manifest_path()
                    .map(|p| p.to_path_buf())
                    .ok_or_else(|| {
                        TaskError::InvalidOptions(
                            "no manifest: set `manifest` in the config or the target".to_string(),
                        )
                    })?,
            };

            let text = read_text(ctx, &path)?;
            let mut manifest: serde_json::Value = serde_json::from_str(&text)
                .map_err(|e| TaskError::Failed(format!("{:?} is not valid JSON: {e}", path)))?;

            let current = manifest
                .get("version")
                .and_then(|v| v.as_str())
                .ok_or_else(|| TaskError::Failed(format!("{:?} has no string `version`", path)))?;
            let next = Version::parse(current)
                .map_err(TaskError::Failed)?
                .bump(opts.part);

            info!(task = %target.task_ref, from = %current, to = %next, "bumping version");
            manifest["version"] = serde_json::Value::String(next.to_string());

            let mut out = serde_json::to_string_pretty(&manifest)
                .map_err(|e| TaskError::Failed(e.to_string()))?;
            out.push('\n');
            write_text(ctx, &path, &out)
        })
    }
}
