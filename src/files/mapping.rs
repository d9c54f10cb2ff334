// src/files/mapping.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

use crate::config::ConfigNode;
use crate::types::ExtDot;

/// Keys of a target table that make up a compact file mapping.
const COMPACT_KEYS: &[&str] = &[
    "cwd", "src", "dest", "ext", "ext_dot", "extDot", "flatten", "expand", "nonull",
];

/// A glob-style `src` -> `dest` declaration, resolved lazily by the
/// [`FileExpander`](crate::files::FileExpander).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct FileMapping {
    /// Directory the `src` patterns are relative to (default: project root).
    #[serde(default)]
    pub cwd: Option<String>,

    /// Patterns; a leading `!` excludes previously matched paths.
    #[serde(default, deserialize_with = "one_or_many")]
    pub src: Vec<String>,

    /// Destination file (`expand = false`) or directory (`expand = true`).
    #[serde(default)]
    pub dest: Option<String>,

    /// Replacement extension, including the leading dot (e.g. `.min.css`).
    #[serde(default)]
    pub ext: Option<String>,

    #[serde(default, alias = "extDot")]
    pub ext_dot: ExtDot,

    /// Keep only the file name of each match under `dest`.
    #[serde(default)]
    pub flatten: bool,

    /// Map each match to its own destination under `dest`.
    #[serde(default)]
    pub expand: bool,

    /// Keep unmatched literal patterns as sources so the task reports them.
    #[serde(default)]
    pub nonull: bool,
}

impl FileMapping {
    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            src: patterns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn expanded(mut self) -> Self {
        self.expand = true;
        self
    }

    pub fn flattened(mut self) -> Self {
        self.flatten = true;
        self
    }

    pub fn with_ext(mut self, ext: impl Into<String>) -> Self {
        self.ext = Some(ext.into());
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

pub(crate) fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

/// Extract the file mappings declared by a resolved target node.
///
/// Accepted shapes:
/// - a bare sequence of patterns (`build = ["build"]`),
/// - `files = [...]` whose entries are mappings or plain patterns (plain
///   patterns are gathered into one mapping),
/// - compact keys (`src`, `dest`, `cwd`, ...) directly on the target.
pub fn mappings_from_target(data: &ConfigNode) -> Result<Vec<FileMapping>, String> {
    match data {
        ConfigNode::Sequence(items) => Ok(vec![FileMapping::from_patterns(patterns_of(items)?)]),
        ConfigNode::Mapping(map) => {
            let mut mappings = Vec::new();

            if let Some(files) = map.get("files") {
                mappings.extend(mappings_from_files(files)?);
            }

            if map.contains_key("src") {
                let compact: BTreeMap<String, ConfigNode> = map
                    .iter()
                    .filter(|(k, _)| COMPACT_KEYS.contains(&k.as_str()))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                let mapping = ConfigNode::Mapping(compact)
                    .deserialize::<FileMapping>()
                    .map_err(|e| format!("invalid file mapping: {e}"))?;
                mappings.push(mapping);
            }

            Ok(mappings)
        }
        ConfigNode::Null => Ok(Vec::new()),
        other => Err(format!("target must be a table or an array, got {other:?}")),
    }
}

fn mappings_from_files(files: &ConfigNode) -> Result<Vec<FileMapping>, String> {
    let items = match files {
        ConfigNode::Sequence(items) => items.as_slice(),
        ConfigNode::String(_) => std::slice::from_ref(files),
        other => return Err(format!("`files` must be an array, got {other:?}")),
    };

    let mut patterns = Vec::new();
    let mut mappings = Vec::new();
    for item in items {
        match item {
            ConfigNode::String(s) => patterns.push(s.clone()),
            ConfigNode::Mapping(_) => mappings.push(
                item.deserialize::<FileMapping>()
                    .map_err(|e| format!("invalid entry in `files`: {e}"))?,
            ),
            other => return Err(format!("invalid entry in `files`: {other:?}")),
        }
    }

    if !patterns.is_empty() {
        mappings.insert(0, FileMapping::from_patterns(patterns));
    }
    Ok(mappings)
}

fn patterns_of(items: &[ConfigNode]) -> Result<Vec<String>, String> {
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| format!("expected a path pattern, got {item:?}"))
        })
        .collect()
}
