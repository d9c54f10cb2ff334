// src/files/expander.rs

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::{GlobBuilder, GlobMatcher};
use tracing::{debug, warn};

use crate::errors::ExpandError;
use crate::files::FileMapping;
use crate::fs::path_utils::{join_slash, relative_str};
use crate::fs::FileSystem;
use crate::types::{EmptyMatchPolicy, ExtDot};

/// One concrete source file and where it goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePair {
    pub src: PathBuf,
    /// `None` when the mapping declares no `dest` (lint, clean, optimize).
    pub dest: Option<PathBuf>,
}

/// All sources that feed one destination, in match order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestGroup {
    pub dest: Option<PathBuf>,
    pub sources: Vec<PathBuf>,
}

/// Turns [`FileMapping`] declarations into concrete (src, dest) pairs.
///
/// Evaluated at execution time, so files produced by earlier tasks in the
/// same queue are visible.
#[derive(Debug, Clone)]
pub struct FileExpander {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    policy: EmptyMatchPolicy,
}

impl FileExpander {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>, policy: EmptyMatchPolicy) -> Self {
        Self {
            fs,
            root: root.into(),
            policy,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Expand every mapping, concatenating their pairs.
    pub fn expand_all(&self, mappings: &[FileMapping]) -> Result<Vec<FilePair>, ExpandError> {
        let mut pairs = Vec::new();
        for mapping in mappings {
            pairs.extend(self.expand(mapping)?);
        }
        Ok(pairs)
    }

    pub fn expand(&self, mapping: &FileMapping) -> Result<Vec<FilePair>, ExpandError> {
        let base = self.base_dir(mapping);
        let matched = self.match_patterns(&base, &mapping.src, mapping.nonull)?;

        if matched.is_empty() {
            match self.policy {
                EmptyMatchPolicy::Error => {
                    return Err(ExpandError::NoMatches {
                        patterns: mapping.src.clone(),
                        cwd: base,
                    });
                }
                EmptyMatchPolicy::Warn => {
                    warn!(patterns = ?mapping.src, cwd = ?base, "file mapping matched no files");
                }
                EmptyMatchPolicy::Ignore => {}
            }
            return Ok(Vec::new());
        }

        let pairs = if mapping.expand {
            let dest_dir = mapping
                .dest
                .as_deref()
                .ok_or_else(|| ExpandError::MissingDest(mapping.src.clone()))?;
            let dest_dir = join_slash(&self.root, dest_dir);

            matched
                .into_iter()
                .map(|rel| {
                    let name = if mapping.flatten {
                        rel.rsplit('/').next().unwrap_or(&rel).to_string()
                    } else {
                        rel.clone()
                    };
                    let name = match &mapping.ext {
                        Some(ext) => replace_ext(&name, ext, mapping.ext_dot),
                        None => name,
                    };
                    FilePair {
                        src: join_slash(&base, &rel),
                        dest: Some(join_slash(&dest_dir, &name)),
                    }
                })
                .collect()
        } else {
            let dest = mapping.dest.as_deref().map(|d| join_slash(&self.root, d));
            matched
                .into_iter()
                .map(|rel| FilePair {
                    src: join_slash(&base, &rel),
                    dest: dest.clone(),
                })
                .collect()
        };

        debug!(patterns = ?mapping.src, pairs = ?pairs, "expanded file mapping");
        Ok(pairs)
    }

    /// Source paths only, for handlers that work in place.
    pub fn sources(&self, mappings: &[FileMapping]) -> Result<Vec<PathBuf>, ExpandError> {
        Ok(self
            .expand_all(mappings)?
            .into_iter()
            .map(|p| p.src)
            .collect())
    }

    fn base_dir(&self, mapping: &FileMapping) -> PathBuf {
        match mapping.cwd.as_deref() {
            Some(cwd) => join_slash(&self.root, cwd),
            None => self.root.clone(),
        }
    }

    /// Apply every pattern in order; results are relative to `base`.
    fn match_patterns(
        &self,
        base: &Path,
        patterns: &[String],
        nonull: bool,
    ) -> Result<Vec<String>, ExpandError> {
        let mut out: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for raw in patterns {
            if let Some(exclude) = raw.strip_prefix('!') {
                let matcher = compile(normalize(exclude))?;
                out.retain(|rel| !matcher.is_match(rel));
                seen.retain(|rel| !matcher.is_match(rel));
                continue;
            }

            let pattern = normalize(raw);
            let mut found = if has_glob_meta(pattern) {
                self.walk_matches(base, pattern)?
            } else {
                let path = join_slash(base, pattern);
                if self.fs.is_file(&path) {
                    vec![pattern.to_string()]
                } else {
                    Vec::new()
                }
            };

            if found.is_empty() && nonull && !has_glob_meta(pattern) {
                found.push(pattern.to_string());
            }

            found.sort();
            for rel in found {
                if seen.insert(rel.clone()) {
                    out.push(rel);
                }
            }
        }

        Ok(out)
    }

    fn walk_matches(&self, base: &Path, pattern: &str) -> Result<Vec<String>, ExpandError> {
        let matcher = compile(pattern)?;
        let start = join_slash(base, &literal_prefix(pattern));

        let mut found = Vec::new();
        if !self.fs.is_dir(&start) {
            return Ok(found);
        }

        // Directories are tracked by canonical path so symlink loops end.
        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut stack = vec![start];
        while let Some(dir) = stack.pop() {
            let canonical = self.fs.canonicalize(&dir).unwrap_or_else(|_| dir.clone());
            if !visited.insert(canonical) {
                continue;
            }
            for entry in self.fs.read_dir(&dir)? {
                if self.fs.is_dir(&entry) {
                    stack.push(entry);
                } else if self.fs.is_file(&entry) {
                    if let Some(rel) = relative_str(base, &entry) {
                        if matcher.is_match(&rel) {
                            found.push(rel);
                        }
                    }
                }
            }
        }
        Ok(found)
    }
}

/// Group pairs by destination, keeping the first-seen order of both the
/// destinations and their sources.
pub fn group_by_dest(pairs: &[FilePair]) -> Vec<DestGroup> {
    let mut groups: Vec<DestGroup> = Vec::new();
    for pair in pairs {
        match groups.iter_mut().find(|g| g.dest == pair.dest) {
            Some(group) => group.sources.push(pair.src.clone()),
            None => groups.push(DestGroup {
                dest: pair.dest.clone(),
                sources: vec![pair.src.clone()],
            }),
        }
    }
    groups
}

/// Replace the extension of the final path segment of `rel`.
pub fn replace_ext(rel: &str, ext: &str, ext_dot: ExtDot) -> String {
    let (dir, name) = match rel.rfind('/') {
        Some(i) => rel.split_at(i + 1),
        None => ("", rel),
    };
    let dot = match ext_dot {
        ExtDot::First => name.find('.'),
        ExtDot::Last => name.rfind('.'),
    };
    let stem = match dot {
        Some(i) => &name[..i],
        None => name,
    };
    format!("{dir}{stem}{ext}")
}

pub fn has_glob_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Leading directory components that contain no glob syntax.
fn literal_prefix(pattern: &str) -> String {
    let mut parts: Vec<&str> = pattern.split('/').collect();
    // The last component is a file pattern, never a directory to start from.
    parts.pop();
    parts
        .into_iter()
        .take_while(|part| !has_glob_meta(part))
        .collect::<Vec<_>>()
        .join("/")
}

fn normalize(pattern: &str) -> &str {
    pattern.trim().trim_start_matches("./")
}

fn compile(pattern: &str) -> Result<GlobMatcher, ExpandError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| ExpandError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_ext_respects_ext_dot() {
        assert_eq!(replace_ext("css/style.min.css", ".x.css", ExtDot::First), "css/style.x.css");
        assert_eq!(replace_ext("css/style.min.css", ".gz", ExtDot::Last), "css/style.min.gz");
        assert_eq!(replace_ext("LICENSE", ".txt", ExtDot::First), "LICENSE.txt");
    }

    #[test]
    fn literal_prefix_stops_at_first_glob() {
        assert_eq!(literal_prefix("build/assets/css/*.css"), "build/assets/css");
        assert_eq!(literal_prefix("src/**/*.js"), "src");
        assert_eq!(literal_prefix("*.html"), "");
    }

    #[test]
    fn group_by_dest_preserves_first_seen_order() {
        let pair = |s: &str, d: &str| FilePair {
            src: PathBuf::from(s),
            dest: Some(PathBuf::from(d)),
        };
        let groups = group_by_dest(&[pair("b.js", "out.js"), pair("x.css", "out.css"), pair("a.js", "out.js")]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].dest, Some(PathBuf::from("out.js")));
        assert_eq!(groups[0].sources, vec![PathBuf::from("b.js"), PathBuf::from("a.js")]);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_loops_are_walked_once() {
        use crate::fs::RealFileSystem;

        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/js")).unwrap();
        std::fs::write(dir.path().join("src/js/app.js"), "x").unwrap();
        std::os::unix::fs::symlink(dir.path().join("src"), dir.path().join("src/js/back")).unwrap();

        let ex = FileExpander::new(Arc::new(RealFileSystem), dir.path(), EmptyMatchPolicy::Warn);
        let pairs = ex.expand(&FileMapping::from_patterns(["src/**/*.js"])).unwrap();

        assert!(pairs.iter().any(|p| p.src == dir.path().join("src/js/app.js")));
    }
}
