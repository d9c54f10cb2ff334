// src/template/resolver.rs

use tracing::trace;

use crate::config::ConfigNode;
use crate::errors::TemplateError;
use crate::template::parser::{contains_placeholder, parse_segments, sole_placeholder, Segment};

/// Default bound on nested reference depth.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Expands placeholders against a borrowed configuration tree.
///
/// The resolver never mutates the tree; every call is a pure function of the
/// snapshot it was built with.
#[derive(Debug, Clone, Copy)]
pub struct TemplateResolver<'a> {
    root: &'a ConfigNode,
    max_depth: usize,
}

impl<'a> TemplateResolver<'a> {
    pub fn new(root: &'a ConfigNode) -> Self {
        Self {
            root,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// Fully expand a string. The result contains no placeholders.
    pub fn resolve_str(&self, input: &str) -> Result<String, TemplateError> {
        let mut stack = Vec::new();
        self.expand_str(input, &mut stack)
    }

    /// Expand every string inside `node`.
    ///
    /// A string that is exactly one placeholder is replaced by the referenced
    /// node itself, so it keeps its type; a sequence substituted inside a
    /// sequence is flattened into it.
    pub fn resolve_node(&self, node: &ConfigNode) -> Result<ConfigNode, TemplateError> {
        let mut stack = Vec::new();
        self.expand_node(node, &mut stack)
    }

    /// Resolve the value stored at `path`.
    pub fn resolve_path(&self, path: &str) -> Result<ConfigNode, TemplateError> {
        let mut stack = Vec::new();
        self.lookup(path, &mut stack)
    }

    fn expand_node(
        &self,
        node: &ConfigNode,
        stack: &mut Vec<String>,
    ) -> Result<ConfigNode, TemplateError> {
        match node {
            ConfigNode::String(s) => {
                if !contains_placeholder(s) {
                    return Ok(node.clone());
                }
                if let Some(path) = sole_placeholder(s)? {
                    return self.lookup(path, stack);
                }
                Ok(ConfigNode::String(self.expand_str(s, stack)?))
            }
            ConfigNode::Sequence(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    let spliced = match item {
                        ConfigNode::String(s) => sole_placeholder(s)?.is_some(),
                        _ => false,
                    };
                    match self.expand_node(item, stack)? {
                        ConfigNode::Sequence(inner) if spliced => out.extend(inner),
                        other => out.push(other),
                    }
                }
                Ok(ConfigNode::Sequence(out))
            }
            ConfigNode::Mapping(map) => {
                let mut out = std::collections::BTreeMap::new();
                for (k, v) in map {
                    out.insert(k.clone(), self.expand_node(v, stack)?);
                }
                Ok(ConfigNode::Mapping(out))
            }
            other => Ok(other.clone()),
        }
    }

    /// Expand `input`, then rescan the assembled text until no placeholder
    /// is left; substituted values may join into a new placeholder.
    fn expand_str(&self, input: &str, stack: &mut Vec<String>) -> Result<String, TemplateError> {
        let mut current = input.to_string();
        let mut passes = 0;
        while contains_placeholder(&current) {
            if passes >= self.max_depth {
                let mut chain = stack.clone();
                chain.push(current);
                return Err(TemplateError::Cyclic { chain });
            }
            current = self.expand_once(&current, stack)?;
            passes += 1;
        }
        Ok(current)
    }

    fn expand_once(&self, input: &str, stack: &mut Vec<String>) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(input.len());
        for segment in parse_segments(input)? {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(path) => match self.lookup(path, stack)? {
                    ConfigNode::Mapping(_) => {
                        return Err(TemplateError::Malformed(format!(
                            "'{path}' is a mapping and cannot be interpolated into {input:?}"
                        )));
                    }
                    value => out.push_str(&value.to_string()),
                },
            }
        }
        Ok(out)
    }

    fn lookup(&self, path: &str, stack: &mut Vec<String>) -> Result<ConfigNode, TemplateError> {
        if stack.iter().any(|p| p == path) || stack.len() >= self.max_depth {
            let mut chain = stack.clone();
            chain.push(path.to_string());
            return Err(TemplateError::Cyclic { chain });
        }

        let raw = self
            .root
            .get_path(path)
            .ok_or_else(|| TemplateError::Unresolved {
                path: path.to_string(),
            })?;

        trace!(path, depth = stack.len(), "resolving template reference");

        stack.push(path.to_string());
        let resolved = self.expand_node(raw, stack);
        stack.pop();
        resolved
    }
}
