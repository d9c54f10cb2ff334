// src/config/store.rs

use std::collections::BTreeMap;

use crate::config::ConfigNode;
use crate::errors::TemplateError;
use crate::template::TemplateResolver;

/// Immutable snapshot of every value templates may reference.
///
/// The root mapping holds the `[vars]` entries at the top level, the manifest
/// under `pkg`, and each task's raw table under the task's name (so a
/// template can reference `serve.options.port`).
#[derive(Debug, Clone)]
pub struct ConfigStore {
    root: ConfigNode,
    max_depth: usize,
}

impl ConfigStore {
    pub fn new(root: ConfigNode, max_depth: usize) -> Self {
        Self { root, max_depth }
    }

    /// Assemble the root mapping from its three sources.
    ///
    /// Returns the conflicting key if a var shadows `pkg` or a task name.
    pub fn assemble(
        vars: BTreeMap<String, ConfigNode>,
        pkg: Option<ConfigNode>,
        tasks: BTreeMap<String, ConfigNode>,
        max_depth: usize,
    ) -> Result<Self, String> {
        let mut root = vars;

        if let Some(pkg) = pkg {
            if root.insert("pkg".to_string(), pkg).is_some() {
                return Err("`pkg` is reserved for the manifest and cannot be a var".to_string());
            }
        }

        for (name, node) in tasks {
            if root.contains_key(&name) {
                return Err(format!("task '{name}' has the same name as a var"));
            }
            root.insert(name, node);
        }

        Ok(Self::new(ConfigNode::Mapping(root), max_depth))
    }

    pub fn root(&self) -> &ConfigNode {
        &self.root
    }

    /// Raw (unresolved) value at a dotted path.
    pub fn get(&self, path: &str) -> Option<&ConfigNode> {
        self.root.get_path(path)
    }

    pub fn resolver(&self) -> TemplateResolver<'_> {
        TemplateResolver::new(&self.root).with_max_depth(self.max_depth)
    }

    pub fn resolve_str(&self, input: &str) -> Result<String, TemplateError> {
        self.resolver().resolve_str(input)
    }

    pub fn resolve_node(&self, node: &ConfigNode) -> Result<ConfigNode, TemplateError> {
        self.resolver().resolve_node(node)
    }

    pub fn resolve_path(&self, path: &str) -> Result<ConfigNode, TemplateError> {
        self.resolver().resolve_path(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_rejects_shadowed_names() {
        let mut vars = BTreeMap::new();
        vars.insert("copy".to_string(), ConfigNode::from("x"));
        let mut tasks = BTreeMap::new();
        tasks.insert("copy".to_string(), ConfigNode::empty_mapping());

        let err = ConfigStore::assemble(vars, None, tasks, 8).unwrap_err();
        assert!(err.contains("copy"));
    }

    #[test]
    fn pkg_is_visible_to_templates() {
        let pkg = ConfigNode::from(serde_json::json!({ "name": "demo", "version": "1.2.3" }));
        let store = ConfigStore::assemble(BTreeMap::new(), Some(pkg), BTreeMap::new(), 8).unwrap();
        assert_eq!(
            store.resolve_str("<%= pkg.name %>@<%= pkg.version %>").unwrap(),
            "demo@1.2.3"
        );
    }
}
