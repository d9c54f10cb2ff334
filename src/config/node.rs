// src/config/node.rs

//! The generic configuration value tree.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;

/// A configuration value: a scalar, an ordered sequence or a string-keyed
/// mapping. String scalars may contain `<%= path %>` placeholders.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConfigNode {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<ConfigNode>),
    Mapping(BTreeMap<String, ConfigNode>),
}

impl ConfigNode {
    pub fn empty_mapping() -> Self {
        ConfigNode::Mapping(BTreeMap::new())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigNode::String(s) => Some(s),
            _ => None,
        }
    }

    /// Child lookup by key (mappings) or numeric index (sequences).
    pub fn child(&self, key: &str) -> Option<&ConfigNode> {
        match self {
            ConfigNode::Mapping(m) => m.get(key),
            ConfigNode::Sequence(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Look up a dotted path such as `project.buildAssets`.
    pub fn get_path(&self, path: &str) -> Option<&ConfigNode> {
        path.split('.')
            .try_fold(self, |node, segment| node.child(segment.trim()))
    }

    /// Deep-merge `overlay` into `self`: mappings merge key by key, anything
    /// else in `overlay` replaces the base value.
    pub fn merged_with(&self, overlay: &ConfigNode) -> ConfigNode {
        match (self, overlay) {
            (ConfigNode::Mapping(base), ConfigNode::Mapping(over)) => {
                let mut out = base.clone();
                for (k, v) in over {
                    let merged = match out.get(k) {
                        Some(existing) => existing.merged_with(v),
                        None => v.clone(),
                    };
                    out.insert(k.clone(), merged);
                }
                ConfigNode::Mapping(out)
            }
            (_, ConfigNode::Null) => self.clone(),
            _ => overlay.clone(),
        }
    }

    /// Deserialize this node into a typed struct via its JSON form.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(serde_json::Value::from(self))
    }
}

impl fmt::Display for ConfigNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigNode::Null => Ok(()),
            ConfigNode::Bool(b) => write!(f, "{b}"),
            ConfigNode::Integer(i) => write!(f, "{i}"),
            ConfigNode::Float(x) => write!(f, "{x}"),
            ConfigNode::String(s) => f.write_str(s),
            ConfigNode::Sequence(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            ConfigNode::Mapping(_) => f.write_str("[object]"),
        }
    }
}

impl From<&str> for ConfigNode {
    fn from(s: &str) -> Self {
        ConfigNode::String(s.to_string())
    }
}

impl From<String> for ConfigNode {
    fn from(s: String) -> Self {
        ConfigNode::String(s)
    }
}

impl From<toml::Value> for ConfigNode {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::String(s) => ConfigNode::String(s),
            toml::Value::Integer(i) => ConfigNode::Integer(i),
            toml::Value::Float(x) => ConfigNode::Float(x),
            toml::Value::Boolean(b) => ConfigNode::Bool(b),
            toml::Value::Datetime(d) => ConfigNode::String(d.to_string()),
            toml::Value::Array(items) => {
                ConfigNode::Sequence(items.into_iter().map(ConfigNode::from).collect())
            }
            toml::Value::Table(table) => ConfigNode::from(table),
        }
    }
}

impl From<toml::Table> for ConfigNode {
    fn from(table: toml::Table) -> Self {
        ConfigNode::Mapping(
            table
                .into_iter()
                .map(|(k, v)| (k, ConfigNode::from(v)))
                .collect(),
        )
    }
}

impl From<serde_json::Value> for ConfigNode {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ConfigNode::Null,
            serde_json::Value::Bool(b) => ConfigNode::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => ConfigNode::Integer(i),
                None => ConfigNode::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => ConfigNode::String(s),
            serde_json::Value::Array(items) => {
                ConfigNode::Sequence(items.into_iter().map(ConfigNode::from).collect())
            }
            serde_json::Value::Object(map) => ConfigNode::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, ConfigNode::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&ConfigNode> for serde_json::Value {
    fn from(node: &ConfigNode) -> Self {
        match node {
            ConfigNode::Null => serde_json::Value::Null,
            ConfigNode::Bool(b) => serde_json::Value::Bool(*b),
            ConfigNode::Integer(i) => serde_json::Value::from(*i),
            ConfigNode::Float(x) => serde_json::Number::from_f64(*x)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ConfigNode::String(s) => serde_json::Value::String(s.clone()),
            ConfigNode::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            ConfigNode::Mapping(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(src: &str) -> ConfigNode {
        ConfigNode::from(toml::from_str::<toml::Table>(src).unwrap())
    }

    #[test]
    fn get_path_walks_mappings_and_indices() {
        let root = node(
            r#"
            [project]
            css = ["a.sass", "b.sass"]
            [project.dirs]
            build = "build"
            "#,
        );
        assert_eq!(
            root.get_path("project.dirs.build"),
            Some(&ConfigNode::from("build"))
        );
        assert_eq!(root.get_path("project.css.1"), Some(&ConfigNode::from("b.sass")));
        assert_eq!(root.get_path("project.missing"), None);
    }

    #[test]
    fn merge_prefers_overlay_and_recurses() {
        let base = node("style = \"expanded\"\n[nested]\na = 1\nb = 2\n");
        let over = node("style = \"compressed\"\n[nested]\nb = 3\n");
        let merged = base.merged_with(&over);
        assert_eq!(merged.get_path("style"), Some(&ConfigNode::from("compressed")));
        assert_eq!(merged.get_path("nested.a"), Some(&ConfigNode::Integer(1)));
        assert_eq!(merged.get_path("nested.b"), Some(&ConfigNode::Integer(3)));
    }

    #[test]
    fn display_joins_sequences_with_commas() {
        let seq = ConfigNode::Sequence(vec!["a".into(), ConfigNode::Integer(2)]);
        assert_eq!(seq.to_string(), "a,2");
        assert_eq!(ConfigNode::Null.to_string(), "");
    }
}
