// src/config/validate.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile, RawTask, Settings};
use crate::config::{ConfigNode, ConfigStore};
use crate::errors::{PipelineError, Result};
use crate::tasks::{TaskQueue, TaskRegistry, TaskSpec};
use crate::types::parse_duration;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PipelineError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_tasks(&raw)?;
        ensure_distinct_names(&raw)?;

        let settings = validate_settings(&raw)?;
        let store = Arc::new(build_store(&raw, &settings)?);
        let registry = TaskRegistry::build(&raw.task, &store)?;
        let queues = build_queues(&raw, &registry)?;

        let manifest = raw
            .manifest
            .as_deref()
            .map(|m| crate::fs::path_utils::join_slash(&raw.root, m));

        Ok(ConfigFile::new_unchecked(
            raw.root, manifest, settings, store, registry, queues,
        ))
    }
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(PipelineError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn ensure_distinct_names(cfg: &RawConfigFile) -> Result<()> {
    if let Some(name) = cfg.queue.keys().find(|q| cfg.task.contains_key(*q)) {
        return Err(PipelineError::ConfigError(format!(
            "'{name}' is declared both as a task and as a queue"
        )));
    }
    Ok(())
}

fn validate_settings(cfg: &RawConfigFile) -> Result<Settings> {
    let section = &cfg.config;

    let debounce = parse_duration(&section.debounce)
        .map_err(|e| PipelineError::ConfigError(format!("[config].debounce: {e}")))?;

    let task_timeout = section
        .task_timeout
        .as_deref()
        .map(parse_duration)
        .transpose()
        .map_err(|e| PipelineError::ConfigError(format!("[config].task_timeout: {e}")))?;

    if section.template_max_depth == 0 {
        return Err(PipelineError::ConfigError(
            "[config].template_max_depth must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(Settings {
        default_queue: section.default_queue.clone(),
        debounce,
        task_timeout,
        empty_match: section.empty_match,
        template_max_depth: section.template_max_depth,
        skip_unchanged: section.skip_unchanged,
    })
}

fn build_store(cfg: &RawConfigFile, settings: &Settings) -> Result<ConfigStore> {
    let vars: BTreeMap<String, ConfigNode> = cfg
        .vars
        .iter()
        .map(|(k, v)| (k.clone(), ConfigNode::from(v.clone())))
        .collect();

    let pkg = cfg.pkg.clone().map(ConfigNode::from);

    let tasks: BTreeMap<String, ConfigNode> = cfg
        .task
        .iter()
        .map(|(name, task)| (name.clone(), task_node(task)))
        .collect();

    ConfigStore::assemble(vars, pkg, tasks, settings.template_max_depth)
        .map_err(PipelineError::ConfigError)
}

/// How a task's raw table is exposed to templates (`serve.options.port`).
fn task_node(task: &RawTask) -> ConfigNode {
    let mut map: BTreeMap<String, ConfigNode> = task
        .data
        .iter()
        .map(|(k, v)| (k.clone(), ConfigNode::from(v.clone())))
        .collect();
    map.insert("kind".to_string(), ConfigNode::from(task.kind.as_str()));
    map.insert(
        "options".to_string(),
        ConfigNode::from(task.options.clone()),
    );
    map.insert(
        "targets".to_string(),
        ConfigNode::Mapping(
            task.targets
                .iter()
                .map(|(k, v)| (k.clone(), ConfigNode::from(v.clone())))
                .collect(),
        ),
    );
    ConfigNode::Mapping(map)
}

/// Flatten queue aliases and check every remaining entry against the
/// registry.
fn build_queues(
    cfg: &RawConfigFile,
    registry: &TaskRegistry,
) -> Result<BTreeMap<String, TaskQueue>> {
    let order = alias_order(cfg)?;

    let mut flattened: BTreeMap<String, TaskQueue> = BTreeMap::new();
    for name in order {
        let mut entries = Vec::new();
        for raw_entry in &cfg.queue[name] {
            let raw_entry = raw_entry.trim();
            if let Some(alias) = flattened.get(raw_entry) {
                entries.extend(alias.entries.iter().cloned());
                continue;
            }

            let spec: TaskSpec = raw_entry.parse().map_err(|e| {
                PipelineError::ConfigError(format!("queue '{name}': {e}"))
            })?;
            registry
                .targets_for(&spec)
                .map_err(|e| PipelineError::ConfigError(format!("queue '{name}': {e}")))?;
            entries.push(spec);
        }
        flattened.insert(name.to_string(), TaskQueue::new(name, entries));
    }

    Ok(flattened)
}

/// Queue names ordered so that every alias comes before the queues that
/// reference it.
fn alias_order(cfg: &RawConfigFile) -> Result<Vec<&str>> {
    // Edge direction: alias -> queue
    // For:
    //   [queue]
    //   release = ["build", "bump"]
    // we add edge build -> release.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.queue.keys() {
        graph.add_node(name.as_str());
    }

    for (name, entries) in &cfg.queue {
        for entry in entries {
            let entry = entry.trim();
            if entry == name {
                return Err(PipelineError::ConfigError(format!(
                    "queue '{name}' cannot include itself"
                )));
            }
            if let Some((alias, _)) = cfg.queue.get_key_value(entry) {
                graph.add_edge(alias.as_str(), name.as_str(), ());
            }
        }
    }

    toposort(&graph, None).map_err(|cycle| {
        PipelineError::ConfigError(format!(
            "cycle detected in queue aliases involving queue '{}'",
            cycle.node_id()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(src: &str) -> RawConfigFile {
        toml::from_str(src).unwrap()
    }

    const TASKS: &str = r#"
        [task.clean]
        kind = "clean"
        targets = { build = ["build"] }

        [task.shell]
        kind = "shell"
        [task.shell.targets.bump]
        command = "true"
    "#;

    #[test]
    fn aliases_are_flattened_in_place() {
        let cfg = ConfigFile::try_from(raw(&format!(
            "{TASKS}\n[queue]\nbuild = [\"clean\"]\nrelease = [\"build\", \"shell:bump\"]\n"
        )))
        .unwrap();
        let release = cfg.queue("release").unwrap();
        assert_eq!(
            release.entries,
            vec![TaskSpec::all("clean"), TaskSpec::one("shell", "bump")]
        );
    }

    #[test]
    fn alias_cycle_is_rejected() {
        let err = ConfigFile::try_from(raw(&format!(
            "{TASKS}\n[queue]\na = [\"b\"]\nb = [\"a\"]\n"
        )))
        .unwrap_err();
        assert!(matches!(err, PipelineError::ConfigError(msg) if msg.contains("cycle")));
    }

    #[test]
    fn unknown_task_in_queue_is_rejected() {
        let err = ConfigFile::try_from(raw(&format!("{TASKS}\n[queue]\nbuild = [\"nope\"]\n")))
            .unwrap_err();
        assert!(matches!(err, PipelineError::ConfigError(msg) if msg.contains("nope")));
    }

    #[test]
    fn unknown_target_in_queue_is_rejected() {
        let err = ConfigFile::try_from(raw(&format!(
            "{TASKS}\n[queue]\nbuild = [\"clean:dist\"]\n"
        )))
        .unwrap_err();
        assert!(matches!(err, PipelineError::ConfigError(msg) if msg.contains("dist")));
    }

    #[test]
    fn empty_config_is_rejected() {
        assert!(ConfigFile::try_from(RawConfigFile::default()).is_err());
    }

    #[test]
    fn bad_debounce_is_rejected() {
        let err = ConfigFile::try_from(raw(&format!(
            "[config]\ndebounce = \"soon\"\n{TASKS}"
        )))
        .unwrap_err();
        assert!(matches!(err, PipelineError::ConfigError(msg) if msg.contains("debounce")));
    }
}
