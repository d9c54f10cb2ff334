// src/tasks/registry.rs

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::{ConfigNode, ConfigStore, RawTask};
use crate::errors::{PipelineError, Result};
use crate::files::mappings_from_target;
use crate::tasks::{TaskKind, TaskRef, TaskSpec, TaskTarget, DEFAULT_TARGET};

/// Target keys that describe files or nested options rather than handler
/// settings.
const NON_OPTION_KEYS: &[&str] = &[
    "files", "options", "cwd", "src", "dest", "ext", "ext_dot", "extDot", "flatten", "expand",
    "nonull",
];

/// A declared task and its resolved targets (in name order).
#[derive(Debug, Clone)]
pub struct RegisteredTask {
    pub name: String,
    pub kind: TaskKind,
    pub targets: BTreeMap<String, TaskTarget>,
}

/// All declared tasks, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<String, RegisteredTask>,
}

impl TaskRegistry {
    /// Resolve every task target against `store`.
    ///
    /// A task without targets gets a single `default` target built from the
    /// rest of its table.
    pub fn build(raw_tasks: &BTreeMap<String, RawTask>, store: &ConfigStore) -> Result<Self> {
        let mut tasks = BTreeMap::new();

        for (name, raw) in raw_tasks {
            let task_options = ConfigNode::from(raw.options.clone());

            let mut declared: BTreeMap<String, ConfigNode> = raw
                .targets
                .iter()
                .map(|(t, v)| (t.clone(), ConfigNode::from(v.clone())))
                .collect();
            if declared.is_empty() {
                declared.insert(DEFAULT_TARGET.to_string(), ConfigNode::from(raw.data.clone()));
            } else if !raw.data.is_empty() {
                let keys: Vec<&String> = raw.data.keys().collect();
                return Err(PipelineError::ConfigError(format!(
                    "task '{name}' declares targets, so {keys:?} must move into a target"
                )));
            }

            let mut targets = BTreeMap::new();
            for (target_name, raw_target) in declared {
                let task_ref = TaskRef::new(name.clone(), target_name.clone());
                let target = build_target(task_ref, raw.kind, &task_options, &raw_target, store)?;
                targets.insert(target_name, target);
            }

            debug!(task = %name, kind = %raw.kind, targets = targets.len(), "registered task");
            tasks.insert(
                name.clone(),
                RegisteredTask {
                    name: name.clone(),
                    kind: raw.kind,
                    targets,
                },
            );
        }

        Ok(Self { tasks })
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTask> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredTask> {
        self.tasks.values()
    }

    pub fn target(&self, task_ref: &TaskRef) -> Option<&TaskTarget> {
        self.tasks
            .get(&task_ref.task)
            .and_then(|t| t.targets.get(&task_ref.target))
    }

    /// Targets named by `spec`, in execution order.
    pub fn targets_for(&self, spec: &TaskSpec) -> std::result::Result<Vec<&TaskTarget>, String> {
        let task = self
            .tasks
            .get(&spec.task)
            .ok_or_else(|| format!("unknown task '{}'", spec.task))?;

        match &spec.target {
            Some(target) => task
                .targets
                .get(target)
                .map(|t| vec![t])
                .ok_or_else(|| format!("task '{}' has no target '{}'", spec.task, target)),
            None => Ok(task.targets.values().collect()),
        }
    }
}

fn build_target(
    task_ref: TaskRef,
    kind: TaskKind,
    task_options: &ConfigNode,
    raw_target: &ConfigNode,
    store: &ConfigStore,
) -> Result<TaskTarget> {
    let in_target = |e| PipelineError::ConfigError(format!("task '{task_ref}': {e}"));

    let data = store.resolve_node(raw_target).map_err(in_target)?;

    let mut options = store.resolve_node(task_options).map_err(in_target)?;
    if let ConfigNode::Mapping(map) = &data {
        let settings: BTreeMap<String, ConfigNode> = map
            .iter()
            .filter(|(k, _)| !NON_OPTION_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        options = options.merged_with(&ConfigNode::Mapping(settings));
        if let Some(target_options) = map.get("options") {
            options = options.merged_with(target_options);
        }
    }

    let files = mappings_from_target(&data)
        .map_err(|e| PipelineError::ConfigError(format!("task '{task_ref}': {e}")))?;

    Ok(TaskTarget {
        task_ref,
        kind,
        options,
        data,
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawConfigFile;

    fn registry(src: &str) -> TaskRegistry {
        let raw: RawConfigFile = toml::from_str(src).unwrap();
        let vars = raw
            .vars
            .clone()
            .into_iter()
            .map(|(k, v)| (k, ConfigNode::from(v)))
            .collect();
        let store = ConfigStore::assemble(vars, None, BTreeMap::new(), 16).unwrap();
        TaskRegistry::build(&raw.task, &store).unwrap()
    }

    #[test]
    fn target_options_override_task_options() {
        let reg = registry(
            r#"
            [vars]
            banner = "/*! demo */"

            [task.sass]
            kind = "compile"
            options = { style = "expanded", banner = "<%= banner %>" }

            [task.sass.targets.dist]
            options = { style = "compressed" }
            files = [{ src = ["a.scss"], dest = "a.css" }]
            "#,
        );
        let target = reg.target(&TaskRef::new("sass", "dist")).unwrap();
        assert_eq!(target.option("style"), Some(&ConfigNode::from("compressed")));
        assert_eq!(target.option("banner"), Some(&ConfigNode::from("/*! demo */")));
        assert_eq!(target.files.len(), 1);
    }

    #[test]
    fn target_settings_become_options() {
        let reg = registry(
            r#"
            [task.shell]
            kind = "shell"
            [task.shell.targets.bumpVersion]
            command = "npm version patch"
            "#,
        );
        let target = reg.target(&TaskRef::new("shell", "bumpVersion")).unwrap();
        assert_eq!(target.option("command"), Some(&ConfigNode::from("npm version patch")));
        assert!(target.files.is_empty());
    }

    #[test]
    fn whole_task_spec_runs_targets_in_name_order() {
        let reg = registry(
            r#"
            [task.clean]
            kind = "clean"
            [task.clean.targets]
            zeta = ["z"]
            alpha = ["a"]
            "#,
        );
        let names: Vec<_> = reg
            .targets_for(&TaskSpec::all("clean"))
            .unwrap()
            .iter()
            .map(|t| t.task_ref.target.clone())
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert!(reg.targets_for(&TaskSpec::one("clean", "beta")).is_err());
    }

    #[test]
    fn task_level_files_form_the_default_target() {
        let reg = registry(
            r#"
            [vars.project]
            js = ["src/js/*.js"]

            [task.jshint]
            kind = "lint"
            files = ["<%= project.js %>", "Assetpipe.toml"]
            "#,
        );
        let target = reg.target(&TaskRef::new("jshint", DEFAULT_TARGET)).unwrap();
        assert_eq!(target.files.len(), 1);
        assert_eq!(target.files[0].src, vec!["src/js/*.js", "Assetpipe.toml"]);
    }

    #[test]
    fn task_without_targets_gets_default_target() {
        let reg = registry(
            r#"
            [task.open]
            kind = "open"
            options = { url = "http://localhost:9000" }
            "#,
        );
        let target = reg.target(&TaskRef::new("open", DEFAULT_TARGET)).unwrap();
        assert_eq!(target.option("url"), Some(&ConfigNode::from("http://localhost:9000")));
    }
}
