// src/lib.rs

pub mod capability;
pub mod cli;
pub mod config;
pub mod errors;
pub mod files;
pub mod fs;
pub mod logging;
pub mod server;
pub mod tasks;
pub mod template;
pub mod types;
pub mod watch;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{default_config_path, load_and_validate, ConfigFile};
use crate::errors::{PipelineError, Result};
use crate::tasks::{Pipeline, RunResult, TaskQueue, TaskRunner};

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the config, then lists, plans or runs the requested
/// queue. A failed run is reported on stdout and returned as
/// [`PipelineError::TaskFailed`].
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let cfg = load_and_validate(&config_path)?;
    debug!(config = %config_path.display(), root = %cfg.root().display(), "configuration loaded");

    if args.list {
        print_listing(&cfg);
        return Ok(());
    }

    let queue_name = args
        .queue
        .clone()
        .unwrap_or_else(|| cfg.settings().default_queue.clone());

    let pipeline = Pipeline::new(cfg)?;
    let queue = pipeline.resolve_queue(&queue_name)?;

    if args.dry_run {
        print_plan(&pipeline, &queue);
        return Ok(());
    }

    info!(queue = %queue.name, "starting");
    let result = TaskRunner::new(pipeline).with_force(args.force).run(&queue).await;
    print_summary(&queue, &result);

    match (result.failed_task, result.cause) {
        (Some(task), Some(cause)) => Err(PipelineError::TaskFailed { task, cause }),
        _ => Ok(()),
    }
}

/// `--list`: tasks with their targets, then queues.
fn print_listing(cfg: &ConfigFile) {
    println!("tasks:");
    for task in cfg.registry().iter() {
        let targets: Vec<&str> = task.targets.keys().map(String::as_str).collect();
        println!("  {} ({}): {}", task.name, task.kind, targets.join(", "));
    }

    println!();
    println!("queues:");
    for (name, queue) in cfg.queues() {
        let entries: Vec<String> = queue.entries.iter().map(|e| e.to_string()).collect();
        let marker = if *name == cfg.settings().default_queue {
            " (default)"
        } else {
            ""
        };
        println!("  {name}{marker}: {}", entries.join(" "));
    }
}

/// `--dry-run`: every target the queue would run, with its file mappings
/// expanded against the current tree.
fn print_plan(pipeline: &Pipeline, queue: &TaskQueue) {
    println!("assetpipe dry-run: queue '{}'", queue.name);
    let expander = pipeline.expander();

    for spec in &queue.entries {
        let targets = match pipeline.registry().targets_for(spec) {
            Ok(targets) => targets,
            Err(msg) => {
                println!("  - {spec}: {msg}");
                continue;
            }
        };
        for target in targets {
            println!("  - {} [{}]", target.task_ref, target.kind);
            if target.files.is_empty() {
                continue;
            }
            match expander.expand_all(&target.files) {
                Ok(pairs) => {
                    for pair in pairs {
                        match &pair.dest {
                            Some(dest) => {
                                println!("      {} -> {}", pair.src.display(), dest.display())
                            }
                            None => println!("      {}", pair.src.display()),
                        }
                    }
                }
                Err(e) => println!("      (files: {e})"),
            }
        }
    }

    debug!("dry-run complete (no execution)");
}

fn print_summary(queue: &TaskQueue, result: &RunResult) {
    let completed: Vec<String> = result.completed.iter().map(|t| t.to_string()).collect();
    if result.ok {
        println!("queue '{}' done ({} targets)", queue.name, completed.len());
        return;
    }

    if let (Some(task), Some(cause)) = (&result.failed_task, &result.cause) {
        println!("queue '{}' aborted: task '{task}' failed", queue.name);
        println!("  cause: {cause}");
    }
    if completed.is_empty() {
        println!("  completed before the failure: none");
    } else {
        println!("  completed before the failure: {}", completed.join(", "));
    }
}
