// tests/runner_queue.rs

mod common;
use crate::common::{init_tracing, Project};

use assetpipe::errors::{PipelineError, TaskError};
use assetpipe::tasks::{TaskRef, TaskRunner};

const CONFIG: &str = r#"
[task.first]
kind = "concat"
files = [{ src = ["src/a.js"], dest = "out/a.js" }]

[task.broken]
kind = "concat"
files = [{ src = ["src/missing.js"], dest = "out/b.js", nonull = true }]

[task.last]
kind = "concat"
files = [{ src = ["src/c.js"], dest = "out/c.js" }]

[queue]
abc = ["first", "broken", "last"]
"#;

fn project() -> Project {
    Project::new()
        .file("Assetpipe.toml", CONFIG)
        .file("src/a.js", "var a;")
        .file("src/c.js", "var c;")
}

#[tokio::test]
async fn failure_stops_the_queue_and_keeps_earlier_outputs() {
    init_tracing();
    let p = project();

    let result = p.run("abc").await;

    assert!(!result.ok);
    assert_eq!(result.failed_task, Some(TaskRef::new("broken", "default")));
    assert!(matches!(result.cause, Some(TaskError::MissingSource(_))));
    assert_eq!(result.completed, vec![TaskRef::new("first", "default")]);

    assert_eq!(p.read("out/a.js"), "var a;");
    assert!(!p.exists("out/b.js"));
    assert!(!p.exists("out/c.js"), "C must never run after B fails");
}

#[tokio::test]
async fn force_runs_the_rest_but_still_reports_the_failure() {
    init_tracing();
    let p = project();
    let pipeline = p.pipeline();
    let queue = pipeline.resolve_queue("abc").unwrap();

    let result = TaskRunner::new(pipeline).with_force(true).run(&queue).await;

    assert!(!result.ok);
    assert_eq!(result.failed_task, Some(TaskRef::new("broken", "default")));
    assert_eq!(
        result.completed,
        vec![TaskRef::new("first", "default"), TaskRef::new("last", "default")]
    );
    assert_eq!(p.read("out/c.js"), "var c;");
}

#[tokio::test]
async fn a_task_name_runs_as_a_single_entry_queue() {
    init_tracing();
    let p = project();

    let result = p.run("last").await;
    assert!(result.ok);
    assert_eq!(result.completed, vec![TaskRef::new("last", "default")]);
}

#[test]
fn unknown_queue_is_reported_by_name() {
    let p = project();
    let err = p.pipeline().resolve_queue("deploy").unwrap_err();
    assert!(matches!(err, PipelineError::UnknownQueue(ref name) if name == "deploy"));
}

#[tokio::test]
async fn entry_point_returns_task_failed() {
    init_tracing();
    let p = project();
    let args = assetpipe::cli::CliArgs {
        queue: Some("abc".to_string()),
        config: Some(p.path("Assetpipe.toml")),
        log_level: None,
        dry_run: false,
        force: false,
        list: false,
    };

    match assetpipe::run(args).await {
        Err(PipelineError::TaskFailed { task, cause }) => {
            assert_eq!(task, TaskRef::new("broken", "default"));
            assert!(cause.to_string().contains("missing.js"));
        }
        other => panic!("expected TaskFailed, got {other:?}"),
    }
}
