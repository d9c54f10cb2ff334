// tests/watch_debounce.rs

mod common;
use crate::common::{init_tracing, FakeQueueExecutor};

use std::time::Duration;

use assetpipe::tasks::{TaskQueue, TaskSpec};
use assetpipe::watch::{WatchCore, WatchEvent, WatchRule, WatchRuntime};

fn rule(name: &str, patterns: &[&str], debounce_ms: u64) -> WatchRule {
    WatchRule::new(
        name,
        patterns.iter().map(|p| p.to_string()).collect(),
        TaskQueue::new(name, vec![TaskSpec::all(name)]),
        Duration::from_millis(debounce_ms),
    )
    .unwrap()
}

fn changed(path: &str) -> WatchEvent {
    WatchEvent::FileChanged {
        path: path.to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn three_quick_changes_cause_one_run() {
    init_tracing();
    let executor = FakeQueueExecutor::new();
    let runtime = WatchRuntime::new(
        WatchCore::new(vec![rule("scripts", &["src/js/*.js"], 250)]),
        executor.clone(),
    );
    let tx = runtime.sender();
    let handle = tokio::spawn(runtime.run());

    for path in ["src/js/a.js", "src/js/b.js", "src/js/a.js"] {
        tx.send(changed(path)).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    tokio::time::sleep(Duration::from_secs(2)).await;
    tx.send(WatchEvent::ShutdownRequested).unwrap();

    let stats = handle.await.unwrap();
    assert_eq!(stats.runs, 1);
    assert_eq!(executor.executed(), vec!["scripts".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn each_rule_debounces_on_its_own() {
    init_tracing();
    let executor = FakeQueueExecutor::new();
    let runtime = WatchRuntime::new(
        WatchCore::new(vec![
            rule("scripts", &["src/js/*.js"], 100),
            rule("styles", &["src/sass/*.scss"], 1000),
            rule("everything", &["src/**/*"], 300),
        ]),
        executor.clone(),
    );
    let tx = runtime.sender();
    let handle = tokio::spawn(runtime.run());

    tx.send(changed("src/sass/main.scss")).unwrap();
    tx.send(changed("src/js/app.js")).unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;
    tx.send(changed("README.md")).unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;
    tx.send(WatchEvent::ShutdownRequested).unwrap();

    handle.await.unwrap();
    assert_eq!(
        executor.executed(),
        vec!["scripts".to_string(), "everything".to_string(), "styles".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn a_failed_run_does_not_stop_watching() {
    init_tracing();
    let executor = FakeQueueExecutor::new().failing("lint");
    let runtime = WatchRuntime::new(
        WatchCore::new(vec![rule("lint", &["**/*.js"], 50)]),
        executor.clone(),
    );
    let tx = runtime.sender();
    let handle = tokio::spawn(runtime.run());

    tx.send(changed("a.js")).unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    tx.send(changed("b.js")).unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    tx.send(WatchEvent::ShutdownRequested).unwrap();

    let stats = handle.await.unwrap();
    assert_eq!((stats.runs, stats.failed), (2, 2));
}

#[tokio::test(start_paused = true)]
async fn slow_runs_are_never_overlapped() {
    init_tracing();
    let executor = FakeQueueExecutor::new().with_delay(Duration::from_secs(2));
    let runtime = WatchRuntime::new(
        WatchCore::new(vec![rule("build", &["src/**"], 100)]),
        executor.clone(),
    );
    let tx = runtime.sender();
    let handle = tokio::spawn(runtime.run());

    tx.send(changed("src/a.css")).unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    // Arrives mid-run; picked up after the first run completes.
    tx.send(changed("src/b.css")).unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    tx.send(WatchEvent::ShutdownRequested).unwrap();

    assert_eq!(handle.await.unwrap().runs, 2);
    assert_eq!(executor.executed().len(), 2);
}
