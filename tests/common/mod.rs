#![allow(dead_code)]

use std::path::PathBuf;

pub use assetpipe_test_utils::{init_tracing, with_timeout, ConfigBuilder, FakeQueueExecutor, Project};

/// The demo project shipped with the repository.
pub fn demo_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos")
}
