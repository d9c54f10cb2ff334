// src/watch/mod.rs

//! Watch loop: filesystem events in, debounced queue runs out.
//!
//! - [`rules`] compiles each watch target's patterns.
//! - [`watcher`] turns `notify` events into root-relative paths.
//! - [`core`] is the pure debounce state machine.
//! - [`runtime`] is the async shell that arms timers, runs queues and
//!   publishes live-reload messages.

use std::time::Duration;

pub mod cache;
pub mod core;
pub mod hash;
pub mod rules;
pub mod runtime;
pub mod watcher;

pub use cache::FileCache;
pub use core::WatchCore;
pub use rules::WatchRule;
pub use runtime::WatchRuntime;
pub use watcher::{spawn_watcher, WatcherHandle};

/// Inputs to the watch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A file below the project root changed (slash-separated, relative).
    FileChanged { path: String },
    /// A debounce timer armed for `rule` at `generation` fired.
    DebounceElapsed { rule: usize, generation: u64 },
    /// Ctrl-C or an embedding caller asked the loop to stop.
    ShutdownRequested,
}

/// What the core asks the shell to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchCommand {
    ArmDebounce {
        rule: usize,
        generation: u64,
        delay: Duration,
    },
    RunRule {
        rule: usize,
        changed: Vec<String>,
    },
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchStep {
    pub commands: Vec<WatchCommand>,
    pub keep_running: bool,
}
