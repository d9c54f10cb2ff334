// src/server/mod.rs

//! Local preview server and the live-reload channel.

pub mod livereload;
pub mod preview;

pub use livereload::{LiveReloadHub, LiveReloadSetting, ReloadEvent, ReloadKind, DEFAULT_LIVERELOAD_PORT};
pub use preview::{inject_snippet, PreviewConfig};
