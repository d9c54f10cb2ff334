// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `assetpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetpipe",
    version,
    about = "Run front-end asset pipeline queues (build, dev, release, ...).",
    long_about = None
)]
pub struct CliArgs {
    /// Name of the task queue to run (e.g. `build`, `dev`).
    ///
    /// Defaults to `[config].default_queue` from the config file.
    #[arg(value_name = "QUEUE")]
    pub queue: Option<String>,

    /// Path to the config file (TOML). Defaults to `Assetpipe.toml`.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the resolved plan, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Keep going after a task fails; the run still exits non-zero.
    #[arg(long)]
    pub force: bool,

    /// List declared tasks and queues and exit.
    #[arg(long)]
    pub list: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
