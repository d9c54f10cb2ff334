// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Loading is two-phase: [`loader`] deserializes `Assetpipe.toml` (plus the
//! optional manifest) into a [`RawConfigFile`], and `validate` turns that
//! into a [`ConfigFile`] whose templates are resolved and whose queues only
//! name known tasks.

pub mod loader;
pub mod model;
pub mod node;
pub mod store;
mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, ConfigSection, RawConfigFile, RawTask, Settings};
pub use node::ConfigNode;
pub use store::ConfigStore;
