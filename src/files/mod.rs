// src/files/mod.rs

//! File-mapping declarations and their expansion into concrete paths.

pub mod expander;
pub mod mapping;

pub use expander::{group_by_dest, DestGroup, FileExpander, FilePair};
pub use mapping::{mappings_from_target, FileMapping};
