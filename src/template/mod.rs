// src/template/mod.rs

//! `<%= path.to.value %>` placeholder expansion against a [`ConfigNode`] tree.
//!
//! - [`parser`] splits a string into literal and placeholder segments.
//! - [`resolver`] looks placeholders up in the tree, recursively, with cycle
//!   detection and a depth bound.
//!
//! [`ConfigNode`]: crate::config::ConfigNode

pub mod parser;
pub mod resolver;

pub use parser::{contains_placeholder, parse_segments, Segment};
pub use resolver::{TemplateResolver, DEFAULT_MAX_DEPTH};
