//! Knowledge graph and learning-path engine for course content.
//!
//! Knowledge points form a parent/child tree per course plus a directed
//! relation graph; student submissions turn into per-topic mastery, and the
//! planner orders the gaps into prerequisite-respecting stages.

pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod mastery;
pub mod models;
pub mod path;
pub mod planner;
pub mod service;
pub mod tree;

pub use error::{Error, Result};
