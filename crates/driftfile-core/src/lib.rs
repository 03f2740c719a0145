//! Core types for driftfile.
//!
//! This crate provides the data structures shared by the engine: tree
//! nodes, the per-view tree, sort keys, directory listing and configuration.

mod config;
mod error;
mod listing;
mod node;
mod sort;
mod tree;

pub use config::{CONFIG_FILE_NAME, EngineConfig, EngineConfigBuilder, RemoteMountConfig};
pub use error::FsError;
pub use listing::{DirLister, LocalLister, stat_entry};
pub use node::{Entry, NodeId, NodeKind, Stat, TreeNode};
pub use sort::{SortKey, SortOrder};
pub use tree::{DirRef, IdGen, Level, ViewTree};
