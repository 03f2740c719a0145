//! Views, selection and the command engine for driftfile.
//!
//! An [`Engine`] owns every open view. Each view shows a directory tree,
//! keeps its own pending selection and counts the file operations it has
//! in flight. Commands arrive by name from the host; file operations are
//! handed to `driftfile-ops` and their completions refresh every view that
//! shows an affected directory.

mod bookmark;
mod command;
mod engine;
mod error;
mod notice;
mod reconcile;
mod selection;

pub use bookmark::BookmarkTable;
pub use command::{Command, parse_command};
pub use engine::{DisplayLine, Engine, HostRequest, View, ViewId};
pub use error::EngineError;
pub use notice::{Notice, NoticeLevel};
pub use reconcile::{ReconcileStats, TreeReconciler};
pub use selection::{Intent, Materialized, PendingSelection};
