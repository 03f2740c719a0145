//! Error types for file operations.

use std::path::PathBuf;

use driftfile_core::FsError;
use thiserror::Error;

/// Errors raised while planning, starting or running file operations.
///
/// Every variant is user-visible and non-fatal.
#[derive(Debug, Error)]
pub enum OpsError {
    /// The job process could not be started; no job was recorded.
    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A leg's background job exited unsuccessfully.
    #[error("{leg} failed ({status}){}", format_detail(.message))]
    Transfer {
        leg: String,
        status: String,
        message: String,
    },

    /// The paste destination is one of the sources or lies inside one.
    #[error("Cannot paste into {}: it is part of the selection", .destination.display())]
    CyclicPaste { destination: PathBuf },

    /// Selected nodes vanished before the selection was used.
    #[error("Dropped {} stale selection entries", .dropped.len())]
    StaleSelection { dropped: Vec<PathBuf> },

    /// A destructive action was refused because operations are in flight.
    #[error("{pending} file operation(s) still running; try again when they finish")]
    Busy { pending: usize },

    /// A bounded wait expired.
    #[error("Timed out with {pending} operation(s) still running")]
    Timeout { pending: usize },

    /// A wait was cancelled by its caller.
    #[error("Wait cancelled")]
    Cancelled,

    /// A new name cannot be used as a file name.
    #[error("Invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// Creating or renaming would overwrite an existing entry.
    #[error("{} already exists", .path.display())]
    AlreadyExists { path: PathBuf },

    /// A remote path did not resolve to any configured mount.
    #[error("No remote mount for {}", .path.display())]
    UnknownMount { path: PathBuf },

    #[error(transparent)]
    Fs(#[from] FsError),
}

fn format_detail(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(": {message}")
    }
}
