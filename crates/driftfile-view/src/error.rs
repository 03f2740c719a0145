//! Engine error types.

use driftfile_core::FsError;
use driftfile_ops::OpsError;
use thiserror::Error;

use crate::command::Command;
use crate::engine::ViewId;

/// Errors surfaced by [`Engine`](crate::Engine) commands and API calls.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Unknown command: {name}")]
    UnknownCommand { name: String },

    #[error("`{command}` needs an argument")]
    MissingArgument { command: Command },

    #[error("Invalid argument for `{command}`: {arg}")]
    InvalidArgument { command: Command, arg: String },

    #[error("No such view: {0}")]
    UnknownView(ViewId),

    #[error("No bookmark '{0}'")]
    UnknownBookmark(char),

    #[error("Nothing under the cursor")]
    NoCurrentNode,

    #[error(transparent)]
    Ops(#[from] OpsError),

    #[error(transparent)]
    Fs(#[from] FsError),
}

impl EngineError {
    /// Whether the action was refused because file operations are running.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Ops(OpsError::Busy { .. }))
    }
}
