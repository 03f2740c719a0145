//! File operation types.

use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::job::JobCommand;
use crate::ledger::CacheEffect;
use crate::progress::{BatchId, OperationType};

/// Whether a transfer keeps its sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferMode {
    Copy,
    Move,
}

impl TransferMode {
    pub fn operation_type(self) -> OperationType {
        match self {
            Self::Copy => OperationType::Copy,
            Self::Move => OperationType::Move,
        }
    }
}

/// A file operation to be executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FileOperation {
    /// Copy or move sources into a destination directory.
    Transfer {
        sources: Vec<PathBuf>,
        destination: PathBuf,
        mode: TransferMode,
    },
    /// Delete files/directories.
    Delete { targets: Vec<PathBuf>, force: bool },
    /// Create an empty file or directory.
    Create { path: PathBuf, directory: bool },
    /// Give entries new names in their own directories. Entries may lie
    /// inside one another.
    Rename { renames: Vec<(PathBuf, String)> },
}

impl FileOperation {
    /// Create a copy operation.
    pub fn copy(sources: Vec<PathBuf>, destination: PathBuf) -> Self {
        Self::Transfer {
            sources,
            destination,
            mode: TransferMode::Copy,
        }
    }

    /// Create a move operation.
    pub fn move_to(sources: Vec<PathBuf>, destination: PathBuf) -> Self {
        Self::Transfer {
            sources,
            destination,
            mode: TransferMode::Move,
        }
    }

    /// Create a delete operation.
    pub fn delete(targets: Vec<PathBuf>, force: bool) -> Self {
        Self::Delete { targets, force }
    }

    /// Create an empty file.
    pub fn create_file(path: PathBuf) -> Self {
        Self::Create {
            path,
            directory: false,
        }
    }

    /// Create a directory.
    pub fn create_directory(path: PathBuf) -> Self {
        Self::Create {
            path,
            directory: true,
        }
    }

    /// Create a rename operation.
    pub fn rename(renames: Vec<(PathBuf, String)>) -> Self {
        Self::Rename { renames }
    }

    pub fn operation_type(&self) -> OperationType {
        match self {
            Self::Transfer { mode, .. } => mode.operation_type(),
            Self::Delete { .. } => OperationType::Delete,
            Self::Create { .. } => OperationType::Create,
            Self::Rename { .. } => OperationType::Rename,
        }
    }
}

/// Which side of the cache boundary a leg crosses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegKind {
    LocalToLocal,
    LocalToRemote,
    RemoteToLocal,
    RemoteToRemote,
    DeleteLocal,
    DeleteRemote,
    CreateLocal,
    CreateRemote,
    RenameLocal,
    RenameRemote,
}

impl fmt::Display for LegKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::LocalToLocal => "local -> local",
            Self::LocalToRemote => "local -> remote",
            Self::RemoteToLocal => "remote -> local",
            Self::RemoteToRemote => "remote -> remote",
            Self::DeleteLocal => "local delete",
            Self::DeleteRemote => "remote delete",
            Self::CreateLocal => "local create",
            Self::CreateRemote => "remote create",
            Self::RenameLocal => "local rename",
            Self::RenameRemote => "remote rename",
        };
        f.write_str(label)
    }
}

/// One job of a leg, with the ledger update it makes on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub command: JobCommand,
    pub effect: Option<CacheEffect>,
}

impl Step {
    pub fn new(command: JobCommand) -> Self {
        Self {
            command,
            effect: None,
        }
    }

    pub fn with_effect(mut self, effect: CacheEffect) -> Self {
        self.effect = Some(effect);
        self
    }
}

/// The job sequence that handles one source.
#[derive(Debug, Clone)]
pub struct Leg {
    pub batch: BatchId,
    pub op: OperationType,
    pub kind: LegKind,
    pub source: PathBuf,
    /// Final path of the transferred, created or renamed entry; `None` for
    /// deletes.
    pub target: Option<PathBuf>,
    /// Steps still to run, in order.
    pub steps: VecDeque<Step>,
    /// Directories whose listing changes when the leg completes.
    pub affected: Vec<PathBuf>,
}

impl Leg {
    /// Report for this leg, ending with `error` if it failed.
    pub fn report(&self, error: Option<String>) -> LegReport {
        LegReport {
            batch: self.batch,
            op: self.op,
            kind: self.kind,
            source: self.source.clone(),
            target: self.target.clone(),
            affected: self.affected.clone(),
            error: error.map(|message| OperationError::new(self.source.clone(), message)),
        }
    }

    pub fn describe(&self) -> String {
        match &self.target {
            Some(target) => format!(
                "{} {} -> {}",
                self.op,
                self.source.display(),
                target.display()
            ),
            None => format!("{} {}", self.op, self.source.display()),
        }
    }
}

/// An error that occurred during a file operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationError {
    /// The path that caused the error.
    pub path: PathBuf,
    /// A human-readable error message.
    pub message: String,
}

impl OperationError {
    /// Create a new operation error.
    pub fn new(path: PathBuf, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// How a leg ended.
#[derive(Debug, Clone)]
pub struct LegReport {
    pub batch: BatchId,
    pub op: OperationType,
    pub kind: LegKind,
    pub source: PathBuf,
    pub target: Option<PathBuf>,
    pub affected: Vec<PathBuf>,
    pub error: Option<OperationError>,
}

impl LegReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}
