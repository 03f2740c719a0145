//! File operations engine for driftfile.
//!
//! Every file operation runs as a background OS process started by a
//! [`JobRunner`]. A [`SyncEngine`] plans one leg per source, classifying
//! each side as local or as the cache mirror of a remote store, and the legs
//! are chained through job exit callbacks by [`launch_leg`].

mod conflict;
mod counter;
mod error;
mod exec;
mod job;
mod ledger;
mod operation;
mod progress;
mod remote;
mod sync;

pub use conflict::{auto_rename_path, resolve_target, validate_name};
pub use counter::{OpCounter, OpGuard};
pub use error::OpsError;
pub use exec::{LegHost, launch_leg, launch_listing};
pub use job::{
    ChunkHandler, ExitHandler, JobCallbacks, JobCommand, JobEvent, JobExit, JobHost, JobId,
    JobRunner, dispatch, drain, pump_until_quiescent,
};
pub use ledger::{CacheEffect, CacheLedger};
pub use operation::{FileOperation, Leg, LegKind, LegReport, OperationError, Step, TransferMode};
pub use progress::{BatchId, BatchReport, OperationType};
pub use remote::{
    ListingSync, Location, MountTable, RemoteEntry, RemoteMount, SyncTool, apply_listing,
    parse_lsf_line,
};
pub use sync::{ListingPlan, SyncEngine, check_cyclic, detect_trash_command};
