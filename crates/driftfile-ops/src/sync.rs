//! Leg planning: turns a file operation into per-source job sequences.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use driftfile_core::EngineConfig;

use crate::conflict::{resolve_target, validate_name};
use crate::job::JobCommand;
use crate::ledger::{CacheEffect, CacheLedger};
use crate::operation::{FileOperation, Leg, LegKind, Step, TransferMode};
use crate::progress::{BatchId, OperationType};
use crate::remote::{Location, MountTable, SyncTool};
use crate::OpsError;

/// Candidate trash commands, in order of preference.
const TRASH_CANDIDATES: &[&[&str]] = &[&["trash-put"], &["gio", "trash"], &["trash"]];

/// A remote directory listing to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPlan {
    /// Cache directory that receives the placeholders.
    pub dir: PathBuf,
    pub command: JobCommand,
}

/// Plans local and remote transfers against the configured mounts.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    mounts: MountTable,
    tool: SyncTool,
    trash: Option<Vec<String>>,
}

impl SyncEngine {
    pub fn new(mounts: MountTable, tool: SyncTool, trash: Option<Vec<String>>) -> Self {
        Self {
            mounts,
            tool,
            trash,
        }
    }

    /// Build from configuration. An unset trash command is auto-detected; an
    /// empty one disables the trash.
    pub fn from_config(config: &EngineConfig) -> Self {
        let trash = match &config.trash_command {
            Some(cmd) if cmd.is_empty() => None,
            Some(cmd) => Some(cmd.clone()),
            None => detect_trash_command(),
        };
        Self::new(
            MountTable::from_config(config),
            SyncTool::new(&config.sync_program),
            trash,
        )
    }

    pub fn mounts(&self) -> &MountTable {
        &self.mounts
    }

    pub fn tool(&self) -> &SyncTool {
        &self.tool
    }

    pub fn trash_command(&self) -> Option<&[String]> {
        self.trash.as_deref()
    }

    pub fn classify(&self, path: &Path) -> Location {
        self.mounts.resolve(path)
    }

    /// Plan every leg of `op`.
    pub fn plan(
        &self,
        batch: BatchId,
        op: &FileOperation,
        ledger: &CacheLedger,
    ) -> Result<Vec<Leg>, OpsError> {
        match op {
            FileOperation::Transfer {
                sources,
                destination,
                mode,
            } => self.plan_transfer(batch, sources, destination, *mode, ledger),
            FileOperation::Delete { targets, force } => {
                Ok(self.plan_delete(batch, targets, *force))
            }
            FileOperation::Create { path, directory } => {
                self.plan_create(batch, path, *directory).map(|leg| vec![leg])
            }
            FileOperation::Rename { renames } => self.plan_rename(batch, renames),
        }
    }

    /// Plan copying or moving `sources` into the directory `destination`.
    ///
    /// Fails before planning anything if the destination is one of the
    /// sources or lies inside one. Moves within the same directory are
    /// skipped; name clashes get a numbered name.
    pub fn plan_transfer(
        &self,
        batch: BatchId,
        sources: &[PathBuf],
        destination: &Path,
        mode: TransferMode,
        ledger: &CacheLedger,
    ) -> Result<Vec<Leg>, OpsError> {
        check_cyclic(sources, destination)?;

        let mut reserved = HashSet::new();
        let mut legs = Vec::new();
        for source in sources {
            let Some(name) = source.file_name() else {
                tracing::warn!(source = %source.display(), "skipping source without a name");
                continue;
            };
            if mode == TransferMode::Move && source.parent() == Some(destination) {
                tracing::debug!(source = %source.display(), "move into own directory skipped");
                continue;
            }

            let target = resolve_target(
                destination,
                &name.to_string_lossy(),
                &mut reserved,
                |p| p.symlink_metadata().is_ok(),
            );

            let mut steps = VecDeque::new();
            if !destination.is_dir() {
                steps.push_back(Step::new(
                    JobCommand::new("mkdir").arg("-p").arg(destination),
                ));
            }
            let kind = self.transfer_steps(source, &target, mode, ledger, &mut steps);

            let mut affected = vec![destination.to_path_buf()];
            if mode == TransferMode::Move {
                if let Some(parent) = source.parent() {
                    affected.push(parent.to_path_buf());
                }
            }

            legs.push(Leg {
                batch,
                op: mode.operation_type(),
                kind,
                source: source.clone(),
                target: Some(target),
                steps,
                affected,
            });
        }
        Ok(legs)
    }

    fn transfer_steps(
        &self,
        source: &Path,
        target: &Path,
        mode: TransferMode,
        ledger: &CacheLedger,
        steps: &mut VecDeque<Step>,
    ) -> LegKind {
        let copy = mode == TransferMode::Copy;
        match (self.classify(source), self.classify(target)) {
            (Location::Local(_), Location::Local(_)) => {
                steps.push_back(Step::new(local_transfer(source, target, mode)));
                LegKind::LocalToLocal
            }
            (Location::Local(_), Location::Remote { store, .. }) => {
                steps.push_back(Step::new(self.tool.copyto(source, &store)));
                steps.push_back(
                    Step::new(local_transfer(source, target, mode))
                        .with_effect(CacheEffect::MarkFresh(target.to_path_buf())),
                );
                LegKind::LocalToRemote
            }
            (
                Location::Remote {
                    cache,
                    store: src_store,
                    ..
                },
                Location::Local(_),
            ) => {
                if !ledger.is_fresh(&cache) {
                    steps.push_back(
                        Step::new(self.tool.copyto(&src_store, &cache))
                            .with_effect(CacheEffect::MarkFresh(cache.clone())),
                    );
                }
                steps.push_back(Step::new(local_transfer(&cache, target, TransferMode::Copy)));
                if !copy {
                    steps.push_back(Step::new(self.store_remove(&cache, &src_store)));
                    steps.push_back(
                        Step::new(JobCommand::new("rm").arg("-rf").arg(&cache))
                            .with_effect(CacheEffect::Forget(cache.clone())),
                    );
                }
                LegKind::RemoteToLocal
            }
            (
                Location::Remote {
                    cache: src_cache,
                    store: src_store,
                    ..
                },
                Location::Remote {
                    cache: dst_cache,
                    store: dst_store,
                    ..
                },
            ) => {
                let push = if copy {
                    self.tool.copyto(&src_store, &dst_store)
                } else {
                    self.tool.moveto(&src_store, &dst_store)
                };
                steps.push_back(Step::new(push));
                steps.push_back(
                    Step::new(local_transfer(&src_cache, &dst_cache, mode)).with_effect(
                        CacheEffect::Mirror {
                            from: src_cache.clone(),
                            to: dst_cache.clone(),
                            keep_source: copy,
                        },
                    ),
                );
                LegKind::RemoteToRemote
            }
        }
    }

    /// Plan deleting `targets`. Local deletes go to the trash unless forced;
    /// remote deletes are always permanent.
    pub fn plan_delete(&self, batch: BatchId, targets: &[PathBuf], force: bool) -> Vec<Leg> {
        targets
            .iter()
            .map(|target| {
                let mut steps = VecDeque::new();
                let kind = match self.classify(target) {
                    Location::Local(_) => {
                        steps.push_back(Step::new(self.local_delete(target, force)));
                        LegKind::DeleteLocal
                    }
                    Location::Remote { cache, store, .. } => {
                        steps.push_back(Step::new(self.store_remove(&cache, &store)));
                        steps.push_back(
                            Step::new(JobCommand::new("rm").arg("-rf").arg(&cache))
                                .with_effect(CacheEffect::Forget(cache.clone())),
                        );
                        LegKind::DeleteRemote
                    }
                };
                Leg {
                    batch,
                    op: OperationType::Delete,
                    kind,
                    source: target.clone(),
                    target: None,
                    steps,
                    affected: target.parent().map(Path::to_path_buf).into_iter().collect(),
                }
            })
            .collect()
    }

    /// Plan creating an empty file or directory at `path`. An existing entry
    /// is never overwritten. Remote entries are created in the store first.
    pub fn plan_create(
        &self,
        batch: BatchId,
        path: &Path,
        directory: bool,
    ) -> Result<Leg, OpsError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        validate_name(&name)?;
        if path.symlink_metadata().is_ok() {
            return Err(OpsError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }

        let mut steps = VecDeque::new();
        let kind = match self.classify(path) {
            Location::Local(_) => {
                steps.push_back(Step::new(local_create(path, directory)));
                LegKind::CreateLocal
            }
            Location::Remote { store, .. } => {
                let push = if directory {
                    self.tool.mkdir(&store)
                } else {
                    self.tool.touch(&store)
                };
                steps.push_back(Step::new(push));
                steps.push_back(
                    Step::new(local_create(path, directory))
                        .with_effect(CacheEffect::MarkFresh(path.to_path_buf())),
                );
                LegKind::CreateRemote
            }
        };

        Ok(Leg {
            batch,
            op: OperationType::Create,
            kind,
            source: path.to_path_buf(),
            target: Some(path.to_path_buf()),
            steps,
            affected: path.parent().map(Path::to_path_buf).into_iter().collect(),
        })
    }

    /// Plan renaming entries within their own directories.
    ///
    /// Nothing is planned if a name is invalid or a new path is taken.
    /// Renames nested inside another renamed entry share its leg and run
    /// deepest first, so each `mv` finds its source where it expects it.
    pub fn plan_rename(
        &self,
        batch: BatchId,
        renames: &[(PathBuf, String)],
    ) -> Result<Vec<Leg>, OpsError> {
        let mut claimed = HashSet::new();
        let mut moves = Vec::new();
        for (source, name) in renames {
            validate_name(name)?;
            let Some(parent) = source.parent() else {
                tracing::warn!(source = %source.display(), "cannot rename a root directory");
                continue;
            };
            let target = parent.join(name);
            if target == *source {
                continue;
            }
            if target.symlink_metadata().is_ok() || !claimed.insert(target.clone()) {
                return Err(OpsError::AlreadyExists { path: target });
            }
            moves.push((source.clone(), target));
        }

        moves.sort_by_key(|(source, _)| source.components().count());
        let mut groups: Vec<Vec<(PathBuf, PathBuf)>> = Vec::new();
        for (source, target) in moves {
            match groups.iter_mut().find(|g| source.starts_with(&g[0].0)) {
                Some(group) => group.push((source, target)),
                None => groups.push(vec![(source, target)]),
            }
        }

        Ok(groups
            .into_iter()
            .map(|group| self.rename_leg(batch, group))
            .collect())
    }

    fn rename_leg(&self, batch: BatchId, mut group: Vec<(PathBuf, PathBuf)>) -> Leg {
        let (source, target) = group[0].clone();
        group.reverse();

        let mut steps = VecDeque::new();
        let mut affected: Vec<PathBuf> = Vec::new();
        let mut kind = LegKind::RenameLocal;
        for (from, to) in &group {
            match (self.classify(from), self.classify(to)) {
                (
                    Location::Remote {
                        store: from_store, ..
                    },
                    Location::Remote { store: to_store, .. },
                ) => {
                    kind = LegKind::RenameRemote;
                    steps.push_back(Step::new(self.tool.moveto(&from_store, &to_store)));
                    steps.push_back(
                        Step::new(local_transfer(from, to, TransferMode::Move)).with_effect(
                            CacheEffect::Mirror {
                                from: from.clone(),
                                to: to.clone(),
                                keep_source: false,
                            },
                        ),
                    );
                }
                _ => steps.push_back(Step::new(local_transfer(from, to, TransferMode::Move))),
            }
            if let Some(parent) = from.parent() {
                let parent = renamed_path(parent, &group);
                if !affected.contains(&parent) {
                    affected.push(parent);
                }
            }
        }

        Leg {
            batch,
            op: OperationType::Rename,
            kind,
            source,
            target: Some(target),
            steps,
            affected,
        }
    }

    /// Plan listing the remote directory mirrored at `dir`.
    pub fn plan_listing(&self, dir: &Path) -> Result<ListingPlan, OpsError> {
        match self.classify(dir) {
            Location::Remote { cache, store, .. } => Ok(ListingPlan {
                dir: cache,
                command: self.tool.lsf(&store),
            }),
            Location::Local(path) => Err(OpsError::UnknownMount { path }),
        }
    }

    fn local_delete(&self, target: &Path, force: bool) -> JobCommand {
        if force {
            return JobCommand::new("rm").arg("-rf").arg(target);
        }
        match self.trash.as_deref() {
            Some([program, args @ ..]) => JobCommand::new(program).args(args).arg(target),
            _ => JobCommand::new("rm").arg("-r").arg(target),
        }
    }

    fn store_remove(&self, cache: &Path, store: &str) -> JobCommand {
        if cache.is_dir() {
            self.tool.purge(store)
        } else {
            self.tool.deletefile(store)
        }
    }
}

fn local_transfer(source: &Path, target: &Path, mode: TransferMode) -> JobCommand {
    match mode {
        TransferMode::Copy => JobCommand::new("cp").arg("-R").arg(source).arg(target),
        TransferMode::Move => JobCommand::new("mv").arg(source).arg(target),
    }
}

fn local_create(path: &Path, directory: bool) -> JobCommand {
    if directory {
        JobCommand::new("mkdir").arg("-p").arg(path)
    } else {
        JobCommand::new("touch").arg(path)
    }
}

/// Where `path` ends up once every rename of `moves` (deepest first) is done.
fn renamed_path(path: &Path, moves: &[(PathBuf, PathBuf)]) -> PathBuf {
    moves
        .iter()
        .fold(path.to_path_buf(), |current, (from, to)| {
            match current.strip_prefix(from) {
                Ok(rel) if rel.as_os_str().is_empty() => to.clone(),
                Ok(rel) => to.join(rel),
                Err(_) => current,
            }
        })
}

/// Refuse a destination that is one of the sources or lies inside one.
pub fn check_cyclic(sources: &[PathBuf], destination: &Path) -> Result<(), OpsError> {
    if sources.iter().any(|s| destination.starts_with(s)) {
        return Err(OpsError::CyclicPaste {
            destination: destination.to_path_buf(),
        });
    }
    Ok(())
}

/// First trash command found on `PATH`.
pub fn detect_trash_command() -> Option<Vec<String>> {
    let found = TRASH_CANDIDATES
        .iter()
        .find(|cmd| which::which(cmd[0]).is_ok())?;
    tracing::debug!(command = ?found, "detected trash command");
    Some(found.iter().map(|s| s.to_string()).collect())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::remote::RemoteMount;

    fn engine(cache: &Path) -> SyncEngine {
        SyncEngine::new(
            MountTable::new(vec![RemoteMount::new("store", "store:", cache)]),
            SyncTool::new("rclone"),
            None,
        )
    }

    fn commands(leg: &Leg) -> Vec<String> {
        leg.steps.iter().map(|s| s.command.to_string()).collect()
    }

    #[test]
    fn test_cyclic_destination_rejected() {
        let sources = vec![PathBuf::from("/a/dir")];
        assert!(check_cyclic(&sources, Path::new("/a/dir")).is_err());
        assert!(check_cyclic(&sources, Path::new("/a/dir/sub")).is_err());
        assert!(check_cyclic(&sources, Path::new("/a/dir2")).is_ok());
        assert!(check_cyclic(&sources, Path::new("/a")).is_ok());
    }

    #[test]
    fn test_local_copy_renames_on_clash() {
        let tmp = tempfile::TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(src.join("a.txt"), b"x").unwrap();
        fs::write(dst.join("a.txt"), b"y").unwrap();

        let engine = engine(&tmp.path().join("cache"));
        let legs = engine
            .plan_transfer(
                BatchId(1),
                &[src.join("a.txt")],
                &dst,
                TransferMode::Copy,
                &CacheLedger::new(),
            )
            .unwrap();

        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].kind, LegKind::LocalToLocal);
        assert_eq!(legs[0].target.as_deref(), Some(dst.join("a (1).txt").as_path()));
        assert_eq!(legs[0].steps.len(), 1);
    }

    #[test]
    fn test_move_into_own_parent_is_noop() {
        let engine = engine(Path::new("/cache"));
        let legs = engine
            .plan_transfer(
                BatchId(1),
                &[PathBuf::from("/d/x")],
                Path::new("/d"),
                TransferMode::Move,
                &CacheLedger::new(),
            )
            .unwrap();
        assert!(legs.is_empty());
    }

    #[test]
    fn test_remote_to_local_skips_fetch_when_fresh() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        let local = tmp.path().join("local");
        fs::create_dir_all(cache.join("docs")).unwrap();
        fs::create_dir_all(&local).unwrap();

        let engine = engine(&cache);
        let mut ledger = CacheLedger::new();
        let sources = vec![cache.join("docs")];

        let legs = engine
            .plan_transfer(BatchId(1), &sources, &local, TransferMode::Move, &ledger)
            .unwrap();
        let cmds = commands(&legs[0]);
        assert_eq!(legs[0].kind, LegKind::RemoteToLocal);
        assert_eq!(cmds.len(), 4);
        assert!(cmds[0].starts_with("rclone copyto store:docs "));
        assert_eq!(cmds[2], "rclone purge store:docs");

        ledger.mark_fresh(cache.join("docs"));
        let legs = engine
            .plan_transfer(BatchId(2), &sources, &local, TransferMode::Copy, &ledger)
            .unwrap();
        assert_eq!(commands(&legs[0]).len(), 1);
        assert!(commands(&legs[0])[0].starts_with("cp -R "));
    }

    #[test]
    fn test_local_to_remote_pushes_first() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        fs::create_dir_all(&cache).unwrap();
        fs::write(tmp.path().join("f.txt"), b"x").unwrap();

        let engine = engine(&cache);
        let legs = engine
            .plan_transfer(
                BatchId(1),
                &[tmp.path().join("f.txt")],
                &cache,
                TransferMode::Copy,
                &CacheLedger::new(),
            )
            .unwrap();
        let leg = &legs[0];
        assert_eq!(leg.kind, LegKind::LocalToRemote);
        assert!(commands(leg)[0].ends_with(" store:f.txt"));
        assert_eq!(
            leg.steps[1].effect,
            Some(CacheEffect::MarkFresh(cache.join("f.txt")))
        );
    }

    #[test]
    fn test_delete_plans() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        fs::create_dir_all(&cache).unwrap();
        fs::write(cache.join("r.txt"), b"").unwrap();

        let mut engine = engine(&cache);
        let legs = engine.plan_delete(
            BatchId(1),
            &[PathBuf::from("/l/a"), cache.join("r.txt")],
            false,
        );
        assert_eq!(commands(&legs[0]), vec!["rm -r /l/a"]);
        assert_eq!(legs[0].affected, vec![PathBuf::from("/l")]);
        assert_eq!(legs[1].kind, LegKind::DeleteRemote);
        assert_eq!(commands(&legs[1])[0], "rclone deletefile store:r.txt");

        engine.trash = Some(vec!["gio".into(), "trash".into()]);
        let legs = engine.plan_delete(BatchId(2), &[PathBuf::from("/l/a")], false);
        assert_eq!(commands(&legs[0]), vec!["gio trash /l/a"]);
        let legs = engine.plan_delete(BatchId(3), &[PathBuf::from("/l/a")], true);
        assert_eq!(commands(&legs[0]), vec!["rm -rf /l/a"]);
    }

    #[test]
    fn test_create_plans() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        fs::create_dir_all(&cache).unwrap();
        fs::write(tmp.path().join("taken"), b"").unwrap();
        let engine = engine(&cache);

        let leg = engine
            .plan_create(BatchId(1), &tmp.path().join("fresh"), true)
            .unwrap();
        assert_eq!(leg.kind, LegKind::CreateLocal);
        assert!(commands(&leg)[0].starts_with("mkdir -p "));
        assert_eq!(leg.affected, vec![tmp.path().to_path_buf()]);

        let leg = engine
            .plan_create(BatchId(2), &cache.join("notes.txt"), false)
            .unwrap();
        assert_eq!(leg.kind, LegKind::CreateRemote);
        assert_eq!(commands(&leg)[0], "rclone touch store:notes.txt");
        assert!(commands(&leg)[1].starts_with("touch "));
        assert_eq!(
            leg.steps[1].effect,
            Some(CacheEffect::MarkFresh(cache.join("notes.txt")))
        );

        assert!(matches!(
            engine.plan_create(BatchId(3), &tmp.path().join("taken"), false),
            Err(OpsError::AlreadyExists { .. })
        ));
        assert!(matches!(
            engine.plan_create(BatchId(4), Path::new("/"), true),
            Err(OpsError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_nested_renames_share_a_leg() {
        let engine = engine(Path::new("/cache"));
        let renames = vec![
            (PathBuf::from("/w/dir"), "zdir".to_string()),
            (PathBuf::from("/w/dir/subdir"), "ysubdir".to_string()),
            (PathBuf::from("/w/other"), "xother".to_string()),
            (PathBuf::from("/w/dir/a"), "wa".to_string()),
            (PathBuf::from("/w/same"), "same".to_string()),
        ];
        let legs = engine.plan_rename(BatchId(1), &renames).unwrap();

        assert_eq!(legs.len(), 2);
        let nested = &legs[0];
        assert_eq!(nested.kind, LegKind::RenameLocal);
        assert_eq!(nested.source, PathBuf::from("/w/dir"));
        assert_eq!(nested.target.as_deref(), Some(Path::new("/w/zdir")));
        assert_eq!(
            commands(nested),
            vec![
                "mv /w/dir/a /w/dir/wa",
                "mv /w/dir/subdir /w/dir/ysubdir",
                "mv /w/dir /w/zdir",
            ]
        );
        assert_eq!(nested.affected, vec![PathBuf::from("/w/zdir"), PathBuf::from("/w")]);
        assert_eq!(commands(&legs[1]), vec!["mv /w/other /w/xother"]);
    }

    #[test]
    fn test_rename_refusals() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join("a"), b"").unwrap();
        fs::write(tmp.path().join("b"), b"").unwrap();
        let engine = engine(&tmp.path().join("cache"));

        let clash = vec![(tmp.path().join("a"), "b".to_string())];
        assert!(matches!(
            engine.plan_rename(BatchId(1), &clash),
            Err(OpsError::AlreadyExists { .. })
        ));
        let twice = vec![
            (tmp.path().join("a"), "c".to_string()),
            (tmp.path().join("b"), "c".to_string()),
        ];
        assert!(engine.plan_rename(BatchId(2), &twice).is_err());
        let bad = vec![(tmp.path().join("a"), "x/y".to_string())];
        assert!(matches!(
            engine.plan_rename(BatchId(3), &bad),
            Err(OpsError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_remote_rename_mirrors_cache() {
        let engine = engine(Path::new("/cache"));
        let renames = vec![(PathBuf::from("/cache/docs"), "papers".to_string())];
        let legs = engine.plan_rename(BatchId(1), &renames).unwrap();
        assert_eq!(legs[0].kind, LegKind::RenameRemote);
        assert_eq!(
            commands(&legs[0]),
            vec![
                "rclone moveto store:docs store:papers",
                "mv /cache/docs /cache/papers",
            ]
        );
        assert_eq!(
            legs[0].steps[1].effect,
            Some(CacheEffect::Mirror {
                from: PathBuf::from("/cache/docs"),
                to: PathBuf::from("/cache/papers"),
                keep_source: false,
            })
        );
    }

    #[test]
    fn test_listing_requires_mount() {
        let engine = engine(Path::new("/cache"));
        let plan = engine.plan_listing(Path::new("/cache/docs")).unwrap();
        assert_eq!(
            plan.command.to_string(),
            "rclone lsf --format ps --separator ; store:docs"
        );
        assert!(matches!(
            engine.plan_listing(Path::new("/home")),
            Err(OpsError::UnknownMount { .. })
        ));
    }
}
