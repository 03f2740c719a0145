//! The engine: owns the views and runs every command and API call.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use driftfile_core::{DirRef, EngineConfig, FsError, LocalLister, NodeId, NodeKind, ViewTree};
use driftfile_ops::{
    BatchId, BatchReport, CacheLedger, FileOperation, JobHost, JobId, JobRunner, LegHost,
    LegReport, ListingSync, OpCounter, OperationError, OpsError, SyncEngine, TransferMode,
    dispatch, drain, launch_leg, launch_listing, pump_until_quiescent, validate_name,
};
use indexmap::IndexMap;
use itertools::Itertools;

use crate::bookmark::BookmarkTable;
use crate::command::{Command, parse_command};
use crate::error::EngineError;
use crate::notice::Notice;
use crate::reconcile::{ReconcileStats, TreeReconciler};
use crate::selection::{Intent, PendingSelection};

/// Identity of an open view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u64);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view {}", self.0)
    }
}

/// Something the host has to do on the engine's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostRequest {
    /// Open a file in the editor.
    Edit(PathBuf),
}

/// One rendered line of a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLine {
    pub depth: u32,
    pub name: String,
    pub path: PathBuf,
    pub kind: NodeKind,
    pub expanded: bool,
    pub tag: Option<Intent>,
    /// File size; `None` for directories.
    pub size: Option<u64>,
    pub cursor: bool,
}

impl fmt::Display for DisplayLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self.tag {
            Some(Intent::Pick) => '*',
            Some(Intent::Cut) => '-',
            Some(Intent::Copy) => '+',
            None => ' ',
        };
        let suffix = if self.kind.is_expandable() { "/" } else { "" };
        write!(
            f,
            "{marker}{:indent$}{}{suffix}",
            "",
            self.name,
            indent = self.depth as usize * 2
        )
    }
}

/// One editor view: the tree it shows, trees of directories it showed
/// before, and its selection and in-flight counter.
#[derive(Debug)]
pub struct View {
    tree: ViewTree,
    visited: HashMap<PathBuf, ViewTree>,
    selection: PendingSelection,
    counter: OpCounter,
}

impl View {
    pub fn tree(&self) -> &ViewTree {
        &self.tree
    }

    pub fn root(&self) -> &Path {
        self.tree.root()
    }

    pub fn selection(&self) -> &PendingSelection {
        &self.selection
    }

    pub fn counter(&self) -> &OpCounter {
        &self.counter
    }

    /// Whether `id` belongs to any tree this view has shown.
    fn knows(&self, id: NodeId) -> bool {
        self.tree.contains(id) || self.visited.values().any(|t| t.contains(id))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.tree.root().join(path)
        }
    }
}

/// The file-operation engine.
///
/// Runs on a single-threaded event loop: commands mutate views directly,
/// file operations run as background jobs, and their completions come back
/// through [`Engine::process_next`] or the waiting helpers.
pub struct Engine {
    config: EngineConfig,
    sync: SyncEngine,
    runner: JobRunner<Engine>,
    ledger: CacheLedger,
    lister: LocalLister,
    views: IndexMap<ViewId, View>,
    next_view: u64,
    next_batch: u64,
    batches: HashMap<BatchId, BatchReport>,
    notices: VecDeque<Notice>,
    requests: VecDeque<HostRequest>,
    bookmarks: BookmarkTable,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let sync = SyncEngine::from_config(&config);
        Self::with_sync(config, sync)
    }

    /// Build with an explicit sync engine.
    pub fn with_sync(config: EngineConfig, sync: SyncEngine) -> Self {
        let bookmarks = match &config.bookmark_file {
            Some(path) => BookmarkTable::load(path).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "could not read bookmarks");
                BookmarkTable::new()
            }),
            None => BookmarkTable::new(),
        };
        Self {
            config,
            sync,
            runner: JobRunner::new(),
            ledger: CacheLedger::new(),
            lister: LocalLister::new(),
            views: IndexMap::new(),
            next_view: 0,
            next_batch: 0,
            batches: HashMap::new(),
            notices: VecDeque::new(),
            requests: VecDeque::new(),
            bookmarks,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sync(&self) -> &SyncEngine {
        &self.sync
    }

    pub fn cache_ledger(&self) -> &CacheLedger {
        &self.ledger
    }

    pub fn bookmarks(&self) -> &BookmarkTable {
        &self.bookmarks
    }

    pub fn view(&self, id: ViewId) -> Option<&View> {
        self.views.get(&id)
    }

    pub fn views(&self) -> impl Iterator<Item = (ViewId, &View)> {
        self.views.iter().map(|(id, v)| (*id, v))
    }

    fn view_ref(&self, id: ViewId) -> Result<&View, EngineError> {
        self.views.get(&id).ok_or(EngineError::UnknownView(id))
    }

    fn view_mut(&mut self, id: ViewId) -> Result<&mut View, EngineError> {
        self.views.get_mut(&id).ok_or(EngineError::UnknownView(id))
    }

    /// Open a view on a directory.
    pub fn open_view(&mut self, root: impl AsRef<Path>) -> Result<ViewId, EngineError> {
        let root = absolute(root.as_ref())?;
        let mut tree = ViewTree::new(&root, self.config.sort_order(), self.config.show_hidden);
        TreeReconciler::new(&self.lister).refresh(&mut tree, DirRef::Root)?;

        self.next_view += 1;
        let id = ViewId(self.next_view);
        self.views.insert(
            id,
            View {
                tree,
                visited: HashMap::new(),
                selection: PendingSelection::new(),
                counter: OpCounter::new(),
            },
        );
        tracing::debug!(view = %id, root = %root.display(), "opened view");
        self.pull_remote(id, &root);
        Ok(id)
    }

    /// Close a view. Jobs it started keep running.
    pub fn close_view(&mut self, id: ViewId) -> bool {
        self.views.shift_remove(&id).is_some()
    }

    /// Drain queued notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    /// Drain queued host requests.
    pub fn take_requests(&mut self) -> Vec<HostRequest> {
        self.requests.drain(..).collect()
    }

    /// Visible lines of a view, top to bottom.
    pub fn render(&self, id: ViewId) -> Result<Vec<DisplayLine>, EngineError> {
        let view = self.view_ref(id)?;
        let cursor = view.tree.cursor();
        Ok(view
            .tree
            .visible()
            .into_iter()
            .enumerate()
            .map(|(i, node)| DisplayLine {
                depth: node.depth,
                name: node.name().to_string(),
                path: node.path().to_path_buf(),
                kind: node.kind().clone(),
                expanded: node.expanded,
                tag: view.selection.intent(node.id),
                size: node
                    .entry
                    .stat
                    .filter(|_| !node.is_dir())
                    .map(|s| s.size),
                cursor: i == cursor,
            })
            .collect())
    }

    /// Run a command line such as `go_bookmark a`.
    pub fn execute(&mut self, id: ViewId, line: &str) -> Result<(), EngineError> {
        match parse_command(line) {
            None => Ok(()),
            Some(Ok((command, arg))) => self.dispatch_command(id, command, arg.as_deref()),
            Some(Err(name)) => Err(EngineError::UnknownCommand { name }),
        }
    }

    /// Run a command by name.
    pub fn invoke(&mut self, id: ViewId, name: &str, arg: Option<&str>) -> Result<(), EngineError> {
        let command = name
            .parse::<Command>()
            .map_err(|_| EngineError::UnknownCommand {
                name: name.to_string(),
            })?;
        self.dispatch_command(id, command, arg)
    }

    pub fn dispatch_command(
        &mut self,
        id: ViewId,
        command: Command,
        arg: Option<&str>,
    ) -> Result<(), EngineError> {
        self.view_ref(id)?;
        if command.requires_argument() && arg.is_none() {
            return Err(EngineError::MissingArgument { command });
        }
        tracing::debug!(view = %id, %command, ?arg, "command");

        match command {
            Command::MoveDown => {
                let step = parse_step(command, arg)?;
                self.move_cursor(id, step)
            }
            Command::MoveUp => {
                let step = parse_step(command, arg)?;
                self.move_cursor(id, -step)
            }
            Command::Open => self.open(id),
            Command::Parent => self.parent(id),
            Command::ToggleExpand => self.toggle_expand(id),
            Command::ToggleExpandRecursive => self.toggle_expand_recursive(id),
            Command::GoPrevSibling => self.go_sibling(id, false),
            Command::GoNextSibling => self.go_sibling(id, true),
            Command::Refresh => self.refresh(id).map(drop),
            Command::ToggleHidden => self.toggle_hidden(id),
            Command::CycleSort => self.cycle_sort(id),
            Command::TogglePick => {
                let count = parse_count(command, arg)?;
                self.toggle_pick(id, count)
            }
            Command::Cut => self.tag(id, Intent::Cut, false),
            Command::CutSingle => self.tag(id, Intent::Cut, true),
            Command::Copy => self.tag(id, Intent::Copy, false),
            Command::CopySingle => self.tag(id, Intent::Copy, true),
            Command::Paste => self.paste(id).map(drop),
            Command::NewFile => self.create(id, arg.unwrap_or_default(), false).map(drop),
            Command::NewDirectory => self.create(id, arg.unwrap_or_default(), true).map(drop),
            Command::Rename => {
                let path = self.current_node_path(id).ok_or(EngineError::NoCurrentNode)?;
                self.rename(id, path, arg.unwrap_or_default()).map(drop)
            }
            Command::Delete => self.delete(id, true, false).map(drop),
            Command::DeleteSingle => self.delete(id, false, false).map(drop),
            Command::ForceDelete => self.delete(id, true, true).map(drop),
            Command::ForceDeleteSingle => self.delete(id, false, true).map(drop),
            Command::SetBookmark => {
                let mark = parse_mark(command, arg)?;
                self.set_bookmark(id, mark)
            }
            Command::GoBookmark => {
                let mark = parse_mark(command, arg)?;
                self.go_bookmark(id, mark)
            }
        }
    }

    fn move_cursor(&mut self, id: ViewId, delta: isize) -> Result<(), EngineError> {
        self.view_mut(id)?.tree.move_cursor(delta);
        Ok(())
    }

    fn open(&mut self, id: ViewId) -> Result<(), EngineError> {
        let view = self.view_ref(id)?;
        let node = view.tree.current().ok_or(EngineError::NoCurrentNode)?;
        let path = node.path().to_path_buf();
        if node.is_dir() {
            self.enter(id, &path)
        } else {
            self.requests.push_back(HostRequest::Edit(path));
            Ok(())
        }
    }

    /// Show `dir` in the view. A directory shown before comes back with its
    /// expansion and cursor, reconciled against the filesystem.
    pub fn enter(&mut self, id: ViewId, dir: &Path) -> Result<(), EngineError> {
        let dir = absolute(dir)?;
        let view = self.views.get_mut(&id).ok_or(EngineError::UnknownView(id))?;
        let order = view.tree.order();
        let show_hidden = view.tree.show_hidden();

        let mut tree = if view.tree.root() == dir {
            view.tree.clone()
        } else {
            view.visited
                .remove(&dir)
                .unwrap_or_else(|| ViewTree::new(&dir, order, show_hidden))
        };
        tree.set_order(order);
        tree.set_show_hidden(show_hidden);
        tree.continue_ids(&view.tree);

        if let Err(e) = TreeReconciler::new(&self.lister).refresh(&mut tree, DirRef::Root) {
            if tree.root() != view.tree.root() {
                view.visited.insert(dir, tree);
            }
            return Err(e.into());
        }

        let previous = std::mem::replace(&mut view.tree, tree);
        if previous.root() != view.tree.root() {
            view.visited.insert(previous.root().to_path_buf(), previous);
        }
        self.pull_remote(id, &dir);
        Ok(())
    }

    fn parent(&mut self, id: ViewId) -> Result<(), EngineError> {
        let old_root = self.view_ref(id)?.root().to_path_buf();
        let Some(parent) = old_root.parent() else {
            return Ok(());
        };
        self.enter(id, parent)?;

        let view = self.view_mut(id)?;
        if let Some(node) = view.tree.find_path(&old_root).map(|n| n.id) {
            view.tree.focus(node);
        }
        Ok(())
    }

    fn toggle_expand(&mut self, id: ViewId) -> Result<(), EngineError> {
        let view = self.views.get_mut(&id).ok_or(EngineError::UnknownView(id))?;
        let Some(node) = view.tree.current() else {
            return Ok(());
        };
        if !node.is_dir() {
            return Ok(());
        }
        let (node, expanded, path) = (node.id, node.expanded, node.path().to_path_buf());

        view.tree.set_expanded(node, !expanded);
        if !expanded {
            TreeReconciler::new(&self.lister).refresh(&mut view.tree, DirRef::Node(node))?;
            self.pull_remote(id, &path);
        }
        Ok(())
    }

    fn toggle_expand_recursive(&mut self, id: ViewId) -> Result<(), EngineError> {
        let view = self.views.get_mut(&id).ok_or(EngineError::UnknownView(id))?;
        let Some(node) = view.tree.current() else {
            return Ok(());
        };
        if !node.is_dir() {
            return Ok(());
        }
        let (node, expanded) = (node.id, node.expanded);
        if expanded {
            view.tree.collapse_all(node);
            return Ok(());
        }

        let reconciler = TreeReconciler::new(&self.lister);
        let mut pending = vec![node];
        let mut expanded_dirs = Vec::new();
        while let Some(dir) = pending.pop() {
            view.tree.set_expanded(dir, true);
            if let Err(e) = reconciler.refresh(&mut view.tree, DirRef::Node(dir)) {
                tracing::warn!(error = %e, "could not expand directory");
                view.tree.set_expanded(dir, false);
                continue;
            }
            if let Some(path) = view.tree.node(dir).map(|n| n.path().to_path_buf()) {
                expanded_dirs.push(path);
            }
            pending.extend(view.tree.child_dirs(dir));
        }
        for dir in expanded_dirs {
            self.pull_remote(id, &dir);
        }
        Ok(())
    }

    fn go_sibling(&mut self, id: ViewId, forward: bool) -> Result<(), EngineError> {
        let view = self.view_mut(id)?;
        let target = if forward {
            view.tree.next_sibling()
        } else {
            view.tree.prev_sibling()
        };
        if let Some(index) = target {
            view.tree.set_cursor(index);
        }
        Ok(())
    }

    /// Re-list the view root and its expanded directories, pulling remote
    /// listings where they are backed by a store.
    pub fn refresh(&mut self, id: ViewId) -> Result<ReconcileStats, EngineError> {
        let view = self.views.get_mut(&id).ok_or(EngineError::UnknownView(id))?;
        let stats = TreeReconciler::new(&self.lister).refresh(&mut view.tree, DirRef::Root)?;

        let mut remote_dirs = vec![view.tree.root().to_path_buf()];
        remote_dirs.extend(
            view.tree
                .visible()
                .into_iter()
                .filter(|n| n.expanded)
                .map(|n| n.path().to_path_buf()),
        );
        for dir in remote_dirs {
            self.pull_remote(id, &dir);
        }
        Ok(stats)
    }

    fn toggle_hidden(&mut self, id: ViewId) -> Result<(), EngineError> {
        let view = self.views.get_mut(&id).ok_or(EngineError::UnknownView(id))?;
        let show = !view.tree.show_hidden();
        view.tree.set_show_hidden(show);
        TreeReconciler::new(&self.lister).refresh(&mut view.tree, DirRef::Root)?;
        Ok(())
    }

    fn cycle_sort(&mut self, id: ViewId) -> Result<(), EngineError> {
        let view = self.views.get_mut(&id).ok_or(EngineError::UnknownView(id))?;
        let mut order = view.tree.order();
        order.key = order.key.next();
        view.tree.set_order(order);
        TreeReconciler::new(&self.lister).refresh(&mut view.tree, DirRef::Root)?;
        self.notices
            .push_back(Notice::info(format!("Sorted by {}", order.key)));
        Ok(())
    }

    fn toggle_pick(&mut self, id: ViewId, count: usize) -> Result<(), EngineError> {
        let view = self.view_mut(id)?;
        let cursor = view.tree.cursor();
        let nodes: Vec<(NodeId, PathBuf)> = view
            .tree
            .visible()
            .into_iter()
            .skip(cursor)
            .take(count)
            .map(|n| (n.id, n.path().to_path_buf()))
            .collect();
        view.selection.set_range(nodes, Intent::Pick);
        Ok(())
    }

    /// Cut or copy: converts the picks if there are any, otherwise toggles
    /// the node under the cursor. `single` always acts on the cursor.
    fn tag(&mut self, id: ViewId, intent: Intent, single: bool) -> Result<(), EngineError> {
        let view = self.view_mut(id)?;
        if !single && view.selection.has(Intent::Pick) {
            view.selection.convert_picks(intent);
            return Ok(());
        }
        let Some(node) = view.tree.current() else {
            return Ok(());
        };
        let (node, path) = (node.id, node.path().to_path_buf());
        view.selection.toggle(node, path, intent);
        Ok(())
    }

    /// Paste the cut (or else copied) nodes of every view into the root of
    /// view `id`. Selections are cleared once the legs are started.
    ///
    /// A paste moves or copies, never both: when any view holds cut nodes,
    /// pending copies are discarded along with the rest of the selection.
    pub fn paste(&mut self, id: ViewId) -> Result<Vec<JobId>, EngineError> {
        let destination = self.view_ref(id)?.root().to_path_buf();

        let mut moves = Vec::new();
        let mut copies = Vec::new();
        let mut stale = Vec::new();
        for view in self.views.values() {
            let out = view
                .selection
                .materialize(|node, path| view.knows(node) && path.symlink_metadata().is_ok());
            stale.extend(out.stale);
            match out.mode {
                Some(TransferMode::Move) => moves.extend(out.paths),
                Some(TransferMode::Copy) => copies.extend(out.paths),
                None => {}
            }
        }

        if !stale.is_empty() {
            let err = OpsError::StaleSelection { dropped: stale };
            tracing::warn!(error = %err, "paste");
            self.notices.push_back(Notice::warning(err.to_string()));
        }

        let op = if !moves.is_empty() {
            FileOperation::move_to(moves, destination)
        } else if !copies.is_empty() {
            FileOperation::copy(copies, destination)
        } else {
            self.notices.push_back(Notice::info("Nothing to paste"));
            return Ok(Vec::new());
        };

        let jobs = self.run_operation(id, op)?;
        for view in self.views.values_mut() {
            view.selection.clear();
        }
        Ok(jobs)
    }

    /// Delete the picked nodes (or the node under the cursor). Refused while
    /// operations of this view are in flight.
    pub fn delete(&mut self, id: ViewId, batch: bool, force: bool) -> Result<Vec<JobId>, EngineError> {
        let view = self.view_mut(id)?;
        view.counter.ensure_quiescent()?;

        let targets = if batch && view.selection.has(Intent::Pick) {
            view.selection.take_picks()
        } else {
            let node = view.tree.current().ok_or(EngineError::NoCurrentNode)?;
            vec![node.path().to_path_buf()]
        };
        self.run_operation(id, FileOperation::delete(targets, force))
    }

    fn set_bookmark(&mut self, id: ViewId, mark: char) -> Result<(), EngineError> {
        let root = self.view_ref(id)?.root().to_path_buf();
        self.bookmarks.set(mark, root);
        if let Some(path) = &self.config.bookmark_file {
            if let Err(e) = self.bookmarks.save(path) {
                tracing::warn!(error = %e, "could not save bookmarks");
                self.notices.push_back(Notice::warning(e.to_string()));
            }
        }
        Ok(())
    }

    fn go_bookmark(&mut self, id: ViewId, mark: char) -> Result<(), EngineError> {
        let path = self
            .bookmarks
            .get(mark)
            .map(Path::to_path_buf)
            .ok_or(EngineError::UnknownBookmark(mark))?;
        self.enter(id, &path)
    }

    /// Create an empty file, or a directory, called `name` in the directory
    /// that holds the node under the cursor. An empty view creates in its
    /// root.
    pub fn create(
        &mut self,
        id: ViewId,
        name: &str,
        directory: bool,
    ) -> Result<Vec<JobId>, EngineError> {
        validate_name(name)?;
        let view = self.view_ref(id)?;
        let dir = view
            .tree
            .current()
            .and_then(|n| n.path().parent())
            .unwrap_or(view.tree.root())
            .to_path_buf();
        let path = dir.join(name);
        let op = if directory {
            FileOperation::create_directory(path)
        } else {
            FileOperation::create_file(path)
        };
        self.run_operation(id, op)
    }

    /// Give `src` the name `name` in its own directory.
    pub fn rename(
        &mut self,
        id: ViewId,
        src: impl AsRef<Path>,
        name: &str,
    ) -> Result<Vec<JobId>, EngineError> {
        self.rename_many(id, [(src.as_ref().to_path_buf(), name.to_string())])
    }

    /// Rename several entries at once. Entries may lie inside one another;
    /// nothing starts if any new name is invalid or taken.
    pub fn rename_many(
        &mut self,
        id: ViewId,
        renames: impl IntoIterator<Item = (PathBuf, String)>,
    ) -> Result<Vec<JobId>, EngineError> {
        let view = self.view_ref(id)?;
        let renames = renames
            .into_iter()
            .map(|(path, name)| (view.resolve(&path), name))
            .collect();
        self.run_operation(id, FileOperation::rename(renames))
    }

    /// Name of the node under the cursor.
    pub fn current_node_name(&self, id: ViewId) -> Option<String> {
        self.views
            .get(&id)?
            .tree
            .current()
            .map(|n| n.name().to_string())
    }

    /// Path of the node under the cursor.
    pub fn current_node_path(&self, id: ViewId) -> Option<PathBuf> {
        self.views
            .get(&id)?
            .tree
            .current()
            .map(|n| n.path().to_path_buf())
    }

    /// Copy `src` into the directory `dest`. Relative paths resolve against
    /// the view root.
    pub fn cp(
        &mut self,
        id: ViewId,
        src: impl AsRef<Path>,
        dest: impl AsRef<Path>,
    ) -> Result<Vec<JobId>, EngineError> {
        let view = self.view_ref(id)?;
        let op = FileOperation::copy(vec![view.resolve(src.as_ref())], view.resolve(dest.as_ref()));
        self.run_operation(id, op)
    }

    /// Move `src` into the directory `dest`.
    pub fn mv(
        &mut self,
        id: ViewId,
        src: impl AsRef<Path>,
        dest: impl AsRef<Path>,
    ) -> Result<Vec<JobId>, EngineError> {
        let view = self.view_ref(id)?;
        let op =
            FileOperation::move_to(vec![view.resolve(src.as_ref())], view.resolve(dest.as_ref()));
        self.run_operation(id, op)
    }

    /// Remove `src`, through the trash when one is available.
    pub fn rm(&mut self, id: ViewId, src: impl AsRef<Path>) -> Result<Vec<JobId>, EngineError> {
        self.remove(id, src, false)
    }

    /// Remove `src`; `force` deletes permanently.
    pub fn remove(
        &mut self,
        id: ViewId,
        src: impl AsRef<Path>,
        force: bool,
    ) -> Result<Vec<JobId>, EngineError> {
        let view = self.view_ref(id)?;
        let op = FileOperation::delete(vec![view.resolve(src.as_ref())], force);
        self.run_operation(id, op)
    }

    fn run_operation(&mut self, id: ViewId, op: FileOperation) -> Result<Vec<JobId>, EngineError> {
        let counter = self.view_ref(id)?.counter.clone();
        self.next_batch += 1;
        let batch = BatchId(self.next_batch);

        let legs = self.sync.plan(batch, &op, &self.ledger)?;
        if legs.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!(view = %id, batch = batch.0, legs = legs.len(), op = %op.operation_type(), "starting operation");
        self.batches
            .insert(batch, BatchReport::new(op.operation_type(), legs.len()));

        let mut jobs = Vec::new();
        let mut failures = Vec::new();
        for leg in legs {
            let source = leg.source.clone();
            match launch_leg(self, leg, &counter) {
                Ok(Some(job)) => jobs.push(job),
                Ok(None) => {}
                Err(err) => {
                    if let Some(report) = self.batches.get_mut(&batch) {
                        report.record_failure(OperationError::new(source, err.to_string()));
                    }
                    failures.push(err);
                }
            }
        }
        self.settle_batch(batch);

        if jobs.is_empty() && !failures.is_empty() {
            let first = failures.remove(0);
            for err in failures {
                self.notices.push_back(Notice::error(err.to_string()));
            }
            return Err(first.into());
        }
        for err in failures {
            self.notices.push_back(Notice::error(err.to_string()));
        }
        Ok(jobs)
    }

    fn settle_batch(&mut self, batch: BatchId) {
        if !self.batches.get(&batch).is_some_and(BatchReport::is_complete) {
            return;
        }
        if let Some(report) = self.batches.remove(&batch) {
            let notice = if report.is_success() {
                Notice::info(report.summary())
            } else {
                Notice::warning(report.summary())
            };
            self.notices.push_back(notice);
        }
    }

    fn pull_remote(&mut self, id: ViewId, dir: &Path) {
        if !self.sync.classify(dir).is_remote() {
            return;
        }
        let Some(counter) = self.views.get(&id).map(|v| v.counter.clone()) else {
            return;
        };
        let started = match self.sync.plan_listing(dir) {
            Ok(plan) => launch_listing(self, plan, &counter),
            Err(e) => Err(e),
        };
        if let Err(e) = started {
            tracing::warn!(dir = %dir.display(), error = %e, "could not list remote directory");
            self.notices.push_back(Notice::warning(e.to_string()));
        }
    }

    /// Reconcile every view that shows one of `dirs` as its root or as an
    /// expanded directory.
    fn refresh_dirs(&mut self, dirs: &[PathBuf]) {
        let reconciler = TreeReconciler::new(&self.lister);
        for view in self.views.values_mut() {
            for dir in dirs.iter().unique() {
                let target = match view.tree.dir_ref(dir) {
                    Some(DirRef::Root) => DirRef::Root,
                    Some(DirRef::Node(node)) if view.tree.node(node).is_some_and(|n| n.expanded) => {
                        DirRef::Node(node)
                    }
                    _ => continue,
                };
                if let Err(e) = reconciler.refresh(&mut view.tree, target) {
                    tracing::warn!(dir = %dir.display(), error = %e, "refresh failed");
                    self.notices.push_back(Notice::warning(e.to_string()));
                }
            }
        }
    }

    /// Dispatch job events until view `id` has nothing in flight.
    pub async fn wait_until_quiescent(
        &mut self,
        id: ViewId,
        timeout: Duration,
    ) -> Result<(), EngineError> {
        let counter = self.view_ref(id)?.counter.clone();
        pump_until_quiescent(self, &counter, timeout).await?;
        Ok(())
    }

    /// [`wait_until_quiescent`](Self::wait_until_quiescent) with the
    /// configured timeout.
    pub async fn wait(&mut self, id: ViewId) -> Result<(), EngineError> {
        let timeout = Duration::from_millis(self.config.wait_timeout_ms);
        self.wait_until_quiescent(id, timeout).await
    }

    /// Dispatch job events until no job of any view is running.
    pub async fn wait_all(&mut self, timeout: Duration) -> Result<(), EngineError> {
        drain(self, timeout).await?;
        Ok(())
    }

    /// Wait for one job event and handle it. Returns false once no job can
    /// produce events any more.
    pub async fn process_next(&mut self) -> bool {
        if self.runner.running() == 0 {
            return false;
        }
        match self.runner.next_event().await {
            Some(event) => {
                dispatch(self, event);
                true
            }
            None => false,
        }
    }

    /// Handle every job event that is already queued.
    pub fn process_ready(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.runner.try_next_event() {
            dispatch(self, event);
            handled += 1;
        }
        handled
    }
}

impl JobHost for Engine {
    fn runner(&mut self) -> &mut JobRunner<Self> {
        &mut self.runner
    }
}

impl LegHost for Engine {
    fn ledger(&mut self) -> &mut CacheLedger {
        &mut self.ledger
    }

    fn leg_finished(&mut self, report: LegReport) {
        if let Some(error) = &report.error {
            self.notices.push_back(Notice::error(error.message.clone()));
        }
        self.refresh_dirs(&report.affected);
        if let Some(batch) = self.batches.get_mut(&report.batch) {
            batch.record(&report);
        }
        self.settle_batch(report.batch);
    }

    fn listing_finished(&mut self, dir: PathBuf, result: Result<ListingSync, OpsError>) {
        match result {
            Ok(_) => self.refresh_dirs(&[dir]),
            Err(e) => self.notices.push_back(Notice::warning(e.to_string())),
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf, EngineError> {
    let path = std::path::absolute(path).map_err(|e| FsError::io(path, e))?;
    if !path.is_dir() {
        return Err(FsError::NotADirectory { path }.into());
    }
    Ok(path)
}

/// A cursor step count that fits in a signed offset.
fn parse_step(command: Command, arg: Option<&str>) -> Result<isize, EngineError> {
    let count = parse_count(command, arg)?;
    isize::try_from(count).map_err(|_| EngineError::InvalidArgument {
        command,
        arg: arg.unwrap_or_default().to_string(),
    })
}

fn parse_count(command: Command, arg: Option<&str>) -> Result<usize, EngineError> {
    match arg {
        None => Ok(1),
        Some(arg) => arg
            .trim()
            .parse::<usize>()
            .map_err(|_| EngineError::InvalidArgument {
                command,
                arg: arg.to_string(),
            }),
    }
}

fn parse_mark(command: Command, arg: Option<&str>) -> Result<char, EngineError> {
    let arg = arg.ok_or(EngineError::MissingArgument { command })?;
    arg.trim()
        .chars()
        .exactly_one()
        .map_err(|_| EngineError::InvalidArgument {
            command,
            arg: arg.to_string(),
        })
}
