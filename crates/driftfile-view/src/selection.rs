//! Pick/cut/copy state for one view.

use std::path::{Path, PathBuf};

use driftfile_core::NodeId;
use driftfile_ops::TransferMode;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::Display;

/// What the user intends to do with a tagged node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum Intent {
    /// Marked for a later batch action.
    Pick,
    Cut,
    Copy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Pending {
    path: PathBuf,
    intent: Intent,
}

/// Sources ready for a paste.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Materialized {
    /// `Move` if anything was cut, `Copy` if only copies, `None` if empty.
    pub mode: Option<TransferMode>,
    /// Sources in the order they were tagged.
    pub paths: Vec<PathBuf>,
    /// Entries dropped because their node or path disappeared.
    pub stale: Vec<PathBuf>,
}

/// Ordered map from node to intent. A node carries at most one tag.
#[derive(Debug, Clone, Default)]
pub struct PendingSelection {
    entries: IndexMap<NodeId, Pending>,
}

impl PendingSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tag of a node, if any.
    pub fn intent(&self, id: NodeId) -> Option<Intent> {
        self.entries.get(&id).map(|p| p.intent)
    }

    /// Whether any node carries `intent`.
    pub fn has(&self, intent: Intent) -> bool {
        self.entries.values().any(|p| p.intent == intent)
    }

    /// Tagged paths with `intent`, in tagging order.
    pub fn paths(&self, intent: Intent) -> Vec<PathBuf> {
        self.entries
            .values()
            .filter(|p| p.intent == intent)
            .map(|p| p.path.clone())
            .collect()
    }

    /// Toggle `intent` on a node: the same tag clears it, any other tag is
    /// replaced. Returns the node's tag afterwards.
    pub fn toggle(&mut self, id: NodeId, path: impl Into<PathBuf>, intent: Intent) -> Option<Intent> {
        match self.entries.get_mut(&id) {
            Some(pending) if pending.intent == intent => {
                self.entries.shift_remove(&id);
                None
            }
            Some(pending) => {
                pending.intent = intent;
                Some(intent)
            }
            None => {
                self.entries.insert(
                    id,
                    Pending {
                        path: path.into(),
                        intent,
                    },
                );
                Some(intent)
            }
        }
    }

    /// Apply [`toggle`](Self::toggle) to every node in the range.
    pub fn set_range<I, P>(&mut self, nodes: I, intent: Intent)
    where
        I: IntoIterator<Item = (NodeId, P)>,
        P: Into<PathBuf>,
    {
        for (id, path) in nodes {
            self.toggle(id, path, intent);
        }
    }

    /// Turn every pick into `intent`. Returns how many were converted.
    pub fn convert_picks(&mut self, intent: Intent) -> usize {
        let mut converted = 0;
        for pending in self.entries.values_mut() {
            if pending.intent == Intent::Pick {
                pending.intent = intent;
                converted += 1;
            }
        }
        converted
    }

    /// Remove and return the picked paths.
    pub fn take_picks(&mut self) -> Vec<PathBuf> {
        let mut picked = Vec::new();
        self.entries.retain(|_, pending| {
            if pending.intent == Intent::Pick {
                picked.push(pending.path.clone());
                false
            } else {
                true
            }
        });
        picked
    }

    /// Resolve the cut or copy set into source paths.
    ///
    /// The cut set wins over the copy set. Entries for which `is_live` is
    /// false are dropped and reported as stale.
    pub fn materialize(&self, is_live: impl Fn(NodeId, &Path) -> bool) -> Materialized {
        let mode = if self.has(Intent::Cut) {
            TransferMode::Move
        } else if self.has(Intent::Copy) {
            TransferMode::Copy
        } else {
            return Materialized::default();
        };
        let wanted = match mode {
            TransferMode::Move => Intent::Cut,
            TransferMode::Copy => Intent::Copy,
        };

        let mut out = Materialized {
            mode: Some(mode),
            ..Materialized::default()
        };
        for (id, pending) in &self.entries {
            if pending.intent != wanted {
                continue;
            }
            if is_live(*id, &pending.path) {
                out.paths.push(pending.path.clone());
            } else {
                out.stale.push(pending.path.clone());
            }
        }
        out
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate over `(node, path, intent)` in tagging order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Path, Intent)> {
        self.entries
            .iter()
            .map(|(id, p)| (*id, p.path.as_path(), p.intent))
    }
}
