//! Sort keys for directory listings.

use std::cmp::Ordering;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, FromRepr, IntoEnumIterator};

use crate::node::{Entry, Stat};

/// Sort key for sibling entries. Directories always come first.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Display,
    EnumIter,
    EnumString,
    FromRepr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Name, case-insensitive.
    #[default]
    Name,
    /// Size, largest first.
    Size,
    /// Modification time, newest first.
    Modified,
    /// File extension, then name.
    Extension,
    /// Access time, most recent first.
    Accessed,
    /// Status change time, most recent first.
    Changed,
}

impl SortKey {
    /// Cycle to the next sort key.
    pub fn next(self) -> Self {
        let current = self as usize;
        let next = (current + 1) % Self::iter().count();
        Self::from_repr(next).unwrap_or_default()
    }
}

/// A sort key plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortOrder {
    pub key: SortKey,
    pub reverse: bool,
}

impl SortOrder {
    pub fn new(key: SortKey, reverse: bool) -> Self {
        Self { key, reverse }
    }

    /// Compare two sibling entries.
    pub fn compare(&self, a: &Entry, b: &Entry) -> Ordering {
        // Directory grouping is not affected by `reverse`.
        let group = b.kind.is_expandable().cmp(&a.kind.is_expandable());
        if group != Ordering::Equal {
            return group;
        }

        let by_key = match self.key {
            SortKey::Name => Ordering::Equal,
            SortKey::Size => size_of(b).cmp(&size_of(a)),
            SortKey::Modified => newest_first(a, b, |s| s.modified),
            SortKey::Extension => extension_of(a).cmp(&extension_of(b)),
            SortKey::Accessed => newest_first(a, b, |s| s.accessed),
            SortKey::Changed => newest_first(a, b, |s| s.changed),
        };
        let ordering = by_key.then_with(|| compare_names(&a.name, &b.name));

        if self.reverse {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

fn newest_first(a: &Entry, b: &Entry, time: impl Fn(Stat) -> Option<SystemTime>) -> Ordering {
    let ta = a.stat.and_then(&time);
    let tb = b.stat.and_then(&time);
    tb.cmp(&ta)
}

fn size_of(entry: &Entry) -> u64 {
    entry.stat.map(|s| s.size).unwrap_or(0)
}

fn extension_of(entry: &Entry) -> String {
    entry
        .path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}
