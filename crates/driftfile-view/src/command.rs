//! The command table: every action a host can bind to a key.

use std::str::FromStr;

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Host commands, addressed by their snake_case name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Command {
    /// Move the cursor down (optional count).
    MoveDown,
    /// Move the cursor up (optional count).
    MoveUp,
    /// Enter the directory under the cursor, or ask the host to edit a file.
    Open,
    /// Show the parent of the view root.
    Parent,
    /// Expand or collapse the directory under the cursor.
    ToggleExpand,
    /// Expand the directory under the cursor and everything below it, or
    /// collapse it.
    ToggleExpandRecursive,
    /// Move to the previous node at the same depth, or to the parent.
    GoPrevSibling,
    GoNextSibling,
    /// Re-list the view root and every expanded directory.
    Refresh,
    /// Show or hide dot-files.
    ToggleHidden,
    /// Switch to the next sort key.
    CycleSort,
    /// Pick the node under the cursor (optional count for a range).
    TogglePick,
    /// Cut the picked nodes, or the node under the cursor.
    Cut,
    CutSingle,
    /// Copy the picked nodes, or the node under the cursor.
    Copy,
    CopySingle,
    /// Paste the cut or copied nodes of every view into this view's root.
    Paste,
    /// Create an empty file next to the node under the cursor.
    NewFile,
    NewDirectory,
    /// Give the node under the cursor a new name.
    Rename,
    /// Delete the picked nodes, or the node under the cursor.
    Delete,
    DeleteSingle,
    /// Delete permanently, bypassing the trash.
    ForceDelete,
    ForceDeleteSingle,
    /// Bookmark the view root under a mark character.
    SetBookmark,
    /// Show a bookmarked directory.
    GoBookmark,
}

impl Command {
    /// Commands that remove files and are refused while the view is busy.
    pub fn is_destructive(self) -> bool {
        matches!(
            self,
            Self::Delete | Self::DeleteSingle | Self::ForceDelete | Self::ForceDeleteSingle
        )
    }

    /// Commands that cannot run without an argument.
    pub fn requires_argument(self) -> bool {
        matches!(
            self,
            Self::SetBookmark | Self::GoBookmark | Self::NewFile | Self::NewDirectory | Self::Rename
        )
    }

    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Parse a command line: a command name followed by an optional argument.
///
/// Returns `None` for blank input and `Some(Err(name))` for unknown names.
pub fn parse_command(line: &str) -> Option<Result<(Command, Option<String>), String>> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let (name, rest) = parts.split_first()?;

    let arg = if rest.is_empty() {
        None
    } else {
        Some(rest.join(" "))
    };
    Some(
        Command::from_str(name)
            .map(|cmd| (cmd, arg))
            .map_err(|_| name.to_string()),
    )
}
