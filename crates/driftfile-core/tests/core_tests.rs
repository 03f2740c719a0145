use std::fs;
use std::path::Path;

use driftfile_core::{
    DirLister, DirRef, EngineConfig, Entry, LocalLister, NodeId, NodeKind, SortKey, SortOrder,
    TreeNode, ViewTree, stat_entry,
};
use tempfile::TempDir;

#[test]
fn test_node_id_operations() {
    let id1 = NodeId::new(42);
    let id2 = NodeId::new(42);

    assert_eq!(id1, id2);
    assert_eq!(id1.0, 42);
    assert!(NodeId::new(1) < NodeId::new(2));
}

#[test]
fn test_node_kind_discrimination() {
    let file_node = NodeKind::File { executable: false };
    assert!(file_node.is_file());
    assert!(!file_node.is_dir());
    assert!(!file_node.is_expandable());

    let dir_node = NodeKind::Directory;
    assert!(dir_node.is_dir());
    assert!(dir_node.is_expandable());

    let symlink_node = NodeKind::Symlink {
        target: "target/path".into(),
        to_dir: false,
        broken: false,
    };
    assert!(symlink_node.is_symlink());
    assert!(!symlink_node.is_expandable());
}

#[test]
fn test_stat_entry_reads_kind_and_size() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("a.txt");
    fs::write(&file, b"12345678").unwrap();

    let entry = stat_entry(&file);
    assert_eq!(entry.name.as_str(), "a.txt");
    assert!(entry.kind.is_file());
    let stat = entry.stat.unwrap();
    assert_eq!(stat.size, 8);
    assert!(stat.modified.is_some());

    let dir = stat_entry(tmp.path());
    assert!(dir.kind.is_dir());
    assert_eq!(dir.stat.map(|s| s.size), Some(0));
}

#[cfg(unix)]
#[test]
fn test_symlink_to_directory_is_expandable() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir(tmp.path().join("real")).unwrap();
    std::os::unix::fs::symlink(tmp.path().join("real"), tmp.path().join("link")).unwrap();
    std::os::unix::fs::symlink(tmp.path().join("gone"), tmp.path().join("broken")).unwrap();

    let link = stat_entry(&tmp.path().join("link"));
    assert!(link.kind.is_symlink());
    assert!(link.kind.is_expandable());

    let broken = stat_entry(&tmp.path().join("broken"));
    match broken.kind {
        NodeKind::Symlink { broken, to_dir, .. } => {
            assert!(broken);
            assert!(!to_dir);
        }
        other => panic!("Expected Symlink node kind, got {other:?}"),
    }
}

#[test]
fn test_listing_sorted_by_order() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir(tmp.path().join("subdir2")).unwrap();
    fs::create_dir(tmp.path().join("subdir")).unwrap();
    fs::write(tmp.path().join("a"), b"").unwrap();

    let order = SortOrder::new(SortKey::Name, false);
    let mut entries = LocalLister.list(tmp.path()).unwrap();
    entries.sort_by(|a, b| order.compare(a, b));

    let names: Vec<_> = entries.iter().map(|e| e.name.to_string()).collect();
    assert_eq!(names, vec!["subdir", "subdir2", "a"]);
}

#[test]
fn test_view_tree_navigation() {
    let mut tree = ViewTree::new("/root", SortOrder::default(), false);
    {
        let mut level = tree.level_mut(DirRef::Root).unwrap();
        for name in ["dir", "dir2"] {
            let id = level.ids.next_id();
            level.children.push(TreeNode::new(
                id,
                Entry::new(format!("/root/{name}"), NodeKind::Directory, None),
                0,
            ));
        }
    }

    assert_eq!(tree.current().map(|n| n.name()), Some("dir"));
    tree.move_cursor(1);
    assert_eq!(tree.current().map(|n| n.name()), Some("dir2"));
    tree.move_cursor(-5);
    assert_eq!(tree.cursor(), 0);

    let dir2 = tree.find_path(Path::new("/root/dir2")).map(|n| n.id).unwrap();
    assert!(tree.focus(dir2));
    assert_eq!(tree.cursor(), 1);

    {
        let mut level = tree.level_mut(DirRef::Node(dir2)).unwrap();
        assert_eq!(level.depth, 1);
        let id = level.ids.next_id();
        level.children.push(TreeNode::new(
            id,
            Entry::new("/root/dir2/x", NodeKind::File { executable: false }, None),
            1,
        ));
    }
    assert_eq!(tree.visible().len(), 2);
    assert!(tree.set_expanded(dir2, true));
    assert_eq!(tree.visible().len(), 3);
}

#[test]
fn test_default_config_values() {
    let config = EngineConfig::default();
    assert_eq!(config.sort_key, SortKey::Name);
    assert!(!config.show_hidden);
    assert_eq!(config.sync_program, "rclone");
    assert!(config.remotes.is_empty());
    assert!(config.cache_root.ends_with("driftfile/remote"));
}
