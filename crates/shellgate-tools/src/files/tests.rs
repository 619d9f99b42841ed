use super::*;
use crate::error::{Error, RejectReason};
use crate::path_guard::Denylist;
use crate::test_log::LogCapture;
use std::path::Path;

fn scratch() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    (dir, root)
}

fn s(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn reason(err: Error) -> RejectReason {
    match err {
        Error::Rejected { reason, .. } => reason,
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_list_directory_sorted_with_kinds() {
    let (_dir, root) = scratch();
    std::fs::write(root.join("b.txt"), b"12345").unwrap();
    std::fs::write(root.join("a.txt"), b"1").unwrap();
    std::fs::create_dir(root.join("c")).unwrap();

    let browser = FileBrowser::new(PathGuard::default());
    let entries = browser.list_directory(s(&root)).await.unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["a.txt", "b.txt", "c"]);

    assert_eq!(entries[1].kind, EntryKind::File);
    assert_eq!(entries[1].size, 5);
    assert_eq!(entries[1].path, root.join("b.txt"));
    assert_eq!(entries[2].kind, EntryKind::Directory);
    assert_eq!(entries[2].size, 0);
    assert!(entries[0].modified.is_some());
}

#[tokio::test]
async fn test_list_rejects_denylisted_and_files() {
    let (_dir, root) = scratch();
    std::fs::write(root.join("f"), b"x").unwrap();
    let browser = FileBrowser::new(PathGuard::default());

    for raw in ["/", "/etc", "/tmp/../etc", "/PROC"] {
        let err = browser.list_directory(raw).await.unwrap_err();
        assert_eq!(reason(err), RejectReason::Denylisted, "{raw}");
    }
    let err = browser.list_directory(s(&root.join("f"))).await.unwrap_err();
    assert_eq!(reason(err), RejectReason::WrongKind);
    let err = browser
        .list_directory(s(&root.join("missing")))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[cfg(unix)]
#[tokio::test]
async fn test_concurrent_listings_with_unreadable_entry() {
    use std::os::unix::fs::PermissionsExt;
    let (_dir, root) = scratch();
    for i in 0..10 {
        std::fs::write(root.join(format!("f{i}")), b"x").unwrap();
    }
    let locked = root.join("locked");
    std::fs::create_dir(&locked).unwrap();
    std::fs::write(locked.join("inner"), b"x").unwrap();
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
    #[cfg(unix)]
    std::os::unix::fs::symlink(root.join("nowhere"), root.join("dangling")).unwrap();

    let browser = FileBrowser::new(PathGuard::default());
    let raw = s(&root).to_string();
    let calls = (0..100).map(|_| {
        let browser = browser.clone();
        let raw = raw.clone();
        tokio::spawn(async move { browser.list_directory(&raw).await })
    });
    let results = futures::future::join_all(calls).await;

    let first = results[0].as_ref().unwrap().as_ref().unwrap().clone();
    for result in &results {
        let listing = result.as_ref().unwrap().as_ref().unwrap();
        assert_eq!(listing, &first);
    }
    // The dangling link cannot be stat'ed and is skipped.
    assert!(first.iter().all(|e| e.name != "dangling"));
    assert!(first.iter().any(|e| e.name == "f9"));

    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
}

#[tokio::test]
async fn test_read_file_and_limits() {
    let (_dir, root) = scratch();
    std::fs::write(root.join("small"), b"hello").unwrap();
    std::fs::write(root.join("ten"), b"0123456789").unwrap();
    std::fs::write(root.join("eleven"), b"0123456789a").unwrap();

    let browser = FileBrowser::new(PathGuard::default()).with_max_read_bytes(10);
    assert_eq!(browser.read_file(s(&root.join("small"))).await.unwrap(), b"hello");
    assert_eq!(browser.read_file(s(&root.join("ten"))).await.unwrap().len(), 10);
    let err = browser
        .read_file(s(&root.join("eleven")))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TooLarge { size: 11, limit: 10 }));

    let err = browser.read_file(s(&root)).await.unwrap_err();
    assert_eq!(reason(err), RejectReason::WrongKind);
}

#[tokio::test]
async fn test_read_default_limit_is_one_mebibyte() {
    let (_dir, root) = scratch();
    let big = root.join("big.bin");
    std::fs::write(&big, vec![b'x'; (DEFAULT_MAX_READ_BYTES + 1) as usize]).unwrap();
    let browser = FileBrowser::new(PathGuard::default());
    assert!(matches!(
        browser.read_file(s(&big)).await,
        Err(Error::TooLarge { .. })
    ));
}

#[tokio::test]
async fn test_read_denylisted_file() {
    let browser = FileBrowser::new(PathGuard::default());
    for raw in ["/etc/shadow", "/etc/passwd", "/tmp/../../etc/passwd"] {
        let err = browser.read_file(raw).await.unwrap_err();
        assert_eq!(reason(err), RejectReason::Denylisted, "{raw}");
    }
}

#[tokio::test]
async fn test_write_then_read_and_overwrite() {
    let (_dir, root) = scratch();
    let browser = FileBrowser::new(PathGuard::default());
    let target = root.join("note.txt");

    browser.write_file(s(&target), b"first").await.unwrap();
    browser.write_file(s(&target), b"second").await.unwrap();
    assert_eq!(browser.read_file(s(&target)).await.unwrap(), b"second");

    let err = browser.write_file(s(&root), b"x").await.unwrap_err();
    assert_eq!(reason(err), RejectReason::WrongKind);

    let orphan = root.join("no/such/dir/file");
    assert!(matches!(
        browser.write_file(s(&orphan), b"x").await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_write_into_denylisted_location() {
    let browser = FileBrowser::new(PathGuard::default());
    let err = browser
        .write_file("/etc/cron.d/evil", b"* * * * * root sh")
        .await
        .unwrap_err();
    assert_eq!(reason(err), RejectReason::Denylisted);
}

#[tokio::test]
async fn test_delete_file_rules() {
    let (_dir, root) = scratch();
    let browser = FileBrowser::new(PathGuard::default());
    std::fs::write(root.join("f"), b"x").unwrap();

    browser.delete_file(s(&root.join("f"))).await.unwrap();
    assert!(!root.join("f").exists());
    assert!(matches!(
        browser.delete_file(s(&root.join("f"))).await,
        Err(Error::NotFound(_))
    ));

    std::fs::create_dir(root.join("d")).unwrap();
    let err = browser.delete_file(s(&root.join("d"))).await.unwrap_err();
    assert_eq!(reason(err), RejectReason::WrongKind);
    assert!(root.join("d").exists());
}

#[tokio::test]
async fn test_wrong_kind_rejections_are_logged() {
    let (_dir, root) = scratch();
    std::fs::write(root.join("plain"), b"x").unwrap();
    let browser = FileBrowser::new(PathGuard::default());
    let (logs, _guard) = LogCapture::warnings();

    browser.read_file(s(&root)).await.unwrap_err();
    browser.list_directory(s(&root.join("plain"))).await.unwrap_err();
    browser.delete_file(s(&root)).await.unwrap_err();

    let text = logs.text();
    assert_eq!(text.matches("E_WRONG_KIND").count(), 3, "{text}");
    assert!(text.contains("WARN"));
}

#[tokio::test]
async fn test_create_directory_is_recursive_and_idempotent() {
    let (_dir, root) = scratch();
    let browser = FileBrowser::new(PathGuard::default());
    let deep = root.join("a/b/c");
    browser.create_directory(s(&deep)).await.unwrap();
    browser.create_directory(s(&deep)).await.unwrap();
    assert!(deep.is_dir());

    std::fs::write(root.join("file"), b"x").unwrap();
    let err = browser
        .create_directory(s(&root.join("file")))
        .await
        .unwrap_err();
    assert_eq!(reason(err), RejectReason::WrongKind);
}

#[tokio::test]
async fn test_recursive_delete_counts() {
    let (_dir, root) = scratch();
    let tree = root.join("tree");
    std::fs::create_dir_all(tree.join("x/y")).unwrap();
    std::fs::write(tree.join("a"), b"1").unwrap();
    std::fs::write(tree.join("x/b"), b"2").unwrap();
    std::fs::write(tree.join("x/y/c"), b"3").unwrap();

    let browser = FileBrowser::new(PathGuard::default());
    let outcome = browser.delete_directory_recursive(s(&tree)).await.unwrap();
    assert_eq!(
        outcome,
        DeleteOutcome::Deleted {
            files: 3,
            directories: 3
        }
    );
    assert!(!tree.exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_recursive_delete_removes_links_not_targets() {
    let (_dir, root) = scratch();
    let keep = root.join("keep");
    std::fs::create_dir(&keep).unwrap();
    std::fs::write(keep.join("precious"), b"x").unwrap();
    let tree = root.join("tree");
    std::fs::create_dir(&tree).unwrap();
    std::os::unix::fs::symlink(&keep, tree.join("link")).unwrap();

    let browser = FileBrowser::new(PathGuard::default());
    browser.delete_directory_recursive(s(&tree)).await.unwrap();
    assert!(!tree.exists());
    assert!(keep.join("precious").exists());
}

#[tokio::test]
async fn test_recursive_delete_prescan_rejects_before_deleting() {
    let (_dir, root) = scratch();
    let tree = root.join("tree");
    std::fs::create_dir_all(tree.join("vault")).unwrap();
    std::fs::write(tree.join("a"), b"1").unwrap();
    std::fs::write(tree.join("vault/key"), b"k").unwrap();

    let guard = PathGuard::new(Denylist::standard().with_extra_subtrees([tree.join("vault")]));
    let browser = FileBrowser::new(guard);
    let err = browser
        .delete_directory_recursive(s(&tree))
        .await
        .unwrap_err();
    assert_eq!(reason(err), RejectReason::Denylisted);
    assert!(tree.join("a").exists());
    assert!(tree.join("vault/key").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_recursive_delete_reports_partial() {
    use std::os::unix::fs::PermissionsExt;
    let (_dir, root) = scratch();
    let tree = root.join("tree");
    let sealed = tree.join("sealed");
    std::fs::create_dir_all(&sealed).unwrap();
    std::fs::write(sealed.join("stuck"), b"x").unwrap();
    std::fs::write(tree.join("loose"), b"x").unwrap();
    std::fs::set_permissions(&sealed, std::fs::Permissions::from_mode(0o555)).unwrap();

    // Privileged users ignore directory permissions.
    if std::fs::write(sealed.join("write-check"), b"x").is_ok() {
        std::fs::set_permissions(&sealed, std::fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let browser = FileBrowser::new(PathGuard::default());
    let outcome = browser.delete_directory_recursive(s(&tree)).await.unwrap();
    match outcome {
        DeleteOutcome::Partial { deleted, failed } => {
            assert!(deleted >= 1);
            assert!(failed.iter().any(|f| f.path.ends_with("stuck")));
        }
        other => panic!("expected partial delete, got {other:?}"),
    }
    assert!(!tree.join("loose").exists());

    std::fs::set_permissions(&sealed, std::fs::Permissions::from_mode(0o755)).unwrap();
}
