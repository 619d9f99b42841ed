use super::*;
use crate::error::RejectReason;

fn reason_of(result: Result<PathBuf>) -> RejectReason {
    match result {
        Err(Error::Rejected { reason, .. }) => reason,
        other => panic!("expected rejection, got {other:?}"),
    }
}

fn scratch() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    (dir, root)
}

#[test]
fn test_denylisted_roots_rejected_regardless_of_spelling() {
    let guard = PathGuard::default();
    for raw in [
        "/etc",
        "/etc/shadow",
        "/tmp/../etc/passwd",
        "/tmp/../../../../../../etc",
        "/ETC/hosts",
        "\\etc\\passwd",
        "/proc/self/environ",
        "/sys/../sys",
        "/dev/null",
        "/boot",
        "/root/.bashrc",
        "/",
        "/..",
    ] {
        assert_eq!(
            reason_of(guard.resolve(raw)),
            RejectReason::Denylisted,
            "{raw}"
        );
    }
}

#[test]
fn test_unparseable_input_is_rejected_not_panicking() {
    let guard = PathGuard::default();
    assert_eq!(reason_of(guard.resolve("")), RejectReason::Unparseable);
    assert_eq!(reason_of(guard.resolve("\0")), RejectReason::Unparseable);
    assert_eq!(reason_of(guard.resolve("/tmp/\0x")), RejectReason::Unparseable);
}

#[test]
fn test_resolve_allows_ordinary_paths() {
    let (_dir, root) = scratch();
    let guard = PathGuard::default();
    let raw = root.join("sub/../file.txt");
    let resolved = guard.resolve(raw.to_str().unwrap()).unwrap();
    assert_eq!(resolved, root.join("file.txt"));
}

#[test]
fn test_relative_paths_use_base_dir() {
    let (_dir, root) = scratch();
    let guard = PathGuard::default().with_base_dir(&root);
    assert_eq!(guard.resolve("notes.txt").unwrap(), root.join("notes.txt"));
    assert_eq!(guard.base_dir(), root.as_path());
}

#[cfg(unix)]
#[test]
fn test_symlink_into_denylisted_root_is_rejected() {
    let (_dir, root) = scratch();
    std::os::unix::fs::symlink("/etc", root.join("innocent")).unwrap();
    let guard = PathGuard::default();
    let raw = root.join("innocent/passwd");
    assert_eq!(
        reason_of(guard.resolve(raw.to_str().unwrap())),
        RejectReason::Denylisted
    );
}

#[test]
fn test_scoped_relative_and_absolute_inside() {
    let (_dir, root) = scratch();
    let guard = PathGuard::default();
    assert_eq!(
        guard.resolve_within("backup.sh", &root).unwrap(),
        root.join("backup.sh")
    );
    let absolute = root.join("backup.sh");
    assert_eq!(
        guard
            .resolve_within(absolute.to_str().unwrap(), &root)
            .unwrap(),
        absolute
    );
}

#[test]
fn test_scoped_rejects_escape_without_dotdot() {
    let (_dir, root) = scratch();
    let (_other_dir, other) = scratch();
    let guard = PathGuard::default();
    let raw = other.join("x.sh");
    assert_eq!(
        reason_of(guard.resolve_within(raw.to_str().unwrap(), &root)),
        RejectReason::OutsideBoundary
    );
}

#[test]
fn test_scoped_rejects_dotdot_escape() {
    let (_dir, root) = scratch();
    let guard = PathGuard::default();
    assert_eq!(
        reason_of(guard.resolve_within("../x.sh", &root)),
        RejectReason::Traversal
    );
    assert_eq!(
        reason_of(guard.resolve_within("a/../../x.sh", &root)),
        RejectReason::Traversal
    );
    // `..` that stays inside is fine.
    assert_eq!(
        guard.resolve_within("a/../x.sh", &root).unwrap(),
        root.join("x.sh")
    );
}

#[cfg(unix)]
#[test]
fn test_scoped_rejects_symlink_escape() {
    let (_dir, root) = scratch();
    let (_other_dir, other) = scratch();
    std::os::unix::fs::symlink(&other, root.join("out")).unwrap();
    let guard = PathGuard::default();
    assert_eq!(
        reason_of(guard.resolve_within("out/x.sh", &root)),
        RejectReason::Traversal
    );
}

#[test]
fn test_scoped_missing_boundary_is_not_found() {
    let (_dir, root) = scratch();
    let guard = PathGuard::default();
    let result = guard.resolve_within("x.sh", &root.join("missing"));
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[test]
fn test_extra_denied_subtree() {
    let (_dir, root) = scratch();
    let guard = PathGuard::new(Denylist::standard().with_extra_subtrees([root.join("vault")]));
    let raw = root.join("vault/key");
    assert_eq!(
        reason_of(guard.resolve(raw.to_str().unwrap())),
        RejectReason::Denylisted
    );
    assert!(guard.check_absolute(&root.join("open")).is_ok());
    assert!(guard.check_absolute(&root.join("vault")).is_err());
}

#[test]
fn test_denylisted_home_is_not_used_as_base() {
    let Some(home) = dirs::home_dir() else {
        return;
    };
    let guard = PathGuard::new(Denylist::standard().with_extra_subtrees([&home]));
    assert_eq!(guard.base_dir(), std::env::temp_dir().as_path());

    let guard = PathGuard::new(Denylist::from_parts(Vec::<PathBuf>::new(), Vec::<PathBuf>::new()));
    assert_eq!(guard.base_dir(), home.as_path());
}
