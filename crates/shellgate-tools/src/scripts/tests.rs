use super::*;
use crate::error::RejectReason;

fn store_in(dir: &tempfile::TempDir) -> ScriptStore {
    ScriptStore::new(dir.path().join("scripts"), PathGuard::default())
}

fn reason(err: Error) -> RejectReason {
    match err {
        Error::Rejected { reason, .. } => reason,
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_root_is_created_lazily() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    assert!(!store.root().exists());
    assert!(store.list().await.unwrap().is_empty());
    assert!(store.root().is_dir());
}

#[tokio::test]
async fn test_save_then_read_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let body = "#!/bin/bash\necho 'hi'\n";

    let info = store
        .save("hello.sh", body, "says hi", "*/5 * * * *")
        .await
        .unwrap();
    assert_eq!(info.name, "hello");
    assert_eq!(info.filename, "hello.sh");
    assert_eq!(info.size, body.len() as u64);

    assert_eq!(store.read("hello.sh").await.unwrap(), body);

    let listed = store.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].description, "says hi");
    assert_eq!(listed[0].schedule, "*/5 * * * *");
    assert_eq!(listed[0].size, body.len() as u64);
}

#[cfg(unix)]
#[tokio::test]
async fn test_saved_body_is_executable() {
    use std::os::unix::fs::PermissionsExt;
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.save("run.sh", "true\n", "", "").await.unwrap();
    let path = store.script_path("run.sh").await.unwrap();
    let mode = std::fs::metadata(path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, SCRIPT_MODE);
}

#[tokio::test]
async fn test_update_keeps_creation_time() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let first = store.save("job.sh", "v1", "", "").await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    let second = store.save("job.sh", "v2 longer", "new", "").await.unwrap();

    assert_eq!(second.created_at, first.created_at);
    assert!(second.modified_at > first.modified_at);
    assert_eq!(store.read("job.sh").await.unwrap(), "v2 longer");
}

#[tokio::test]
async fn test_invalid_name_leaves_no_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    for name in ["../escape.sh", "no-extension", "sp ace.sh", "/abs/path.sh"] {
        let err = store.save(name, "x", "", "").await.unwrap_err();
        assert_eq!(reason(err), RejectReason::InvalidName, "{name}");
    }
    // Validation runs before the root is even created.
    assert!(!store.root().exists());
    assert!(!dir.path().join("escape.sh").exists());
}

#[tokio::test]
async fn test_invalid_schedule_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let err = store.save("cron.sh", "x", "", "* * *").await.unwrap_err();
    assert_eq!(reason(err), RejectReason::InvalidSchedule);
    assert!(!store.root().join("cron.sh").exists());
}

#[tokio::test]
async fn test_delete_removes_pair_and_reports_missing() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.save("gone.sh", "x", "d", "").await.unwrap();
    assert!(store.root().join("gone.json").exists());

    store.delete("gone.sh").await.unwrap();
    assert!(!store.root().join("gone.sh").exists());
    assert!(!store.root().join("gone.json").exists());
    assert!(store.list().await.unwrap().is_empty());
    assert!(matches!(store.read("gone.sh").await, Err(Error::NotFound(_))));
    assert!(matches!(
        store.delete("gone.sh").await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_list_ordering_and_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.save("b.sh", "bb", "", "").await.unwrap();
    store.save("a.sh", "a", "", "").await.unwrap();
    // Body without a record is listed with defaults.
    tokio::fs::write(store.root().join("c.sh"), b"ccc").await.unwrap();
    // Record without a body and unrelated files are ignored.
    tokio::fs::write(store.root().join("orphan.json"), b"{}").await.unwrap();
    tokio::fs::write(store.root().join("notes.txt"), b"x").await.unwrap();

    let names: Vec<String> = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.filename)
        .collect();
    assert_eq!(names, ["a.sh", "b.sh", "c.sh"]);

    let c = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .find(|s| s.name == "c")
        .unwrap();
    assert_eq!(c.description, "");
    assert_eq!(c.schedule, "");
    assert_eq!(c.size, 3);
}

#[tokio::test]
async fn test_script_path_requires_existing_body() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    assert!(matches!(
        store.script_path("missing.sh").await,
        Err(Error::NotFound(_))
    ));
    store.save("here.sh", "x", "", "").await.unwrap();
    let path = store.script_path("here.sh").await.unwrap();
    assert!(path.is_absolute());
    assert!(path.ends_with("here.sh"));
}

#[tokio::test]
async fn test_unusable_root_fails_only_that_call() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, b"not a dir").unwrap();
    let store = ScriptStore::new(blocker.join("scripts"), PathGuard::default());
    assert!(store.list().await.is_err());
    assert!(store.save("a.sh", "x", "", "").await.is_err());
}
