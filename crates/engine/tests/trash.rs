// crates/engine/tests/trash.rs
use engine::{Status, SyncConfig, sync};
use logging::MemorySink;
use std::fs;
use tempfile::tempdir;
use transport::LocalPath;

#[test]
fn deleted_entries_move_into_the_trash() {
    let tmp = tempdir().unwrap();
    let (src, dst, trash) = (
        tmp.path().join("src"),
        tmp.path().join("dst"),
        tmp.path().join("trash"),
    );
    fs::create_dir_all(&src).unwrap();
    fs::create_dir_all(dst.join("old")).unwrap();
    fs::create_dir_all(&trash).unwrap();
    fs::write(dst.join("old/x.txt"), b"x").unwrap();
    fs::write(dst.join("y.txt"), b"y").unwrap();

    let cfg = SyncConfig::builder(LocalPath::new(&src), LocalPath::new(&dst))
        .trash(Some(LocalPath::new(&trash)))
        .build()
        .unwrap();
    let sink = MemorySink::new();
    let results = sync(&cfg, &sink);

    assert_eq!(results.status, Status::Completed);
    assert_eq!(sink.messages(), vec!["T old/x.txt", "T old/", "T y.txt"]);
    assert_eq!(results.trash_success, 3);
    assert_eq!(results.byte_diff, 0);
    assert_eq!(results.trash_root.as_deref(), Some(trash.to_str().unwrap()));
    assert!(fs::read_dir(&dst).unwrap().next().is_none());
    assert_eq!(fs::read(trash.join("old/x.txt")).unwrap(), b"x");
    assert_eq!(fs::read(trash.join("y.txt")).unwrap(), b"y");
}

#[test]
fn occupied_trash_slot_is_an_error() {
    let tmp = tempdir().unwrap();
    let (src, dst, trash) = (
        tmp.path().join("src"),
        tmp.path().join("dst"),
        tmp.path().join("trash"),
    );
    fs::create_dir_all(&src).unwrap();
    fs::create_dir_all(&dst).unwrap();
    fs::create_dir_all(&trash).unwrap();
    fs::write(dst.join("y.txt"), b"new").unwrap();
    fs::write(trash.join("y.txt"), b"old").unwrap();

    let cfg = SyncConfig::builder(LocalPath::new(&src), LocalPath::new(&dst))
        .trash(Some(LocalPath::new(&trash)))
        .build()
        .unwrap();
    let results = sync(&cfg, &MemorySink::new());

    assert!(results.is_partial());
    assert_eq!(results.trash_error, 1);
    assert!(results.errors[0].starts_with("AlreadyExists: y.txt: "));
    assert_eq!(fs::read(dst.join("y.txt")).unwrap(), b"new");
}

#[test]
fn trash_inside_destination_is_rejected() {
    let tmp = tempdir().unwrap();
    let (src, dst) = (tmp.path().join("src"), tmp.path().join("dst"));
    fs::create_dir_all(&src).unwrap();
    fs::create_dir_all(dst.join("bin")).unwrap();

    let err = SyncConfig::builder(LocalPath::new(&src), LocalPath::new(&dst))
        .trash(Some(LocalPath::new(dst.join("bin"))))
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("'trash' is inside 'dst'"));
}
