// crates/engine/tests/dry_run.rs
use engine::{Status, SyncConfig, sync};
use logging::MemorySink;
use transport::{AbstractPath, MemoryFs};

#[test]
fn dry_run_reports_without_touching_the_destination() {
    let fs = MemoryFs::new();
    let (src, dst) = (fs.root().join("src"), fs.root().join("dst"));
    src.join("new.txt").write(b"12345", 10).unwrap();
    src.join("same.txt").write(b"abcdefgh", 30).unwrap();
    src.join("d/f").write(b"f", 10).unwrap();
    dst.join("same.txt").write(b"abc", 20).unwrap();
    dst.join("gone.txt").write(b"xx", 10).unwrap();
    let before = fs.entries();

    let cfg = SyncConfig::builder(src, dst)
        .delete_files(true)
        .dry_run(true)
        .build()
        .unwrap();
    let sink = MemorySink::new();
    let results = sync(&cfg, &sink);

    assert_eq!(results.status, Status::Completed);
    assert!(results.dry_run);
    assert_eq!(
        sink.messages(),
        vec!["- gone.txt", "U same.txt", "+ new.txt", "+ d/", "+ d/f"]
    );
    assert_eq!(results.byte_diff, -2 + 5 + 5 + 1);
    assert_eq!(results.delete_success, 1);
    assert_eq!(results.dir_create_success, 1);
    assert_eq!(results.summary_lines()[0], "Status: Completed (Dry Run)");
    assert_eq!(fs.entries(), before);
}
