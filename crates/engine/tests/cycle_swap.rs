// crates/engine/tests/cycle_swap.rs
use engine::{Status, SyncConfig, sync};
use filetime::{FileTime, set_file_mtime};
use logging::MemorySink;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use transport::LocalPath;

fn write(path: &Path, data: &[u8], mtime: i64) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, data).unwrap();
    set_file_mtime(path, FileTime::from_unix_time(mtime, 0)).unwrap();
}

#[test]
fn swapped_files_trade_names_through_a_temp_name() {
    let tmp = tempdir().unwrap();
    let (src, dst) = (tmp.path().join("src"), tmp.path().join("dst"));
    write(&src.join("a"), b"bravo", 200);
    write(&src.join("b"), b"alpha!", 100);
    write(&dst.join("a"), b"alpha!", 100);
    write(&dst.join("b"), b"bravo", 200);

    let cfg = SyncConfig::builder(LocalPath::new(src.clone()), LocalPath::new(dst.clone()))
        .rename_threshold(Some(0))
        .build()
        .unwrap();
    let sink = MemorySink::new();
    let results = sync(&cfg, &sink);

    assert_eq!(results.status, Status::Completed);
    assert_eq!(results.rename_success, 3);
    assert_eq!(results.err_count(), 0);
    assert_eq!(
        sink.messages(),
        vec!["R a -> b.tempmove", "R b -> a", "R b.tempmove -> b"]
    );
    assert_eq!(fs::read(dst.join("a")).unwrap(), b"bravo");
    assert_eq!(fs::read(dst.join("b")).unwrap(), b"alpha!");
    assert!(!dst.join("b.tempmove").exists());
}

#[test]
fn three_way_rotation_is_one_cycle() {
    let tmp = tempdir().unwrap();
    let (src, dst) = (tmp.path().join("src"), tmp.path().join("dst"));
    write(&dst.join("a"), b"1", 10);
    write(&dst.join("b"), b"22", 20);
    write(&dst.join("c"), b"333", 30);
    write(&src.join("b"), b"1", 10);
    write(&src.join("c"), b"22", 20);
    write(&src.join("a"), b"333", 30);

    let cfg = SyncConfig::builder(LocalPath::new(src.clone()), LocalPath::new(dst.clone()))
        .rename_threshold(Some(0))
        .build()
        .unwrap();
    let sink = MemorySink::new();
    let results = sync(&cfg, &sink);

    assert_eq!(results.rename_success, 4);
    assert_eq!(
        sink.messages(),
        vec!["R a -> b.tempmove", "R c -> a", "R b -> c", "R b.tempmove -> b"]
    );
    for (name, data) in [("a", "333"), ("b", "1"), ("c", "22")] {
        assert_eq!(fs::read_to_string(dst.join(name)).unwrap(), data);
    }

    let again = MemorySink::new();
    sync(&cfg, &again);
    assert!(again.messages().is_empty());
}
