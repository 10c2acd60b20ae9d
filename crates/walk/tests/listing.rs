// crates/walk/tests/listing.rs
use filetime::FileTime;
use filters::Filter;
use transport::{AbstractPath, LocalPath, MemoryFs, Platform};
use walk::{ScanOptions, SymlinkMode, list_dir};

fn names(keys: &[walk::PathKey]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

#[test]
fn splits_files_and_dirs() {
    let fs = MemoryFs::new();
    let root = fs.root();
    root.join("d").join("f").write(b"1", 5).unwrap();
    root.join("e").mkdir(false, false).unwrap();
    root.join("top").write(b"abc", 7).unwrap();

    let filter = Filter::default();
    let listing = list_dir(Some(&root), &root, &ScanOptions::new(&filter)).unwrap();
    assert!(listing.parent.unwrap().is_root());
    assert_eq!(names(&listing.dirs), vec!["d", "e"]);
    assert_eq!(names(&listing.files), vec!["top"]);
    assert_eq!(listing.dir_size, 3);
    let meta = listing.file_meta.values().next().unwrap();
    assert_eq!(meta.size, 3);
    assert_eq!(meta.mtime, FileTime::from_unix_time(7, 0));
}

#[test]
fn missing_dir_has_no_parent() {
    let fs = MemoryFs::new();
    let root = fs.root();
    let filter = Filter::default();
    let opts = ScanOptions::new(&filter);
    let listing = list_dir(Some(&root.join("nope")), &root, &opts).unwrap();
    assert!(listing.parent.is_none());
    assert!(list_dir(None, &root, &opts).unwrap().parent.is_none());
}

#[test]
fn filter_applies_to_relative_paths() {
    let fs = MemoryFs::new();
    let root = fs.root();
    root.join("d").join("keep.txt").write(b"1", 1).unwrap();
    root.join("d").join("drop.bin").write(b"1", 1).unwrap();
    let filter = Filter::new("d/*.txt").unwrap();
    let listing = list_dir(Some(&root.join("d")), &root, &ScanOptions::new(&filter)).unwrap();
    assert_eq!(names(&listing.files), vec!["d/keep.txt"]);
    assert_eq!(listing.dir_size, 2);
}

#[test]
fn incompatible_names_are_skipped_for_windows_destinations() {
    let fs = MemoryFs::new();
    let root = fs.root();
    root.join("aux.txt").write(b"1", 1).unwrap();
    root.join("ok.txt").write(b"1", 1).unwrap();
    root.join("bad:dir").mkdir(false, false).unwrap();
    let filter = Filter::default();
    let opts = ScanOptions {
        platform: Platform::Windows,
        ..ScanOptions::new(&filter)
    };
    let listing = list_dir(Some(&root), &root, &opts).unwrap();
    assert_eq!(names(&listing.files), vec!["ok.txt"]);
    assert!(listing.dirs.is_empty());
}

#[test]
fn truncates_mtimes_for_remote_comparison() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("f");
    std::fs::write(&file, b"x").unwrap();
    filetime::set_file_mtime(&file, FileTime::from_unix_time(100, 500_000_000)).unwrap();

    let root = LocalPath::new(tmp.path());
    let filter = Filter::default();
    let opts = ScanOptions {
        truncate_mtime: true,
        ..ScanOptions::new(&filter)
    };
    let listing = list_dir(Some(&root), &root, &opts).unwrap();
    let meta = listing.file_meta.values().next().unwrap();
    assert_eq!(meta.mtime, FileTime::from_unix_time(100, 0));
}

#[cfg(unix)]
#[test]
fn symlink_modes() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir(tmp.path().join("dir")).unwrap();
    std::fs::write(tmp.path().join("dir/f"), b"hello").unwrap();
    std::os::unix::fs::symlink("dir", tmp.path().join("dlink")).unwrap();
    std::os::unix::fs::symlink("missing", tmp.path().join("dangling")).unwrap();

    let root = LocalPath::new(tmp.path());
    let filter = Filter::default();
    let list = |symlinks| {
        let opts = ScanOptions {
            symlinks,
            ..ScanOptions::new(&filter)
        };
        list_dir(Some(&root), &root, &opts).unwrap()
    };

    let copy = list(SymlinkMode::Copy);
    assert_eq!(names(&copy.dirs), vec!["dir"]);
    assert_eq!(names(&copy.files), vec!["dangling", "dlink"]);
    assert_eq!(copy.symlinks.len(), 2);

    let ignore = list(SymlinkMode::Ignore);
    assert!(ignore.files.is_empty());
    assert_eq!(names(&ignore.nonstandard), vec!["dangling", "dlink"]);

    let follow = list(SymlinkMode::Follow);
    assert_eq!(names(&follow.dirs), vec!["dir", "dlink"]);
    assert_eq!(names(&follow.nonstandard), vec!["dangling"]);
    assert!(follow.symlinks.is_empty());
}
