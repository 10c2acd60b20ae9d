// tests/common/mod.rs
#![allow(dead_code)]

use assert_cmd::Command;
use filetime::{FileTime, set_file_mtime};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

pub fn rensync() -> Command {
    let mut cmd = Command::cargo_bin("rensync").unwrap();
    cmd.env_remove("RENSYNC_LOG");
    cmd
}

pub fn write(path: &Path, data: &[u8], mtime: i64) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, data).unwrap();
    set_file_mtime(path, FileTime::from_unix_time(mtime, 0)).unwrap();
}

/// Relative path of every entry below `root`, mapped to the hex digest of
/// its contents (directories map to `/`).
pub fn tree(root: &Path) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.unwrap();
        let rel = entry
            .path()
            .strip_prefix(root)
            .unwrap()
            .to_string_lossy()
            .replace('\\', "/");
        let value = if entry.file_type().is_dir() {
            "/".to_string()
        } else {
            hex::encode(Sha256::digest(fs::read(entry.path()).unwrap()))
        };
        out.insert(rel, value);
    }
    out
}
