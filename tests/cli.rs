// tests/cli.rs
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

mod common;
use common::{rensync, tree, write};

#[test]
fn fresh_copy_prints_operations_and_summary() {
    let tmp = tempdir().unwrap();
    let (src, dst) = (tmp.path().join("src"), tmp.path().join("dst"));
    write(&src.join("a.txt"), b"alpha", 100);
    write(&src.join("sub/b.txt"), b"bravo", 100);

    rensync()
        .arg(&src)
        .arg(&dst)
        .assert()
        .success()
        .stdout(predicate::str::contains("+ a.txt"))
        .stdout(predicate::str::contains("+ sub/b.txt"))
        .stdout(predicate::str::contains("Status: Completed"))
        .stdout(predicate::str::contains("Create Success: 2"));
    assert_eq!(tree(&src), tree(&dst));
}

#[test]
fn renamed_file_is_moved() {
    let tmp = tempdir().unwrap();
    let (src, dst) = (tmp.path().join("src"), tmp.path().join("dst"));
    write(&src.join("photo-2020.jpg"), &[7u8; 64], 100);
    write(&dst.join("IMG_0001.jpg"), &[7u8; 64], 100);

    rensync()
        .args(["-R", "0", "-x"])
        .arg(&src)
        .arg(&dst)
        .assert()
        .success()
        .stdout(predicate::str::contains("R IMG_0001.jpg -> photo-2020.jpg"))
        .stdout(predicate::str::contains("Create Success: 0"));
    assert_eq!(tree(&src), tree(&dst));
}

#[test]
fn exclude_first_filter_is_accepted() {
    let tmp = tempdir().unwrap();
    let (src, dst) = (tmp.path().join("src"), tmp.path().join("dst"));
    write(&src.join("keep.txt"), b"k", 100);
    write(&src.join("sub/skip.log"), b"s", 100);

    rensync()
        .args(["-f", "- **/*.log", "-f", "+ **/*/ **/*"])
        .arg(&src)
        .arg(&dst)
        .assert()
        .success()
        .stdout(predicate::str::contains("+ keep.txt"))
        .stdout(predicate::str::contains("skip.log").not());
    assert!(dst.join("keep.txt").exists());
    assert!(!dst.join("sub/skip.log").exists());
}

#[test]
fn dry_run_leaves_destination_alone() {
    let tmp = tempdir().unwrap();
    let (src, dst) = (tmp.path().join("src"), tmp.path().join("dst"));
    write(&src.join("a"), b"a", 100);
    fs::create_dir_all(&dst).unwrap();

    rensync()
        .arg("--dry-run")
        .arg(&src)
        .arg(&dst)
        .assert()
        .success()
        .stdout(predicate::str::contains("Status: Completed (Dry Run)"));
    assert!(tree(&dst).is_empty());
}

#[test]
fn missing_source_exits_with_input_error() {
    let tmp = tempdir().unwrap();
    rensync()
        .arg(tmp.path().join("nope"))
        .arg(tmp.path().join("dst"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("ERROR: 'src' does not exist"));
}

#[test]
fn conflicting_flags_are_rejected() {
    let tmp = tempdir().unwrap();
    rensync()
        .args(["--trash", "auto", "--delete-files"])
        .arg(tmp.path())
        .arg(tmp.path().join("dst"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn help_exits_cleanly() {
    rensync()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--global-renames"));
}

#[test]
fn quiet_hides_operation_lines() {
    let tmp = tempdir().unwrap();
    let (src, dst) = (tmp.path().join("src"), tmp.path().join("dst"));
    write(&src.join("a"), b"a", 100);

    rensync()
        .arg("-q")
        .arg(&src)
        .arg(&dst)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    assert!(dst.join("a").exists());
}

#[test]
fn json_summary() {
    let tmp = tempdir().unwrap();
    let (src, dst) = (tmp.path().join("src"), tmp.path().join("dst"));
    write(&src.join("a"), b"abc", 100);

    let out = rensync()
        .args(["--log-format", "json"])
        .arg(&src)
        .arg(&dst)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let summary = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap())
        .find(|v| v["tag"] == "summary")
        .expect("summary event");
    let results: serde_json::Value =
        serde_json::from_str(summary["fields"]["results"].as_str().unwrap()).unwrap();
    assert_eq!(results["status"], "completed");
    assert_eq!(results["create_success"], 1);
    assert_eq!(results["byte_diff"], 3);
}

#[test]
fn log_file_receives_the_run() {
    let tmp = tempdir().unwrap();
    let (src, dst, log) = (
        tmp.path().join("src"),
        tmp.path().join("dst"),
        tmp.path().join("run.log"),
    );
    write(&src.join("a"), b"a", 100);

    rensync()
        .arg("--log")
        .arg(&log)
        .arg(&src)
        .arg(&dst)
        .assert()
        .success();
    let text = fs::read_to_string(&log).unwrap();
    assert!(text.contains("+ a"));
    assert!(text.contains("Status: Completed"));
}

#[cfg(unix)]
#[test]
fn failed_operation_exits_partial() {
    use std::os::unix::fs::PermissionsExt;

    if running_as_root() {
        return;
    }
    let tmp = tempdir().unwrap();
    let (src, dst) = (tmp.path().join("src"), tmp.path().join("dst"));
    write(&src.join("locked/a"), b"a", 100);
    write(&src.join("b"), b"b", 100);
    fs::create_dir_all(dst.join("locked")).unwrap();
    fs::set_permissions(dst.join("locked"), fs::Permissions::from_mode(0o555)).unwrap();

    let assert = rensync().arg(&src).arg(&dst).assert();
    fs::set_permissions(dst.join("locked"), fs::Permissions::from_mode(0o755)).unwrap();
    assert
        .code(5)
        .stdout(predicate::str::contains("Create Success: 1 | Failed: 1"));
    assert!(dst.join("b").exists());
}

#[cfg(unix)]
fn running_as_root() -> bool {
    use std::os::unix::fs::MetadataExt;
    fs::metadata("/proc/self").map(|m| m.uid() == 0).unwrap_or(false)
}
