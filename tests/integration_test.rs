use filetime::FileTime;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn pairsync_bin() -> String {
    env!("CARGO_BIN_EXE_pairsync").to_string()
}

fn setup_test_dirs() -> (TempDir, TempDir) {
    (TempDir::new().unwrap(), TempDir::new().unwrap())
}

fn run(args: &[&Path], extra: &[&str]) -> Output {
    let mut cmd = Command::new(pairsync_bin());
    for path in args {
        cmd.arg(path);
    }
    // Keep the user's own config file out of the picture
    cmd.args(extra)
        .env_remove("RUST_LOG")
        .env_remove("PAIRSYNC_CONFIG")
        .env("XDG_CONFIG_HOME", "/nonexistent/pairsync-test");
    cmd.output().unwrap()
}

fn sync(left: &Path, right: &Path) -> Output {
    let output = run(&[left, right], &["--quiet"]);
    assert!(
        output.status.success(),
        "stdout: {}, stderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

/// Parse the NDJSON summary line of a `--json` run
fn json_summary(left: &Path, right: &Path) -> serde_json::Value {
    let output = run(&[left, right], &["--json"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .find(|event| event["type"] == "summary")
        .expect("summary event")
}

fn head_content(dir: &Path, name: &str) -> String {
    let text = fs::read_to_string(dir.join(".sync")).unwrap();
    let meta: serde_json::Value = serde_json::from_str(&text).unwrap();
    meta[name][0][1].as_str().unwrap().to_string()
}

fn write_at(path: &Path, content: &str, unix_secs: i64) {
    fs::write(path, content).unwrap();
    filetime::set_file_mtime(path, FileTime::from_unix_time(unix_secs, 0)).unwrap();
}

#[test]
fn test_basic_sync() {
    let (left, right) = setup_test_dirs();
    fs::write(left.path().join("x.txt"), "hello").unwrap();

    sync(left.path(), right.path());

    assert_eq!(fs::read_to_string(right.path().join("x.txt")).unwrap(), "hello");
    assert_eq!(
        head_content(left.path(), "x.txt"),
        "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
    assert_eq!(head_content(left.path(), "x.txt"), head_content(right.path(), "x.txt"));
}

#[test]
fn test_metadata_layout() {
    let (left, right) = setup_test_dirs();
    write_at(&left.path().join("x.txt"), "hello", 1_700_000_000);

    sync(left.path(), right.path());

    let text = fs::read_to_string(right.path().join(".sync")).unwrap();
    assert!(text.contains("\"2023-11-14 22:13:20 +1200\""), "metadata: {}", text);
    assert!(text.contains("\n    \"x.txt\": ["));
}

#[test]
fn test_both_directions() {
    let (left, right) = setup_test_dirs();
    fs::write(left.path().join("from_left.txt"), "L").unwrap();
    fs::write(right.path().join("from_right.txt"), "R").unwrap();

    sync(left.path(), right.path());

    assert_eq!(fs::read_to_string(left.path().join("from_right.txt")).unwrap(), "R");
    assert_eq!(fs::read_to_string(right.path().join("from_left.txt")).unwrap(), "L");
}

#[test]
fn test_second_run_is_noop() {
    let (left, right) = setup_test_dirs();
    fs::create_dir(left.path().join("sub")).unwrap();
    fs::write(left.path().join("a.txt"), "a").unwrap();
    fs::write(left.path().join("sub/b.txt"), "b").unwrap();
    fs::write(right.path().join("c.txt"), "c").unwrap();

    let first = json_summary(left.path(), right.path());
    assert_eq!(first["files_copied"], 3);

    let meta_before = fs::read(right.path().join(".sync")).unwrap();
    let second = json_summary(left.path(), right.path());

    assert_eq!(second["files_copied"], 0);
    assert_eq!(second["files_deleted"], 0);
    assert_eq!(second["directories_created"], 0);
    assert_eq!(fs::read(right.path().join(".sync")).unwrap(), meta_before);
}

#[test]
fn test_deletion_propagates() {
    let (left, right) = setup_test_dirs();
    fs::write(left.path().join("doomed.txt"), "bye").unwrap();
    fs::write(left.path().join("kept.txt"), "stay").unwrap();
    sync(left.path(), right.path());

    fs::remove_file(right.path().join("doomed.txt")).unwrap();
    sync(left.path(), right.path());

    assert!(!left.path().join("doomed.txt").exists());
    assert!(left.path().join("kept.txt").exists());
    assert_eq!(head_content(left.path(), "doomed.txt"), "deleted");
    assert_eq!(head_content(right.path(), "doomed.txt"), "deleted");
}

#[test]
fn test_deletion_loses_to_later_edit() {
    let (left, right) = setup_test_dirs();
    write_at(&left.path().join("f.txt"), "original", 1_700_000_000);
    sync(left.path(), right.path());

    // Left deletes and records it; right edits to content left never saw
    fs::remove_file(left.path().join("f.txt")).unwrap();
    let other = TempDir::new().unwrap();
    sync(left.path(), other.path());
    write_at(&right.path().join("f.txt"), "edited on right", 1_700_000_600);

    sync(left.path(), right.path());

    assert_eq!(fs::read_to_string(left.path().join("f.txt")).unwrap(), "edited on right");
    assert_eq!(fs::read_to_string(right.path().join("f.txt")).unwrap(), "edited on right");
}

#[test]
fn test_updated_file_replaces_older_version() {
    let (left, right) = setup_test_dirs();
    write_at(&left.path().join("doc.txt"), "v1", 1_700_000_000);
    sync(left.path(), right.path());

    write_at(&left.path().join("doc.txt"), "v2", 1_700_000_050);
    sync(left.path(), right.path());

    assert_eq!(fs::read_to_string(right.path().join("doc.txt")).unwrap(), "v2");
}

#[test]
fn test_concurrent_edits_newer_wins() {
    let (left, right) = setup_test_dirs();
    write_at(&left.path().join("doc.txt"), "left version", 1_700_000_100);
    write_at(&right.path().join("doc.txt"), "right version", 1_700_000_200);

    sync(left.path(), right.path());

    assert_eq!(fs::read_to_string(left.path().join("doc.txt")).unwrap(), "right version");
    assert_eq!(fs::read_to_string(right.path().join("doc.txt")).unwrap(), "right version");
}

#[test]
fn test_nested_directories() {
    let (left, right) = setup_test_dirs();
    fs::create_dir_all(left.path().join("dir1/dir2/dir3")).unwrap();
    fs::write(left.path().join("dir1/file1.txt"), "content1").unwrap();
    fs::write(left.path().join("dir1/dir2/file2.txt"), "content2").unwrap();
    fs::write(left.path().join("dir1/dir2/dir3/file3.txt"), "content3").unwrap();
    fs::create_dir_all(right.path().join("other")).unwrap();

    sync(left.path(), right.path());

    assert!(right.path().join("dir1/file1.txt").exists());
    assert!(right.path().join("dir1/dir2/file2.txt").exists());
    assert_eq!(
        fs::read_to_string(right.path().join("dir1/dir2/dir3/file3.txt")).unwrap(),
        "content3"
    );
    assert!(left.path().join("other").is_dir());
    assert!(right.path().join("dir1/dir2/dir3/.sync").exists());
}

#[test]
fn test_hidden_entries_not_synced() {
    let (left, right) = setup_test_dirs();
    fs::write(left.path().join(".secret"), "x").unwrap();
    fs::create_dir(left.path().join(".git")).unwrap();
    fs::write(left.path().join(".git/config"), "x").unwrap();
    fs::write(left.path().join("visible.txt"), "x").unwrap();

    sync(left.path(), right.path());

    assert!(right.path().join("visible.txt").exists());
    assert!(!right.path().join(".secret").exists());
    assert!(!right.path().join(".git").exists());
}

#[test]
fn test_creates_missing_side() {
    let left = TempDir::new().unwrap();
    let parent = TempDir::new().unwrap();
    let right = parent.path().join("new_replica");
    fs::write(left.path().join("x.txt"), "hello").unwrap();

    sync(left.path(), &right);

    assert_eq!(fs::read_to_string(right.join("x.txt")).unwrap(), "hello");
}

#[test]
fn test_error_neither_is_directory() {
    let temp = TempDir::new().unwrap();
    let output = run(
        &[&temp.path().join("missing1"), &temp.path().join("missing2")],
        &[],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"));
    assert!(!temp.path().join("missing1").exists());
}

#[test]
fn test_corrupt_metadata_aborts() {
    let (left, right) = setup_test_dirs();
    fs::write(left.path().join("x.txt"), "x").unwrap();
    fs::write(left.path().join(".sync"), "{ broken").unwrap();

    let output = run(&[left.path(), right.path()], &["--quiet"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Corrupt sync metadata"));
    assert!(!right.path().join("x.txt").exists());
}

#[test]
fn test_dry_run() {
    let (left, right) = setup_test_dirs();
    fs::write(left.path().join("file.txt"), "content").unwrap();

    let output = run(&[left.path(), right.path()], &["--dry-run"]);

    assert!(output.status.success());
    assert!(!right.path().join("file.txt").exists());
    assert!(!left.path().join(".sync").exists());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Dry-run"));
}

#[test]
fn test_quiet_mode() {
    let (left, right) = setup_test_dirs();
    fs::write(left.path().join("file.txt"), "content").unwrap();

    let output = sync(left.path(), right.path());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("pairsync v"));
    assert!(!stdout.contains("Sync complete"));
}

#[test]
fn test_summary_output() {
    let (left, right) = setup_test_dirs();
    fs::write(left.path().join("file.txt"), "content").unwrap();

    let output = run(&[left.path(), right.path()], &[]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("pairsync v"));
    assert!(stdout.contains("Sync complete"));
    assert!(stdout.contains("Files copied:"));
}

#[test]
fn test_profile_from_config_file() {
    let (left, right) = setup_test_dirs();
    let config_dir = TempDir::new().unwrap();
    let config_path = config_dir.path().join("config.toml");
    fs::write(
        &config_path,
        format!(
            "[profiles.pair]\nleft = {:?}\nright = {:?}\n",
            left.path().to_str().unwrap(),
            right.path().to_str().unwrap()
        ),
    )
    .unwrap();
    fs::write(left.path().join("x.txt"), "via profile").unwrap();

    let output = Command::new(pairsync_bin())
        .args(["--profile", "pair", "--quiet"])
        .env("PAIRSYNC_CONFIG", &config_path)
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(fs::read_to_string(right.path().join("x.txt")).unwrap(), "via profile");

    let listed = Command::new(pairsync_bin())
        .arg("--list-profiles")
        .env("PAIRSYNC_CONFIG", &config_path)
        .output()
        .unwrap();
    assert!(String::from_utf8_lossy(&listed.stdout).contains("pair"));
}
