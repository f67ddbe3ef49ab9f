use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn fsbulk(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fsbulk"))
        .current_dir(cwd)
        .args(args)
        .env("NO_COLOR", "1")
        .output()
        .unwrap()
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

#[test]
fn test_typeof_missing_exits_zero() {
    let tmp = tempfile::tempdir().unwrap();
    let out = fsbulk(tmp.path(), &["directory", "absent", "--typeof"]);
    assert!(out.status.success());
    assert_eq!(stdout(&out).trim(), "missing");
    assert!(out.stderr.is_empty());
}

#[cfg(unix)]
#[test]
fn test_typeof_follows_links_unless_symbolic() {
    let tmp = tempfile::tempdir().unwrap();
    fs::create_dir(tmp.path().join("d")).unwrap();
    std::os::unix::fs::symlink(tmp.path().join("d"), tmp.path().join("link")).unwrap();

    let out = fsbulk(tmp.path(), &["directory", "link", "--typeof"]);
    assert_eq!(stdout(&out).trim(), "directory");
    let out = fsbulk(tmp.path(), &["directory", "link", "--typeof", "--symbolic"]);
    assert_eq!(stdout(&out).trim(), "symbolicLink");
}

#[test]
fn test_copy_into_own_subtree_exits_one() {
    let tmp = tempfile::tempdir().unwrap();
    fs::create_dir(tmp.path().join("src")).unwrap();
    fs::write(tmp.path().join("src/f"), "f").unwrap();

    let out = fsbulk(tmp.path(), &["copy", "src", "src/inner"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("inside the source directory"));
    assert!(!tmp.path().join("src/inner").exists());
}

#[test]
fn test_remove_missing_exits_one() {
    let tmp = tempfile::tempdir().unwrap();
    let out = fsbulk(tmp.path(), &["remove", "absent"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("is not a file or directory"));
}

#[test]
fn test_debug_report_on_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let out = fsbulk(tmp.path(), &["hash", "absent", "--debug"]);
    assert_eq!(out.status.code(), Some(1));
    let err = String::from_utf8_lossy(&out.stderr);
    assert!(err.contains("Stack Trace"));
    assert!(err.contains("Environment"));
}

#[test]
fn test_copy_then_remove_summaries() {
    let tmp = tempfile::tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("src/sub")).unwrap();
    fs::write(tmp.path().join("src/sub/f"), "1234").unwrap();

    let out = fsbulk(tmp.path(), &["copy", "src", "dst"]);
    assert!(out.status.success());
    assert_eq!(
        stdout(&out).trim(),
        "fsbulk copied 1 directory, 1 file, and 0 symbolic links at 4 bytes."
    );

    let out = fsbulk(tmp.path(), &["remove", "dst"]);
    assert!(out.status.success());
    assert!(stdout(&out).starts_with("fsbulk removed 1 directory, 1 file"));
    assert!(!tmp.path().join("dst").exists());
}

#[test]
fn test_hash_string_and_list() {
    let tmp = tempfile::tempdir().unwrap();
    let out = fsbulk(tmp.path(), &["hash", "hello", "--string"]);
    assert_eq!(stdout(&out).trim().len(), 128);

    fs::create_dir(tmp.path().join("t")).unwrap();
    fs::write(tmp.path().join("t/a"), "a").unwrap();
    let out = fsbulk(tmp.path(), &["hash", "t", "--list"]);
    let map: serde_json::Map<String, serde_json::Value> =
        serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(map.len(), 2);
}

#[test]
fn test_settings_file_supplies_exclusions() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(
        tmp.path().join(".fsbulk.toml"),
        "[settings]\nexclude = [\"skip\"]\n",
    )
    .unwrap();
    fs::create_dir_all(tmp.path().join("tree/skip")).unwrap();
    fs::write(tmp.path().join("tree/keep"), "k").unwrap();

    let out = fsbulk(tmp.path(), &["directory", "tree", "--list-only"]);
    assert!(out.status.success());
    let paths: Vec<String> = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(paths.len(), 2);
    assert!(paths.iter().all(|p| !p.ends_with("skip")));
}

#[test]
fn test_read_prints_text() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("note"), "plain text\n").unwrap();
    let out = fsbulk(tmp.path(), &["read", "note"]);
    assert_eq!(stdout(&out), "plain text\n");
}
