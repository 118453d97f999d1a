//! The `lesion` binary: walk and fetch against real directories.

use crate::integration::test_utils::write_file;
use serde_json::{json, Value};
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn lesion(env_dir: &Path, args: &[&str]) -> Output {
    let home = env_dir.join("home");
    std::fs::create_dir_all(&home).unwrap();
    Command::new(env!("CARGO_BIN_EXE_lesion"))
        .env("HOME", &home)
        .env("XDG_CONFIG_HOME", env_dir.join("config"))
        .env_remove("LESION_LOG")
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn test_fetch_prints_assembled_json() {
    let env_dir = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    write_file(root.path(), "config/db.json", r#"{"host":"x"}"#);
    write_file(root.path(), "motd.txt", "hello");

    let output = lesion(
        env_dir.path(),
        &["--quiet", "fetch", root.path().to_str().unwrap()],
    );
    assert!(
        output.status.success(),
        "lesion fetch failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value, json!({"config": {"db": {"host": "x"}}, "motd": "hello"}));
}

#[test]
fn test_walk_lists_files() {
    let env_dir = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    write_file(root.path(), "a.json", "1");
    write_file(root.path(), "nested/b.bin", "raw");
    write_file(root.path(), ".git/HEAD", "ref");

    let output = lesion(
        env_dir.path(),
        &["--quiet", "walk", root.path().to_str().unwrap()],
    );
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().collect::<Vec<_>>(), vec!["a.json", "nested/b.bin"]);
}

#[test]
fn test_missing_root_exits_with_error() {
    let env_dir = TempDir::new().unwrap();
    let missing = env_dir.path().join("absent");

    let output = lesion(
        env_dir.path(),
        &["--quiet", "fetch", missing.to_str().unwrap()],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No such directory"));
}

#[test]
fn test_invalid_config_file_exits_with_error() {
    let env_dir = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    let config = write_file(env_dir.path(), "bad.toml", "[watch]\nbatch_window_ms = 0\n");

    let output = lesion(
        env_dir.path(),
        &[
            "--config",
            config.to_str().unwrap(),
            "fetch",
            root.path().to_str().unwrap(),
        ],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid configuration"));
}
