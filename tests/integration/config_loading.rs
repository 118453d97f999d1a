//! Layered configuration loading: defaults, global file, explicit file, environment.

use crate::integration::test_utils::{with_xdg_env, write_file};
use lesion::config::ConfigLoader;
use lesion::store::StoreOptions;
use lesion::ResolverSet;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_defaults_without_any_file() {
    let test_dir = TempDir::new().unwrap();
    with_xdg_env(&test_dir, &[], || {
        let config = ConfigLoader::load(None).unwrap();
        assert!(config.root.is_none());
        assert_eq!(config.watch.batch_window_ms, 50);
        assert_eq!(config.watch.ignore_patterns, vec![".git".to_string()]);
        assert_eq!(config.logging.level, "info");
    });
}

#[test]
fn test_global_config_path_uses_xdg_config_home() {
    let test_dir = TempDir::new().unwrap();
    with_xdg_env(&test_dir, &[], || {
        assert_eq!(
            ConfigLoader::global_config_path(),
            Some(test_dir.path().join("lesion").join("config.toml"))
        );
    });
}

#[test]
fn test_explicit_file_overrides_global_file() {
    let test_dir = TempDir::new().unwrap();
    write_file(
        test_dir.path(),
        "lesion/config.toml",
        r#"
root = "/global/root"

[watch]
batch_window_ms = 100
follow_symlinks = true
"#,
    );
    let explicit = write_file(
        test_dir.path(),
        "project.toml",
        r#"
[watch]
batch_window_ms = 250
"#,
    );

    with_xdg_env(&test_dir, &[], || {
        let config = ConfigLoader::load(Some(&explicit)).unwrap();
        assert_eq!(config.root, Some(PathBuf::from("/global/root")));
        assert_eq!(config.watch.batch_window_ms, 250);
        assert!(config.watch.follow_symlinks);
    });
}

#[test]
fn test_environment_overrides_files() {
    let test_dir = TempDir::new().unwrap();
    write_file(
        test_dir.path(),
        "lesion/config.toml",
        r#"
[watch]
batch_window_ms = 100

[logging]
level = "warn"
"#,
    );

    with_xdg_env(
        &test_dir,
        &[
            ("LESION_WATCH__BATCH_WINDOW_MS", "75"),
            ("LESION_LOGGING__LEVEL", "trace"),
        ],
        || {
            let config = ConfigLoader::load(None).unwrap();
            assert_eq!(config.watch.batch_window_ms, 75);
            assert_eq!(config.logging.level, "trace");
        },
    );
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let test_dir = TempDir::new().unwrap();
    with_xdg_env(&test_dir, &[], || {
        let missing = test_dir.path().join("nope.toml");
        assert!(ConfigLoader::load(Some(&missing)).is_err());
    });
}

#[test]
fn test_invalid_values_fail_validation() {
    let test_dir = TempDir::new().unwrap();
    let explicit = write_file(
        test_dir.path(),
        "bad.toml",
        r#"
[watch]
batch_window_ms = 0

[logging]
format = "yaml"
"#,
    );

    let err = ConfigLoader::load_from_file(&explicit).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("batch_window_ms"), "{}", message);
    assert!(message.contains("yaml"), "{}", message);
}

#[test]
fn test_store_options_from_config() {
    let test_dir = TempDir::new().unwrap();
    let explicit = write_file(
        test_dir.path(),
        "lesion.toml",
        r#"
[watch]
ignore_patterns = ["node_modules"]
max_depth = 4
"#,
    );

    let config = ConfigLoader::load_from_file(&explicit).unwrap();
    let options = StoreOptions::from_config(&config, ResolverSet::builtin());
    assert_eq!(options.walker.ignore_patterns, vec!["node_modules".to_string()]);
    assert_eq!(options.walker.max_depth, Some(4));
    assert_eq!(options.resolvers.names(), vec!["json", "toml", "text"]);
}
