mod common;

use std::fs;

use common::counter;
use statehive::config::ConfigError;
use statehive::{Store, StoreOptions};
use tempfile::TempDir;

/// Test that StoreOptions::default() produces the documented values.
#[test]
fn test_options_default_values() {
    let options = StoreOptions::default();

    assert!(!options.strict);
    assert!(options.devtools);
    assert_eq!(options.assertions, cfg!(debug_assertions));
    assert_eq!(options.diagnostics_capacity, 256);
}

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "strict = true\ndevtools = false\ndiagnostics_capacity = 8\n",
    )
    .unwrap();

    let options = StoreOptions::load_from(&path).unwrap();
    assert!(options.strict);
    assert!(!options.devtools);
    assert_eq!(options.diagnostics_capacity, 8);
}

#[test]
fn test_load_from_missing_file_is_read_error() {
    let dir = TempDir::new().unwrap();
    let err = StoreOptions::load_from(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::ReadError { .. }));
}

#[test]
fn test_load_from_malformed_file_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "strict = [\n").unwrap();

    let err = StoreOptions::load_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ParseError { .. }));
    assert!(err.to_string().contains("config.toml"));
}

#[test]
fn test_loaded_options_drive_the_store() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "strict = true\ndiagnostics_capacity = 2\n").unwrap();

    let options = StoreOptions::load_from(&path).unwrap();
    let store = Store::builder(counter(false)).options(options).build().unwrap();
    assert!(store.options().strict);

    for _ in 0..3 {
        store.commit("missing");
    }
    // Capacity bounds the diagnostics log.
    assert_eq!(store.diagnostics().snapshot().len(), 2);
}
