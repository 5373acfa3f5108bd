use std::fs;

use fleetguard_cli::config::{load, ConfigError, ConfigSource, LoadOptions, StorageBackend};
use tempfile::TempDir;

#[test]
fn file_then_env_then_cli() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fleetguard.yaml");
    fs::write(
        &path,
        "storage:\n  backend: memory\nverifier:\n  page_size: 50\nledger:\n  retry:\n    max_attempts: 9\n",
    )
    .unwrap();

    let options = LoadOptions {
        path: Some(path.clone()),
        env: vec![
            ("FLEETGUARD__VERIFIER__PAGE_SIZE".into(), "75".into()),
            ("UNRELATED".into(), "ignored".into()),
        ],
        cli: Vec::new(),
    }
    .cli_override("ledger.retry.max_attempts", 2);

    let loaded = load(&options).unwrap();
    assert_eq!(loaded.path.as_deref(), Some(path.as_path()));
    assert_eq!(loaded.config.storage.backend, StorageBackend::Memory);
    assert_eq!(loaded.config.verifier.page_size, 75);
    assert_eq!(loaded.config.ledger.retry.max_attempts, 2);

    assert_eq!(loaded.source_of("storage.backend"), Some(ConfigSource::File));
    assert_eq!(loaded.source_of("verifier.page_size"), Some(ConfigSource::Env));
    assert_eq!(
        loaded.source_of("ledger.retry.max_attempts"),
        Some(ConfigSource::Cli)
    );
    assert_eq!(loaded.source_of("storage.path"), Some(ConfigSource::Default));
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let options = LoadOptions {
        path: Some(dir.path().join("absent.yaml")),
        ..LoadOptions::default()
    };
    let loaded = load(&options).unwrap();
    assert_eq!(loaded.path, None);
    assert_eq!(loaded.config.storage.backend, StorageBackend::Sqlite);
}

#[test]
fn unknown_file_keys_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fleetguard.yaml");
    fs::write(&path, "verifier:\n  batch: 10\n").unwrap();
    let err = load(&LoadOptions {
        path: Some(path),
        ..LoadOptions::default()
    })
    .unwrap_err();
    assert!(matches!(err, ConfigError::UnknownKey(key) if key == "verifier.batch"));
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fleetguard.yaml");
    fs::write(&path, "storage: [unclosed\n").unwrap();
    let err = load(&LoadOptions {
        path: Some(path),
        ..LoadOptions::default()
    })
    .unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}
