use std::io::Write;
use todolist_core::{ConfigError, Item, ItemStorage, SqliteItemStore, StoreConfig};

#[test]
fn load_reads_file_and_opens_store() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("todolist.sqlite3");
    let config_path = dir.path().join("todolist.toml");

    let mut file = std::fs::File::create(&config_path).unwrap();
    writeln!(
        file,
        "[database]\npath = {:?}\npool_size = 2\n\n[logging]\nlevel = \"warn\"",
        db_path.to_str().unwrap()
    )
    .unwrap();
    drop(file);

    let config = StoreConfig::load(&config_path).unwrap();
    assert_eq!(config.database.path, db_path);
    assert_eq!(config.database.pool_size, 2);
    assert_eq!(config.logging.level, "warn");

    let store = SqliteItemStore::open(&config.database).unwrap();
    store.merge(&Item::new("configured")).unwrap();
    assert!(db_path.exists());
}

#[test]
fn load_missing_file_returns_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");

    let err = StoreConfig::load(&missing).unwrap_err();
    match err {
        ConfigError::Io { path, .. } => assert_eq!(path, missing),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn malformed_document_returns_parse_error() {
    let err = StoreConfig::from_toml_str("[database\npath = 1").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}
