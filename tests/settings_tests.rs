// tests/settings_tests.rs
//! Configuration parsing and view-settings persistence

mod common;
mod support;

use tempfile::tempdir;
use vault_session::config::Config;
use vault_session::error::ConfigError;
use vault_session::{
    CipherAlgorithm, DatabaseType, MemorySettingsStore, Session, SettingsStore,
    TomlSettingsStore, ViewSetting, ViewSettings,
};

use support::{EngineCall, SpyEngine};

#[test]
fn built_in_defaults() {
    let config = Config::default();
    assert_eq!(config.create.database_type, DatabaseType::CurrentFormat);
    assert_eq!(config.create.cipher_algorithm, CipherAlgorithm::Aes256);
    assert_eq!(config.create.key_derivation_rounds, 50_000);
    assert_eq!(config.view, ViewSettings::default());
    assert!(config.view.show_credentials_in_list);
    assert!(config.view.sort_alphabetically);
}

#[test]
fn toml_overrides_only_what_it_names() {
    let config = Config::from_toml_str(
        r#"
        [create]
        database_type = "LegacyFormat"
        cipher_algorithm = "ChaCha20Poly1305"
        key_derivation_rounds = 12000

        [view]
        sort_alphabetically = false
        "#,
    )
    .unwrap();

    assert_eq!(config.create.database_type, DatabaseType::LegacyFormat);
    assert_eq!(config.create.cipher_algorithm, CipherAlgorithm::ChaCha20Poly1305);
    assert_eq!(config.create.key_derivation_rounds, 12_000);
    assert!(config.view.show_credentials_in_list);
    assert!(!config.view.sort_alphabetically);
}

#[test]
fn invalid_config_is_an_error() {
    assert!(matches!(
        Config::from_toml_str("create = 5"),
        Err(ConfigError::Parse(_))
    ));

    let dir = tempdir().unwrap();
    assert!(matches!(
        Config::from_path(&dir.path().join("missing.toml")),
        Err(ConfigError::Io { .. })
    ));
}

#[test]
fn toml_store_round_trips_and_creates_its_directory() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("settings.toml");
    let mut store = TomlSettingsStore::new(&path);
    assert_eq!(store.load().unwrap(), None);

    let settings = ViewSettings {
        show_credentials_in_list: false,
        sort_alphabetically: true,
    };
    store.save(&settings).unwrap();
    assert!(path.exists());
    assert_eq!(TomlSettingsStore::new(&path).load().unwrap(), Some(settings));
}

#[tokio::test]
async fn stored_settings_win_over_configuration() {
    common::setup();
    let mut config = support::test_config();
    config.view.sort_alphabetically = false;

    let stored = ViewSettings {
        show_credentials_in_list: false,
        sort_alphabetically: true,
    };
    let (engine, spy) = SpyEngine::new();
    let session = Session::builder()
        .config(config)
        .settings_store(MemorySettingsStore::with(stored))
        .build(engine)
        .unwrap();

    assert_eq!(session.view_settings(), stored);
    session.shutdown();
    assert_eq!(
        spy.calls(),
        vec![
            EngineCall::ApplySetting(ViewSetting::ShowCredentialsInList(false)),
            EngineCall::ApplySetting(ViewSetting::SortAlphabetically(true)),
        ]
    );
}

#[tokio::test]
async fn configuration_applies_when_nothing_is_stored() {
    let mut config = support::test_config();
    config.view.show_credentials_in_list = false;

    let (engine, _spy) = SpyEngine::new();
    let session = Session::builder()
        .config(config)
        .settings_store(MemorySettingsStore::new())
        .build(engine)
        .unwrap();

    assert!(!session.show_credentials_in_list());
    assert!(session.sort_alphabetically());
    session.shutdown();
}

#[tokio::test]
async fn setters_persist_through_the_store() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.toml");

    let (engine, _spy) = SpyEngine::new();
    let mut session = Session::builder()
        .config(support::test_config())
        .settings_store(TomlSettingsStore::new(&path))
        .build(engine)
        .unwrap();
    session.set_show_credentials_in_list(false);
    session.shutdown();

    let (engine, _spy) = SpyEngine::new();
    let session = Session::builder()
        .config(support::test_config())
        .settings_store(TomlSettingsStore::new(&path))
        .build(engine)
        .unwrap();
    assert!(!session.show_credentials_in_list());
    assert!(session.sort_alphabetically());
    session.shutdown();
}

#[tokio::test]
async fn settings_file_from_configuration_is_used() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("view.toml");
    let mut config = support::test_config();
    config.paths.settings_file = Some(path.clone());

    let (engine, _spy) = SpyEngine::new();
    let mut session = Session::builder().config(config).build(engine).unwrap();
    session.set_sort_alphabetically(false);
    session.shutdown();

    let stored = TomlSettingsStore::new(&path).load().unwrap().unwrap();
    assert!(!stored.sort_alphabetically);
}
