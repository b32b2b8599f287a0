//! Tests for loading `Config` from disk and the environment.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use toolrent::config::Config;

fn resolver(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config =
        Config::load_from_file(&dir.path().join("absent.toml")).expect("defaults expected");
    assert!(config.bot.welcome_enabled);
    assert_eq!(config.store.db_path, PathBuf::from("data/tools.db"));
}

#[test]
fn partial_file_keeps_other_defaults() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[store]\ndb_path = \"/srv/tools.db\"").expect("write");

    let config = Config::load_from_file(file.path()).expect("should load");
    assert_eq!(config.store.db_path, PathBuf::from("/srv/tools.db"));
    assert_eq!(config.whatsapp.bridge_url, "http://127.0.0.1:3001");
    assert_eq!(config.health.port, 3000);
}

#[test]
fn malformed_file_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[bot\nwelcome_enabled = ").expect("write");

    let err = Config::load_from_file(file.path()).expect_err("should fail");
    assert!(err.to_string().contains("invalid config"));
}

#[test]
fn env_overrides_win_over_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        "[whatsapp]\nbridge_url = \"http://file:3001\"\n\n[bot]\nwelcome_enabled = true"
    )
    .expect("write");

    let mut config = Config::load_from_file(file.path()).expect("should load");
    config.apply_overrides(resolver(&[
        ("TOOLRENT_BRIDGE_URL", "http://env:3001"),
        ("TOOLRENT_WELCOME", "off"),
        ("PORT", "8080"),
    ]));

    assert_eq!(config.whatsapp.bridge_url, "http://env:3001");
    assert!(!config.bot.welcome_enabled);
    assert_eq!(config.health.port, 8080);
}

#[test]
fn config_path_prefers_env() {
    let path = Config::config_path_with(resolver(&[("TOOLRENT_CONFIG_PATH", "/etc/toolrent.toml")]));
    assert_eq!(path, PathBuf::from("/etc/toolrent.toml"));
    assert_eq!(
        Config::config_path_with(resolver(&[])),
        PathBuf::from("config.toml")
    );
}
