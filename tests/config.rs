use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use recall_monitor::config::{ConfigLoader, DegradePolicy, Settings};
use recall_monitor::error::RecallError;

#[test]
fn load_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().join("recall-monitor.json")).unwrap();
    fs::write(
        &path,
        r#"{
            "fda_base_url": "http://localhost:9000/enforcement.json",
            "cpsc_recall_date_start": "2023-06-01",
            "degrade": "static",
            "max_search_limit": 50
        }"#,
    )
    .unwrap();

    let settings = ConfigLoader::resolve(Some(path.as_str())).unwrap();
    assert_eq!(settings.fda_base_url, "http://localhost:9000/enforcement.json");
    assert_eq!(settings.cpsc_recall_date_start, "2023-06-01");
    assert_eq!(settings.degrade, DegradePolicy::Static);
    assert_eq!(settings.max_search_limit, 50);
    assert_eq!(settings.cpsc_base_url, Settings::default().cpsc_base_url);
}

#[test]
fn missing_explicit_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(RecallError::ConfigRead(_))
    );
}

#[test]
fn malformed_config_is_reported() {
    assert_matches!(
        ConfigLoader::parse(r#"{"degrade": "sometimes"}"#),
        Err(RecallError::ConfigParse(_))
    );
}

#[test]
fn empty_object_yields_defaults() {
    let settings = ConfigLoader::parse("{}").unwrap();
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.max_list_limit, 10_000);
    assert_eq!(settings.default_search_limit, 20);
    assert_eq!(settings.fda_timeout().as_secs(), 30);
    assert_eq!(settings.cpsc_timeout().as_secs(), 45);
}
